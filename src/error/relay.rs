//! Ошибки ядра ретранслятора.
//!
//! Таксономия повторяет то, как ретранслятор реагирует на сбой:
//! - [`ConnectionError`] — брокер недоступен. При подписке фатально, при
//!   публикации повторяется.
//! - [`SubscriptionError`] — ошибка регистрации слушателя, не повторяется.
//! - [`PayloadExtractionError`] — сообщение нельзя превратить в текст;
//!   фиксируется в логе и метрике, но не засчитывается как получение.
//! - [`RelayError`] — верхнеуровневая ошибка для вызывающего кода.

use std::str::Utf8Error;

use thiserror::Error;

/// Брокер недоступен или отказал в операции.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionError {
    #[error("broker connection is closed")]
    Closed,

    #[error("broker unreachable: {reason}")]
    Unreachable { reason: String },

    #[error("invalid channel pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

/// Ошибка регистрации подписки в [`SubscriptionManager`].
///
/// [`SubscriptionManager`]: crate::relay::SubscriptionManager
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubscriptionError {
    #[error("listener '{listener}' is already subscribed to '{pattern}'")]
    Duplicate { pattern: String, listener: String },

    #[error("subscription manager is stopped")]
    Stopped,

    #[error("subscribe failed: {0}")]
    Connection(#[from] ConnectionError),
}

/// Доставленное событие не удалось превратить в текстовый payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadExtractionError {
    #[error("payload on channel '{channel}' is not valid UTF-8: {source}")]
    InvalidUtf8 {
        channel: String,
        #[source]
        source: Utf8Error,
    },
}

/// Верхнеуровневая ошибка ретранслятора.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Subscription(#[from] SubscriptionError),

    #[error(transparent)]
    Payload(#[from] PayloadExtractionError),

    #[error("publish failed {attempts} times in a row, last error: {last}")]
    RetriesExhausted {
        attempts: u32,
        last: ConnectionError,
    },
}

impl RelayError {
    /// Код завершения процесса для фатальной ошибки.
    pub fn exit_code(&self) -> u8 {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_display_names_binding() {
        let err = SubscriptionError::Duplicate {
            pattern: "chat".into(),
            listener: "receiver".into(),
        };
        assert_eq!(
            err.to_string(),
            "listener 'receiver' is already subscribed to 'chat'"
        );
    }

    #[test]
    fn test_connection_error_converts_into_subscription_error() {
        let err: SubscriptionError = ConnectionError::Closed.into();
        assert_eq!(err, SubscriptionError::Connection(ConnectionError::Closed));
    }

    #[test]
    fn test_retries_exhausted_display() {
        let err = RelayError::RetriesExhausted {
            attempts: 3,
            last: ConnectionError::Unreachable {
                reason: "refused".into(),
            },
        };
        assert_eq!(
            err.to_string(),
            "publish failed 3 times in a row, last error: broker unreachable: refused"
        );
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_payload_error_keeps_source() {
        let bytes = [0xffu8, 0xfe];
        let source = std::str::from_utf8(&bytes).unwrap_err();
        let err = PayloadExtractionError::InvalidUtf8 {
            channel: "chat".into(),
            source,
        };
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().starts_with("payload on channel 'chat'"));
    }
}
