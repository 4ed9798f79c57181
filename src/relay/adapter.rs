use std::{fmt, sync::Arc};

use crate::{error::PayloadExtractionError, pubsub::Message, relay::MessageListener};

/// Адаптер между событием брокера и вызовом слушателя.
///
/// Извлекает payload из [`Message`] как UTF-8 текст без преобразований и
/// вызывает слушателя ровно один раз. Имя адаптера служит его идентичностью
/// в [`SubscriptionManager`](crate::relay::SubscriptionManager).
#[derive(Clone)]
pub struct ListenerAdapter {
    name: Arc<str>,
    listener: Arc<dyn MessageListener>,
}

impl ListenerAdapter {
    pub fn new(
        name: impl Into<Arc<str>>,
        listener: Arc<dyn MessageListener>,
    ) -> Self {
        Self {
            name: name.into(),
            listener,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Передаёт одно доставленное сообщение слушателю.
    ///
    /// Не-UTF-8 payload возвращается как ошибка, слушатель при этом не
    /// вызывается.
    pub fn dispatch(
        &self,
        message: &Message,
    ) -> Result<(), PayloadExtractionError> {
        let payload =
            message
                .payload_str()
                .map_err(|source| PayloadExtractionError::InvalidUtf8 {
                    channel: message.channel.to_string(),
                    source,
                })?;
        self.listener.on_notification(payload);
        Ok(())
    }
}

impl fmt::Debug for ListenerAdapter {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("ListenerAdapter")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use bytes::Bytes;

    use super::*;
    use crate::relay::NotificationHandler;

    /// Слушатель, запоминающий payload'ы.
    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl MessageListener for Recorder {
        fn on_notification(
            &self,
            payload: &str,
        ) {
            self.0.lock().unwrap().push(payload.to_string());
        }
    }

    #[test]
    fn test_dispatch_passes_payload_verbatim() {
        let recorder = Arc::new(Recorder::default());
        let adapter = ListenerAdapter::new("recorder", recorder.clone());

        adapter
            .dispatch(&Message::new("chat", "  Hello from Relay!\n"))
            .unwrap();

        assert_eq!(*recorder.0.lock().unwrap(), vec!["  Hello from Relay!\n"]);
    }

    #[test]
    fn test_dispatch_increments_handler() {
        let handler = Arc::new(NotificationHandler::new());
        let adapter = ListenerAdapter::new("receiver", handler.clone());

        adapter.dispatch(&Message::new("chat", "ping")).unwrap();
        assert_eq!(handler.count(), 1);
    }

    /// Битое сообщение: ошибка, счётчик не меняется.
    #[test]
    fn test_malformed_payload_is_surfaced_and_not_counted() {
        let handler = Arc::new(NotificationHandler::new());
        let adapter = ListenerAdapter::new("receiver", handler.clone());

        let err = adapter
            .dispatch(&Message::new("chat", Bytes::from_static(&[0xc3, 0x28])))
            .unwrap_err();

        assert!(matches!(
            err,
            PayloadExtractionError::InvalidUtf8 { ref channel, .. } if channel == "chat"
        ));
        assert_eq!(handler.count(), 0);
    }

    #[test]
    fn test_debug_shows_name() {
        let adapter = ListenerAdapter::new("receiver", Arc::new(NotificationHandler::new()));
        assert!(format!("{adapter:?}").contains("receiver"));
    }
}
