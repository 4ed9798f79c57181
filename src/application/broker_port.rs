//! Интерфейс (порт) соединения с брокером сообщений.
//!
//! Ядро ретранслятора зависит только от этого набора операций:
//! - `publish` — опубликовать текстовое сообщение в канал.
//! - `psubscribe` — подписаться на канал по шаблону и получить поток
//!   входящих сообщений.
//! - `close` — освободить соединение.
//!
//! Встроенная реализация — внутрипроцессный [`Broker`]. Тесты подставляют
//! собственные реализации с задержками и сбоями.

use async_trait::async_trait;
use bytes::Bytes;

use crate::{
    error::ConnectionError,
    pubsub::{Broker, PatternSubscription},
};

#[async_trait]
pub trait BrokerConnection: Send + Sync {
    /// Опубликовать сообщение. Возвращает число получателей.
    async fn publish(
        &self,
        channel: &str,
        payload: Bytes,
    ) -> Result<usize, ConnectionError>;

    /// Подписаться на каналы, подходящие под шаблон.
    async fn psubscribe(
        &self,
        pattern: &str,
    ) -> Result<PatternSubscription, ConnectionError>;

    /// Закрыть соединение. Повторный вызов ничего не делает.
    async fn close(&self);
}

#[async_trait]
impl BrokerConnection for Broker {
    async fn publish(
        &self,
        channel: &str,
        payload: Bytes,
    ) -> Result<usize, ConnectionError> {
        if self.is_closed() {
            return Err(ConnectionError::Closed);
        }
        Ok(Broker::publish(self, channel, payload))
    }

    async fn psubscribe(
        &self,
        pattern: &str,
    ) -> Result<PatternSubscription, ConnectionError> {
        if self.is_closed() {
            return Err(ConnectionError::Closed);
        }
        Broker::psubscribe(self, pattern).map_err(|e| ConnectionError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })
    }

    async fn close(&self) {
        Broker::close(self);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn test_broker_connection_round_trip() {
        let conn: Arc<dyn BrokerConnection> = Arc::new(Broker::new(8));
        let mut sub = conn.psubscribe("chat").await.unwrap();

        let reached = conn
            .publish("chat", Bytes::from_static(b"Hello"))
            .await
            .unwrap();
        assert_eq!(reached, 1);
        assert_eq!(sub.recv().await.unwrap().payload_str().unwrap(), "Hello");
    }

    #[tokio::test]
    async fn test_closed_broker_rejects_operations() {
        let broker = Broker::new(8);
        BrokerConnection::close(&broker).await;

        let publish = BrokerConnection::publish(&broker, "chat", Bytes::from_static(b"x")).await;
        assert_eq!(publish.unwrap_err(), ConnectionError::Closed);

        let subscribe = BrokerConnection::psubscribe(&broker, "chat").await;
        assert!(matches!(subscribe, Err(ConnectionError::Closed)));
    }

    #[tokio::test]
    async fn test_invalid_pattern_maps_to_connection_error() {
        let broker = Broker::new(8);
        let err = BrokerConnection::psubscribe(&broker, "[bad")
            .await
            .err()
            .expect("pattern must be rejected");
        match err {
            ConnectionError::InvalidPattern { pattern, .. } => assert_eq!(pattern, "[bad"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
