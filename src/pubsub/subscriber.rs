use std::sync::Arc;

use globset::Glob;
use tokio::sync::broadcast;

use super::Message;
use crate::error::{RecvError, TryRecvError};

/// Подписка на конкретный канал по имени.
///
/// Отписка происходит автоматически при `Drop`.
pub struct Subscription {
    /// Название канала, на который подписаны.
    pub channel: Arc<str>,
    /// Внутренний приёмник для входящих сообщений.
    pub(crate) inner: broadcast::Receiver<Message>,
}

/// Подписка на каналы по glob-паттерну.
///
/// Получает сообщения из всех каналов, чьё имя подходит под шаблон.
/// Шаблон без спецсимволов (`"chat"`) совпадает только с самим собой.
pub struct PatternSubscription {
    /// Шаблон glob для сопоставления имён каналов.
    pub pattern: Glob,
    /// Внутренний приёмник для входящих сообщений.
    pub(crate) inner: broadcast::Receiver<Message>,
}

impl Subscription {
    /// Асинхронно ожидает следующее сообщение из канала.
    ///
    /// # Возвращает
    /// - `Ok(Message)` при успешном получении сообщения
    /// - `Err(RecvError::Closed)` если канал закрыт
    /// - `Err(RecvError::Lagged(n))` если приёмник отстал на `n` сообщений
    pub async fn recv(&mut self) -> Result<Message, RecvError> {
        self.inner.recv().await.map_err(Into::into)
    }

    /// Пытается получить сообщение без ожидания.
    pub fn try_recv(&mut self) -> Result<Message, TryRecvError> {
        self.inner.try_recv().map_err(Into::into)
    }

    /// Явно отписаться от канала. Аналогично `drop(self)`.
    pub fn unsubscribe(self) {}

    /// Возвращает имя канала, на который подписались.
    pub fn channel_name(&self) -> &Arc<str> {
        &self.channel
    }

    /// Проверяет, закрыт ли канал (нет активных отправителей).
    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    /// Количество сообщений в очереди на получение.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl PatternSubscription {
    pub(crate) fn new(
        pattern: Glob,
        inner: broadcast::Receiver<Message>,
    ) -> Self {
        Self { pattern, inner }
    }

    /// Асинхронно ожидает следующее сообщение, соответствующее паттерну.
    pub async fn recv(&mut self) -> Result<Message, RecvError> {
        self.inner.recv().await.map_err(Into::into)
    }

    /// Пытается получить сообщение без ожидания.
    ///
    /// Используется при остановке контейнера, чтобы дочитать уже
    /// доставленные, но ещё не обработанные сообщения.
    pub fn try_recv(&mut self) -> Result<Message, TryRecvError> {
        self.inner.try_recv().map_err(Into::into)
    }

    /// Явно отписаться от шаблона.
    pub fn unsubscribe(self) {}

    /// Возвращает паттерн подписки.
    pub fn pattern(&self) -> &Glob {
        &self.pattern
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use bytes::Bytes;
    use globset::Glob;
    use tokio::{sync::broadcast, time::timeout};

    use super::*;
    use crate::pubsub::Broker;

    /// Тест проверяет, что имя канала доступно и после удаления брокера.
    #[tokio::test]
    async fn test_subscription_channel_name_outlives_broker() {
        let sub = {
            let broker = Broker::new(10);
            broker.subscribe("mychan")
        };
        assert_eq!(&**sub.channel_name(), "mychan");
    }

    /// Тест проверяет получение сообщения через `recv`.
    #[tokio::test]
    async fn test_receive_message_via_subscription() {
        let broker = Broker::new(10);
        let mut sub = broker.subscribe("testchan");
        broker.publish("testchan", Bytes::from_static(b"hello"));

        let msg = timeout(Duration::from_millis(100), sub.recv())
            .await
            .expect("timed out")
            .expect("no message");
        assert_eq!(&*msg.channel, "testchan");
        assert_eq!(msg.payload, Bytes::from_static(b"hello"));
    }

    /// Тест проверяет, что `try_recv` на пустой очереди отдаёт `Empty`.
    #[test]
    fn test_try_recv_empty() {
        let broker = Broker::new(4);
        let mut sub = broker.subscribe("quiet");
        assert_eq!(sub.try_recv().unwrap_err(), TryRecvError::Empty);
        assert!(sub.is_empty());
    }

    /// Тест проверяет, что явная отписка уменьшает число слушателей.
    #[test]
    fn test_explicit_unsubscribe_drops_receiver() {
        let (tx, rx) = broadcast::channel(5);
        let sub = Subscription {
            channel: Arc::from("bar"),
            inner: rx,
        };
        assert_eq!(tx.receiver_count(), 1);
        sub.unsubscribe();
        assert_eq!(tx.receiver_count(), 0);
    }

    /// Тест проверяет, что шаблонная подписка получает сообщение и
    /// буферизует его до чтения.
    #[tokio::test]
    async fn test_pattern_subscription_buffers_until_read() {
        let broker = Broker::new(10);
        let mut psub = broker.psubscribe("foo*").unwrap();

        broker.publish("foobar", Bytes::from_static(b"xyz"));
        assert_eq!(psub.len(), 1);

        let msg = psub.try_recv().expect("buffered message");
        assert_eq!(&*msg.channel, "foobar");
        assert_eq!(msg.payload, Bytes::from_static(b"xyz"));
        assert!(psub.is_empty());
    }

    /// Тест проверяет, что после закрытия отправителя подписка видит Closed.
    #[tokio::test]
    async fn test_pattern_subscription_closed_after_sender_drop() {
        let (tx, rx) = broadcast::channel::<Message>(3);
        let mut psub = PatternSubscription::new(Glob::new("pat*").unwrap(), rx);
        drop(tx);

        assert!(psub.is_closed());
        assert_eq!(psub.recv().await.unwrap_err(), RecvError::Closed);
    }
}
