use std::sync::atomic::{AtomicU64, Ordering};

use tracing::info;

/// Получатель текстовых уведомлений.
///
/// Вызывается из задачи диспетчеризации, поэтому должен быть `Send + Sync`.
pub trait MessageListener: Send + Sync {
    fn on_notification(
        &self,
        payload: &str,
    );
}

/// Обработчик, считающий полученные уведомления.
///
/// Счётчик меняется только в [`MessageListener::on_notification`], начинается
/// с нуля и никогда не сбрасывается. Операции идут с `SeqCst`, поэтому
/// `count()` после возврата `on_notification` видит новое значение из любого
/// потока.
#[derive(Debug, Default)]
pub struct NotificationHandler {
    received: AtomicU64,
}

impl NotificationHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Текущее количество полученных уведомлений.
    pub fn count(&self) -> u64 {
        self.received.load(Ordering::SeqCst)
    }
}

impl MessageListener for NotificationHandler {
    fn on_notification(
        &self,
        payload: &str,
    ) {
        let total = self.received.fetch_add(1, Ordering::SeqCst) + 1;
        info!(payload, total, "Received notification");
    }
}
