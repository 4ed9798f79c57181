use std::time::Duration;

use tokio::sync::watch;

/// Сигнал остановки, разделяемый между циклом публикации и задачами
/// диспетчеризации.
///
/// Построен на `watch`-канале: состояние "остановлено" запоминается, поэтому
/// задача, которая начала ждать уже после `trigger`, тоже его увидит.
#[derive(Clone, Debug)]
pub struct Shutdown {
    tx: watch::Sender<bool>,
}

/// Сторона, ожидающая сигнала остановки.
#[derive(Clone, Debug)]
pub struct ShutdownListener {
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    /// Возвращает нового слушателя сигнала.
    pub fn listener(&self) -> ShutdownListener {
        ShutdownListener {
            rx: self.tx.subscribe(),
        }
    }

    /// Подаёт сигнал остановки. Повторные вызовы безвредны.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownListener {
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Завершается, когда подан сигнал остановки.
    ///
    /// Если все `Shutdown` удалены без сигнала, future не завершится никогда.
    pub async fn triggered(&mut self) {
        if self.rx.wait_for(|stopped| *stopped).await.is_err() {
            std::future::pending::<()>().await;
        }
    }

    /// Спит `period`, прерываясь по сигналу остановки.
    ///
    /// Возвращает `true`, если сон был прерван.
    pub async fn sleep(
        &mut self,
        period: Duration,
    ) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(period) => false,
            _ = self.triggered() => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_sleep_completes_without_signal() {
        let shutdown = Shutdown::new();
        let mut listener = shutdown.listener();

        assert!(!listener.sleep(Duration::from_millis(20)).await);
        assert!(!listener.is_triggered());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_interrupted_by_trigger() {
        let shutdown = Shutdown::new();
        let mut listener = shutdown.listener();

        let trigger = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            trigger.trigger();
        });

        let started = tokio::time::Instant::now();
        assert!(listener.sleep(Duration::from_secs(60)).await);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    /// Слушатель, созданный после сигнала, видит его сразу.
    #[tokio::test]
    async fn test_late_listener_sees_latched_signal() {
        let shutdown = Shutdown::new();
        shutdown.trigger();
        shutdown.trigger();

        let mut late = shutdown.listener();
        assert!(late.is_triggered());
        late.triggered().await;
        assert!(shutdown.is_triggered());
    }
}
