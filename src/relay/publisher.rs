use std::{process::ExitCode, sync::Arc, time::Duration};

use bytes::Bytes;
use tracing::{debug, info, warn};

use crate::{
    application::BrokerConnection,
    error::{ConnectionError, RelayError},
    relay::{NotificationHandler, ShutdownListener},
};

/// Интервал между публикациями по умолчанию.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(500);

/// Код завершения при отмене до первого полученного уведомления.
pub const CANCELLED_EXIT_CODE: u8 = 130;

/// Параметры цикла публикации.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishConfig {
    /// Пауза между попытками публикации.
    pub interval: Duration,
    /// Сколько подряд неудачных публикаций допустимо. `None` — без предела.
    pub max_retries: Option<u32>,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            max_retries: None,
        }
    }
}

/// Чем закончился цикл публикации.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopOutcome {
    /// Обработчик увидел хотя бы одно уведомление.
    Observed { published: u64, received: u64 },
    /// Цикл прерван сигналом остановки.
    Cancelled { published: u64 },
}

impl LoopOutcome {
    pub fn published(&self) -> u64 {
        match *self {
            Self::Observed { published, .. } | Self::Cancelled { published } => published,
        }
    }

    /// Числовой код завершения процесса.
    pub fn exit_status(&self) -> u8 {
        match self {
            Self::Observed { .. } => 0,
            Self::Cancelled { .. } => CANCELLED_EXIT_CODE,
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.exit_status())
    }
}

/// Цикл публикации.
///
/// Пока счётчик обработчика равен нулю, публикует payload и ждёт `interval`.
/// Счётчик проверяется в начале каждой итерации. Это опрос, а не ожидание
/// конкретного ответа: до остановки может уйти больше одного сообщения, и
/// остановить цикл может любое полученное уведомление, не обязательно
/// ответ на первую публикацию.
pub struct PublishLoop {
    connection: Arc<dyn BrokerConnection>,
    config: PublishConfig,
    shutdown: ShutdownListener,
}

impl PublishLoop {
    pub fn new(
        connection: Arc<dyn BrokerConnection>,
        config: PublishConfig,
        shutdown: ShutdownListener,
    ) -> Self {
        Self {
            connection,
            config,
            shutdown,
        }
    }

    pub fn config(&self) -> &PublishConfig {
        &self.config
    }

    pub async fn run(
        &mut self,
        channel: &str,
        payload: &str,
        handler: &NotificationHandler,
    ) -> Result<LoopOutcome, RelayError> {
        let payload = Bytes::copy_from_slice(payload.as_bytes());
        let mut published = 0u64;
        let mut failures = 0u32;

        loop {
            let received = handler.count();
            if received != 0 {
                info!(channel, published, received, "notification observed, stopping");
                return Ok(LoopOutcome::Observed {
                    published,
                    received,
                });
            }
            if self.shutdown.is_triggered() {
                return Ok(self.cancelled(published));
            }

            info!(channel, "Sending message...");
            match self.connection.publish(channel, payload.clone()).await {
                Ok(receivers) => {
                    published += 1;
                    failures = 0;
                    debug!(channel, receivers, published, "message published");
                }
                Err(e) => {
                    failures += 1;
                    self.check_retry_budget(channel, failures, e)?;
                }
            }

            if self.shutdown.sleep(self.config.interval).await {
                return Ok(self.cancelled(published));
            }
        }
    }

    fn check_retry_budget(
        &self,
        channel: &str,
        failures: u32,
        error: ConnectionError,
    ) -> Result<(), RelayError> {
        match self.config.max_retries {
            Some(max) if failures > max => Err(RelayError::RetriesExhausted {
                attempts: failures,
                last: error,
            }),
            _ => {
                warn!(
                    channel,
                    failures,
                    retry_in_ms = self.config.interval.as_millis() as u64,
                    error = %error,
                    "publish failed, will retry"
                );
                Ok(())
            }
        }
    }

    fn cancelled(
        &self,
        published: u64,
    ) -> LoopOutcome {
        info!(published, "publish loop cancelled");
        LoopOutcome::Cancelled { published }
    }
}
