//! pubsub-relay
//!
//! Публикует уведомление в канал встроенного брокера, пока подписчик на тот
//! же канал не получит хотя бы одно сообщение.
//!
//! Коды завершения: 0 — уведомление получено, 1 — фатальная ошибка,
//! 130 — остановлено по Ctrl-C.

use std::{process::ExitCode, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use pubsub_relay::{
    init_logging, Broker, BrokerConnection, LoggingConfig, Relay, Settings, Shutdown,
};
use tracing::{error, info, warn};

/// Аргументы командной строки. Переопределяют значения из `relay.toml` и
/// переменных окружения `RELAY_*`.
#[derive(Parser, Debug)]
#[command(name = "pubsub-relay")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_version = concat!(
    env!("CARGO_PKG_VERSION"),
    " (", env!("RELAY_GIT_COMMIT"), ", built ", env!("RELAY_BUILD_TIME"), ")"
))]
#[command(about = "Publish a notification until a subscriber on the same channel receives it", long_about = None)]
struct Cli {
    /// Канал (glob-шаблон подписки)
    #[arg(short, long)]
    channel: Option<String>,
    /// Текст уведомления
    #[arg(short, long, conflicts_with = "source")]
    payload: Option<String>,
    /// Источник для текста `Hello from <source>!`
    #[arg(short, long)]
    source: Option<String>,
    /// Пауза между публикациями, мс
    #[arg(short, long)]
    interval_ms: Option<u64>,
    /// Допустимое число подряд неудачных публикаций
    #[arg(long)]
    max_retries: Option<u32>,
    /// Путь к файлу настроек
    #[arg(long, default_value = "relay.toml")]
    config: std::path::PathBuf,
    /// Уровень логирования (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn settings(&self) -> Result<Settings> {
        let mut settings = Settings::load_from(&self.config)
            .with_context(|| format!("failed to load settings from {}", self.config.display()))?;

        if let Some(channel) = &self.channel {
            settings.channel = channel.clone();
        }
        if let Some(payload) = &self.payload {
            settings.payload = payload.clone();
        }
        if let Some(source) = &self.source {
            settings.payload = pubsub_relay::greeting(source);
        }
        if let Some(interval_ms) = self.interval_ms {
            settings.interval_ms = interval_ms;
        }
        if self.max_retries.is_some() {
            settings.max_publish_retries = self.max_retries;
        }
        settings.validate().context("invalid settings")?;
        Ok(settings)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let logging = LoggingConfig {
        level_override: cli.log_level.clone(),
        ..LoggingConfig::default()
    };
    let log_handle = match init_logging(logging) {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            return ExitCode::FAILURE;
        }
    };

    let code = match cli.settings() {
        Ok(settings) => run(settings).await,
        Err(e) => {
            error!(error = %format!("{e:#}"), "fatal startup error");
            ExitCode::FAILURE
        }
    };

    log_handle.shutdown();
    code
}

async fn run(settings: Settings) -> ExitCode {
    let broker: Arc<dyn BrokerConnection> = Arc::new(Broker::new(settings.broker_capacity));
    let shutdown = Shutdown::new();

    let ctrl_c = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Ctrl-C received, shutting down");
            ctrl_c.trigger();
        }
    });

    info!(
        commit = env!("RELAY_GIT_COMMIT"),
        channel = %settings.channel,
        interval_ms = settings.interval_ms,
        max_retries = ?settings.max_publish_retries,
        "starting relay"
    );

    match Relay::assemble(broker, &settings, &shutdown).run().await {
        Ok(outcome) => outcome.exit_code(),
        Err(e) => {
            error!(error = %e, "relay failed");
            ExitCode::from(e.exit_code())
        }
    }
}
