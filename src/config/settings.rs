use std::{path::Path, time::Duration};

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::relay::{PublishConfig, DEFAULT_DRAIN_TIMEOUT, DEFAULT_INTERVAL};

pub const DEFAULT_CHANNEL: &str = "chat";
pub const DEFAULT_SOURCE: &str = "Relay";
pub const DEFAULT_LISTENER: &str = "receiver";
pub const DEFAULT_BROKER_CAPACITY: usize = 64;

/// Настройки ретранслятора.
///
/// Источники по возрастанию приоритета: значения по умолчанию, файл
/// `relay.toml` (если есть), переменные окружения `RELAY_*`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Канал (glob-шаблон для подписки) — `chat`.
    pub channel: String,
    /// Текст уведомления; по умолчанию `Hello from <source>!`.
    pub payload: String,
    /// Пауза между публикациями, мс.
    pub interval_ms: u64,
    /// Допустимое число подряд неудачных публикаций.
    pub max_publish_retries: Option<u32>,
    /// Имя слушателя в контейнере подписок.
    pub listener_name: String,
    /// Ёмкость буфера канала во встроенном брокере.
    pub broker_capacity: usize,
    /// Сколько ждать дочитывания сообщений при остановке, мс.
    pub drain_timeout_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            channel: DEFAULT_CHANNEL.to_string(),
            payload: greeting(DEFAULT_SOURCE),
            interval_ms: DEFAULT_INTERVAL.as_millis() as u64,
            max_publish_retries: None,
            listener_name: DEFAULT_LISTENER.to_string(),
            broker_capacity: DEFAULT_BROKER_CAPACITY,
            drain_timeout_ms: DEFAULT_DRAIN_TIMEOUT.as_millis() as u64,
        }
    }
}

/// Текст уведомления для источника: `Hello from <source>!`.
pub fn greeting(source: &str) -> String {
    format!("Hello from {source}!")
}

impl Settings {
    /// Загружает настройки из `relay.toml` в рабочем каталоге и окружения
    /// и проверяет их.
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Self::load_from(Path::new("relay.toml"))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Загружает настройки из указанного файла (необязательного) и окружения.
    ///
    /// Значения не проверяются: вызывающий может ещё наложить свои
    /// переопределения и затем вызвать [`Settings::validate`].
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let defaults = Settings::default();
        let cfg = Config::builder()
            .set_default("channel", defaults.channel)?
            .set_default("payload", defaults.payload)?
            .set_default("interval_ms", defaults.interval_ms)?
            .set_default("listener_name", defaults.listener_name)?
            .set_default("broker_capacity", defaults.broker_capacity as u64)?
            .set_default("drain_timeout_ms", defaults.drain_timeout_ms)?
            .add_source(File::from(path).required(false))
            // Переменные окружения с префиксом RELAY_
            .add_source(Environment::with_prefix("RELAY").try_parsing(true))
            .build()?;

        cfg.try_deserialize()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channel.trim().is_empty() {
            return Err(ConfigError::Message("channel must not be empty".into()));
        }
        if self.interval_ms == 0 {
            return Err(ConfigError::Message("interval_ms must be positive".into()));
        }
        if self.broker_capacity == 0 {
            return Err(ConfigError::Message(
                "broker_capacity must be positive".into(),
            ));
        }
        if self.listener_name.is_empty() {
            return Err(ConfigError::Message(
                "listener_name must not be empty".into(),
            ));
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }

    pub fn publish_config(&self) -> PublishConfig {
        PublishConfig {
            interval: self.interval(),
            max_retries: self.max_publish_retries,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use serial_test::serial;

    use super::*;

    const ENV_KEYS: &[&str] = &[
        "RELAY_CHANNEL",
        "RELAY_PAYLOAD",
        "RELAY_INTERVAL_MS",
        "RELAY_MAX_PUBLISH_RETRIES",
        "RELAY_BROKER_CAPACITY",
    ];

    fn clear_env() {
        for key in ENV_KEYS {
            std::env::remove_var(key);
        }
    }

    fn missing_file() -> std::path::PathBuf {
        std::env::temp_dir().join("relay-settings-does-not-exist.toml")
    }

    #[test]
    #[serial]
    fn test_defaults_without_file_or_env() {
        clear_env();
        let settings = Settings::load_from(&missing_file()).unwrap();

        assert_eq!(settings, Settings::default());
        assert_eq!(settings.channel, "chat");
        assert_eq!(settings.payload, "Hello from Relay!");
        assert_eq!(settings.interval(), Duration::from_millis(500));
        assert_eq!(settings.publish_config().max_retries, None);
    }

    #[test]
    #[serial]
    fn test_env_overrides_defaults() {
        clear_env();
        std::env::set_var("RELAY_CHANNEL", "news");
        std::env::set_var("RELAY_INTERVAL_MS", "25");
        std::env::set_var("RELAY_MAX_PUBLISH_RETRIES", "3");

        let settings = Settings::load_from(&missing_file());
        clear_env();
        let settings = settings.unwrap();

        assert_eq!(settings.channel, "news");
        assert_eq!(settings.interval_ms, 25);
        assert_eq!(settings.max_publish_retries, Some(3));
    }

    #[test]
    #[serial]
    fn test_file_source_is_applied() {
        clear_env();
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "payload = \"Hello from tests!\"\ninterval_ms = 40").unwrap();

        let settings = Settings::load_from(file.path()).unwrap();
        assert_eq!(settings.payload, "Hello from tests!");
        assert_eq!(settings.interval_ms, 40);
        assert_eq!(settings.channel, "chat");
    }

    #[test]
    #[serial]
    fn test_zero_interval_is_rejected() {
        clear_env();
        std::env::set_var("RELAY_INTERVAL_MS", "0");
        let settings = Settings::load_from(&missing_file());
        clear_env();

        let settings = settings.unwrap();
        assert_eq!(settings.interval_ms, 0);
        assert!(settings.validate().is_err());
    }

    /// Невалидное значение из окружения можно исправить переопределением
    /// до проверки.
    #[test]
    #[serial]
    fn test_override_after_load_fixes_invalid_env_value() {
        clear_env();
        std::env::set_var("RELAY_INTERVAL_MS", "0");
        let settings = Settings::load_from(&missing_file());
        clear_env();

        let mut settings = settings.unwrap();
        settings.interval_ms = 100;
        assert!(settings.validate().is_ok());
        assert_eq!(settings.interval(), Duration::from_millis(100));
    }

    #[test]
    fn test_greeting_format() {
        assert_eq!(greeting("Redis"), "Hello from Redis!");
    }
}
