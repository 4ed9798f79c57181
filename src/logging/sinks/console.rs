use std::io::{self, Stdout};

use tracing_subscriber::registry::LookupSpan;

use crate::logging::{
    config::LoggingConfig,
    formatter::{build_formatter, BoxedLayer},
};

/// Консольный слой (stdout) с форматом из конфигурации.
pub fn layer_with_config<S>(config: &LoggingConfig) -> BoxedLayer<S>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    let writer: fn() -> Stdout = io::stdout;
    build_formatter(
        &config.console,
        config.format,
        config.console.with_ansi,
        writer,
    )
}
