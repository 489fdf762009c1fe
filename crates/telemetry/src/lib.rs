//! Tracing subscriber bootstrap.

use anyhow::Context;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use bookshelf_kernel::settings::{LogFormat, TelemetrySettings};

/// Build the `EnvFilter`: `RUST_LOG` wins, otherwise the configured level.
fn env_filter(settings: &TelemetrySettings) -> anyhow::Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&settings.level)
            .with_context(|| format!("invalid log level directive '{}'", settings.level)),
    }
}

/// Install the global tracing subscriber.
///
/// Calling this more than once is harmless; later calls leave the first
/// subscriber in place.
pub fn init(settings: &TelemetrySettings) -> anyhow::Result<()> {
    let filter = env_filter(settings)?;

    let installed = match settings.log_format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_current_span(true))
            .try_init(),
    };

    if installed.is_ok() {
        tracing::info!(
            target: "bookshelf-telemetry",
            format = ?settings.log_format,
            level = %settings.level,
            "telemetry initialized"
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_malformed_level() {
        let settings = TelemetrySettings {
            log_format: LogFormat::Pretty,
            level: "bookshelf=loud".to_string(),
        };
        if std::env::var("RUST_LOG").is_err() {
            assert!(env_filter(&settings).is_err());
        }
    }

    #[test]
    fn init_twice_is_harmless() {
        let settings = TelemetrySettings::default();
        init(&settings).unwrap();
        init(&settings).unwrap();
    }
}
