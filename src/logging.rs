//! Logging setup
//!
//! Structured logging through `tracing`, written to stderr (or a file) so
//! command output on stdout stays machine-readable.

use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LoggingConfig, LOG_ENV};

/// Initialize the global subscriber from configuration
///
/// `ANIFLIX_LOG` takes precedence over the configured level. Supports JSON
/// and pretty formats.
pub fn init(config: &LoggingConfig) -> anyhow::Result<()> {
    let fallback = parse_level(&config.level).unwrap_or(Level::INFO);
    let env_filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new(fallback.to_string()));

    let registry = tracing_subscriber::registry().with(env_filter);
    let json = config.format.eq_ignore_ascii_case("json");

    match (&config.file_path, json) {
        (Some(path), json) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            let writer = std::sync::Arc::new(file);
            if json {
                registry
                    .with(fmt::layer().json().with_writer(writer))
                    .try_init()?;
            } else {
                registry
                    .with(fmt::layer().with_ansi(false).with_writer(writer))
                    .try_init()?;
            }
        }
        (None, true) => {
            registry
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .try_init()?;
        }
        (None, false) => {
            registry
                .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
                .try_init()?;
        }
    }

    Ok(())
}

/// Parse a plain level name
pub fn parse_level(level: &str) -> Option<Level> {
    match level.trim().to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" | "warning" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}
