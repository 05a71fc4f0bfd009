//! Initializes `tracing` from the loaded configuration's `default` level.

use crate::config::LoggingConfig;
use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

fn parse_level(raw: &str) -> Level {
    match raw.to_ascii_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

pub fn init(config: &LoggingConfig) {
    let level = config
        .get("default")
        .map(|section| parse_level(&section.level))
        .unwrap_or(Level::INFO);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string().to_lowercase()));

    fmt().with_env_filter(filter).with_target(true).init();
}
