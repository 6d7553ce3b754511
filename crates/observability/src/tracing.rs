//! Tracing/logging initialization.

use restkit_core::Settings;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Filter used when `RUST_LOG` is unset or invalid.
    pub default_filter: String,
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            default_filter: "info".to_string(),
            json: true,
        }
    }
}

impl LogConfig {
    /// Human-readable output for local runs, JSON everywhere else.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            json: settings.environment != "local",
            ..Self::default()
        }
    }

    pub fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.default_filter))
    }
}

/// Install the global subscriber described by `config`.
///
/// Returns `false` when a subscriber was already installed.
pub fn init_with(config: &LogConfig) -> bool {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(config.filter())
        .with_timer(tracing_subscriber::fmt::time::SystemTime);

    if config.json {
        builder.json().with_target(true).try_init().is_ok()
    } else {
        builder.with_target(true).try_init().is_ok()
    }
}
