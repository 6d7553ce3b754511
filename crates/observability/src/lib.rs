//! Process-wide tracing setup shared by restkit services.

/// Initialize tracing with JSON output and `RUST_LOG` filtering.
///
/// Safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    self::tracing::init_with(&LogConfig::default());
}

pub use self::tracing::{LogConfig, init_with};

/// Subscriber configuration (filters, output format).
pub mod tracing;
