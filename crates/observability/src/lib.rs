//! Process-wide logging setup for the orgusers services.

pub mod tracing;

pub use tracing::{LogConfig, LogFormat};

/// Initialize tracing from the environment (`RUST_LOG`, `ORGUSERS_LOG_FORMAT`).
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    tracing::init(&LogConfig::from_env());
}
