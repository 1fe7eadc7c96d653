//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once per process
//! - Keep log output on stderr so stdout carries only command results
//!
//! # Design Decisions
//! - `RSK_CLI_LOG` (EnvFilter syntax) overrides the configured level
//! - Fields, not interpolated strings, for addresses, hashes and nonces

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable holding an `EnvFilter` directive.
pub const LOG_ENV_VAR: &str = "RSK_CLI_LOG";

/// Filter from `RSK_CLI_LOG`, falling back to `default_level` for this crate.
pub fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(format!("rsk_wallet={}", default_level)))
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init_logging(default_level: &str) {
    let _ = tracing_subscriber::registry()
        .with(env_filter(default_level))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
}
