//! Observability subsystem.
//!
//! All subsystems emit `tracing` events with structured fields; `logging.rs`
//! installs the subscriber that renders them to stderr.

pub mod logging;

pub use logging::init_logging;
