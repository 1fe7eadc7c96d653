//! Process lifecycle.
//!
//! ```text
//! Ctrl-C (signals.rs) → Shutdown::trigger (shutdown.rs)
//!     → StatusTracker stops polling and reports the last observation
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
