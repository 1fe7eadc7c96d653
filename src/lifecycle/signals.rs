//! OS signal handling.
//!
//! Ctrl-C (SIGINT) triggers [`Shutdown`]. Once tokio registers its handler it
//! stays installed for the life of the process, so further Ctrl-C presses are
//! swallowed; waits observe the shutdown flag and return on their own.

use crate::lifecycle::shutdown::Shutdown;

/// Spawn a task that triggers `shutdown` on the first Ctrl-C.
pub fn spawn_ctrl_c_listener(shutdown: Shutdown) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Interrupt received, stopping local wait");
                shutdown.trigger();
            }
            Err(e) => tracing::warn!(error = %e, "Failed to listen for Ctrl-C"),
        }
    })
}
