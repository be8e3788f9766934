//! Application wiring and lifecycle management.

mod call;
mod executor;
mod lifecycle;
mod serve;

pub use call::{call, CallArgs};
pub use executor::run_executor;
pub use lifecycle::{check_status, stop_controller};
pub use serve::run_controller;

use tracing::{info, warn};

/// Wait for SIGTERM or Ctrl-C.
async fn wait_for_termination() {
    let mut terminate =
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(signal) => signal,
            Err(e) => {
                warn!(error = %e, "SIGTERM handler unavailable, waiting for Ctrl-C only");
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };

    tokio::select! {
        _ = terminate.recv() => info!("SIGTERM received"),
        _ = tokio::signal::ctrl_c() => info!("Ctrl-C received"),
    }
}
