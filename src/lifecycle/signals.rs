//! OS signal handling for the default (non-wrap) mode.
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - SIGINT and SIGTERM both end the service with exit code 0
//! - In wrap mode signals belong to the child; see `supervisor::relay`

use crate::lifecycle::shutdown::{Shutdown, TerminalEvent};

/// Wait for SIGINT (Ctrl+C) or SIGTERM.
pub async fn terminate_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            res = tokio::signal::ctrl_c() => res?,
            _ = terminate.recv() => {}
        }
    }
    #[cfg(not(unix))]
    tokio::signal::ctrl_c().await?;

    Ok(())
}

/// Trigger shutdown when a termination signal arrives.
pub fn spawn_signal_shutdown(shutdown: Shutdown) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        match terminate_signal().await {
            Ok(()) => {
                tracing::info!("Shutdown signal received");
                shutdown.trigger(TerminalEvent::Signal);
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
            }
        }
    })
}
