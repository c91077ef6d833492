//! OS signal handling.
//!
//! # Responsibilities
//! - Wait for SIGTERM or SIGINT
//! - Trigger the shutdown coordinator exactly once
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - No reload signal; configuration is fixed for the process lifetime

use std::io;

use tokio::signal;

use crate::lifecycle::shutdown::Shutdown;

/// Resolve on the first SIGTERM or SIGINT.
pub async fn termination_signal() -> io::Result<&'static str> {
    #[cfg(unix)]
    {
        let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())?;
        tokio::select! {
            res = signal::ctrl_c() => res.map(|_| "SIGINT"),
            _ = terminate.recv() => Ok("SIGTERM"),
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c().await.map(|_| "SIGINT")
    }
}

/// Spawn the listener that turns the first termination signal into a
/// shutdown trigger.
pub fn spawn_signal_listener(shutdown: Shutdown) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        match termination_signal().await {
            Ok(name) => {
                tracing::info!(signal = name, "shutdown-signal");
                shutdown.trigger();
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handlers");
            }
        }
    })
}
