//! # Termination signals for [`Supervisor::run_until_signal`](crate::Supervisor::run_until_signal).
//!
//! A bot process usually runs until its service manager asks it to stop; the
//! supervisor then retracts every visible indicator before the process exits.
//!
//! - unix: `SIGINT`, `SIGTERM` or `SIGQUIT`
//! - elsewhere: Ctrl-C

use std::io;

/// Resolves once the process is asked to terminate.
///
/// Fails only if a listener can not be installed.
#[cfg(unix)]
pub(crate) async fn wait_for_shutdown_signal() -> io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let kinds = [
        ("SIGINT", SignalKind::interrupt()),
        ("SIGTERM", SignalKind::terminate()),
        ("SIGQUIT", SignalKind::quit()),
    ];
    let mut listeners = Vec::with_capacity(kinds.len());
    for (name, kind) in kinds {
        listeners.push((name, signal(kind)?));
    }

    let received = listeners
        .iter_mut()
        .map(|(name, sig)| Box::pin(async move { (sig.recv().await, *name) }));
    let ((_, name), _, _) = futures::future::select_all(received).await;
    tracing::info!(signal = name, "termination signal received");
    Ok(())
}

/// Resolves once the process is asked to terminate.
#[cfg(not(unix))]
pub(crate) async fn wait_for_shutdown_signal() -> io::Result<()> {
    tokio::signal::ctrl_c().await?;
    tracing::info!(signal = "ctrl-c", "termination signal received");
    Ok(())
}
