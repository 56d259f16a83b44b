//! Shutdown triggers for `stagemirror watch`.

use tokio::sync::broadcast;

/// What ended the watch loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// Ctrl+C
    Interrupt,
    /// SIGTERM
    Terminate,
    /// `q` typed on stdin
    Quit,
}

/// Resolve with the first shutdown trigger.
///
/// A signal handler that cannot be installed is logged and never fires.
pub async fn wait_for_shutdown(mut quit_rx: broadcast::Receiver<()>) -> ShutdownReason {
    let reason = tokio::select! {
        _ = interrupt() => ShutdownReason::Interrupt,
        _ = terminate() => ShutdownReason::Terminate,
        _ = quit_rx.recv() => ShutdownReason::Quit,
    };

    tracing::info!(?reason, "Shutdown requested");
    reason
}

async fn interrupt() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to register SIGTERM handler");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}
