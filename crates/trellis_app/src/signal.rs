//! Shutdown signal handling.

use std::io;

/// Waits for Ctrl-C, or SIGTERM on Unix.
///
/// # Errors
///
/// Returns an error if a signal handler could not be installed.
pub async fn shutdown_signal() -> io::Result<()> {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?
            .recv()
            .await;
        Ok::<(), io::Error>(())
    };

    #[cfg(not(unix))]
    let terminate = core::future::pending::<io::Result<()>>();

    tokio::select! {
        result = ctrl_c => {
            tracing::info!("received Ctrl-C, shutting down");
            result
        }
        result = terminate => {
            tracing::info!("received SIGTERM, shutting down");
            result
        }
    }
}
