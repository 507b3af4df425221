//! Process shutdown signals
//!
//! A run stops early on Ctrl-C and, on unix, on SIGTERM, so the coordinator
//! can save its final checkpoint before the process exits.

use std::future::Future;

/// Returns a future resolving on the first shutdown signal
///
/// The SIGTERM handler is installed before this returns, so a signal sent
/// right after the call is not lost. Must be called inside a tokio runtime.
///
/// # Returns
///
/// * `Ok(future)` - Resolves on Ctrl-C or SIGTERM
/// * `Err(io::Error)` - The signal handler could not be installed
pub fn shutdown_signal() -> std::io::Result<impl Future<Output = ()>> {
    #[cfg(unix)]
    let mut terminate =
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    Ok(async move {
        let ctrl_c = async {
            if tokio::signal::ctrl_c().await.is_err() {
                // No Ctrl-C handler available; rely on the other signals
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminated = async {
            if terminate.recv().await.is_none() {
                std::future::pending::<()>().await;
            }
        };
        #[cfg(not(unix))]
        let terminated = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => tracing::warn!("Ctrl-C received, stopping after saving progress"),
            _ = terminated => tracing::warn!("SIGTERM received, stopping after saving progress"),
        }
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_sigterm_resolves_shutdown() {
        let shutdown = shutdown_signal().unwrap();

        let status = std::process::Command::new("kill")
            .arg("-TERM")
            .arg(std::process::id().to_string())
            .status()
            .unwrap();
        assert!(status.success());

        let fired = tokio::time::timeout(Duration::from_secs(5), shutdown).await;
        assert!(fired.is_ok(), "SIGTERM did not resolve the shutdown future");
    }
}
