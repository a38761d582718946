use std::future::Future;

/// Resolves on ctrl-c.
pub async fn shutdown_signal() {
    wait_for(tokio::signal::ctrl_c()).await;
}

/// Resolves once `signal` fires. A signal that cannot be installed never
/// resolves, so the server keeps running instead of shutting down at once.
pub(crate) async fn wait_for<F>(signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = signal.await {
        tracing::error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("signal received, shutting down");
}
