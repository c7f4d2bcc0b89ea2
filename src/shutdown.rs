use std::{future::Future, io};

use tracing::error;

/// Waits for a signal listener to fire. A listener that can't be installed
/// never fires, so a registration error doesn't read as a shutdown request.
pub async fn wait_for<F>(listener: F, name: &str)
where
    F: Future<Output = io::Result<()>>,
{
    if let Err(e) = listener.await {
        error!("Couldn't listen for {}: {}", name, e);
        std::future::pending::<()>().await;
    }
}

/// Resolves on CTRL-C, or SIGTERM on unix.
#[cfg(unix)]
pub async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = wait_for(tokio::signal::ctrl_c(), "CTRL-C") => {}
                _ = term.recv() => {}
            }
        }
        Err(e) => {
            error!("Couldn't listen for SIGTERM: {}", e);
            wait_for(tokio::signal::ctrl_c(), "CTRL-C").await;
        }
    }
}

#[cfg(not(unix))]
pub async fn shutdown_signal() {
    wait_for(tokio::signal::ctrl_c(), "CTRL-C").await;
}
