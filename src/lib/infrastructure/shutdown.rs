//! Process shutdown signals

use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Cancels `cancel` on Ctrl+C or SIGTERM
#[mutants::skip]
pub fn cancel_on_shutdown_signal(cancel: CancellationToken) {
    tokio::spawn(async move {
        shutdown_signal().await;

        info!("shutdown signal received");
        cancel.cancel();
    });
}

#[mutants::skip]
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
