use tokio::sync::broadcast;
use tracing::{error, info};

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

/// Shutdown signal types
#[derive(Debug, Clone, Copy)]
pub enum ShutdownSignal {
    /// Stop accepting requests, let background tasks wind down
    Graceful,
}

/// Install SIGTERM/SIGINT handlers.
///
/// Returns the broadcast sender every background task subscribes to, and
/// the handle of the listening task.
#[cfg(unix)]
pub fn setup_signal_handlers() -> (broadcast::Sender<ShutdownSignal>, tokio::task::JoinHandle<()>) {
    let (shutdown_tx, _) = broadcast::channel(16);
    let tx = shutdown_tx.clone();

    let handle = tokio::spawn(async move {
        let (mut sigterm, mut sigint) =
            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(term), Ok(int)) => (term, int),
                (Err(e), _) | (_, Err(e)) => {
                    error!(error = %e, "Failed to install signal handlers");
                    return;
                }
            };

        tokio::select! {
            _ = sigterm.recv() => info!("SIGTERM received, initiating graceful shutdown"),
            _ = sigint.recv() => info!("SIGINT received, initiating graceful shutdown"),
        }
        let _ = tx.send(ShutdownSignal::Graceful);
    });

    (shutdown_tx, handle)
}

/// Ctrl+C only on platforms without Unix signals
#[cfg(not(unix))]
pub fn setup_signal_handlers() -> (broadcast::Sender<ShutdownSignal>, tokio::task::JoinHandle<()>) {
    let (shutdown_tx, _) = broadcast::channel(16);
    let tx = shutdown_tx.clone();

    let handle = tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Ctrl+C received, initiating graceful shutdown");
                let _ = tx.send(ShutdownSignal::Graceful);
            }
            Err(e) => error!(error = %e, "Failed to listen for Ctrl+C"),
        }
    });

    (shutdown_tx, handle)
}

/// Resolve once a shutdown signal is broadcast (for `with_graceful_shutdown`)
pub async fn wait_for_shutdown(mut rx: broadcast::Receiver<ShutdownSignal>) {
    let _ = rx.recv().await;
}
