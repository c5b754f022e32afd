//! Periodic ingestion.
//!
//! The first tick fires immediately. A tick that lands while a pass is still
//! running is skipped rather than queued.

use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{self, MissedTickBehavior};

use super::runner::IngestionRunner;
use crate::error::TriggerError;
use crate::signals::ShutdownSignal;

pub fn spawn_scheduler(
    runner: IngestionRunner,
    interval: Duration,
    shutdown: broadcast::Receiver<ShutdownSignal>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        scheduler_loop(runner, interval, shutdown).await;
    })
}

async fn scheduler_loop(
    runner: IngestionRunner,
    interval: Duration,
    mut shutdown: broadcast::Receiver<ShutdownSignal>,
) {
    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracing::info!(interval_secs = interval.as_secs(), "Ingestion scheduler started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match runner.trigger() {
                    Ok(handle) => {
                        tracing::info!(pass_id = %handle.pass_id, "Scheduled ingestion pass started");
                    }
                    Err(TriggerError::AlreadyRunning(pass_id)) => {
                        tracing::info!(pass_id = %pass_id, "Ingestion pass still running, skipping scheduled tick");
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Scheduled ingestion not started");
                    }
                }
            }
            _ = shutdown.recv() => {
                tracing::info!("Ingestion scheduler stopping");
                break;
            }
        }
    }
}
