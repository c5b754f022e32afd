//! Background retention task for observations
//!
//! Once a day, deletes observations older than the configured retention
//! window. Locations and data source rows are never touched.

use anyhow::Result;
use chrono::{Datelike, Days, Local, NaiveDate, Timelike};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time;

use crate::signals::ShutdownSignal;
use crate::store::ObservationStore;

/// Retention configuration
#[derive(Debug, Clone, Copy)]
pub struct RetentionConfig {
    /// Observations dated before `today - retention_days` are deleted
    pub retention_days: u32,

    /// Hour of day to run (0-23)
    pub cleanup_hour: u32,

    /// How often to check whether it's cleanup time
    pub check_interval: Duration,
}

impl RetentionConfig {
    pub fn new(retention_days: u32) -> Self {
        Self {
            retention_days,
            cleanup_hour: 3,
            check_interval: Duration::from_secs(3600),
        }
    }

    /// First date that is kept, or `None` when the window reaches past the
    /// earliest representable date
    pub fn cutoff(&self, today: NaiveDate) -> Option<NaiveDate> {
        today.checked_sub_days(Days::new(u64::from(self.retention_days)))
    }
}

/// Spawn the retention task; a zero retention window disables it
pub fn spawn_retention_task(
    store: ObservationStore,
    config: RetentionConfig,
    shutdown: broadcast::Receiver<ShutdownSignal>,
) -> Option<tokio::task::JoinHandle<()>> {
    if config.retention_days == 0 {
        tracing::info!("Observation retention disabled");
        return None;
    }

    Some(tokio::spawn(async move {
        retention_loop(store, config, shutdown).await;
    }))
}

async fn retention_loop(
    store: ObservationStore,
    config: RetentionConfig,
    mut shutdown: broadcast::Receiver<ShutdownSignal>,
) {
    let mut interval = time::interval(config.check_interval);
    let mut last_cleanup_day: Option<u32> = None;

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = shutdown.recv() => break,
        }

        let now = Local::now();
        let today = now.ordinal();

        if now.hour() == config.cleanup_hour && Some(today) != last_cleanup_day {
            match run_retention_now(&store, config.retention_days).await {
                Ok(_) => last_cleanup_day = Some(today),
                Err(e) => tracing::error!(error = %e, "Observation retention failed"),
            }
        }
    }
}

/// Delete expired observations immediately, returning the number removed
pub async fn run_retention_now(store: &ObservationStore, retention_days: u32) -> Result<u64> {
    let Some(cutoff) = RetentionConfig::new(retention_days).cutoff(Local::now().date_naive()) else {
        tracing::warn!(
            retention_days = retention_days,
            "Retention window exceeds the calendar range, nothing to delete"
        );
        return Ok(0);
    };
    let deleted = store.delete_observations_before(cutoff).await?;

    tracing::info!(
        retention_days = retention_days,
        %cutoff,
        deleted = deleted,
        "Observation retention completed"
    );

    Ok(deleted)
}
