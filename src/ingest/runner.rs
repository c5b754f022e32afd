use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::{JoinError, JoinHandle};
use uuid::Uuid;

use super::orchestrator::{IngestionReport, Orchestrator};
use crate::error::TriggerError;

/// Handle to a launched ingestion pass
pub struct PassHandle {
    pub pass_id: Uuid,
    pub started_at: DateTime<Utc>,
    handle: JoinHandle<IngestionReport>,
}

impl PassHandle {
    /// Wait for the pass to finish
    pub async fn wait(self) -> Result<IngestionReport, JoinError> {
        self.handle.await
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ActivePass {
    pub pass_id: Uuid,
    pub started_at: DateTime<Utc>,
}

/// Snapshot of the runner for status endpoints
#[derive(Debug, Clone, Serialize)]
pub struct RunnerStatus {
    pub running: bool,
    pub current: Option<ActivePass>,
    pub last_report: Option<IngestionReport>,
}

#[derive(Default)]
struct RunnerState {
    current: Option<ActivePass>,
    last_report: Option<IngestionReport>,
}

/// Launches ingestion passes in the background, at most one at a time
#[derive(Clone)]
pub struct IngestionRunner {
    orchestrator: Arc<Orchestrator>,
    state: Arc<Mutex<RunnerState>>,
}

/// Clears the in-flight marker when the pass task ends, including on panic
struct ActiveGuard {
    state: Arc<Mutex<RunnerState>>,
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        lock(&self.state).current = None;
    }
}

fn lock(state: &Mutex<RunnerState>) -> MutexGuard<'_, RunnerState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl IngestionRunner {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            orchestrator,
            state: Arc::new(Mutex::new(RunnerState::default())),
        }
    }

    /// Start a pass unless one is already in flight.
    ///
    /// Returns immediately; the pass runs to completion on its own task.
    pub fn trigger(&self) -> Result<PassHandle, TriggerError> {
        let active = {
            let mut state = lock(&self.state);
            if let Some(current) = state.current {
                return Err(TriggerError::AlreadyRunning(current.pass_id));
            }
            let active = ActivePass {
                pass_id: Uuid::new_v4(),
                started_at: Utc::now(),
            };
            state.current = Some(active);
            active
        };

        let orchestrator = self.orchestrator.clone();
        let state = self.state.clone();
        let handle = tokio::spawn(async move {
            let guard = ActiveGuard { state };
            let report = orchestrator.run_pass_with_id(active.pass_id).await;
            lock(&guard.state).last_report = Some(report.clone());
            report
        });

        tracing::info!(pass_id = %active.pass_id, "Ingestion pass launched");

        Ok(PassHandle {
            pass_id: active.pass_id,
            started_at: active.started_at,
            handle,
        })
    }

    pub fn status(&self) -> RunnerStatus {
        let state = lock(&self.state);
        RunnerStatus {
            running: state.current.is_some(),
            current: state.current,
            last_report: state.last_report.clone(),
        }
    }

    pub fn is_running(&self) -> bool {
        lock(&self.state).current.is_some()
    }

    /// Wait until no pass is in flight, up to `timeout`. Returns false on timeout.
    pub async fn wait_idle(&self, timeout: std::time::Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while self.is_running() {
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::models::{TideReading, WeatherSnapshot};
    use crate::registry::LocationEntry;
    use crate::sources::{TideSource, WeatherSource};
    use crate::store::ObservationStore;
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio::sync::Notify;

    /// Blocks every fetch until released
    struct GatedTides {
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl TideSource for GatedTides {
        fn name(&self) -> &str {
            "tides"
        }

        fn url_for(&self, slug: &str) -> String {
            format!("http://tides.test/{}", slug)
        }

        async fn fetch_tides(&self, _slug: &str) -> Result<Vec<TideReading>, FetchError> {
            self.gate.notified().await;
            Ok(vec![])
        }
    }

    struct StaticWeather;

    #[async_trait]
    impl WeatherSource for StaticWeather {
        fn name(&self) -> &str {
            "weather"
        }

        fn url_for(&self, slug: &str) -> String {
            format!("http://weather.test/{}", slug)
        }

        async fn fetch_weather(&self, _slug: &str) -> Result<WeatherSnapshot, FetchError> {
            Ok(WeatherSnapshot::unavailable())
        }
    }

    async fn gated_runner() -> (IngestionRunner, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        let store = ObservationStore::in_memory().await.unwrap();
        let orchestrator = Orchestrator::new(
            store,
            Arc::new(GatedTides { gate: gate.clone() }),
            Arc::new(StaticWeather),
            vec![LocationEntry::new("France", "Brest", "brest", "fr/brest")],
        );
        (IngestionRunner::new(Arc::new(orchestrator)), gate)
    }

    #[tokio::test]
    async fn test_second_trigger_is_rejected_while_running() {
        let (runner, gate) = gated_runner().await;

        let first = runner.trigger().unwrap();
        assert!(runner.is_running());

        match runner.trigger() {
            Err(TriggerError::AlreadyRunning(id)) => assert_eq!(id, first.pass_id),
            other => panic!("expected AlreadyRunning, got {:?}", other.map(|h| h.pass_id)),
        }

        gate.notify_one();
        let report = tokio::time::timeout(Duration::from_secs(5), first.wait())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(report.error_count, 1);
        assert!(!runner.is_running());
        let status = runner.status();
        assert_eq!(status.last_report.unwrap().pass_id, report.pass_id);
    }

    #[tokio::test]
    async fn test_trigger_allowed_again_after_completion() {
        let (runner, gate) = gated_runner().await;

        gate.notify_one();
        let first = runner.trigger().unwrap();
        first.wait().await.unwrap();

        gate.notify_one();
        let second = runner.trigger().unwrap();
        let report = second.wait().await.unwrap();
        assert_eq!(report.locations_total, 1);
    }
}
