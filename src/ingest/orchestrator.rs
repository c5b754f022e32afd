//! One ingestion pass over the location registry.
//!
//! Locations are processed sequentially in registry order with a jittered
//! pause before each one. A location's failure is recorded in the report and
//! never stops the pass.

use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::Config;
use crate::error::IngestError;
use crate::models::{NewObservation, TideReading};
use crate::registry::LocationEntry;
use crate::sources::{HttpFetcher, TideClient, TideSource, WeatherClient, WeatherSource};
use crate::store::ObservationStore;

/// A location that failed during a pass
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationFailure {
    pub country: String,
    pub city: String,
    pub reason: String,
}

/// Summary of one ingestion pass
#[derive(Debug, Clone, Serialize)]
pub struct IngestionReport {
    pub pass_id: Uuid,
    pub locations_total: usize,
    pub locations_updated: usize,
    pub error_count: usize,
    pub observations_written: u64,
    pub observations_pruned: u64,
    pub failures: Vec<LocationFailure>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl IngestionReport {
    /// Process status: 0 when every location succeeded
    pub fn exit_code(&self) -> u8 {
        if self.error_count == 0 {
            0
        } else {
            1
        }
    }

    pub fn is_clean(&self) -> bool {
        self.error_count == 0
    }

    pub fn duration(&self) -> Duration {
        (self.finished_at - self.started_at).to_std().unwrap_or_default()
    }
}

/// Observations written for one successful location
#[derive(Debug, Clone, Copy, Default)]
struct LocationOutcome {
    written: u64,
    pruned: u64,
}

pub struct Orchestrator {
    store: ObservationStore,
    tides: Arc<dyn TideSource>,
    weather: Arc<dyn WeatherSource>,
    registry: Vec<LocationEntry>,
    min_delay_ms: u64,
    max_delay_ms: u64,
}

impl Orchestrator {
    pub fn new(
        store: ObservationStore,
        tides: Arc<dyn TideSource>,
        weather: Arc<dyn WeatherSource>,
        registry: Vec<LocationEntry>,
    ) -> Self {
        Self {
            store,
            tides,
            weather,
            registry,
            min_delay_ms: 0,
            max_delay_ms: 0,
        }
    }

    /// Wire the HTTP source clients from configuration
    pub fn from_config(config: &Config, store: ObservationStore) -> anyhow::Result<Self> {
        let fetcher = HttpFetcher::new(&config.sources, config.retry)?;
        let tides = TideClient::new(fetcher.clone(), config.sources.tide.clone());
        let weather = WeatherClient::new(fetcher, config.sources.weather.clone());

        Ok(Self::new(store, Arc::new(tides), Arc::new(weather), config.registry())
            .with_jitter(config.ingestion.min_delay_ms, config.ingestion.max_delay_ms))
    }

    /// Pause before each location, drawn uniformly from `[min_ms, max_ms]`
    pub fn with_jitter(mut self, min_ms: u64, max_ms: u64) -> Self {
        self.min_delay_ms = min_ms.min(max_ms);
        self.max_delay_ms = max_ms;
        self
    }

    pub fn registry(&self) -> &[LocationEntry] {
        &self.registry
    }

    pub async fn run_pass(&self) -> IngestionReport {
        self.run_pass_with_id(Uuid::new_v4()).await
    }

    /// Run a full pass under a caller-chosen id
    pub async fn run_pass_with_id(&self, pass_id: Uuid) -> IngestionReport {
        let span = tracing::info_span!("ingestion_pass", pass_id = %pass_id);
        self.execute(pass_id).instrument(span).await
    }

    async fn execute(&self, pass_id: Uuid) -> IngestionReport {
        let started_at = Utc::now();
        let mut report = IngestionReport {
            pass_id,
            locations_total: self.registry.len(),
            locations_updated: 0,
            error_count: 0,
            observations_written: 0,
            observations_pruned: 0,
            failures: Vec::new(),
            started_at,
            finished_at: started_at,
        };

        tracing::info!(locations = self.registry.len(), "Starting ingestion pass");

        for entry in &self.registry {
            let delay = self.jitter();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            match self.ingest_location(entry).await {
                Ok(outcome) => {
                    report.locations_updated += 1;
                    report.observations_written += outcome.written;
                    report.observations_pruned += outcome.pruned;
                    crate::metrics::record_location("updated");
                    crate::metrics::record_observations_written(outcome.written);
                    tracing::info!(
                        country = %entry.country,
                        city = %entry.city,
                        written = outcome.written,
                        pruned = outcome.pruned,
                        "Location updated"
                    );
                }
                Err(e) => {
                    report.error_count += 1;
                    crate::metrics::record_location("error");
                    tracing::error!(
                        country = %entry.country,
                        city = %entry.city,
                        error = %e,
                        "Location ingestion failed"
                    );
                    report.failures.push(LocationFailure {
                        country: entry.country.clone(),
                        city: entry.city.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        report.finished_at = Utc::now();
        let outcome = if report.is_clean() { "clean" } else { "partial" };
        crate::metrics::record_pass(outcome, report.duration());

        tracing::info!(
            updated = report.locations_updated,
            errors = report.error_count,
            observations = report.observations_written,
            duration_ms = report.duration().as_millis() as u64,
            "Ingestion pass finished"
        );

        report
    }

    async fn ingest_location(&self, entry: &LocationEntry) -> Result<LocationOutcome, IngestError> {
        let location_id = self
            .store
            .ensure_location(&entry.country, &entry.city, &entry.slugs())
            .await?;

        // Weather first so every tide row can embed the same snapshot
        let weather = self.weather.fetch_weather(&entry.weather_slug).await;
        self.record_source(
            self.weather.name(),
            &self.weather.url_for(&entry.weather_slug),
            weather.as_ref().err().map(ToString::to_string),
        )
        .await;
        let weather = weather?;

        let tides = self.tides.fetch_tides(&entry.tide_slug).await;
        self.record_source(
            self.tides.name(),
            &self.tides.url_for(&entry.tide_slug),
            tides.as_ref().err().map(ToString::to_string),
        )
        .await;
        let tides = tides?;

        if tides.is_empty() {
            return Err(IngestError::NoTideReadings {
                url: self.tides.url_for(&entry.tide_slug),
            });
        }

        let mut outcome = LocationOutcome::default();
        for (date, readings) in group_by_date(&tides) {
            let observations: Vec<NewObservation> = readings
                .iter()
                .map(|reading| NewObservation::from_parts(reading, &weather))
                .collect();

            let replaced = self.store.replace_day(location_id, date, &observations).await?;
            outcome.written += replaced.upserted;
            outcome.pruned += replaced.pruned;
        }

        Ok(outcome)
    }

    async fn record_source(&self, name: &str, url: &str, error: Option<String>) {
        if let Err(e) = self.store.record_source_fetch(name, url, error.as_deref()).await {
            tracing::warn!(source = name, error = %e, "Failed to record data source status");
        }
    }

    fn jitter(&self) -> Duration {
        if self.max_delay_ms == 0 {
            return Duration::ZERO;
        }
        let ms = rand::thread_rng().gen_range(self.min_delay_ms..=self.max_delay_ms);
        Duration::from_millis(ms)
    }
}

/// Readings keyed by the calendar date they fall on
fn group_by_date(readings: &[TideReading]) -> BTreeMap<NaiveDate, Vec<&TideReading>> {
    let mut days: BTreeMap<NaiveDate, Vec<&TideReading>> = BTreeMap::new();
    for reading in readings {
        days.entry(reading.timestamp.date()).or_default().push(reading);
    }
    days
}
