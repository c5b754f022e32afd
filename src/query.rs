//! Read access over the observation store plus the guarded ingestion trigger.
//!
//! Every read validates its input before touching the store, and an empty
//! result is reported as `NotFound` rather than an empty success.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use subtle::ConstantTimeEq;

use crate::error::{QueryError, TriggerError, ValidationError};
use crate::ingest::{IngestionRunner, PassHandle, RunnerStatus};
use crate::models::{DataSource, Location, Observation, StoreStats};
use crate::store::ObservationStore;
use crate::validation;

#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub version: &'static str,
}

/// Which days of observations to return
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateSelection {
    Day(NaiveDate),
    Range(NaiveDate, NaiveDate),
}

impl DateSelection {
    /// Build from raw query parameters.
    ///
    /// `start` and `end` must be given together; `date` alone picks one day;
    /// nothing means today.
    pub fn from_params(
        date: Option<&str>,
        start: Option<&str>,
        end: Option<&str>,
        today: NaiveDate,
    ) -> Result<Self, QueryError> {
        match (date, start, end) {
            (_, Some(start), Some(end)) => {
                let (start, end) = validation::parse_range(start, end)?;
                Ok(Self::Range(start, end))
            }
            (_, Some(_), None) | (_, None, Some(_)) => Err(ValidationError::IncompleteRange.into()),
            (Some(date), None, None) => Ok(Self::Day(validation::parse_date(date)?)),
            (None, None, None) => Ok(Self::Day(today)),
        }
    }

    pub fn bounds(&self) -> (NaiveDate, NaiveDate) {
        match *self {
            Self::Day(day) => (day, day),
            Self::Range(start, end) => (start, end),
        }
    }
}

/// Observations for one location over the selected days
#[derive(Debug, Clone, Serialize)]
pub struct MarineData {
    pub country: String,
    pub city: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub count: usize,
    pub observations: Vec<Observation>,
}

/// Accepted ingestion trigger
#[derive(Debug, Clone, Serialize)]
pub struct TriggerAccepted {
    pub status: &'static str,
    pub pass_id: uuid::Uuid,
    pub started_at: DateTime<Utc>,
}

impl From<&PassHandle> for TriggerAccepted {
    fn from(handle: &PassHandle) -> Self {
        Self {
            status: "accepted",
            pass_id: handle.pass_id,
            started_at: handle.started_at,
        }
    }
}

#[derive(Clone)]
pub struct QueryService {
    store: ObservationStore,
    runner: IngestionRunner,
    trigger_secret: Option<String>,
}

impl QueryService {
    pub fn new(store: ObservationStore, runner: IngestionRunner, trigger_secret: Option<String>) -> Self {
        Self {
            store,
            runner,
            trigger_secret,
        }
    }

    pub fn health(&self) -> HealthStatus {
        HealthStatus {
            status: "ok",
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION"),
        }
    }

    pub async fn marine_data(
        &self,
        country: &str,
        city: &str,
        selection: DateSelection,
    ) -> Result<MarineData, QueryError> {
        let location = self.resolve_location(country, city).await?;
        let (start_date, end_date) = selection.bounds();

        let observations = self
            .store
            .query_range(location.id, start_date, end_date)
            .await?;
        if observations.is_empty() {
            return Err(QueryError::NotFound(format!(
                "No marine data for {}/{} between {} and {}",
                location.country, location.city, start_date, end_date
            )));
        }

        Ok(MarineData {
            country: location.country,
            city: location.city,
            start_date,
            end_date,
            count: observations.len(),
            observations,
        })
    }

    pub async fn latest_marine_data(&self, country: &str, city: &str) -> Result<Observation, QueryError> {
        let location = self.resolve_location(country, city).await?;
        self.store
            .query_latest(location.id)
            .await?
            .ok_or_else(|| {
                QueryError::NotFound(format!("No marine data for {}/{}", location.country, location.city))
            })
    }

    pub async fn countries(&self) -> Result<Vec<String>, QueryError> {
        let countries = self.store.list_countries().await?;
        if countries.is_empty() {
            return Err(QueryError::NotFound("No countries registered".to_string()));
        }
        Ok(countries)
    }

    pub async fn cities(&self, country: &str) -> Result<Vec<String>, QueryError> {
        validation::validate_name("country", country)?;
        let cities = self.store.list_cities(country).await?;
        if cities.is_empty() {
            return Err(QueryError::NotFound(format!("No cities registered for {}", country.trim())));
        }
        Ok(cities)
    }

    pub async fn stats(&self) -> Result<StoreStats, QueryError> {
        Ok(self.store.stats().await?)
    }

    pub async fn sources(&self) -> Result<Vec<DataSource>, QueryError> {
        Ok(self.store.list_sources().await?)
    }

    /// Launch a background ingestion pass if `credential` matches the secret.
    ///
    /// Fails closed: with no secret configured every credential is rejected.
    pub fn trigger_ingestion(&self, credential: Option<&str>) -> Result<TriggerAccepted, TriggerError> {
        self.authorize(credential)?;
        let handle = self.runner.trigger()?;
        Ok(TriggerAccepted::from(&handle))
    }

    pub fn ingestion_status(&self) -> RunnerStatus {
        self.runner.status()
    }

    fn authorize(&self, credential: Option<&str>) -> Result<(), TriggerError> {
        let secret = self
            .trigger_secret
            .as_deref()
            .ok_or_else(|| TriggerError::Unauthorized("Ingestion trigger is disabled".to_string()))?;
        let credential =
            credential.ok_or_else(|| TriggerError::Unauthorized("Missing trigger credential".to_string()))?;

        if bool::from(secret.as_bytes().ct_eq(credential.as_bytes())) {
            Ok(())
        } else {
            Err(TriggerError::Unauthorized("Invalid trigger credential".to_string()))
        }
    }

    async fn resolve_location(&self, country: &str, city: &str) -> Result<Location, QueryError> {
        validation::validate_location(country, city)?;
        self.store
            .find_location(country, city)
            .await?
            .ok_or_else(|| QueryError::NotFound(format!("Unknown location {}/{}", country.trim(), city.trim())))
    }
}
