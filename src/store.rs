//! SQLite-backed observation store
//!
//! Owns every persisted row: locations, observations and data source
//! bookkeeping. Each operation checks a connection out of the pool (or opens
//! a transaction) for the duration of the call only; sqlx returns the
//! connection and rolls back uncommitted transactions on every exit path.
//!
//! Uniqueness is enforced by the schema:
//! - `locations (country, city)`, ignoring case
//! - `observations (location_id, observed_at)`
//!
//! Writes to those keys are upserts, never duplicate inserts.

use crate::config::DatabaseConfig;
use crate::error::StoreError;
use crate::models::{
    DataSource, Location, LocationCount, NewObservation, Observation, SourceSlugs, SourceStatus,
    StoreStats, TideLevel,
};
use crate::validation;
use chrono::{Local, NaiveDate, NaiveDateTime, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePool, SqlitePoolOptions,
    SqliteRow,
};
use sqlx::Row;
use std::collections::HashSet;
use std::str::FromStr;
use std::time::Duration;

const OBSERVATION_COLUMNS: &str = "id, location_id, observed_at, tide_level, tide_coefficient, \
     weather_condition, wind_speed, temperature, humidity, pressure, visibility, uv_index, \
     last_fetched, created_at";

/// Result of refreshing one location's day of observations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaceOutcome {
    pub upserted: u64,
    pub pruned: u64,
}

/// Observation store handle
#[derive(Clone)]
pub struct ObservationStore {
    pool: SqlitePool,
}

impl ObservationStore {
    /// Open the file-backed store, creating its directory on first use
    pub async fn open(config: &DatabaseConfig) -> Result<Self, StoreError> {
        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(&config.path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(30))
            .pragma("synchronous", "NORMAL");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(30))
            .connect_with(options)
            .await?;

        tracing::info!(path = %config.path.display(), "Opened observation store");
        Self::from_pool(pool).await
    }

    /// Private in-memory store (single connection so all callers share one database)
    pub async fn in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        Self::from_pool(pool).await
    }

    async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::debug!("Observation store migrations completed");
        Ok(Self { pool })
    }

    /// Register a location, or refresh its slugs if the (country, city) pair exists.
    ///
    /// The pair is matched ignoring case; the stored spelling is the first one seen.
    pub async fn ensure_location(
        &self,
        country: &str,
        city: &str,
        slugs: &SourceSlugs,
    ) -> Result<i64, StoreError> {
        validation::validate_location(country, city)?;

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO locations (country, city, tide_slug, weather_slug, updated_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(country, city) DO UPDATE SET
                 tide_slug = excluded.tide_slug,
                 weather_slug = excluded.weather_slug,
                 updated_at = excluded.updated_at
             RETURNING id",
        )
        .bind(country.trim())
        .bind(city.trim())
        .bind(&slugs.tide)
        .bind(&slugs.weather)
        .bind(Utc::now().naive_utc())
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    /// Look up a location by its (country, city) key, case-insensitively
    pub async fn find_location(&self, country: &str, city: &str) -> Result<Option<Location>, StoreError> {
        let row = sqlx::query(
            "SELECT id, country, city, tide_slug, weather_slug, updated_at
             FROM locations
             WHERE country = ? COLLATE NOCASE AND city = ? COLLATE NOCASE
             ORDER BY id ASC
             LIMIT 1",
        )
        .bind(country.trim())
        .bind(city.trim())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(location_from_row).transpose()
    }

    pub async fn list_locations(&self) -> Result<Vec<Location>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, country, city, tide_slug, weather_slug, updated_at
             FROM locations
             ORDER BY country COLLATE NOCASE ASC, city COLLATE NOCASE ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(location_from_row).collect()
    }

    /// Upsert one observation keyed on (location, timestamp)
    pub async fn insert_or_replace_observation(
        &self,
        location_id: i64,
        observation: &NewObservation,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        upsert_observation(&mut *tx, location_id, observation, Utc::now().naive_utc()).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Refresh one location's observations for `date` atomically.
    ///
    /// Every fresh observation is upserted, then rows on `date` whose
    /// timestamp is not in the fresh set are pruned. Readers see either the
    /// previous day or the refreshed one, never an empty intermediate state.
    pub async fn replace_day(
        &self,
        location_id: i64,
        date: NaiveDate,
        observations: &[NewObservation],
    ) -> Result<ReplaceOutcome, StoreError> {
        let now = Utc::now().naive_utc();
        let (start, end) = day_bounds(date);
        let keep: HashSet<NaiveDateTime> = observations.iter().map(|o| o.observed_at).collect();

        let mut tx = self.pool.begin().await?;
        let mut outcome = ReplaceOutcome::default();

        for observation in observations {
            upsert_observation(&mut *tx, location_id, observation, now).await?;
            outcome.upserted += 1;
        }

        let existing: Vec<(i64, NaiveDateTime)> = sqlx::query_as(
            "SELECT id, observed_at FROM observations
             WHERE location_id = ? AND observed_at >= ? AND observed_at < ?",
        )
        .bind(location_id)
        .bind(start)
        .bind(end)
        .fetch_all(&mut *tx)
        .await?;

        for (id, observed_at) in existing {
            if keep.contains(&observed_at) {
                continue;
            }
            sqlx::query("DELETE FROM observations WHERE id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            outcome.pruned += 1;
        }

        tx.commit().await?;
        Ok(outcome)
    }

    /// Delete every observation of a location on one calendar date
    pub async fn clear_observations(&self, location_id: i64, date: NaiveDate) -> Result<u64, StoreError> {
        let (start, end) = day_bounds(date);
        let result = sqlx::query(
            "DELETE FROM observations
             WHERE location_id = ? AND observed_at >= ? AND observed_at < ?",
        )
        .bind(location_id)
        .bind(start)
        .bind(end)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn query_today(&self, location_id: i64) -> Result<Vec<Observation>, StoreError> {
        self.query_date(location_id, Local::now().date_naive()).await
    }

    pub async fn query_date(&self, location_id: i64, date: NaiveDate) -> Result<Vec<Observation>, StoreError> {
        self.query_range(location_id, date, date).await
    }

    /// Observations between two dates (both inclusive), oldest first
    pub async fn query_range(
        &self,
        location_id: i64,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Observation>, StoreError> {
        let (start, _) = day_bounds(start_date);
        let (_, end) = day_bounds(end_date);

        let sql = format!(
            "SELECT {OBSERVATION_COLUMNS} FROM observations
             WHERE location_id = ? AND observed_at >= ? AND observed_at < ?
             ORDER BY observed_at ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(location_id)
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(observation_from_row).collect()
    }

    /// The most recent observation of a location
    pub async fn query_latest(&self, location_id: i64) -> Result<Option<Observation>, StoreError> {
        let sql = format!(
            "SELECT {OBSERVATION_COLUMNS} FROM observations
             WHERE location_id = ?
             ORDER BY observed_at DESC
             LIMIT 1"
        );
        let row = sqlx::query(&sql)
            .bind(location_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(observation_from_row).transpose()
    }

    pub async fn list_countries(&self) -> Result<Vec<String>, StoreError> {
        let countries = sqlx::query_scalar(
            "SELECT DISTINCT country FROM locations ORDER BY country COLLATE NOCASE ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(countries)
    }

    pub async fn list_cities(&self, country: &str) -> Result<Vec<String>, StoreError> {
        let cities = sqlx::query_scalar(
            "SELECT DISTINCT city FROM locations
             WHERE country = ? COLLATE NOCASE
             ORDER BY city COLLATE NOCASE ASC",
        )
        .bind(country.trim())
        .fetch_all(&self.pool)
        .await?;
        Ok(cities)
    }

    /// Record the outcome of a fetch against an external source.
    ///
    /// `last_fetch` only moves forward on success.
    pub async fn record_source_fetch(
        &self,
        name: &str,
        url: &str,
        error: Option<&str>,
    ) -> Result<(), StoreError> {
        let (status, last_fetch) = match error {
            None => (SourceStatus::Ok, Some(Utc::now().naive_utc())),
            Some(_) => (SourceStatus::Error, None),
        };

        sqlx::query(
            "INSERT INTO data_sources (name, url, last_fetch, status, last_error)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(name) DO UPDATE SET
                 url = excluded.url,
                 last_fetch = COALESCE(excluded.last_fetch, data_sources.last_fetch),
                 status = excluded.status,
                 last_error = excluded.last_error",
        )
        .bind(name)
        .bind(url)
        .bind(last_fetch)
        .bind(status.as_str())
        .bind(error)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn list_sources(&self) -> Result<Vec<DataSource>, StoreError> {
        let rows = sqlx::query(
            "SELECT name, url, last_fetch, status, last_error FROM data_sources ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(DataSource {
                    name: row.try_get("name")?,
                    url: row.try_get("url")?,
                    last_fetch: row.try_get("last_fetch")?,
                    status: SourceStatus::parse(row.try_get::<&str, _>("status")?),
                    last_error: row.try_get("last_error")?,
                })
            })
            .collect()
    }

    /// Aggregate counts, observed date range and the five busiest locations
    pub async fn stats(&self) -> Result<StoreStats, StoreError> {
        let locations: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM locations")
            .fetch_one(&self.pool)
            .await?;

        let summary = sqlx::query(
            "SELECT COUNT(*) AS total, MIN(observed_at) AS first, MAX(observed_at) AS last
             FROM observations",
        )
        .fetch_one(&self.pool)
        .await?;

        let top_rows = sqlx::query(
            "SELECT l.country AS country, l.city AS city, COUNT(o.id) AS total
             FROM locations l
             JOIN observations o ON o.location_id = l.id
             GROUP BY l.id
             ORDER BY total DESC, l.country ASC, l.city ASC
             LIMIT 5",
        )
        .fetch_all(&self.pool)
        .await?;

        let top_locations = top_rows
            .iter()
            .map(|row| {
                Ok(LocationCount {
                    country: row.try_get("country")?,
                    city: row.try_get("city")?,
                    observations: row.try_get("total")?,
                })
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        Ok(StoreStats {
            locations,
            observations: summary.try_get("total")?,
            first_observation: summary.try_get("first")?,
            last_observation: summary.try_get("last")?,
            top_locations,
        })
    }

    /// Delete observations dated before `cutoff`
    pub async fn delete_observations_before(&self, cutoff: NaiveDate) -> Result<u64, StoreError> {
        let (start, _) = day_bounds(cutoff);
        let result = sqlx::query("DELETE FROM observations WHERE observed_at < ?")
            .bind(start)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

async fn upsert_observation(
    conn: &mut SqliteConnection,
    location_id: i64,
    observation: &NewObservation,
    now: NaiveDateTime,
) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO observations (
             location_id, observed_at, tide_level, tide_coefficient, weather_condition,
             wind_speed, temperature, humidity, pressure, visibility, uv_index,
             last_fetched, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(location_id, observed_at) DO UPDATE SET
             tide_level = excluded.tide_level,
             tide_coefficient = excluded.tide_coefficient,
             weather_condition = excluded.weather_condition,
             wind_speed = excluded.wind_speed,
             temperature = excluded.temperature,
             humidity = excluded.humidity,
             pressure = excluded.pressure,
             visibility = excluded.visibility,
             uv_index = excluded.uv_index,
             last_fetched = excluded.last_fetched",
    )
    .bind(location_id)
    .bind(observation.observed_at)
    .bind(observation.tide_level.as_str())
    .bind(observation.tide_coefficient)
    .bind(&observation.weather_condition)
    .bind(observation.wind_speed)
    .bind(observation.temperature)
    .bind(observation.humidity)
    .bind(observation.pressure)
    .bind(observation.visibility)
    .bind(observation.uv_index)
    .bind(now)
    .bind(now)
    .execute(conn)
    .await?;

    Ok(())
}

/// Half-open `[date 00:00, next day 00:00)` bounds
fn day_bounds(date: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
    let start = date.and_time(chrono::NaiveTime::MIN);
    let end = date
        .succ_opt()
        .map(|next| next.and_time(chrono::NaiveTime::MIN))
        .unwrap_or(NaiveDateTime::MAX);
    (start, end)
}

fn location_from_row(row: &SqliteRow) -> Result<Location, StoreError> {
    Ok(Location {
        id: row.try_get("id")?,
        country: row.try_get("country")?,
        city: row.try_get("city")?,
        tide_slug: row.try_get("tide_slug")?,
        weather_slug: row.try_get("weather_slug")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn observation_from_row(row: &SqliteRow) -> Result<Observation, StoreError> {
    let level: &str = row.try_get("tide_level")?;
    let tide_level = TideLevel::from_str(level).map_err(|reason| StoreError::CorruptRow {
        table: "observations",
        reason,
    })?;

    Ok(Observation {
        id: row.try_get("id")?,
        location_id: row.try_get("location_id")?,
        observed_at: row.try_get("observed_at")?,
        tide_level,
        tide_coefficient: row.try_get("tide_coefficient")?,
        weather_condition: row.try_get("weather_condition")?,
        wind_speed: row.try_get("wind_speed")?,
        temperature: row.try_get("temperature")?,
        humidity: row.try_get("humidity")?,
        pressure: row.try_get("pressure")?,
        visibility: row.try_get("visibility")?,
        uv_index: row.try_get("uv_index")?,
        last_fetched: row.try_get("last_fetched")?,
        created_at: row.try_get("created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;

    async fn create_test_store() -> ObservationStore {
        ObservationStore::in_memory().await.unwrap()
    }

    fn slugs(tide: &str) -> SourceSlugs {
        SourceSlugs {
            tide: tide.to_string(),
            weather: format!("fr/{tide}"),
        }
    }

    fn at(date: &str, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn observation(observed_at: NaiveDateTime, wind_speed: f64) -> NewObservation {
        NewObservation {
            observed_at,
            tide_level: TideLevel::High,
            tide_coefficient: Some(80),
            weather_condition: "Cloudy".to_string(),
            wind_speed,
            temperature: Some(17.0),
            humidity: None,
            pressure: None,
            visibility: None,
            uv_index: None,
        }
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[tokio::test]
    async fn test_ensure_location_is_idempotent() {
        let store = create_test_store().await;

        let first = store.ensure_location("France", "Romagny", &slugs("romagny")).await.unwrap();
        let second = store.ensure_location("France", "Romagny", &slugs("romagny")).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(store.list_locations().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_ensure_location_updates_slugs_in_place() {
        let store = create_test_store().await;

        let id = store.ensure_location("France", "Romagny", &slugs("old-slug")).await.unwrap();
        let again = store.ensure_location("France", "Romagny", &slugs("new-slug")).await.unwrap();
        assert_eq!(id, again);

        let locations = store.list_locations().await.unwrap();
        assert_eq!(locations.len(), 1);
        assert_eq!(locations[0].tide_slug, "new-slug");
        assert_eq!(locations[0].weather_slug, "fr/new-slug");
    }

    #[tokio::test]
    async fn test_ensure_location_ignores_case_variants() {
        let store = create_test_store().await;

        let id = store.ensure_location("France", "Brest", &slugs("brest")).await.unwrap();
        let again = store.ensure_location("FRANCE", "brest", &slugs("brest-v2")).await.unwrap();
        assert_eq!(id, again);

        let locations = store.list_locations().await.unwrap();
        assert_eq!(locations.len(), 1);
        assert_eq!(locations[0].country, "France");
        assert_eq!(locations[0].city, "Brest");
        assert_eq!(locations[0].tide_slug, "brest-v2");
        assert_eq!(store.list_countries().await.unwrap(), vec!["France"]);
        assert_eq!(store.list_cities("france").await.unwrap(), vec!["Brest"]);
    }

    #[tokio::test]
    async fn test_ensure_location_rejects_bad_names() {
        let store = create_test_store().await;
        let err = store.ensure_location("123", "!!", &slugs("x")).await.unwrap_err();
        assert!(matches!(err, StoreError::Validation(ValidationError::InvalidName { .. })));
        assert!(store.list_locations().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upsert_keeps_single_row_with_latest_values() {
        let store = create_test_store().await;
        let loc = store.ensure_location("France", "Brest", &slugs("brest")).await.unwrap();
        let t = at("2024-06-01", 6, 12);

        store.insert_or_replace_observation(loc, &observation(t, 10.0)).await.unwrap();
        store.insert_or_replace_observation(loc, &observation(t, 25.0)).await.unwrap();

        let rows = store.query_date(loc, date("2024-06-01")).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].observed_at, t);
        assert_eq!(rows[0].wind_speed, 25.0);
    }

    #[tokio::test]
    async fn test_clear_observations_is_scoped_to_location_and_date() {
        let store = create_test_store().await;
        let brest = store.ensure_location("France", "Brest", &slugs("brest")).await.unwrap();
        let malo = store.ensure_location("France", "Saint-Malo", &slugs("saint-malo")).await.unwrap();

        store.insert_or_replace_observation(brest, &observation(at("2024-06-01", 6, 0), 1.0)).await.unwrap();
        store.insert_or_replace_observation(brest, &observation(at("2024-06-01", 18, 30), 2.0)).await.unwrap();
        store.insert_or_replace_observation(brest, &observation(at("2024-06-02", 7, 0), 3.0)).await.unwrap();
        store.insert_or_replace_observation(malo, &observation(at("2024-06-01", 6, 0), 4.0)).await.unwrap();

        let deleted = store.clear_observations(brest, date("2024-06-01")).await.unwrap();
        assert_eq!(deleted, 2);

        assert!(store.query_date(brest, date("2024-06-01")).await.unwrap().is_empty());
        assert_eq!(store.query_date(brest, date("2024-06-02")).await.unwrap().len(), 1);
        assert_eq!(store.query_date(malo, date("2024-06-01")).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_replace_day_upserts_and_prunes_stale_rows() {
        let store = create_test_store().await;
        let loc = store.ensure_location("France", "Brest", &slugs("brest")).await.unwrap();

        store.insert_or_replace_observation(loc, &observation(at("2024-06-01", 5, 0), 1.0)).await.unwrap();
        store.insert_or_replace_observation(loc, &observation(at("2024-06-01", 11, 0), 1.0)).await.unwrap();
        store.insert_or_replace_observation(loc, &observation(at("2024-05-31", 11, 0), 1.0)).await.unwrap();

        let fresh = vec![
            observation(at("2024-06-01", 11, 0), 9.0),
            observation(at("2024-06-01", 23, 15), 9.0),
        ];
        let outcome = store.replace_day(loc, date("2024-06-01"), &fresh).await.unwrap();
        assert_eq!(outcome, ReplaceOutcome { upserted: 2, pruned: 1 });

        let day = store.query_date(loc, date("2024-06-01")).await.unwrap();
        let times: Vec<_> = day.iter().map(|o| o.observed_at).collect();
        assert_eq!(times, vec![at("2024-06-01", 11, 0), at("2024-06-01", 23, 15)]);
        assert!(day.iter().all(|o| o.wind_speed == 9.0));

        // Other dates are untouched
        assert_eq!(store.query_date(loc, date("2024-05-31")).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_query_range_is_inclusive_and_ordered() {
        let store = create_test_store().await;
        let loc = store.ensure_location("France", "Brest", &slugs("brest")).await.unwrap();

        for (d, h) in [("2024-06-03", 9), ("2024-06-01", 18), ("2024-06-01", 6), ("2024-06-04", 1)] {
            store.insert_or_replace_observation(loc, &observation(at(d, h, 0), 1.0)).await.unwrap();
        }

        let rows = store.query_range(loc, date("2024-06-01"), date("2024-06-03")).await.unwrap();
        let times: Vec<_> = rows.iter().map(|o| o.observed_at).collect();
        assert_eq!(
            times,
            vec![at("2024-06-01", 6, 0), at("2024-06-01", 18, 0), at("2024-06-03", 9, 0)]
        );
    }

    #[tokio::test]
    async fn test_query_latest() {
        let store = create_test_store().await;
        let loc = store.ensure_location("France", "Brest", &slugs("brest")).await.unwrap();
        assert!(store.query_latest(loc).await.unwrap().is_none());

        store.insert_or_replace_observation(loc, &observation(at("2024-06-02", 3, 0), 1.0)).await.unwrap();
        store.insert_or_replace_observation(loc, &observation(at("2024-06-01", 23, 0), 1.0)).await.unwrap();

        let latest = store.query_latest(loc).await.unwrap().unwrap();
        assert_eq!(latest.observed_at, at("2024-06-02", 3, 0));
    }

    #[tokio::test]
    async fn test_countries_and_cities_are_distinct_and_sorted() {
        let store = create_test_store().await;
        store.ensure_location("Spain", "San Sebastian", &slugs("ss")).await.unwrap();
        store.ensure_location("France", "Saint-Malo", &slugs("sm")).await.unwrap();
        store.ensure_location("France", "Brest", &slugs("brest")).await.unwrap();

        assert_eq!(store.list_countries().await.unwrap(), vec!["France", "Spain"]);
        assert_eq!(store.list_cities("france").await.unwrap(), vec!["Brest", "Saint-Malo"]);
        assert!(store.list_cities("Italy").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_find_location_is_case_insensitive() {
        let store = create_test_store().await;
        let id = store.ensure_location("France", "Brest", &slugs("brest")).await.unwrap();

        let found = store.find_location("FRANCE", "brest").await.unwrap().unwrap();
        assert_eq!(found.id, id);
        assert!(store.find_location("France", "Nantes").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stats() {
        let store = create_test_store().await;
        let empty = store.stats().await.unwrap();
        assert_eq!(empty.observations, 0);
        assert!(empty.first_observation.is_none());

        let brest = store.ensure_location("France", "Brest", &slugs("brest")).await.unwrap();
        let malo = store.ensure_location("France", "Saint-Malo", &slugs("sm")).await.unwrap();
        store.insert_or_replace_observation(brest, &observation(at("2024-06-01", 6, 0), 1.0)).await.unwrap();
        store.insert_or_replace_observation(brest, &observation(at("2024-06-02", 6, 0), 1.0)).await.unwrap();
        store.insert_or_replace_observation(malo, &observation(at("2024-05-30", 6, 0), 1.0)).await.unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.locations, 2);
        assert_eq!(stats.observations, 3);
        assert_eq!(stats.first_observation, Some(at("2024-05-30", 6, 0)));
        assert_eq!(stats.last_observation, Some(at("2024-06-02", 6, 0)));
        assert_eq!(stats.top_locations[0].city, "Brest");
        assert_eq!(stats.top_locations[0].observations, 2);
    }

    #[tokio::test]
    async fn test_record_source_fetch_keeps_last_success() {
        let store = create_test_store().await;

        store.record_source_fetch("tides", "https://t/brest", None).await.unwrap();
        let ok = store.list_sources().await.unwrap();
        assert_eq!(ok[0].status, SourceStatus::Ok);
        let last_success = ok[0].last_fetch;
        assert!(last_success.is_some());

        store
            .record_source_fetch("tides", "https://t/brest", Some("HTTP 503"))
            .await
            .unwrap();
        let failed = store.list_sources().await.unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].status, SourceStatus::Error);
        assert_eq!(failed[0].last_error.as_deref(), Some("HTTP 503"));
        assert_eq!(failed[0].last_fetch, last_success);
    }

    #[tokio::test]
    async fn test_delete_observations_before() {
        let store = create_test_store().await;
        let loc = store.ensure_location("France", "Brest", &slugs("brest")).await.unwrap();
        store.insert_or_replace_observation(loc, &observation(at("2024-05-01", 6, 0), 1.0)).await.unwrap();
        store.insert_or_replace_observation(loc, &observation(at("2024-06-01", 6, 0), 1.0)).await.unwrap();

        let deleted = store.delete_observations_before(date("2024-06-01")).await.unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(store.stats().await.unwrap().observations, 1);
    }

    #[tokio::test]
    async fn test_open_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let config = DatabaseConfig {
            path: dir.path().join("nested").join("coastwatch.db"),
            max_connections: 2,
        };

        let store = ObservationStore::open(&config).await.unwrap();
        store.ensure_location("France", "Brest", &slugs("brest")).await.unwrap();
        assert!(config.path.exists());
    }
}
