//! Domain records shared by the store, the source clients and the query service.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Tide classification of an observation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TideLevel {
    High,
    Low,
    Normal,
}

impl TideLevel {
    /// Normalize a free-form source label.
    ///
    /// Any label containing "high" or "low" (case-insensitive) maps to that
    /// class; everything else is `Normal`.
    pub fn from_label(label: &str) -> Self {
        let lower = label.to_lowercase();
        if lower.contains("high") {
            Self::High
        } else if lower.contains("low") {
            Self::Low
        } else {
            Self::Normal
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Low => "low",
            Self::Normal => "normal",
        }
    }
}

impl fmt::Display for TideLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TideLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "high" => Ok(Self::High),
            "low" => Ok(Self::Low),
            "normal" => Ok(Self::Normal),
            other => Err(format!("unknown tide level '{}'", other)),
        }
    }
}

/// Reference slugs identifying a location on each external source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSlugs {
    pub tide: String,
    pub weather: String,
}

/// A registered coastal place
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: i64,
    pub country: String,
    pub city: String,
    pub tide_slug: String,
    pub weather_slug: String,
    pub updated_at: NaiveDateTime,
}

/// One tide event as parsed from the tide source
#[derive(Debug, Clone, PartialEq)]
pub struct TideReading {
    pub timestamp: NaiveDateTime,
    pub level: TideLevel,
    pub coefficient: Option<i64>,
}

/// Weather conditions as parsed from the weather source
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherSnapshot {
    pub condition: String,
    pub wind_speed: f64,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub pressure: Option<f64>,
    pub visibility: Option<f64>,
    pub uv_index: Option<f64>,
}

/// Condition label used when no weather marker could be parsed
pub const UNAVAILABLE_CONDITION: &str = "Unavailable";

/// Fallback record used when the weather document has no known markers
pub static UNAVAILABLE_WEATHER: LazyLock<WeatherSnapshot> = LazyLock::new(|| WeatherSnapshot {
    condition: UNAVAILABLE_CONDITION.to_string(),
    wind_speed: 0.0,
    temperature: None,
    humidity: None,
    pressure: None,
    visibility: None,
    uv_index: None,
});

impl WeatherSnapshot {
    /// The documented default record: "Unavailable", zero wind, no optional fields
    pub fn unavailable() -> Self {
        UNAVAILABLE_WEATHER.clone()
    }

    pub fn is_unavailable(&self) -> bool {
        self.condition == UNAVAILABLE_CONDITION
    }
}

/// Measured fields of an observation prior to persistence
#[derive(Debug, Clone, PartialEq)]
pub struct NewObservation {
    pub observed_at: NaiveDateTime,
    pub tide_level: TideLevel,
    pub tide_coefficient: Option<i64>,
    pub weather_condition: String,
    pub wind_speed: f64,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub pressure: Option<f64>,
    pub visibility: Option<f64>,
    pub uv_index: Option<f64>,
}

impl NewObservation {
    /// Merge a tide event with the weather snapshot fetched for the same location
    pub fn from_parts(tide: &TideReading, weather: &WeatherSnapshot) -> Self {
        Self {
            observed_at: tide.timestamp,
            tide_level: tide.level,
            tide_coefficient: tide.coefficient,
            weather_condition: weather.condition.clone(),
            wind_speed: weather.wind_speed,
            temperature: weather.temperature,
            humidity: weather.humidity,
            pressure: weather.pressure,
            visibility: weather.visibility,
            uv_index: weather.uv_index,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.observed_at.date()
    }
}

/// A persisted observation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    pub id: i64,
    pub location_id: i64,
    #[serde(with = "iso_datetime")]
    pub observed_at: NaiveDateTime,
    pub tide_level: TideLevel,
    pub tide_coefficient: Option<i64>,
    pub weather_condition: String,
    pub wind_speed: f64,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub pressure: Option<f64>,
    pub visibility: Option<f64>,
    pub uv_index: Option<f64>,
    #[serde(with = "iso_datetime")]
    pub last_fetched: NaiveDateTime,
    #[serde(with = "iso_datetime")]
    pub created_at: NaiveDateTime,
}

/// Health of an external source as last observed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceStatus {
    Ok,
    Error,
    Unknown,
}

impl SourceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Error => "error",
            Self::Unknown => "unknown",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "ok" => Self::Ok,
            "error" => Self::Error,
            _ => Self::Unknown,
        }
    }
}

/// Metadata about an external source
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataSource {
    pub name: String,
    pub url: String,
    pub last_fetch: Option<NaiveDateTime>,
    pub status: SourceStatus,
    pub last_error: Option<String>,
}

/// Observation count for one location
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationCount {
    pub country: String,
    pub city: String,
    pub observations: i64,
}

/// Aggregate store statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreStats {
    pub locations: i64,
    pub observations: i64,
    pub first_observation: Option<NaiveDateTime>,
    pub last_observation: Option<NaiveDateTime>,
    pub top_locations: Vec<LocationCount>,
}

/// Serialize timestamps as `YYYY-MM-DDTHH:MM:SS`
pub mod iso_datetime {
    use chrono::NaiveDateTime;
    use serde::Serializer;

    pub const FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.format(FORMAT).to_string())
    }
}
