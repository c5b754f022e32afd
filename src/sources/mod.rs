//! External source clients.
//!
//! Each client fetches one HTML document per location and parses it into
//! domain records. Clients hold no state between calls; bookkeeping about
//! source health lives in the store.

pub mod http;
pub mod selectors;
pub mod tide;
pub mod weather;

use async_trait::async_trait;

use crate::error::FetchError;
use crate::models::{TideReading, WeatherSnapshot};

pub use http::HttpFetcher;
pub use tide::TideClient;
pub use weather::WeatherClient;

/// Source of tide events for a location
#[async_trait]
pub trait TideSource: Send + Sync {
    /// Source name used for data source bookkeeping
    fn name(&self) -> &str;

    fn url_for(&self, slug: &str) -> String;

    /// Fetch and parse the tide events listed for a location.
    /// An empty list means the document carried no recognizable events.
    async fn fetch_tides(&self, slug: &str) -> Result<Vec<TideReading>, FetchError>;
}

/// Source of current weather conditions for a location
#[async_trait]
pub trait WeatherSource: Send + Sync {
    fn name(&self) -> &str;

    fn url_for(&self, slug: &str) -> String;

    /// Fetch and parse conditions. Falls back to the "Unavailable" record
    /// when the document has no recognizable markers.
    async fn fetch_weather(&self, slug: &str) -> Result<WeatherSnapshot, FetchError>;
}
