use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;

use super::selectors::{self, ParseAttempt};
use super::{HttpFetcher, WeatherSource};
use crate::config::SourceEndpoint;
use crate::error::FetchError;
use crate::models::WeatherSnapshot;

const WEATHER_ATTEMPTS: [ParseAttempt<WeatherSnapshot>; 3] =
    [snapshot_from_attributes, snapshot_from_classes, snapshot_from_labels];

/// Numeric fields of a weather document
#[derive(Debug, Clone, Copy)]
enum Field {
    Wind,
    Temperature,
    Humidity,
    Pressure,
    Visibility,
    Uv,
}

impl Field {
    fn attribute(self) -> &'static str {
        match self {
            Field::Wind => "data-wind-speed",
            Field::Temperature => "data-temperature",
            Field::Humidity => "data-humidity",
            Field::Pressure => "data-pressure",
            Field::Visibility => "data-visibility",
            Field::Uv => "data-uv-index",
        }
    }

    fn class(self) -> &'static str {
        match self {
            Field::Wind => "wind-speed",
            Field::Temperature => "temperature",
            Field::Humidity => "humidity",
            Field::Pressure => "pressure",
            Field::Visibility => "visibility",
            Field::Uv => "uv-index",
        }
    }

    fn label_pattern(self) -> &'static Regex {
        static WIND: LazyLock<Regex> = LazyLock::new(|| labelled(r"wind(?:\s+speed)?"));
        static TEMPERATURE: LazyLock<Regex> = LazyLock::new(|| labelled(r"temp(?:erature)?"));
        static HUMIDITY: LazyLock<Regex> = LazyLock::new(|| labelled(r"humidity"));
        static PRESSURE: LazyLock<Regex> = LazyLock::new(|| labelled(r"pressure"));
        static VISIBILITY: LazyLock<Regex> = LazyLock::new(|| labelled(r"visibility"));
        static UV: LazyLock<Regex> = LazyLock::new(|| labelled(r"uv(?:\s+index)?"));

        match self {
            Field::Wind => &WIND,
            Field::Temperature => &TEMPERATURE,
            Field::Humidity => &HUMIDITY,
            Field::Pressure => &PRESSURE,
            Field::Visibility => &VISIBILITY,
            Field::Uv => &UV,
        }
    }
}

fn labelled(label: &str) -> Regex {
    Regex::new(&format!(r"(?i)\b{}\s*:\s*(-?\d[\d.,\s]*)", label)).expect("label pattern is valid")
}

/// Build a snapshot from a condition and a per-field text lookup.
/// Unparsable numbers become `None`; missing wind becomes zero.
fn build_snapshot(condition: String, lookup: impl Fn(Field) -> Option<String>) -> WeatherSnapshot {
    let number = |field| lookup(field).and_then(|text| selectors::parse_number(&text));

    WeatherSnapshot {
        condition,
        wind_speed: number(Field::Wind).unwrap_or(0.0),
        temperature: number(Field::Temperature),
        humidity: number(Field::Humidity),
        pressure: number(Field::Pressure),
        visibility: number(Field::Visibility),
        uv_index: number(Field::Uv),
    }
}

/// Client for the marine weather source
pub struct WeatherClient {
    fetcher: HttpFetcher,
    endpoint: SourceEndpoint,
}

impl WeatherClient {
    pub fn new(fetcher: HttpFetcher, endpoint: SourceEndpoint) -> Self {
        Self { fetcher, endpoint }
    }
}

#[async_trait]
impl WeatherSource for WeatherClient {
    fn name(&self) -> &str {
        &self.endpoint.name
    }

    fn url_for(&self, slug: &str) -> String {
        self.endpoint.url_for(slug)
    }

    async fn fetch_weather(&self, slug: &str) -> Result<WeatherSnapshot, FetchError> {
        let url = self.url_for(slug);
        let document = self.fetcher.fetch_text(&self.endpoint.name, &url).await?;
        let snapshot = parse_weather_document(&document);

        if snapshot.is_unavailable() {
            tracing::warn!(slug = slug, url = %url, "No weather markers found, using default record");
        }
        Ok(snapshot)
    }
}

/// Parse a weather document, falling back to the "Unavailable" record
pub fn parse_weather_document(document: &str) -> WeatherSnapshot {
    selectors::first_match(document, &WEATHER_ATTEMPTS)
        .map(|(_, snapshot)| snapshot)
        .unwrap_or_else(WeatherSnapshot::unavailable)
}

/// `<div data-condition="Sunny" data-wind-speed="12" ...>`
fn snapshot_from_attributes(document: &str) -> Option<WeatherSnapshot> {
    let condition = selectors::first_attribute(document, "data-condition")?;
    Some(build_snapshot(condition, |field| {
        selectors::first_attribute(document, field.attribute())
    }))
}

/// Classes that mark the condition text
const CONDITION_CLASSES: [&str; 3] = ["condition", "weather-condition", "conditions"];

/// `<span class="condition">Sunny</span><span class="wind-speed">12 km/h</span>`
fn snapshot_from_classes(document: &str) -> Option<WeatherSnapshot> {
    let condition = CONDITION_CLASSES
        .iter()
        .find_map(|class| selectors::text_by_class(document, class))?;
    Some(build_snapshot(condition, |field| {
        selectors::text_by_class(document, field.class())
    }))
}

static CONDITION_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:conditions?|sky)\s*:\s*([A-Za-z][A-Za-z '\-]*[A-Za-z])")
        .expect("condition pattern is valid")
});

/// "Conditions: Light rain. Wind: 20 km/h. Temperature: 14 °C" as plain text
fn snapshot_from_labels(document: &str) -> Option<WeatherSnapshot> {
    let lines = selectors::text_lines(document);
    let condition = lines.iter().find_map(|line| {
        let caps = CONDITION_LABEL.captures(line)?;
        Some(caps.get(1)?.as_str().trim().to_string())
    })?;

    Some(build_snapshot(condition, |field| {
        lines.iter().find_map(|line| {
            let caps = field.label_pattern().captures(line)?;
            Some(caps.get(1)?.as_str().to_string())
        })
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{create_test_config, RetryConfig};
    use crate::models::UNAVAILABLE_CONDITION;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_parse_data_attributes() {
        let doc = r#"<div class="now" data-condition="Partly cloudy" data-wind-speed="18 km/h"
                       data-temperature="17,5" data-humidity="72%" data-uv-index="4"></div>"#;

        let weather = parse_weather_document(doc);

        assert_eq!(weather.condition, "Partly cloudy");
        assert_eq!(weather.wind_speed, 18.0);
        assert_eq!(weather.temperature, Some(17.5));
        assert_eq!(weather.humidity, Some(72.0));
        assert_eq!(weather.pressure, None);
        assert_eq!(weather.uv_index, Some(4.0));
    }

    #[test]
    fn test_parse_class_markers() {
        let doc = r#"
            <div class="current">
              <span class="weather-condition">Sunny</span>
              <span class="wind-speed">12&nbsp;km/h</span>
              <span class="temperature">21 &deg;C</span>
              <span class="pressure">1 016 hPa</span>
              <span class="visibility">n/a</span>
            </div>"#;

        let weather = parse_weather_document(doc);

        assert_eq!(weather.condition, "Sunny");
        assert_eq!(weather.wind_speed, 12.0);
        assert_eq!(weather.temperature, Some(21.0));
        assert_eq!(weather.pressure, Some(1016.0));
        assert_eq!(weather.visibility, None);
        assert_eq!(weather.humidity, None);
    }

    #[test]
    fn test_class_markers_ignore_related_classes() {
        let doc = r#"
            <span class="condition-icon"></span>
            <span class="condition">Overcast</span>
            <span class="feels-like-temperature">11 °C</span>
            <span class="temperature-max">19 °C</span>
            <span class="temperature now">14 °C</span>
            <span class="wind-speed-gusts">60 km/h</span>"#;

        let weather = parse_weather_document(doc);

        assert_eq!(weather.condition, "Overcast");
        assert_eq!(weather.temperature, Some(14.0));
        assert_eq!(weather.wind_speed, 0.0);
    }

    #[test]
    fn test_parse_labelled_text() {
        let doc = "<p>Conditions: Light rain</p><p>Wind: 25 km/h</p><p>Temperature: -2 °C</p><p>UV index: 1</p>";

        let weather = parse_weather_document(doc);

        assert_eq!(weather.condition, "Light rain");
        assert_eq!(weather.wind_speed, 25.0);
        assert_eq!(weather.temperature, Some(-2.0));
        assert_eq!(weather.uv_index, Some(1.0));
    }

    #[test]
    fn test_unparsable_wind_defaults_to_zero() {
        let doc = r#"<div data-condition="Fog" data-wind-speed="calm"></div>"#;
        let weather = parse_weather_document(doc);
        assert_eq!(weather.condition, "Fog");
        assert_eq!(weather.wind_speed, 0.0);
    }

    #[test]
    fn test_document_without_markers_yields_default_record() {
        let weather = parse_weather_document("<html><body><h1>Oops</h1></body></html>");

        assert_eq!(weather, WeatherSnapshot::unavailable());
        assert_eq!(weather.condition, UNAVAILABLE_CONDITION);
        assert_eq!(weather.wind_speed, 0.0);
        assert!(weather.temperature.is_none());
        assert!(weather.humidity.is_none());
        assert!(weather.pressure.is_none());
        assert!(weather.visibility.is_none());
        assert!(weather.uv_index.is_none());
    }

    #[tokio::test]
    async fn test_client_degrades_on_unrecognized_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather/fr/brest"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>redesigned</html>"))
            .expect(1)
            .mount(&server)
            .await;

        let cfg = create_test_config();
        let fetcher = HttpFetcher::new(&cfg.sources, RetryConfig::default()).unwrap();
        let client = WeatherClient::new(
            fetcher,
            SourceEndpoint {
                name: "weather".to_string(),
                base_url: format!("{}/weather", server.uri()),
            },
        );

        let weather = client.fetch_weather("fr/brest").await.unwrap();
        assert!(weather.is_unavailable());
    }

    #[tokio::test]
    async fn test_client_propagates_permanent_http_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(410))
            .expect(1)
            .mount(&server)
            .await;

        let cfg = create_test_config();
        let fetcher = HttpFetcher::new(&cfg.sources, RetryConfig::default()).unwrap();
        let client = WeatherClient::new(
            fetcher,
            SourceEndpoint {
                name: "weather".to_string(),
                base_url: server.uri(),
            },
        );

        let err = client.fetch_weather("fr/brest").await.unwrap_err();
        assert!(!err.is_transient());
    }
}
