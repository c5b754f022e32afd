use async_trait::async_trait;
use chrono::{Local, NaiveDate, NaiveTime};
use regex::Regex;
use std::sync::LazyLock;

use super::selectors::{self, ParseAttempt};
use super::{HttpFetcher, TideSource};
use crate::config::SourceEndpoint;
use crate::error::FetchError;
use crate::models::{TideLevel, TideReading};

/// A tide event before date anchoring
#[derive(Debug, Clone, PartialEq)]
struct TideEvent {
    time: NaiveTime,
    label: String,
    coefficient: Option<i64>,
}

const TIDE_ATTEMPTS: [ParseAttempt<Vec<TideEvent>>; 3] =
    [events_from_attributes, events_from_table, events_from_text];

const DATE_ATTEMPTS: [ParseAttempt<NaiveDate>; 3] =
    [date_from_attribute, date_from_time_element, date_from_header];

/// Client for the tide tables source
pub struct TideClient {
    fetcher: HttpFetcher,
    endpoint: SourceEndpoint,
}

impl TideClient {
    pub fn new(fetcher: HttpFetcher, endpoint: SourceEndpoint) -> Self {
        Self { fetcher, endpoint }
    }
}

#[async_trait]
impl TideSource for TideClient {
    fn name(&self) -> &str {
        &self.endpoint.name
    }

    fn url_for(&self, slug: &str) -> String {
        self.endpoint.url_for(slug)
    }

    async fn fetch_tides(&self, slug: &str) -> Result<Vec<TideReading>, FetchError> {
        let url = self.url_for(slug);
        let document = self.fetcher.fetch_text(&self.endpoint.name, &url).await?;
        let readings = parse_tide_document(&document, Local::now().date_naive());

        tracing::debug!(slug = slug, readings = readings.len(), "Parsed tide document");
        Ok(readings)
    }
}

/// Parse every tide event in a document, anchored to the page date or `today`
pub fn parse_tide_document(document: &str, today: NaiveDate) -> Vec<TideReading> {
    let Some((attempt, events)) = selectors::first_match(document, &TIDE_ATTEMPTS) else {
        return Vec::new();
    };
    let date = resolve_page_date(document).unwrap_or(today);
    tracing::trace!(attempt = attempt, events = events.len(), %date, "Tide selector matched");

    let mut readings: Vec<TideReading> = events
        .into_iter()
        .map(|event| TideReading {
            timestamp: date.and_time(event.time),
            level: TideLevel::from_label(&event.label),
            coefficient: event.coefficient,
        })
        .collect();
    readings.sort_by_key(|r| r.timestamp);
    readings
}

/// Calendar date printed on the page, if any
pub fn resolve_page_date(document: &str) -> Option<NaiveDate> {
    selectors::first_match(document, &DATE_ATTEMPTS).map(|(_, date)| date)
}

fn parse_coefficient(text: &str) -> Option<i64> {
    selectors::parse_number(text).map(|n| n.round() as i64)
}

fn non_empty(events: Vec<TideEvent>) -> Option<Vec<TideEvent>> {
    (!events.is_empty()).then_some(events)
}

/// `<li data-tide-time="06:12" data-tide-type="High tide" data-coefficient="95">`
fn events_from_attributes(document: &str) -> Option<Vec<TideEvent>> {
    let events = selectors::tags_with_attribute(document, "data-tide-time")
        .into_iter()
        .filter_map(|tag| {
            let time = selectors::parse_time(&selectors::attribute(tag, "data-tide-time")?)?;
            Some(TideEvent {
                time,
                label: selectors::attribute(tag, "data-tide-type").unwrap_or_default(),
                coefficient: selectors::attribute(tag, "data-coefficient")
                    .and_then(|c| parse_coefficient(&c)),
            })
        })
        .collect();
    non_empty(events)
}

/// Row classes seen on tide tables
const ROW_CLASSES: [&str; 2] = ["tide-row", "tide"];

/// Classes of the heading that carries the page date
const DATE_CLASSES: [&str; 3] = ["tide-date", "date", "day-date"];

/// `<tr class="tide-row"><td>High</td><td>06:12</td><td class="coef">95</td></tr>`
fn events_from_table(document: &str) -> Option<Vec<TideEvent>> {
    let rows = ROW_CLASSES
        .iter()
        .map(|class| selectors::blocks_by_class(document, "tr", class))
        .find(|rows| !rows.is_empty())?;

    let events = rows
        .into_iter()
        .filter_map(|row| {
            let cells: Vec<(&str, String)> = selectors::cells(row)
                .into_iter()
                .map(|(tag, inner)| (tag, selectors::clean_text(inner)))
                .collect();

            let time = cells.iter().find_map(|(_, text)| selectors::parse_time(text))?;
            let label = cells
                .iter()
                .map(|(_, text)| text)
                .find(|text| selectors::parse_time(text).is_none() && text.chars().any(char::is_alphabetic))
                .cloned()
                .unwrap_or_default();
            let coefficient = cells
                .iter()
                .find(|(tag, _)| tag.to_lowercase().contains("coef"))
                .and_then(|(_, text)| parse_coefficient(text));

            Some(TideEvent { time, label, coefficient })
        })
        .collect();
    non_empty(events)
}

static TEXT_EVENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(high|low)(?:\s+(?:tide|water))?\W{0,5}(?:at\s+)?([01]?\d|2[0-3])[:h]([0-5]\d)(?:[^A-Za-z0-9]{0,5}(?:coef(?:ficient)?\.?)\s*:?\s*(\d{1,3}))?",
    )
    .expect("tide event pattern is valid")
});

/// "High tide 06:12 coef 95 / Low tide 12:30" in plain text
fn events_from_text(document: &str) -> Option<Vec<TideEvent>> {
    let text = selectors::clean_text(document);
    let events = TEXT_EVENT
        .captures_iter(&text)
        .filter_map(|caps| {
            let hour = caps.get(2)?.as_str().parse().ok()?;
            let minute = caps.get(3)?.as_str().parse().ok()?;
            Some(TideEvent {
                time: NaiveTime::from_hms_opt(hour, minute, 0)?,
                label: caps.get(1)?.as_str().to_string(),
                coefficient: caps.get(4).and_then(|m| parse_coefficient(m.as_str())),
            })
        })
        .collect();
    non_empty(events)
}

static ISO_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{4})-(\d{2})-(\d{2})").expect("ISO date pattern is valid"));
static DMY_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2})/(\d{1,2})/(\d{4})\b").expect("day-first date pattern is valid")
});

/// `YYYY-MM-DD` or `DD/MM/YYYY` anywhere in the text
fn parse_page_date(text: &str) -> Option<NaiveDate> {
    if let Some(caps) = ISO_DATE.captures(text) {
        return NaiveDate::from_ymd_opt(
            caps[1].parse().ok()?,
            caps[2].parse().ok()?,
            caps[3].parse().ok()?,
        );
    }
    let caps = DMY_DATE.captures(text)?;
    NaiveDate::from_ymd_opt(
        caps[3].parse().ok()?,
        caps[2].parse().ok()?,
        caps[1].parse().ok()?,
    )
}

fn date_from_attribute(document: &str) -> Option<NaiveDate> {
    parse_page_date(&selectors::first_attribute(document, "data-date")?)
}

fn date_from_time_element(document: &str) -> Option<NaiveDate> {
    selectors::tags_with_attribute(document, "datetime")
        .into_iter()
        .filter(|tag| tag.to_lowercase().starts_with("<time"))
        .find_map(|tag| parse_page_date(&selectors::attribute(tag, "datetime")?))
}

fn date_from_header(document: &str) -> Option<NaiveDate> {
    DATE_CLASSES
        .iter()
        .filter_map(|class| selectors::text_by_class(document, class))
        .find_map(|text| parse_page_date(&text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{create_test_config, RetryConfig};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn at(date: NaiveDate, h: u32, m: u32) -> chrono::NaiveDateTime {
        date.and_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_parse_data_attributes_with_page_date() {
        let doc = r#"
            <section data-date="2024-06-03">
              <ul>
                <li data-tide-time="12:40" data-tide-type="Low tide">Low</li>
                <li data-tide-time="06:12" data-tide-type="High tide" data-coefficient="95">High</li>
              </ul>
            </section>"#;

        let readings = parse_tide_document(doc, today());
        let day = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();

        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0].timestamp, at(day, 6, 12));
        assert_eq!(readings[0].level, TideLevel::High);
        assert_eq!(readings[0].coefficient, Some(95));
        assert_eq!(readings[1].level, TideLevel::Low);
        assert_eq!(readings[1].coefficient, None);
    }

    #[test]
    fn test_parse_table_rows_with_french_date_header() {
        let doc = r#"
            <h2 class="tide-date">Saturday 08/06/2024</h2>
            <table>
              <tr class="tide-row"><td>Pleine mer (high)</td><td>05h58</td><td class="coef">Coef. 102</td></tr>
              <tr class="tide-row"><td>Basse mer (low)</td><td>12:17</td><td class="coef">n/a</td></tr>
              <tr class="ad"><td>Sponsored</td><td>09:00</td></tr>
            </table>"#;

        let readings = parse_tide_document(doc, today());
        let day = NaiveDate::from_ymd_opt(2024, 6, 8).unwrap();

        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0].timestamp, at(day, 5, 58));
        assert_eq!(readings[0].level, TideLevel::High);
        assert_eq!(readings[0].coefficient, Some(102));
        assert_eq!(readings[1].level, TideLevel::Low);
        assert_eq!(readings[1].coefficient, None);
    }

    #[test]
    fn test_parse_plain_text_defaults_to_today() {
        let doc = "<p>High tide 06:12 coef 88. Low tide at 12:30.</p>";

        let readings = parse_tide_document(doc, today());

        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0].timestamp, at(today(), 6, 12));
        assert_eq!(readings[0].coefficient, Some(88));
        assert_eq!(readings[1].timestamp, at(today(), 12, 30));
        assert_eq!(readings[1].level, TideLevel::Low);
    }

    #[test]
    fn test_unrecognized_document_yields_empty() {
        assert!(parse_tide_document("<html><body>Maintenance</body></html>", today()).is_empty());
        assert!(parse_tide_document("", today()).is_empty());
    }

    #[test]
    fn test_attribute_selector_wins_over_text() {
        let doc = r#"<div data-tide-time="07:00" data-tide-type="slack"></div><p>High tide 09:00</p>"#;
        let readings = parse_tide_document(doc, today());
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].level, TideLevel::Normal);
    }

    #[test]
    fn test_date_header_needs_an_exact_class() {
        let doc = r#"<span class="last-updated-date">01/01/2020</span>
                     <h2 class="date big">08/06/2024</h2>"#;
        assert_eq!(resolve_page_date(doc), NaiveDate::from_ymd_opt(2024, 6, 8));
    }

    #[test]
    fn test_table_rows_need_a_tide_class_token() {
        let doc = r#"<table>
              <tr class="tides-ad"><td>High</td><td>09:00</td></tr>
              <tr class="tide"><td>Low</td><td>15:10</td></tr>
            </table>"#;

        let readings = parse_tide_document(doc, today());

        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].timestamp, at(today(), 15, 10));
        assert_eq!(readings[0].level, TideLevel::Low);
    }

    #[test]
    fn test_resolve_page_date_from_time_element() {
        let doc = r#"<time datetime="2024-07-14T00:00">14 July</time>"#;
        assert_eq!(resolve_page_date(doc), NaiveDate::from_ymd_opt(2024, 7, 14));
        assert_eq!(resolve_page_date("<p>no date</p>"), None);
    }

    #[tokio::test]
    async fn test_client_fetches_with_user_agent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tides/brest"))
            .and(header("user-agent", "coastwatch-test"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<li data-tide-time="06:12" data-tide-type="High"></li>"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let cfg = create_test_config();
        let fetcher = HttpFetcher::new(&cfg.sources, RetryConfig::default()).unwrap();
        let client = TideClient::new(
            fetcher,
            SourceEndpoint {
                name: "tides".to_string(),
                base_url: format!("{}/tides", server.uri()),
            },
        );

        let readings = client.fetch_tides("brest").await.unwrap();
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].level, TideLevel::High);
        assert_eq!(client.url_for("brest"), format!("{}/tides/brest", server.uri()));
    }
}
