use crate::config::{RetryConfig, SourcesConfig};
use crate::error::FetchError;
use reqwest::{Client, StatusCode};

/// Shared HTTP client for the external sources, with bounded retries.
///
/// Retries happen only for transient failures:
/// - connection failures and timeouts
/// - HTTP 5xx responses
///
/// HTTP 4xx responses are permanent and returned after a single attempt.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    retry: RetryConfig,
}

impl HttpFetcher {
    pub fn new(sources: &SourcesConfig, retry: RetryConfig) -> reqwest::Result<Self> {
        let client = Client::builder()
            .user_agent(sources.user_agent.clone())
            .timeout(sources.timeout())
            .build()?;

        Ok(Self { client, retry })
    }

    /// GET a document body, making at most `retry.max_attempts` attempts
    pub async fn fetch_text(&self, source: &str, url: &str) -> Result<String, FetchError> {
        let mut attempt = 0;

        loop {
            attempt += 1;

            match self.get_once(url).await {
                Ok(body) => {
                    crate::metrics::record_fetch_attempt(source, "success");
                    tracing::debug!(source = source, url = url, attempt = attempt, bytes = body.len(), "Fetched document");
                    return Ok(body);
                }
                Err(e) if e.is_transient() && attempt < self.retry.max_attempts => {
                    crate::metrics::record_fetch_attempt(source, "retry");
                    let delay = self.retry.delay_for(attempt);
                    tracing::warn!(
                        source = source,
                        url = url,
                        attempt = attempt,
                        max_attempts = self.retry.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transient fetch failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    crate::metrics::record_fetch_attempt(source, "failure");
                    tracing::warn!(
                        source = source,
                        url = url,
                        attempt = attempt,
                        error = %e,
                        "Fetch failed"
                    );
                    return Err(e);
                }
            }
        }
    }

    async fn get_once(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| classify_transport(url, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(url, status, format!("HTTP {}", status)));
        }

        response
            .text()
            .await
            .map_err(|e| classify_transport(url, &e))
    }
}

/// Map a non-success status to a fetch error: 5xx retry, everything else is final
pub fn classify_status(url: &str, status: StatusCode, reason: String) -> FetchError {
    let url = url.to_string();
    let code = Some(status.as_u16());
    if status.is_server_error() {
        FetchError::Transient { url, status: code, reason }
    } else {
        FetchError::Permanent { url, status: code, reason }
    }
}

/// Map a transport error. Only a malformed request is permanent.
fn classify_transport(url: &str, error: &reqwest::Error) -> FetchError {
    if error.is_builder() {
        return FetchError::Permanent {
            url: url.to_string(),
            status: None,
            reason: error.to_string(),
        };
    }

    FetchError::Transient {
        url: url.to_string(),
        status: error.status().map(|s| s.as_u16()),
        reason: error.to_string(),
    }
}
