use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Install the Prometheus recorder and describe the pipeline metrics
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install Prometheus recorder: {}", e))?;

    init_metric_descriptions();

    Ok(handle)
}

/// Describe metrics (safe to call more than once)
fn init_metric_descriptions() {
    describe_counter!(
        "coastwatch_ingestion_passes_total",
        "Completed ingestion passes by outcome"
    );
    describe_counter!(
        "coastwatch_locations_total",
        "Locations processed by outcome"
    );
    describe_counter!(
        "coastwatch_fetch_attempts_total",
        "HTTP fetch attempts against external sources"
    );
    describe_counter!(
        "coastwatch_observations_written_total",
        "Observations upserted by ingestion"
    );
    describe_histogram!(
        "coastwatch_ingestion_duration_seconds",
        "Wall-clock duration of an ingestion pass"
    );
    describe_gauge!("coastwatch_info", "Build information");

    gauge!("coastwatch_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);
}

/// Record one fetch attempt (`success`, `retry` or `failure`)
pub fn record_fetch_attempt(source: &str, outcome: &str) {
    counter!(
        "coastwatch_fetch_attempts_total",
        "source" => source.to_string(),
        "outcome" => outcome.to_string(),
    )
    .increment(1);
}

/// Record a location processed within a pass (`updated` or `error`)
pub fn record_location(outcome: &str) {
    counter!("coastwatch_locations_total", "outcome" => outcome.to_string()).increment(1);
}

pub fn record_observations_written(count: u64) {
    counter!("coastwatch_observations_written_total").increment(count);
}

/// Record a finished pass (`clean` or `partial`)
pub fn record_pass(outcome: &str, duration: Duration) {
    counter!("coastwatch_ingestion_passes_total", "outcome" => outcome.to_string()).increment(1);
    histogram!("coastwatch_ingestion_duration_seconds").record(duration.as_secs_f64());
}
