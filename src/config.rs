use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::registry::{self, LocationEntry};

/// Environment variable prefix, e.g. `COASTWATCH__TRIGGER__SECRET`
pub const ENV_PREFIX: &str = "COASTWATCH";

/// Default configuration file name (looked up in the working directory)
pub const DEFAULT_CONFIG_FILE: &str = "coastwatch.toml";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub sources: SourcesConfig,
    pub retry: RetryConfig,
    pub ingestion: IngestionConfig,
    #[serde(default)]
    pub trigger: TriggerConfig,
    #[serde(default)]
    pub locations: Vec<LocationEntry>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    /// `pretty` or `json`
    pub log_format: String,
    /// When set, logs are also written to a daily-rolling file in this directory
    pub log_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourcesConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub tide: SourceEndpoint,
    pub weather: SourceEndpoint,
}

impl SourcesConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceEndpoint {
    pub name: String,
    pub base_url: String,
}

impl SourceEndpoint {
    /// Document URL for one location slug
    pub fn url_for(&self, slug: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), slug.trim_start_matches('/'))
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub multiplier: f64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            multiplier: 2.0,
            max_delay_ms: 8_000,
        }
    }
}

impl RetryConfig {
    /// Delay before retry number `retry` (1-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1) as i32;
        let delay = (self.base_delay_ms as f64) * self.multiplier.powi(exponent);
        Duration::from_millis(delay.min(self.max_delay_ms as f64) as u64)
    }
}

/// Upper bound on `ingestion.retention_days` (about a century)
pub const MAX_RETENTION_DAYS: u32 = 36_500;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IngestionConfig {
    pub interval_seconds: u64,
    pub schedule_enabled: bool,
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Observations older than this are deleted daily; 0 keeps everything
    pub retention_days: u32,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TriggerConfig {
    pub secret: Option<String>,
}

impl Config {
    /// The location registry for ingestion passes
    pub fn registry(&self) -> Vec<LocationEntry> {
        if self.locations.is_empty() {
            registry::default_registry()
        } else {
            self.locations.clone()
        }
    }
}

/// Load configuration from defaults, the optional file, and the environment
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let file = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    let builder = with_defaults(config::Config::builder())?
        .add_source(config::File::from(file).required(false))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

    let cfg: Config = builder.build()?.try_deserialize()?;
    validate_config(&cfg)?;

    Ok(cfg)
}

fn with_defaults(
    builder: config::ConfigBuilder<config::builder::DefaultState>,
) -> anyhow::Result<config::ConfigBuilder<config::builder::DefaultState>> {
    let retry = RetryConfig::default();
    Ok(builder
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 8080)?
        .set_default("server.log_level", "info")?
        .set_default("server.log_format", "pretty")?
        .set_default("database.path", "./data/coastwatch.db")?
        .set_default("database.max_connections", 5)?
        .set_default(
            "sources.user_agent",
            format!("coastwatch/{}", env!("CARGO_PKG_VERSION")),
        )?
        .set_default("sources.timeout_seconds", 15)?
        .set_default("sources.tide.name", "tides")?
        .set_default("sources.tide.base_url", "https://tides.example.org/tides")?
        .set_default("sources.weather.name", "weather")?
        .set_default("sources.weather.base_url", "https://weather.example.org/marine")?
        .set_default("retry.max_attempts", i64::from(retry.max_attempts))?
        .set_default("retry.base_delay_ms", retry.base_delay_ms as i64)?
        .set_default("retry.multiplier", retry.multiplier)?
        .set_default("retry.max_delay_ms", retry.max_delay_ms as i64)?
        .set_default("ingestion.interval_seconds", 86_400)?
        .set_default("ingestion.schedule_enabled", true)?
        .set_default("ingestion.min_delay_ms", 1_000)?
        .set_default("ingestion.max_delay_ms", 3_000)?
        .set_default("ingestion.retention_days", 30)?)
}

pub fn validate_config(cfg: &Config) -> anyhow::Result<()> {
    if cfg.server.port == 0 {
        anyhow::bail!("server.port must be non-zero");
    }

    match cfg.server.log_format.as_str() {
        "pretty" | "json" => {}
        other => anyhow::bail!("Invalid log format '{}': expected 'pretty' or 'json'", other),
    }

    if cfg.database.max_connections == 0 {
        anyhow::bail!("database.max_connections must be at least 1");
    }

    if cfg.sources.timeout_seconds == 0 {
        anyhow::bail!("sources.timeout_seconds must be non-zero");
    }

    for endpoint in [&cfg.sources.tide, &cfg.sources.weather] {
        if !endpoint.base_url.starts_with("http://") && !endpoint.base_url.starts_with("https://") {
            anyhow::bail!(
                "Source '{}' has invalid base_url '{}'",
                endpoint.name,
                endpoint.base_url
            );
        }
    }

    if cfg.retry.max_attempts == 0 {
        anyhow::bail!("retry.max_attempts must be at least 1");
    }

    if cfg.retry.multiplier < 1.0 {
        anyhow::bail!("retry.multiplier must be >= 1.0");
    }

    if cfg.ingestion.min_delay_ms > cfg.ingestion.max_delay_ms {
        anyhow::bail!(
            "ingestion.min_delay_ms ({}) exceeds ingestion.max_delay_ms ({})",
            cfg.ingestion.min_delay_ms,
            cfg.ingestion.max_delay_ms
        );
    }

    if cfg.ingestion.retention_days > MAX_RETENTION_DAYS {
        anyhow::bail!(
            "ingestion.retention_days must be at most {} (use 0 to keep everything)",
            MAX_RETENTION_DAYS
        );
    }

    if cfg.ingestion.schedule_enabled && cfg.ingestion.interval_seconds == 0 {
        anyhow::bail!("ingestion.interval_seconds must be non-zero when scheduling is enabled");
    }

    if let Some(secret) = &cfg.trigger.secret {
        if secret.trim().is_empty() {
            anyhow::bail!("trigger.secret cannot be empty; unset it to disable the trigger");
        }
    }

    for entry in &cfg.locations {
        entry.validate()?;
    }

    Ok(())
}

#[cfg(test)]
pub(crate) fn create_test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            log_dir: None,
        },
        database: DatabaseConfig {
            path: PathBuf::from("./data/test.db"),
            max_connections: 1,
        },
        sources: SourcesConfig {
            user_agent: "coastwatch-test".to_string(),
            timeout_seconds: 5,
            tide: SourceEndpoint {
                name: "tides".to_string(),
                base_url: "http://127.0.0.1:9/tides".to_string(),
            },
            weather: SourceEndpoint {
                name: "weather".to_string(),
                base_url: "http://127.0.0.1:9/weather".to_string(),
            },
        },
        retry: RetryConfig::default(),
        ingestion: IngestionConfig {
            interval_seconds: 3600,
            schedule_enabled: false,
            min_delay_ms: 0,
            max_delay_ms: 0,
            retention_days: 30,
        },
        trigger: TriggerConfig {
            secret: Some("s3cret".to_string()),
        },
        locations: vec![],
    }
}
