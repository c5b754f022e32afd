use anyhow::Result;
use coastwatch::config::Config;
use colored::Colorize;
use tracing::info;

/// Execute the config show command
///
/// Displays the current configuration with secrets masked
pub fn show(cfg: &Config) -> Result<()> {
    info!("Displaying configuration");

    let sanitized = sanitize_secrets(cfg);

    println!("{}", "Current Configuration:".green().bold());
    println!();

    let toml_string = toml::to_string_pretty(&sanitized)?;
    println!("{}", toml_string);

    Ok(())
}

/// Execute the config validate command
///
/// Loading already validated the file; this reports what was loaded.
pub fn validate(cfg: &Config) -> Result<()> {
    println!("{}", "✓ Configuration is valid".green());
    println!();
    println!("{}", "Summary:".bold());
    println!("  Locations: {}", cfg.registry().len());
    println!(
        "  Scheduled ingestion: {}",
        if cfg.ingestion.schedule_enabled {
            format!("every {}s", cfg.ingestion.interval_seconds)
        } else {
            "disabled".to_string()
        }
    );
    println!(
        "  Manual trigger: {}",
        if cfg.trigger.secret.is_some() {
            "enabled"
        } else {
            "disabled"
        }
    );

    info!("Configuration validation successful");
    Ok(())
}

/// Mask secrets in configuration for safe display
fn sanitize_secrets(cfg: &Config) -> Config {
    let mut sanitized = cfg.clone();
    sanitized.trigger.secret = sanitized.trigger.secret.as_deref().map(mask_secret);
    sanitized
}

/// Shows the first 4 and last 4 characters, or `***` when too short to mask
fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 11 {
        return "***".to_string();
    }

    let prefix: String = chars[..4].iter().collect();
    let suffix: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", prefix, suffix)
}
