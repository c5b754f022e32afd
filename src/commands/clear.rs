use anyhow::Result;
use chrono::{Local, NaiveDate};
use coastwatch::{config::Config, store::ObservationStore, validation};
use colored::Colorize;
use tracing::info;

/// Execute the clear command
///
/// Deletes one location's observations for `date`, or today when omitted.
pub async fn execute(cfg: Config, country: &str, city: &str, date: Option<&str>) -> Result<()> {
    validation::validate_location(country, city)?;
    let date = resolve_date(date, Local::now().date_naive())?;

    let store = ObservationStore::open(&cfg.database).await?;
    let Some(location) = store.find_location(country, city).await? else {
        anyhow::bail!("Location not found: {}/{}", country, city);
    };

    let deleted = store.clear_observations(location.id, date).await?;
    info!(
        country = %location.country,
        city = %location.city,
        %date,
        deleted,
        "Cleared observations"
    );

    println!(
        "{}",
        format!(
            "✓ Deleted {} observations for {}/{} on {}",
            deleted, location.country, location.city, date
        )
        .green()
    );
    Ok(())
}

fn resolve_date(date: Option<&str>, today: NaiveDate) -> Result<NaiveDate> {
    match date {
        Some(value) => Ok(validation::parse_date(value)?),
        None => Ok(today),
    }
}
