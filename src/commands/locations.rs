use anyhow::Result;
use coastwatch::{config::Config, models::Location, registry::LocationEntry, store::ObservationStore};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};

/// Execute the locations command
///
/// Lists the configured registry alongside whether each entry has been
/// stored yet.
pub async fn execute(cfg: Config) -> Result<()> {
    let registry = cfg.registry();
    let store = ObservationStore::open(&cfg.database).await?;
    let stored = store.list_locations().await?;

    println!("Locations ({} configured, {} stored):", registry.len(), stored.len());
    println!("{}", render(&registry, &stored));

    let orphaned = stored
        .iter()
        .filter(|loc| find_entry(&registry, loc).is_none())
        .count();
    if orphaned > 0 {
        println!(
            "{}",
            format!("{} stored locations are no longer in the registry", orphaned).yellow()
        );
    }

    Ok(())
}

fn find_entry<'a>(registry: &'a [LocationEntry], location: &Location) -> Option<&'a LocationEntry> {
    registry.iter().find(|entry| {
        entry.country.eq_ignore_ascii_case(&location.country)
            && entry.city.eq_ignore_ascii_case(&location.city)
    })
}

fn render(registry: &[LocationEntry], stored: &[Location]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("COUNTRY").fg(Color::Cyan),
        Cell::new("CITY").fg(Color::Cyan),
        Cell::new("TIDE SLUG").fg(Color::Cyan),
        Cell::new("WEATHER SLUG").fg(Color::Cyan),
        Cell::new("LAST UPDATED").fg(Color::Cyan),
    ]);

    for entry in registry {
        let updated = stored
            .iter()
            .find(|loc| {
                loc.country.eq_ignore_ascii_case(&entry.country)
                    && loc.city.eq_ignore_ascii_case(&entry.city)
            })
            .map(|loc| Cell::new(loc.updated_at.format("%Y-%m-%d %H:%M").to_string()))
            .unwrap_or_else(|| Cell::new("never").fg(Color::DarkGrey));

        table.add_row(vec![
            Cell::new(&entry.country),
            Cell::new(&entry.city),
            Cell::new(&entry.tide_slug),
            Cell::new(&entry.weather_slug),
            updated,
        ]);
    }

    table
}
