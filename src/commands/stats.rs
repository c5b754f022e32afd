//! Stats command implementation
//!
//! Prints observation totals and the busiest locations straight from the
//! store, without going through a running server.

use anyhow::Result;
use coastwatch::{config::Config, models::StoreStats, store::ObservationStore};
use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};

pub async fn execute(cfg: Config) -> Result<()> {
    let store = ObservationStore::open(&cfg.database).await?;
    let stats = store.stats().await?;
    let sources = store.list_sources().await?;

    print_summary(&stats);

    if !stats.top_locations.is_empty() {
        println!("\nTop Locations:");
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec![
            Cell::new("COUNTRY").fg(Color::Cyan),
            Cell::new("CITY").fg(Color::Cyan),
            Cell::new("OBSERVATIONS").fg(Color::Cyan),
        ]);
        for entry in &stats.top_locations {
            table.add_row(vec![
                Cell::new(&entry.country),
                Cell::new(&entry.city),
                Cell::new(format_number(entry.observations)),
            ]);
        }
        println!("{}", table);
    }

    if !sources.is_empty() {
        println!("\nSources:");
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec![
            Cell::new("SOURCE").fg(Color::Cyan),
            Cell::new("STATUS").fg(Color::Cyan),
            Cell::new("LAST FETCH").fg(Color::Cyan),
            Cell::new("LAST ERROR").fg(Color::Cyan),
        ]);
        for source in &sources {
            let status = match source.status.as_str() {
                "ok" => Cell::new("ok").fg(Color::Green),
                "error" => Cell::new("error").fg(Color::Red),
                other => Cell::new(other),
            };
            table.add_row(vec![
                Cell::new(&source.name),
                status,
                Cell::new(
                    source
                        .last_fetch
                        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                        .unwrap_or_else(|| "-".to_string()),
                ),
                Cell::new(source.last_error.as_deref().unwrap_or("-")),
            ]);
        }
        println!("{}", table);
    }

    Ok(())
}

fn print_summary(stats: &StoreStats) {
    println!("Store Statistics:");
    println!("  Locations: {}", format_number(stats.locations));
    println!("  Observations: {}", format_number(stats.observations));
    match (stats.first_observation, stats.last_observation) {
        (Some(first), Some(last)) => println!(
            "  Observed: {} → {}",
            first.format("%Y-%m-%d %H:%M"),
            last.format("%Y-%m-%d %H:%M")
        ),
        _ => println!("  Observed: no data available"),
    }
}

/// Format a count with thousands separators
fn format_number(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if n < 0 {
        out.insert(0, '-');
    }
    out
}
