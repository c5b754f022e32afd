use anyhow::Result;
use coastwatch::{
    config::Config,
    ingest::{IngestionReport, Orchestrator},
    metrics,
    store::ObservationStore,
};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};
use tracing::info;

/// Execute the ingest command
///
/// Runs a single pass over the registry and returns its report; the caller
/// turns failures into a non-zero exit status.
pub async fn execute(cfg: Config, json: bool) -> Result<IngestionReport> {
    // The recorder only needs to exist so pass metrics have somewhere to go
    let _metrics = metrics::init_metrics()?;

    let store = ObservationStore::open(&cfg.database).await?;
    let orchestrator = Orchestrator::from_config(&cfg, store)?;

    if !json {
        println!(
            "{}",
            format!(
                "Running ingestion pass over {} locations...",
                orchestrator.registry().len()
            )
            .yellow()
        );
    }
    info!("Starting foreground ingestion pass");

    let report = orchestrator.run_pass().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(report)
}

fn print_report(report: &IngestionReport) {
    println!();
    if report.is_clean() {
        println!("{}", "✓ Ingestion pass completed".green());
    } else {
        println!(
            "{}",
            format!("✗ Ingestion pass completed with {} errors", report.error_count).red()
        );
    }
    println!();

    println!("{}", "Summary:".bold());
    println!("  {}: {}", "Pass".cyan(), report.pass_id);
    println!(
        "  {}: {}/{}",
        "Locations updated".cyan(),
        report.locations_updated,
        report.locations_total
    );
    println!("  {}: {}", "Observations written".cyan(), report.observations_written);
    println!("  {}: {}", "Stale rows pruned".cyan(), report.observations_pruned);
    println!(
        "  {}: {:.1}s",
        "Duration".cyan(),
        report.duration().as_secs_f64()
    );

    if report.failures.is_empty() {
        return;
    }

    println!();
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("COUNTRY").fg(Color::Cyan),
        Cell::new("CITY").fg(Color::Cyan),
        Cell::new("REASON").fg(Color::Cyan),
    ]);

    for failure in &report.failures {
        table.add_row(vec![
            Cell::new(&failure.country),
            Cell::new(&failure.city),
            Cell::new(&failure.reason).fg(Color::Red),
        ]);
    }

    println!("{}", table);
}
