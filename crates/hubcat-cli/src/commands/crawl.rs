use crate::cli::OutputFormat;
use crate::context::Catalog;
use crate::output;
use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;

#[derive(Serialize)]
struct CrawlRow {
    hub: String,
    version: u64,
    datasets: usize,
}

pub async fn execute(
    catalog: &Catalog,
    format: OutputFormat,
    repository: String,
    hub: Option<String>,
) -> Result<()> {
    let committed = match hub {
        Some(hub) => {
            let summary = catalog
                .pipeline
                .crawl(&repository, &hub)
                .await
                .with_context(|| format!("Crawl of {repository}/{hub} failed"))?;
            vec![(hub, summary)]
        }
        None => catalog
            .pipeline
            .crawl_active(&repository)
            .await
            .with_context(|| format!("Crawl of {repository} failed"))?,
    };

    let rows: Vec<CrawlRow> = committed
        .into_iter()
        .map(|(hub, summary)| CrawlRow {
            hub,
            version: summary.version,
            datasets: summary.datasets,
        })
        .collect();

    match format {
        OutputFormat::Json => output::print_json(&rows)?,
        OutputFormat::Table => {
            if rows.is_empty() {
                println!(
                    "{}",
                    format!("No active hubs in {repository}; see `hubcat hubs activate`").yellow()
                );
                return Ok(());
            }
            let mut table = output::table(&["Hub", "Raw version", "Datasets"]);
            for row in &rows {
                table.add_row(vec![
                    row.hub.clone(),
                    row.version.to_string(),
                    row.datasets.to_string(),
                ]);
            }
            println!("{table}");
        }
    }
    Ok(())
}
