use crate::cli::OutputFormat;
use crate::context::Catalog;
use crate::output;
use anyhow::{Context, Result};
use colored::Colorize;
use serde_json::Value;

pub async fn execute(
    catalog: &Catalog,
    format: OutputFormat,
    repository: String,
    query: String,
    limit: usize,
    explain: bool,
) -> Result<()> {
    if explain {
        let rewritten = catalog.search.rewrite(&query).context("Query rejected")?;
        match format {
            OutputFormat::Json => output::print_json(&rewritten)?,
            OutputFormat::Table => {
                for join in &rewritten.joins {
                    println!("{} json_each({}) AS {}", "JOIN".cyan(), join.source, join.alias);
                }
                println!("{} {}", "WHERE".cyan(), rewritten.predicate);
            }
        }
        return Ok(());
    }

    // Store failures come back as an empty result and are logged
    let datasets = catalog
        .search
        .search(&repository, &query, limit)
        .await
        .context("Query rejected")?;

    match format {
        OutputFormat::Json => output::print_json(&datasets)?,
        OutputFormat::Table => {
            let mut table = output::table(&["Id", "Hub", "Raw", "Standard", "Content"]);
            for dataset in &datasets {
                let content = Value::Object(dataset.curated_content.clone()).to_string();
                table.add_row(vec![
                    dataset.id.to_string(),
                    dataset.hub.clone(),
                    dataset.raw_version.to_string(),
                    dataset
                        .standard_version
                        .map(|v| v.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                    output::preview(&content, 80),
                ]);
            }
            println!("{table}");
            println!("{} datasets", datasets.len());
        }
    }
    Ok(())
}
