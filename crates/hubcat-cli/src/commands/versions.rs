use crate::cli::OutputFormat;
use crate::context::Catalog;
use crate::output;
use anyhow::Result;

pub async fn execute(
    catalog: &Catalog,
    format: OutputFormat,
    repository: String,
    hub: String,
) -> Result<()> {
    let versions = catalog.pipeline.versions(&repository, &hub).await?;

    match format {
        OutputFormat::Json => output::print_json(&versions)?,
        OutputFormat::Table => {
            let mut table =
                output::table(&["Stage", "Version", "Operation", "User", "Created", "Status"]);
            for version in &versions {
                let status = if version.current {
                    "current"
                } else if version.previous {
                    "previous"
                } else {
                    ""
                };
                table.add_row(vec![
                    version.stage.to_string(),
                    version.version.to_string(),
                    version.operation.to_string(),
                    version.username.clone(),
                    version.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                    status.to_string(),
                ]);
            }
            println!("{table}");
        }
    }
    Ok(())
}
