use crate::cli::{HubCommands, OutputFormat};
use crate::context::Catalog;
use crate::output;
use anyhow::Result;
use colored::Colorize;

pub async fn execute(catalog: &Catalog, format: OutputFormat, cmd: HubCommands) -> Result<()> {
    match cmd {
        HubCommands::List { repository } => {
            let listing = catalog.pipeline.hubs(&repository).await?;
            match format {
                OutputFormat::Json => output::print_json(&listing)?,
                OutputFormat::Table => {
                    let mut table = output::table(&["Hub", "Status"]);
                    for hub in &listing.active {
                        table.add_row(vec![hub.clone(), "active".green().to_string()]);
                    }
                    for hub in &listing.available {
                        table.add_row(vec![hub.clone(), "available".to_string()]);
                    }
                    println!("{table}");
                }
            }
        }
        HubCommands::Activate { repository, hub } => {
            catalog.pipeline.set_hub_active(&repository, &hub, true).await?;
            println!("{} {repository}/{hub}", "Activated".green());
        }
        HubCommands::Deactivate { repository, hub } => {
            catalog.pipeline.set_hub_active(&repository, &hub, false).await?;
            println!("{} {repository}/{hub}", "Deactivated".yellow());
        }
    }
    Ok(())
}
