use anyhow::Result;
use clap::Parser;

use hubcat_cli::{
    cli::{Cli, Commands},
    commands,
    context::Catalog,
    logging,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let catalog = Catalog::open(cli.config.as_deref(), cli.db_path)?;
    let format = cli.format;

    match cli.command {
        Commands::Crawl { repository, hub } => {
            commands::crawl::execute(&catalog, format, repository, hub).await?
        }

        Commands::Map(cmd) => commands::map::execute(&catalog, format, cmd).await?,

        Commands::Search {
            repository,
            query,
            limit,
            explain,
        } => commands::search::execute(&catalog, format, repository, query, limit, explain).await?,

        Commands::Metamodel(cmd) => commands::metamodel::execute(&catalog, format, cmd).await?,

        Commands::Browse {
            repository,
            path,
            filter,
            stage,
        } => {
            commands::browse::execute(&catalog, format, repository, path, filter, stage.raw())
                .await?
        }

        Commands::Versions { repository, hub } => {
            commands::versions::execute(&catalog, format, repository, hub).await?
        }

        Commands::Hubs(cmd) => commands::hubs::execute(&catalog, format, cmd).await?,
    }

    Ok(())
}
