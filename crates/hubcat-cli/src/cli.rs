use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human readable tables
    #[default]
    Table,
    /// Machine readable JSON on stdout
    Json,
}

#[derive(Parser)]
#[command(name = "hubcat")]
#[command(about = "hubcat - metadata catalog for harvested dataset repositories")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path (defaults to ./hubcat.toml, then ~/.config/hubcat/config.toml)
    #[arg(short = 'C', long, global = true, env = "HUBCAT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Database path (overrides [storage] path)
    #[arg(long, global = true, env = "HUBCAT_DB")]
    pub db_path: Option<PathBuf>,

    /// Output format
    #[arg(short = 'f', long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Crawl one hub, or every active hub of a repository
    Crawl {
        repository: String,

        /// Hub to crawl (defaults to all active hubs)
        hub: Option<String>,
    },

    /// Manage and apply mapping rules
    #[command(subcommand)]
    Map(MapCommands),

    /// Search the latest datasets of a repository
    Search {
        repository: String,

        /// Predicate over curated_content / standard_content, arrays marked with `*`
        query: String,

        /// Maximum number of results (0 = unlimited)
        #[arg(short = 'n', long, default_value_t = 0)]
        limit: usize,

        /// Print the rewritten query instead of running it
        #[arg(long)]
        explain: bool,
    },

    /// Inspect the derived attribute schema
    #[command(subcommand)]
    Metamodel(MetamodelCommands),

    /// Drill down into the attribute tree
    Browse {
        repository: String,

        /// Attribute path to expand (levels joined with the separator)
        path: Option<String>,

        /// Only show children whose label contains this text
        #[arg(long, default_value = "")]
        filter: String,

        #[command(flatten)]
        stage: StageArgs,
    },

    /// Version ledger of a hub, newest first
    Versions { repository: String, hub: String },

    /// Manage hub activation
    #[command(subcommand)]
    Hubs(HubCommands),
}

/// Which content stage to read
#[derive(Args, Debug, Clone, Copy)]
pub struct StageArgs {
    /// Read standardized content instead of curated content
    #[arg(long)]
    pub standard: bool,
}

impl StageArgs {
    pub fn raw(&self) -> bool {
        !self.standard
    }
}

#[derive(Subcommand)]
pub enum MapCommands {
    /// Run the hub's mapping rules over its latest raw records
    Apply { repository: String, hub: String },

    /// Show the hub's mapping rules
    Show { repository: String, hub: String },

    /// Replace the hub's mapping rules
    Set {
        repository: String,
        hub: String,

        /// Static rule SOURCE=DESTINATION (repeatable)
        #[arg(short = 's', long = "static", value_name = "SOURCE=DESTINATION")]
        statics: Vec<String>,

        /// File holding the dynamic mapping script
        #[arg(long)]
        script: Option<PathBuf>,

        /// Language of the dynamic script (defaults to [pipeline] scripting_language)
        #[arg(long, requires = "script")]
        language: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum MetamodelCommands {
    /// Attribute paths containing FILTER
    Attributes {
        repository: String,

        #[arg(long, default_value = "")]
        filter: String,

        /// Only distinct top-level segments
        #[arg(long)]
        top: bool,

        #[command(flatten)]
        stage: StageArgs,
    },

    /// Child segments of an attribute
    Children {
        repository: String,
        attribute: String,

        #[arg(long, default_value = "")]
        filter: String,

        #[command(flatten)]
        stage: StageArgs,
    },

    /// Values recorded at an attribute
    Values {
        repository: String,
        attribute: String,

        #[arg(long, default_value = "")]
        filter: String,

        #[command(flatten)]
        stage: StageArgs,
    },

    /// Attributes holding lists of objects
    Arrays {
        repository: String,

        #[command(flatten)]
        stage: StageArgs,
    },

    /// Whole attribute tree as JSON
    Tree {
        repository: String,

        #[command(flatten)]
        stage: StageArgs,
    },
}

#[derive(Subcommand)]
pub enum HubCommands {
    /// Active and available hubs of a repository
    List { repository: String },

    /// Include a hub in `crawl <repository>`
    Activate { repository: String, hub: String },

    /// Exclude a hub from `crawl <repository>`
    Deactivate { repository: String, hub: String },
}
