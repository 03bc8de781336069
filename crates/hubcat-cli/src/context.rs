//! Wiring of the catalog services for one CLI invocation

use anyhow::{Context, Result};
use hubcat_config::{discover, HubcatConfig};
use hubcat_core::{MetamodelStore, ReloadEventBus, SearchService, TreeBrowser};
use hubcat_pipeline::{CommandScriptEngine, HttpJsonFetcher, PipelineManager};
use hubcat_sqlite::{SqliteConfig, SqliteDatasetStore, SqlitePool, SqliteSearchExecutor};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

pub struct Catalog {
    pub config: HubcatConfig,
    pub store: Arc<SqliteDatasetStore>,
    pub metamodel: Arc<MetamodelStore>,
    pub browser: TreeBrowser,
    pub search: SearchService,
    pub pipeline: PipelineManager,
}

impl Catalog {
    /// Load configuration and open the store
    pub fn open(config_path: Option<&Path>, db_path: Option<PathBuf>) -> Result<Self> {
        let mut config = discover(config_path).context("Failed to load configuration")?;
        if let Some(path) = db_path {
            config.storage.path = path;
        }
        Self::from_config(config)
    }

    pub fn from_config(config: HubcatConfig) -> Result<Self> {
        let sqlite = SqliteConfig::from(&config.storage);
        debug!(path = %sqlite.path.display(), "Opening database");

        let pool = SqlitePool::new(sqlite)
            .with_context(|| format!("Failed to open database {}", config.storage.path.display()))?;
        let store = Arc::new(SqliteDatasetStore::new(pool.clone()));
        let executor = Arc::new(SqliteSearchExecutor::new(pool));

        let metamodel = Arc::new(MetamodelStore::new(
            store.clone(),
            config.metamodel.clone(),
        ));
        let events = Arc::new(ReloadEventBus::new());
        events.register(metamodel.clone());

        let search = SearchService::new(&config.query, executor)
            .context("Invalid [query] configuration")?;
        let fetcher = HttpJsonFetcher::new(config.pipeline.operation_timeout())
            .context("Failed to set up HTTP client")?;
        let pipeline = PipelineManager::new(
            &config,
            store.clone(),
            Arc::new(fetcher),
            Arc::new(CommandScriptEngine::new(&config.scripting)),
            events,
        );

        Ok(Self {
            browser: TreeBrowser::new(metamodel.clone()),
            config,
            store,
            metamodel,
            search,
            pipeline,
        })
    }

    pub fn separator(&self) -> &str {
        &self.config.metamodel.levels_separator
    }
}
