//! SQLite storage backend for hubcat
//!
//! Implements the persistent-store contracts of `hubcat-core`:
//!
//! - **SqliteDatasetStore**: append-only raw and standardized records, the
//!   hub version ledger, mapping rules and hub activation
//! - **SqliteSearchExecutor**: rewritten queries with `json_each` unnesting
//! - **WAL Mode**: concurrent readers while a pipeline writes
//!
//! ## Usage
//!
//! ```rust,ignore
//! use hubcat_sqlite::{SqliteConfig, SqlitePool, SqliteDatasetStore};
//!
//! let pool = SqlitePool::new(SqliteConfig::new("./hubcat.db"))?;
//! let store = SqliteDatasetStore::new(pool.clone());
//! let records = store.latest_contents("cellxgene", ContentStage::Curated).await?;
//! ```

pub mod config;
pub mod connection;
pub mod dataset_store;
pub mod error;
pub mod schema;
pub mod search;

pub use config::SqliteConfig;
pub use connection::SqlitePool;
pub use dataset_store::SqliteDatasetStore;
pub use error::{SqliteError, SqliteResult};
pub use search::SqliteSearchExecutor;
