//! SQLite connection management
//!
//! One connection behind `Arc<Mutex<_>>` serves the dataset store and the
//! search executor. Commits hold the lock for their whole transaction, so a
//! search never sees half a batch. Searches run in a `query_only` scope.

use crate::config::SqliteConfig;
use crate::error::{SqliteError, SqliteResult};
use crate::schema;
use parking_lot::Mutex;
use rusqlite::Connection;
use std::sync::Arc;
use tracing::{debug, info};

/// Shared handle to the catalog database
#[derive(Clone)]
pub struct SqlitePool {
    conn: Arc<Mutex<Connection>>,
}

impl SqlitePool {
    /// Open the database, check its JSON support and migrate the schema
    pub fn new(config: SqliteConfig) -> SqliteResult<Self> {
        info!(path = ?config.path, "Opening catalog database");

        let conn = open(&config)?;
        for pragma in pragmas(&config) {
            conn.execute_batch(&pragma)?;
        }
        debug!(wal = config.wal_mode, "Applied connection pragmas");

        check_json_operators(&conn)?;
        schema::apply_migrations(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn memory() -> SqliteResult<Self> {
        Self::new(SqliteConfig::memory())
    }

    /// Run `f` with the connection switched to `query_only`; any write the
    /// statement attempts fails instead of landing
    pub fn with_read_connection<F, T>(&self, f: F) -> SqliteResult<T>
    where
        F: FnOnce(&Connection) -> SqliteResult<T>,
    {
        let conn = self.conn.lock();
        conn.execute_batch("PRAGMA query_only = ON;")?;
        let result = f(&conn);
        conn.execute_batch("PRAGMA query_only = OFF;")?;
        result
    }

    /// Mutable access for transactions
    pub fn with_connection_mut<F, T>(&self, f: F) -> SqliteResult<T>
    where
        F: FnOnce(&mut Connection) -> SqliteResult<T>,
    {
        let mut conn = self.conn.lock();
        f(&mut conn)
    }
}

fn open(config: &SqliteConfig) -> SqliteResult<Connection> {
    if config.is_memory() {
        return Ok(Connection::open_in_memory()?);
    }
    if let Some(parent) = config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            SqliteError::Connection(format!("Failed to create {}: {}", parent.display(), e))
        })?;
    }
    Ok(Connection::open(&config.path)?)
}

fn pragmas(config: &SqliteConfig) -> Vec<String> {
    let mut pragmas = Vec::new();
    if config.wal_mode {
        pragmas.push("PRAGMA journal_mode = WAL;".to_string());
        pragmas.push("PRAGMA synchronous = NORMAL;".to_string());
    }
    if config.foreign_keys {
        pragmas.push("PRAGMA foreign_keys = ON;".to_string());
    }
    pragmas.push(format!("PRAGMA busy_timeout = {};", config.busy_timeout_ms));
    pragmas.push(format!("PRAGMA cache_size = {};", config.cache_size));
    pragmas.push("PRAGMA temp_store = MEMORY;".to_string());
    pragmas
}

/// Search predicates use `->` and `->>`, which need SQLite 3.38
fn check_json_operators(conn: &Connection) -> SqliteResult<()> {
    conn.query_row(r#"SELECT '{"a": [1]}' -> 'a' ->> 0"#, [], |row| {
        row.get::<_, i64>(0)
    })
    .map(|_| ())
    .map_err(|e| {
        SqliteError::Connection(format!(
            "SQLite {} lacks the JSON operators: {}",
            rusqlite::version(),
            e
        ))
    })
}
