//! Shared setup for SQLite integration tests

#![allow(dead_code)]

use hubcat_core::{DatasetStore, RawBatch, RawDataset, Record};
use hubcat_sqlite::{SqliteConfig, SqliteDatasetStore, SqlitePool, SqliteSearchExecutor};
use serde_json::Value;
use tempfile::TempDir;

pub struct TestDb {
    // Keeps the database file alive
    pub dir: TempDir,
    pub pool: SqlitePool,
    pub store: SqliteDatasetStore,
    pub executor: SqliteSearchExecutor,
}

/// File-backed database in a fresh temporary directory
pub fn test_db() -> TestDb {
    let dir = TempDir::new().unwrap();
    let pool = SqlitePool::new(SqliteConfig::new(dir.path().join("hubcat.db"))).unwrap();

    TestDb {
        store: SqliteDatasetStore::new(pool.clone()),
        executor: SqliteSearchExecutor::new(pool.clone()),
        pool,
        dir,
    }
}

pub fn record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        other => panic!("not an object: {other}"),
    }
}

pub fn raw_batch(repository: &str, hub: &str, datasets: Vec<(&str, Value)>) -> RawBatch {
    RawBatch {
        repository: repository.to_string(),
        hub: hub.to_string(),
        username: "tester".to_string(),
        datasets: datasets
            .into_iter()
            .map(|(key, content)| RawDataset {
                key: key.to_string(),
                content: record(content),
            })
            .collect(),
    }
}

/// Crawl-like append of `datasets` into `repository`/`hub`
pub async fn seed(db: &TestDb, repository: &str, hub: &str, datasets: Vec<(&str, Value)>) {
    db.store
        .append_raw(raw_batch(repository, hub, datasets))
        .await
        .unwrap();
}
