//! DatasetStore implementation for SQLite
//!
//! Every write runs in one transaction while holding the connection lock, so
//! the latest-version view only ever reflects whole batches.

use crate::connection::SqlitePool;
use crate::error::{SqliteError, SqliteResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hubcat_core::{
    CommitSummary, ContentStage, Dataset, DatasetId, DatasetStore, HubVersion, MappingRule,
    MetamodelSource, Operation, RawBatch, Record, Stage, StandardBatch, StorageError,
    StorageResult, StoredRecord,
};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

/// SQLite implementation of [`DatasetStore`] and [`MetamodelSource`]
#[derive(Clone)]
pub struct SqliteDatasetStore {
    pool: SqlitePool,
}

impl SqliteDatasetStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Run `f` on the blocking pool with exclusive connection access
    async fn run<F, T>(&self, f: F) -> StorageResult<T>
    where
        F: FnOnce(&mut Connection) -> SqliteResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();

        tokio::task::spawn_blocking(move || pool.with_connection_mut(f))
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?
            .map_err(Into::into)
    }
}

#[async_trait]
impl MetamodelSource for SqliteDatasetStore {
    async fn latest_contents(
        &self,
        repository: &str,
        stage: ContentStage,
    ) -> StorageResult<Vec<Record>> {
        let repository = repository.to_string();

        self.run(move |conn| {
            let sql = match stage {
                ContentStage::Curated => {
                    "SELECT curated_content FROM latest_datasets
                     WHERE repository = ?1 ORDER BY id"
                }
                ContentStage::Standard => {
                    "SELECT standard_content FROM latest_datasets
                     WHERE repository = ?1 AND standard_content IS NOT NULL ORDER BY id"
                }
            };

            let mut stmt = conn.prepare(sql)?;
            let contents = stmt
                .query_map([&repository], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;

            contents.iter().map(|text| parse_record(text)).collect()
        })
        .await
    }
}

#[async_trait]
impl DatasetStore for SqliteDatasetStore {
    async fn append_raw(&self, batch: RawBatch) -> StorageResult<CommitSummary> {
        self.run(move |conn| {
            let tx = conn.transaction()?;
            let now = Utc::now().to_rfc3339();

            tx.execute(
                "INSERT INTO hubs (repository, name) VALUES (?1, ?2)
                 ON CONFLICT(repository, name) DO NOTHING",
                params![batch.repository, batch.hub],
            )?;
            let version = next_hub_version(&tx, &batch.repository, &batch.hub, Stage::Raw)?;

            {
                let mut insert_dataset = tx.prepare(
                    "INSERT OR IGNORE INTO datasets (repository, hub, dataset_key)
                     VALUES (?1, ?2, ?3)",
                )?;
                let mut select_id = tx.prepare(
                    "SELECT id FROM datasets
                     WHERE repository = ?1 AND hub = ?2 AND dataset_key = ?3",
                )?;
                let mut insert_record = tx.prepare(
                    "INSERT INTO raw_records (dataset_id, version, content, created_at)
                     VALUES (?1, ?2, ?3, ?4)",
                )?;

                for dataset in &batch.datasets {
                    insert_dataset.execute(params![batch.repository, batch.hub, dataset.key])?;
                    let id: i64 = select_id.query_row(
                        params![batch.repository, batch.hub, dataset.key],
                        |row| row.get(0),
                    )?;

                    let content = serde_json::to_string(&dataset.content)?;
                    insert_record
                        .execute(params![id, version as i64, content, now])
                        .map_err(|e| duplicate_key(e, &dataset.key))?;
                }
            }

            for stage in [Stage::Raw, Stage::Curated] {
                append_ledger(
                    &tx,
                    LedgerEntry {
                        repository: &batch.repository,
                        hub: &batch.hub,
                        stage,
                        version,
                        operation: Operation::Crawling,
                        username: &batch.username,
                        created_at: &now,
                    },
                )?;
            }

            tx.commit()?;
            info!(
                repository = %batch.repository,
                hub = %batch.hub,
                version,
                datasets = batch.datasets.len(),
                "Committed raw version"
            );

            Ok(CommitSummary {
                version,
                datasets: batch.datasets.len(),
            })
        })
        .await
    }

    async fn latest_raw(&self, repository: &str, hub: &str) -> StorageResult<Vec<StoredRecord>> {
        let repository = repository.to_string();
        let hub = hub.to_string();

        self.run(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT d.id, d.dataset_key, r.version, r.content
                 FROM datasets d
                 JOIN raw_records r
                    ON r.dataset_id = d.id
                    AND r.version = (SELECT MAX(version) FROM raw_records WHERE dataset_id = d.id)
                 WHERE d.repository = ?1 AND d.hub = ?2
                 ORDER BY d.id",
            )?;

            let rows = stmt
                .query_map(params![repository, hub], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                })?
                .collect::<Result<Vec<_>, _>>()?;

            rows.into_iter()
                .map(|(dataset_id, key, version, content)| -> SqliteResult<StoredRecord> {
                    Ok(StoredRecord {
                        dataset_id,
                        key,
                        raw_version: version as u64,
                        content: parse_record(&content)?,
                    })
                })
                .collect()
        })
        .await
    }

    async fn append_standard(&self, batch: StandardBatch) -> StorageResult<CommitSummary> {
        self.run(move |conn| {
            let tx = conn.transaction()?;
            let now = Utc::now().to_rfc3339();
            let version = next_hub_version(&tx, &batch.repository, &batch.hub, Stage::Standard)?;

            {
                let mut next_version = tx.prepare(
                    "SELECT COALESCE(MAX(version), 0) + 1 FROM standard_records
                     WHERE dataset_id = ?1",
                )?;
                let mut insert_record = tx.prepare(
                    "INSERT INTO standard_records (dataset_id, version, raw_version, content, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )?;

                for record in &batch.records {
                    let dataset_version: i64 =
                        next_version.query_row([record.dataset_id], |row| row.get(0))?;
                    let content = serde_json::to_string(&record.content)?;
                    insert_record.execute(params![
                        record.dataset_id,
                        dataset_version,
                        record.raw_version as i64,
                        content,
                        now
                    ])?;
                }
            }

            append_ledger(
                &tx,
                LedgerEntry {
                    repository: &batch.repository,
                    hub: &batch.hub,
                    stage: Stage::Standard,
                    version,
                    operation: Operation::Mapping,
                    username: &batch.username,
                    created_at: &now,
                },
            )?;

            tx.commit()?;
            info!(
                repository = %batch.repository,
                hub = %batch.hub,
                version,
                datasets = batch.records.len(),
                "Committed standard version"
            );

            Ok(CommitSummary {
                version,
                datasets: batch.records.len(),
            })
        })
        .await
    }

    async fn fetch(
        &self,
        dataset_id: DatasetId,
        raw_version: Option<u64>,
    ) -> StorageResult<Option<Dataset>> {
        self.run(move |conn| {
            let raw = conn
                .query_row(
                    "SELECT d.repository, d.hub, r.version, r.content
                     FROM datasets d
                     JOIN raw_records r ON r.dataset_id = d.id
                     WHERE d.id = ?1
                       AND r.version = COALESCE(
                           ?2,
                           (SELECT MAX(version) FROM raw_records WHERE dataset_id = ?1)
                       )",
                    params![dataset_id, raw_version.map(|v| v as i64)],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, i64>(2)?,
                            row.get::<_, String>(3)?,
                        ))
                    },
                )
                .optional()?;

            let Some((repository, hub, version, content)) = raw else {
                debug!(dataset_id, ?raw_version, "Dataset version not found");
                return Ok(None);
            };

            let standard = conn
                .query_row(
                    "SELECT version, content FROM standard_records
                     WHERE dataset_id = ?1 AND raw_version = ?2
                     ORDER BY version DESC LIMIT 1",
                    params![dataset_id, version],
                    |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)),
                )
                .optional()?;

            let (standard_version, standard_content) = match standard {
                Some((v, text)) => (Some(v as u64), Some(parse_record(&text)?)),
                None => (None, None),
            };

            Ok(Some(Dataset {
                id: dataset_id,
                repository,
                hub,
                raw_version: version as u64,
                curated_version: version as u64,
                curated_content: parse_record(&content)?,
                standard_version,
                standard_content,
            }))
        })
        .await
    }

    async fn mappings(&self, repository: &str, hub: &str) -> StorageResult<Vec<MappingRule>> {
        let repository = repository.to_string();
        let hub = hub.to_string();

        self.run(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT rule FROM mappings WHERE repository = ?1 AND hub = ?2 ORDER BY position",
            )?;
            let rules = stmt
                .query_map(params![repository, hub], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;

            rules
                .iter()
                .map(|text| serde_json::from_str::<MappingRule>(text).map_err(SqliteError::from))
                .collect()
        })
        .await
    }

    async fn save_mappings(
        &self,
        repository: &str,
        hub: &str,
        rules: Vec<MappingRule>,
    ) -> StorageResult<()> {
        if rules.iter().filter(|rule| rule.is_dynamic()).count() > 1 {
            return Err(StorageError::invalid_operation(format!(
                "hub {hub} in repository {repository} can hold one dynamic mapping"
            )));
        }

        let repository = repository.to_string();
        let hub = hub.to_string();

        self.run(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "DELETE FROM mappings WHERE repository = ?1 AND hub = ?2",
                params![repository, hub],
            )?;

            {
                let mut insert = tx.prepare(
                    "INSERT INTO mappings (repository, hub, position, rule) VALUES (?1, ?2, ?3, ?4)",
                )?;
                for (position, rule) in rules.iter().enumerate() {
                    let rule = serde_json::to_string(rule)?;
                    insert.execute(params![repository, hub, position as i64, rule])?;
                }
            }

            tx.commit()?;
            info!(%repository, %hub, rules = rules.len(), "Saved mappings");
            Ok(())
        })
        .await
    }

    async fn versions(&self, repository: &str, hub: &str) -> StorageResult<Vec<HubVersion>> {
        let repository = repository.to_string();
        let hub = hub.to_string();

        self.run(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT repository, hub, stage, version, operation, username, created_at, current, previous
                 FROM hub_versions
                 WHERE repository = ?1 AND hub = ?2
                 ORDER BY id DESC",
            )?;

            let rows = stmt
                .query_map(params![repository, hub], |row| {
                    Ok(LedgerRow {
                        repository: row.get(0)?,
                        hub: row.get(1)?,
                        stage: row.get(2)?,
                        version: row.get(3)?,
                        operation: row.get(4)?,
                        username: row.get(5)?,
                        created_at: row.get(6)?,
                        current: row.get(7)?,
                        previous: row.get(8)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;

            rows.into_iter().map(LedgerRow::into_version).collect()
        })
        .await
    }

    async fn active_hubs(&self, repository: &str) -> StorageResult<Vec<String>> {
        let repository = repository.to_string();

        self.run(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT name FROM hubs WHERE repository = ?1 AND active = 1 ORDER BY name",
            )?;
            let hubs = stmt
                .query_map([&repository], |row| row.get(0))?
                .collect::<Result<Vec<String>, _>>()?;
            Ok(hubs)
        })
        .await
    }

    async fn set_hub_active(
        &self,
        repository: &str,
        hub: &str,
        active: bool,
    ) -> StorageResult<()> {
        let repository = repository.to_string();
        let hub = hub.to_string();

        self.run(move |conn| {
            conn.execute(
                "INSERT INTO hubs (repository, name, active) VALUES (?1, ?2, ?3)
                 ON CONFLICT(repository, name) DO UPDATE SET active = excluded.active",
                params![repository, hub, active],
            )?;
            info!(%repository, %hub, active, "Updated hub state");
            Ok(())
        })
        .await
    }
}

fn parse_record(text: &str) -> SqliteResult<Record> {
    Ok(serde_json::from_str(text)?)
}

fn duplicate_key(err: rusqlite::Error, key: &str) -> SqliteError {
    match err.sqlite_error_code() {
        Some(rusqlite::ErrorCode::ConstraintViolation) => {
            SqliteError::InvalidOperation(format!("duplicate dataset key {key} in batch"))
        }
        _ => err.into(),
    }
}

fn next_hub_version(conn: &Connection, repository: &str, hub: &str, stage: Stage) -> SqliteResult<u64> {
    let max: Option<i64> = conn.query_row(
        "SELECT MAX(version) FROM hub_versions
         WHERE repository = ?1 AND hub = ?2 AND stage = ?3",
        params![repository, hub, stage.as_str()],
        |row| row.get(0),
    )?;
    Ok(max.unwrap_or(0) as u64 + 1)
}

struct LedgerEntry<'a> {
    repository: &'a str,
    hub: &'a str,
    stage: Stage,
    version: u64,
    operation: Operation,
    username: &'a str,
    created_at: &'a str,
}

/// Append a ledger entry, moving the current/previous flags along
fn append_ledger(conn: &Connection, entry: LedgerEntry<'_>) -> SqliteResult<()> {
    conn.execute(
        "UPDATE hub_versions SET previous = 0
         WHERE repository = ?1 AND hub = ?2 AND stage = ?3 AND previous = 1",
        params![entry.repository, entry.hub, entry.stage.as_str()],
    )?;
    conn.execute(
        "UPDATE hub_versions SET current = 0, previous = 1
         WHERE repository = ?1 AND hub = ?2 AND stage = ?3 AND current = 1",
        params![entry.repository, entry.hub, entry.stage.as_str()],
    )?;
    conn.execute(
        "INSERT INTO hub_versions
            (repository, hub, stage, version, operation, username, created_at, current, previous)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1, 0)",
        params![
            entry.repository,
            entry.hub,
            entry.stage.as_str(),
            entry.version as i64,
            entry.operation.as_str(),
            entry.username,
            entry.created_at,
        ],
    )?;
    Ok(())
}

struct LedgerRow {
    repository: String,
    hub: String,
    stage: String,
    version: i64,
    operation: String,
    username: String,
    created_at: String,
    current: bool,
    previous: bool,
}

impl LedgerRow {
    fn into_version(self) -> SqliteResult<HubVersion> {
        let stage = Stage::parse(&self.stage)
            .ok_or_else(|| SqliteError::InvalidValue(format!("stage {}", self.stage)))?;
        let operation = Operation::parse(&self.operation)
            .ok_or_else(|| SqliteError::InvalidValue(format!("operation {}", self.operation)))?;
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(|e| SqliteError::InvalidValue(format!("timestamp {}: {}", self.created_at, e)))?
            .with_timezone(&Utc);

        Ok(HubVersion {
            repository: self.repository,
            hub: self.hub,
            stage,
            version: self.version as u64,
            operation,
            username: self.username,
            created_at,
            current: self.current,
            previous: self.previous,
        })
    }
}
