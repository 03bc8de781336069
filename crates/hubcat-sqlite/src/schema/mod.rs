//! Schema management and migrations

use crate::error::{SqliteError, SqliteResult};
use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info};

/// Schema version - increment when making schema changes
const SCHEMA_VERSION: i32 = 1;

/// Apply all pending migrations
pub fn apply_migrations(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    let current_version = current_version(conn)?;
    debug!(current_version, target_version = SCHEMA_VERSION, "Checking migrations");

    if current_version < 1 {
        info!(
            from = current_version,
            to = SCHEMA_VERSION,
            "Applying schema migrations"
        );
        apply_migration_v1(conn)?;
    }

    Ok(())
}

pub fn current_version(conn: &Connection) -> SqliteResult<i32> {
    let version: Option<i32> = conn
        .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
            row.get(0)
        })
        .optional()?
        .flatten();

    Ok(version.unwrap_or(0))
}

fn record_migration(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute(
        "INSERT INTO schema_migrations (version) VALUES (?)",
        [version],
    )?;
    Ok(())
}

/// Migration v1: versioned records, hub ledger, mappings
fn apply_migration_v1(conn: &Connection) -> SqliteResult<()> {
    debug!("Applying migration v1: versioned dataset schema");

    conn.execute_batch(SCHEMA_V1)
        .map_err(|e| SqliteError::Schema(format!("Failed to apply v1 schema: {}", e)))?;

    record_migration(conn, 1)?;
    info!("Migration v1 applied successfully");
    Ok(())
}

const SCHEMA_V1: &str = r#"
-- ============================================================================
-- TABLE: hubs
-- ============================================================================
-- Known hubs per repository and whether they take part in crawl_active

CREATE TABLE IF NOT EXISTS hubs (
    repository TEXT NOT NULL,
    name TEXT NOT NULL,
    active INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (repository, name)
);

-- ============================================================================
-- TABLE: datasets
-- ============================================================================
-- Stable dataset identity; content lives in the versioned tables

CREATE TABLE IF NOT EXISTS datasets (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    repository TEXT NOT NULL,
    hub TEXT NOT NULL,
    dataset_key TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE (repository, hub, dataset_key)
);

CREATE INDEX IF NOT EXISTS idx_datasets_repository ON datasets(repository, hub);

-- ============================================================================
-- TABLE: raw_records
-- ============================================================================
-- Append-only raw content. Curated content is the raw content.

CREATE TABLE IF NOT EXISTS raw_records (
    dataset_id INTEGER NOT NULL REFERENCES datasets(id),
    version INTEGER NOT NULL,
    content TEXT NOT NULL CHECK (json_valid(content)),
    created_at TEXT NOT NULL,
    PRIMARY KEY (dataset_id, version)
);

-- ============================================================================
-- TABLE: standard_records
-- ============================================================================
-- Append-only mapped content, versioned per dataset

CREATE TABLE IF NOT EXISTS standard_records (
    dataset_id INTEGER NOT NULL REFERENCES datasets(id),
    version INTEGER NOT NULL,
    raw_version INTEGER NOT NULL,
    content TEXT NOT NULL CHECK (json_valid(content)),
    created_at TEXT NOT NULL,
    PRIMARY KEY (dataset_id, version),
    FOREIGN KEY (dataset_id, raw_version) REFERENCES raw_records(dataset_id, version)
);

-- ============================================================================
-- TABLE: hub_versions
-- ============================================================================
-- Ledger of committed pipeline runs per stage

CREATE TABLE IF NOT EXISTS hub_versions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    repository TEXT NOT NULL,
    hub TEXT NOT NULL,
    stage TEXT NOT NULL CHECK (stage IN ('RAW', 'CURATED', 'STANDARD')),
    version INTEGER NOT NULL,
    operation TEXT NOT NULL CHECK (operation IN ('CRAWLING', 'MAPPING')),
    username TEXT NOT NULL,
    created_at TEXT NOT NULL,
    current INTEGER NOT NULL DEFAULT 0,
    previous INTEGER NOT NULL DEFAULT 0,
    UNIQUE (repository, hub, stage, version)
);

-- ============================================================================
-- TABLE: mappings
-- ============================================================================
-- Mapping rules per hub, stored as JSON

CREATE TABLE IF NOT EXISTS mappings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    repository TEXT NOT NULL,
    hub TEXT NOT NULL,
    position INTEGER NOT NULL,
    rule TEXT NOT NULL CHECK (json_valid(rule)),
    UNIQUE (repository, hub, position)
);

-- ============================================================================
-- VIEW: latest_datasets
-- ============================================================================
-- Latest raw version of every dataset with its newest standardized content

CREATE VIEW IF NOT EXISTS latest_datasets AS
SELECT
    d.id AS id,
    d.repository AS repository,
    d.hub AS hub,
    r.version AS raw_version,
    r.version AS curated_version,
    r.content AS curated_content,
    s.version AS standard_version,
    s.content AS standard_content
FROM datasets d
JOIN raw_records r
    ON r.dataset_id = d.id
    AND r.version = (SELECT MAX(version) FROM raw_records WHERE dataset_id = d.id)
LEFT JOIN standard_records s
    ON s.dataset_id = d.id
    AND s.version = (SELECT MAX(version) FROM standard_records WHERE dataset_id = d.id);
"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn names(conn: &Connection, kind: &str) -> Vec<String> {
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = ?1 ORDER BY name")
            .unwrap();
        let rows = stmt.query_map([kind], |row| row.get(0)).unwrap();
        rows.filter_map(Result::ok).collect()
    }

    #[test]
    fn test_schema_applied() {
        let conn = Connection::open_in_memory().unwrap();
        apply_migrations(&conn).unwrap();

        let tables = names(&conn, "table");
        for table in ["datasets", "hub_versions", "hubs", "mappings", "raw_records", "standard_records"] {
            assert!(tables.contains(&table.to_string()), "missing {table}");
        }
        assert_eq!(names(&conn, "view"), vec!["latest_datasets"]);
        assert_eq!(current_version(&conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        apply_migrations(&conn).unwrap();
        apply_migrations(&conn).unwrap();

        let applied: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(applied, 1);
    }
}
