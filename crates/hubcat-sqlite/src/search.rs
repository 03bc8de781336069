//! Search over the latest version of every dataset.
//!
//! A rewritten query becomes one SELECT against `latest_datasets`, narrowed to
//! the searched repository before the predicate sees any row. Every join
//! clause unnests a JSON array with `json_each`; a LEFT JOIN keeps datasets
//! whose array is missing so that other branches of an OR can still match.
//!
//! ```sql
//! SELECT DISTINCT latest_datasets.id, ...
//! FROM (SELECT * FROM latest_datasets WHERE repository = :repository) AS latest_datasets
//! LEFT JOIN json_each(curated_content->'samples') AS joinTerm0 ON 1
//! WHERE (joinTerm0.value->>'donor' = 'D1')
//! ORDER BY latest_datasets.id ASC
//! LIMIT :limit
//! ```

use crate::connection::SqlitePool;
use crate::error::{SqliteError, SqliteResult};
use async_trait::async_trait;
use hubcat_core::{Dataset, ExecutionError, Record, SearchExecutor};
use hubcat_query::RewrittenQuery;
use rusqlite::named_params;
use tracing::debug;

const COLUMNS: &str = "latest_datasets.id, latest_datasets.repository, latest_datasets.hub, \
     latest_datasets.raw_version, latest_datasets.curated_version, \
     latest_datasets.curated_content, latest_datasets.standard_version, \
     latest_datasets.standard_content";

/// SQLite implementation of [`SearchExecutor`]
#[derive(Clone)]
pub struct SqliteSearchExecutor {
    pool: SqlitePool,
}

impl SqliteSearchExecutor {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// SQL for a rewritten query, with `:repository` and `:limit` parameters
pub fn build_statement(query: &RewrittenQuery) -> String {
    let mut sql = format!(
        "SELECT DISTINCT {COLUMNS}\nFROM (SELECT * FROM latest_datasets WHERE repository = :repository) \
         AS latest_datasets"
    );
    for join in &query.joins {
        sql.push_str(&format!(
            "\nLEFT JOIN json_each({}) AS {} ON 1",
            join.source, join.alias
        ));
    }
    sql.push_str(&format!(
        "\nWHERE ({})\
         \nORDER BY latest_datasets.id ASC\nLIMIT :limit",
        query.predicate
    ));
    sql
}

/// Fails when the predicate closes a parenthesis it did not open, which would
/// let it append clauses after the WHERE group (`1=0) UNION SELECT ...`).
///
/// Literals, quoted identifiers and comments are skipped the way SQLite's
/// tokenizer skips them.
pub fn check_predicate(predicate: &str) -> SqliteResult<()> {
    let bytes = predicate.as_bytes();
    let mut depth: usize = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            quote @ (b'\'' | b'"' | b'`') => i = skip_quoted(bytes, i + 1, quote),
            b'[' => i = skip_until(bytes, i + 1, b"]"),
            b'-' if bytes.get(i + 1) == Some(&b'-') => i = skip_until(bytes, i + 2, b"\n"),
            b'/' if bytes.get(i + 1) == Some(&b'*') => i = skip_until(bytes, i + 2, b"*/"),
            b'(' => {
                depth += 1;
                i += 1;
            }
            b')' => {
                if depth == 0 {
                    return Err(SqliteError::UnbalancedPredicate { position: i });
                }
                depth -= 1;
                i += 1;
            }
            _ => i += 1,
        }
    }
    Ok(())
}

/// Index after the closing `quote`; a doubled quote is an escaped one
fn skip_quoted(bytes: &[u8], mut i: usize, quote: u8) -> usize {
    while i < bytes.len() {
        if bytes[i] == quote {
            if bytes.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    i
}

/// Index after the next `end`, or the end of input
fn skip_until(bytes: &[u8], start: usize, end: &[u8]) -> usize {
    bytes[start.min(bytes.len())..]
        .windows(end.len())
        .position(|window| window == end)
        .map_or(bytes.len(), |offset| start + offset + end.len())
}

/// SQLite reads a negative limit as no limit
fn sql_limit(limit: usize) -> i64 {
    if limit == 0 {
        -1
    } else {
        i64::try_from(limit).unwrap_or(i64::MAX)
    }
}

#[async_trait]
impl SearchExecutor for SqliteSearchExecutor {
    async fn execute(
        &self,
        repository: &str,
        query: &RewrittenQuery,
        limit: usize,
    ) -> Result<Vec<Dataset>, ExecutionError> {
        let pool = self.pool.clone();
        let repository = repository.to_string();
        let sql = build_statement(query);
        let predicate = query.predicate.clone();

        tokio::task::spawn_blocking(move || {
            pool.with_read_connection(|conn| {
                let mut stmt = conn.prepare(&sql)?;
                if !stmt.readonly() {
                    return Err(SqliteError::NotReadOnly);
                }
                check_predicate(&predicate)?;
                debug!(%repository, %sql, "Running search");

                let rows = stmt
                    .query_map(
                        named_params! {
                            ":repository": repository,
                            ":limit": sql_limit(limit),
                        },
                        |row| {
                            Ok(SearchRow {
                                id: row.get(0)?,
                                repository: row.get(1)?,
                                hub: row.get(2)?,
                                raw_version: row.get(3)?,
                                curated_version: row.get(4)?,
                                curated_content: row.get(5)?,
                                standard_version: row.get(6)?,
                                standard_content: row.get(7)?,
                            })
                        },
                    )?
                    .collect::<Result<Vec<_>, _>>()?;

                rows.into_iter().map(SearchRow::into_dataset).collect()
            })
        })
        .await
        .map_err(|e| ExecutionError::backend(e.to_string()))?
        .map_err(Into::into)
    }
}

struct SearchRow {
    id: i64,
    repository: String,
    hub: String,
    raw_version: i64,
    curated_version: i64,
    curated_content: String,
    standard_version: Option<i64>,
    standard_content: Option<String>,
}

impl SearchRow {
    fn into_dataset(self) -> SqliteResult<Dataset> {
        let curated_content: Record = serde_json::from_str(&self.curated_content)?;
        let standard_content = self
            .standard_content
            .as_deref()
            .map(serde_json::from_str::<Record>)
            .transpose()?;

        Ok(Dataset {
            id: self.id,
            repository: self.repository,
            hub: self.hub,
            raw_version: self.raw_version as u64,
            curated_version: self.curated_version as u64,
            curated_content,
            standard_version: self.standard_version.map(|v| v as u64),
            standard_content,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hubcat_query::JoinClause;
    use test_case::test_case;

    #[test]
    fn test_statement_without_joins() {
        let sql = build_statement(&RewrittenQuery {
            predicate: "curated_content->>'a' = 'x'".to_string(),
            joins: vec![],
        });

        assert!(sql.starts_with("SELECT DISTINCT latest_datasets.id"));
        assert!(!sql.contains("json_each"));
        assert!(sql.contains("WHERE repository = :repository) AS latest_datasets"));
        assert!(sql.contains("\nWHERE (curated_content->>'a' = 'x')"));
        assert!(sql.ends_with("ORDER BY latest_datasets.id ASC\nLIMIT :limit"));
    }

    #[test]
    fn test_statement_unnests_every_join() {
        let sql = build_statement(&RewrittenQuery {
            predicate: "joinTerm1.value->>'name' = 'x.bam'".to_string(),
            joins: vec![
                JoinClause {
                    source: "curated_content->'samples'".to_string(),
                    alias: "joinTerm0".to_string(),
                },
                JoinClause {
                    source: "joinTerm0.value->'files'".to_string(),
                    alias: "joinTerm1".to_string(),
                },
            ],
        });

        assert!(sql.contains("LEFT JOIN json_each(curated_content->'samples') AS joinTerm0 ON 1"));
        assert!(sql.contains("LEFT JOIN json_each(joinTerm0.value->'files') AS joinTerm1 ON 1"));
    }

    #[test_case("curated_content->>'a' = 'x'" ; "plain")]
    #[test_case("(a = 1) OR (b = 2)" ; "nested groups")]
    #[test_case("curated_content->>'a' = ')'" ; "parenthesis in literal")]
    #[test_case("\"a)\" = 1" ; "parenthesis in identifier")]
    #[test_case("a = 'it''s)'" ; "escaped quote")]
    fn test_contained_predicates(predicate: &str) {
        assert!(check_predicate(predicate).is_ok());
    }

    #[test_case("1=0) OR (1=1", 3 ; "closes the where group")]
    #[test_case("/*(*/ 1=0) OR (1=1", 9 ; "opening hidden in comment")]
    #[test_case("a = '(' ) UNION SELECT (1", 8 ; "opening hidden in literal")]
    fn test_escaping_predicates(predicate: &str, position: usize) {
        match check_predicate(predicate) {
            Err(SqliteError::UnbalancedPredicate { position: found }) => {
                assert_eq!(found, position)
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_zero_limit_is_unbounded() {
        assert_eq!(sql_limit(0), -1);
        assert_eq!(sql_limit(25), 25);
    }
}
