//! Integration tests for versioned storage and search
//!
//! Runs the stores against a file-backed database with the full schema.

mod common;

use common::{record, seed, test_db};
use hubcat_config::{MetamodelConfig, QueryConfig};
use hubcat_core::{
    AttributePath, ContentStage, DatasetStore, ExecutionError, MetamodelSource, MetamodelStore,
    SearchExecutor, SearchService,
};
use hubcat_query::{JoinTermRewriter, RewrittenQuery};
use serde_json::json;
use std::sync::Arc;
use test_case::test_case;

fn rewrite(query: &str) -> RewrittenQuery {
    JoinTermRewriter::new(&QueryConfig::default())
        .unwrap()
        .rewrite(query)
        .unwrap()
}

#[tokio::test]
async fn crawling_twice_keeps_both_raw_versions() {
    let db = test_db();
    seed(&db, "r", "h", vec![("k", json!({"title": "first"}))]).await;
    seed(&db, "r", "h", vec![("k", json!({"title": "second"}))]).await;

    let latest = db.store.latest_raw("r", "h").await.unwrap();
    assert_eq!(latest.len(), 1);
    let id = latest[0].dataset_id;

    let first = db.store.fetch(id, Some(1)).await.unwrap().unwrap();
    let second = db.store.fetch(id, Some(2)).await.unwrap().unwrap();
    let newest = db.store.fetch(id, None).await.unwrap().unwrap();

    assert_eq!(first.curated_content, record(json!({"title": "first"})));
    assert_eq!(second.curated_content, record(json!({"title": "second"})));
    assert_eq!(newest, second);
    assert_eq!(newest.curated_version, newest.raw_version);
    assert!(db.store.fetch(id, Some(3)).await.unwrap().is_none());
}

#[tokio::test]
async fn hub_versions_are_independent() {
    let db = test_db();
    seed(&db, "r", "a", vec![("k", json!({}))]).await;
    seed(&db, "r", "a", vec![("k", json!({}))]).await;
    let summary = db
        .store
        .append_raw(common::raw_batch("r", "b", vec![("k", json!({}))]))
        .await
        .unwrap();

    assert_eq!(summary.version, 1);
}

#[tokio::test]
async fn latest_contents_span_hubs() {
    let db = test_db();
    seed(&db, "r", "a", vec![("1", json!({"x": 1}))]).await;
    seed(&db, "r", "b", vec![("1", json!({"y": 2}))]).await;
    seed(&db, "other", "a", vec![("1", json!({"z": 3}))]).await;

    let curated = db.store.latest_contents("r", ContentStage::Curated).await.unwrap();
    assert_eq!(curated, vec![record(json!({"x": 1})), record(json!({"y": 2}))]);

    let standard = db.store.latest_contents("r", ContentStage::Standard).await.unwrap();
    assert!(standard.is_empty());
}

#[tokio::test]
async fn metamodel_reads_through_the_store() {
    let db = test_db();
    seed(
        &db,
        "Demo",
        "h",
        vec![("1", json!({"a": {"b": ["x", "y"]}, "link": "https://example.org"}))],
    )
    .await;

    let metamodel = MetamodelStore::new(Arc::new(db.store.clone()), MetamodelConfig::default());
    let flat = metamodel.get_flat("Demo", true).await.unwrap();

    let values = flat.values(&AttributePath::new(["a", "b"])).unwrap();
    assert_eq!(values.iter().collect::<Vec<_>>(), vec!["x", "y"]);
    assert!(flat.values(&AttributePath::new(["link"])).unwrap().is_empty());

    let fetched = db.store.latest_raw("Demo", "h").await.unwrap();
    assert_eq!(fetched[0].content["link"], json!("https://example.org"));
}

async fn seed_samples(db: &common::TestDb) {
    seed(
        db,
        "r",
        "h",
        vec![
            (
                "1",
                json!({"title": "lung", "samples": [
                    {"donor": "D1", "sex": "female", "files": [{"name": "a.bam"}]},
                    {"donor": "D2", "sex": "male"}
                ]}),
            ),
            (
                "2",
                json!({"title": "liver", "samples": [
                    {"donor": "D1", "sex": "male", "files": [{"name": "b.bam"}]}
                ]}),
            ),
            ("3", json!({"title": "heart"})),
        ],
    )
    .await;
}

#[test_case("curated_content->>'title' = 'heart'", &[3] ; "plain attribute")]
#[test_case("curated_content->'samples'->*->>'donor' = 'D1'", &[1, 2] ; "array attribute")]
#[test_case(
    "curated_content->'samples'->*->>'donor' = 'D1' AND curated_content->'samples'->*->>'sex' = 'female'",
    &[1] ; "conditions on one element"
)]
#[test_case(
    "curated_content->'samples'->*->'files'->*->>'name' = 'b.bam'",
    &[2] ; "nested arrays"
)]
#[test_case(
    "curated_content->'samples'->*->>'donor' = 'D2' OR curated_content->>'title' = 'heart'",
    &[1, 3] ; "missing array still matches other branch"
)]
#[test_case("curated_content->>'title' = 'kidney'", &[] ; "no match")]
#[tokio::test]
async fn search_with_join_terms(query: &str, expected: &[i64]) {
    let db = test_db();
    seed_samples(&db).await;

    let results = db.executor.execute("r", &rewrite(query), 0).await.unwrap();
    let ids: Vec<i64> = results.iter().map(|d| d.id).collect();

    assert_eq!(ids, expected);
}

#[tokio::test]
async fn search_orders_by_id_and_limits() {
    let db = test_db();
    seed_samples(&db).await;

    let query = rewrite("curated_content->>'title' IS NOT NULL");
    let all = db.executor.execute("r", &query, 0).await.unwrap();
    let limited = db.executor.execute("r", &query, 2).await.unwrap();

    assert_eq!(all.iter().map(|d| d.id).collect::<Vec<_>>(), vec![1, 2, 3]);
    assert_eq!(limited.iter().map(|d| d.id).collect::<Vec<_>>(), vec![1, 2]);
}

#[tokio::test]
async fn search_is_scoped_to_repository() {
    let db = test_db();
    seed_samples(&db).await;
    seed(&db, "other", "h", vec![("1", json!({"title": "heart"}))]).await;

    let results = db
        .executor
        .execute("other", &rewrite("curated_content->>'title' = 'heart'"), 0)
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].repository, "other");
}

#[tokio::test]
async fn predicate_cannot_reach_other_repositories() {
    let db = test_db();
    seed(&db, "mine", "h", vec![("1", json!({"title": "a"}))]).await;
    seed(&db, "secret", "h", vec![("1", json!({"title": "b"}))]).await;

    let err = db
        .executor
        .execute("mine", &rewrite("1=0) OR (1=1"), 0)
        .await
        .unwrap_err();
    assert_eq!(err, ExecutionError::UnbalancedPredicate { position: 3 });

    let union = format!(
        "1=0) UNION SELECT {} FROM latest_datasets WHERE (1=1",
        "id, repository, hub, raw_version, curated_version, curated_content, \
         standard_version, standard_content"
    );
    assert!(db.executor.execute("mine", &rewrite(&union), 0).await.is_err());

    let service =
        SearchService::new(&QueryConfig::default(), Arc::new(db.executor.clone())).unwrap();
    assert!(service.search("mine", "1=0) OR (1=1", 0).await.unwrap().is_empty());
}

#[tokio::test]
async fn predicate_only_sees_rows_of_the_searched_repository() {
    let db = test_db();
    seed(&db, "mine", "h", vec![("1", json!({"title": "a"}))]).await;
    seed(&db, "secret", "h", vec![("1", json!({"title": "b"}))]).await;

    let results = db
        .executor
        .execute("mine", &rewrite("latest_datasets.repository = 'secret' OR 1=1"), 0)
        .await
        .unwrap();

    let repositories: Vec<&str> = results.iter().map(|d| d.repository.as_str()).collect();
    assert_eq!(repositories, vec!["mine"]);
}

#[tokio::test]
async fn stacked_statements_are_refused() {
    let db = test_db();
    seed_samples(&db).await;

    let query = RewrittenQuery {
        predicate: "1 = 1); DELETE FROM hubs; SELECT (1".to_string(),
        joins: vec![],
    };
    let err = db.executor.execute("r", &query, 0).await.unwrap_err();

    assert_eq!(err, ExecutionError::MultipleStatements);
    assert_eq!(db.store.latest_raw("r", "h").await.unwrap().len(), 3);
}

#[tokio::test]
async fn engine_failures_surface_as_empty_results() {
    let db = test_db();
    seed_samples(&db).await;

    let service =
        SearchService::new(&QueryConfig::default(), Arc::new(db.executor.clone())).unwrap();

    let results = service.search("r", "no_such_column = 1", 0).await.unwrap();
    assert!(results.is_empty());
    assert!(service.try_search("r", "no_such_column = 1", 0).await.is_err());
}
