//! HttpJsonFetcher against a mock upstream

use hubcat_core::IngestionError;
use hubcat_pipeline::{extract_datasets, DocumentFetcher, HttpJsonFetcher};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn fetches_and_extracts_keyed_collection() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/release.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"release": "2024-07", "datasets": {"d1": {"title": "lung"}, "d2": {"title": "liver"}}}"#,
        ))
        .mount(&server)
        .await;

    let fetcher = HttpJsonFetcher::new(Some(Duration::from_secs(5))).unwrap();
    let documents = fetcher
        .fetch(&format!("{}/release.json", server.uri()))
        .await
        .unwrap();
    let datasets = extract_datasets(documents, Some("/datasets"), None).unwrap();

    assert_eq!(datasets.len(), 2);
    assert_eq!(datasets[0].key, "d1");
    assert_eq!(datasets[1].content["title"], json!("liver"));
}

#[tokio::test]
async fn reads_json_lines() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/lines"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("{\"title\": \"a\"}\n{\"title\": \"b\"}\n"),
        )
        .mount(&server)
        .await;

    let fetcher = HttpJsonFetcher::new(None).unwrap();
    let documents = fetcher
        .fetch(&format!("{}/lines", server.uri()))
        .await
        .unwrap();

    assert_eq!(documents, vec![json!({"title": "a"}), json!({"title": "b"})]);
}

#[tokio::test]
async fn server_errors_are_fetch_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = HttpJsonFetcher::new(None).unwrap();
    let url = format!("{}/broken", server.uri());
    let err = fetcher.fetch(&url).await.unwrap_err();

    match err {
        IngestionError::Fetch { url: failed, message } => {
            assert_eq!(failed, url);
            assert!(message.contains("503"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn invalid_json_is_a_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/html"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .mount(&server)
        .await;

    let fetcher = HttpJsonFetcher::new(None).unwrap();
    let err = fetcher
        .fetch(&format!("{}/html", server.uri()))
        .await
        .unwrap_err();

    assert!(matches!(err, IngestionError::Parse(_)));
}
