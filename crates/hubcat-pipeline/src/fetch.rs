//! Upstream JSON sources
//!
//! A hub's URL returns one or more top-level JSON values. [`DocumentFetcher`]
//! only moves bytes; [`extract_datasets`] turns the documents into keyed
//! dataset records.

use async_trait::async_trait;
use hubcat_core::record::scalar_text;
use hubcat_core::{AttributePath, IngestionError, RawDataset, Record};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Fetches the JSON documents published at a URL
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<Value>, IngestionError>;
}

/// HTTP(S) fetcher built on a shared `reqwest` client
///
/// Failures are reported once; retrying is left to whoever schedules crawls.
#[derive(Clone)]
pub struct HttpJsonFetcher {
    client: reqwest::Client,
}

impl HttpJsonFetcher {
    pub fn new(timeout: Option<Duration>) -> Result<Self, IngestionError> {
        let mut builder = reqwest::Client::builder().user_agent(concat!(
            "hubcat/",
            env!("CARGO_PKG_VERSION")
        ));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| IngestionError::Fetch {
            url: String::new(),
            message: format!("failed to build HTTP client: {e}"),
        })?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DocumentFetcher for HttpJsonFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<Value>, IngestionError> {
        let fetch_error = |e: reqwest::Error| IngestionError::Fetch {
            url: url.to_string(),
            message: e.to_string(),
        };

        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(fetch_error)?
            .error_for_status()
            .map_err(fetch_error)?;
        let body = response.text().await.map_err(fetch_error)?;
        debug!(%url, bytes = body.len(), "Fetched upstream document");

        parse_documents(&body)
    }
}

/// Parse a body holding one or more concatenated JSON values
pub fn parse_documents(body: &str) -> Result<Vec<Value>, IngestionError> {
    let documents = serde_json::Deserializer::from_str(body)
        .into_iter::<Value>()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| IngestionError::Parse(e.to_string()))?;

    if documents.is_empty() {
        return Err(IngestionError::Parse("empty document".to_string()));
    }
    Ok(documents)
}

/// Turn fetched documents into keyed datasets
///
/// With a `pointer`, the value it addresses in each document is the dataset
/// collection: an object is read as `id -> dataset`, an array as a list.
/// Without one, a top-level array is a list and a top-level object is a
/// single dataset. Keys come from `id_attribute` when configured, otherwise
/// from the object key or the running position.
pub fn extract_datasets(
    documents: Vec<Value>,
    pointer: Option<&str>,
    id_attribute: Option<&AttributePath>,
) -> Result<Vec<RawDataset>, IngestionError> {
    let mut candidates: Vec<(Option<String>, Value)> = Vec::new();

    for document in documents {
        match pointer {
            Some(pointer) => {
                let mut document = document;
                let collection = document
                    .pointer_mut(pointer)
                    .map(Value::take)
                    .ok_or_else(|| {
                        IngestionError::Parse(format!("no value at pointer {pointer}"))
                    })?;
                match collection {
                    Value::Object(map) => {
                        candidates.extend(map.into_iter().map(|(k, v)| (Some(k), v)))
                    }
                    Value::Array(items) => candidates.extend(items.into_iter().map(|v| (None, v))),
                    other => {
                        return Err(IngestionError::Parse(format!(
                            "value at pointer {pointer} is not a collection: {}",
                            kind_of(&other)
                        )))
                    }
                }
            }
            None => match document {
                Value::Array(items) => candidates.extend(items.into_iter().map(|v| (None, v))),
                other => candidates.push((None, other)),
            },
        }
    }

    candidates
        .into_iter()
        .enumerate()
        .map(|(position, (object_key, value))| {
            let content = match value {
                Value::Object(content) => content,
                other => {
                    return Err(IngestionError::Parse(format!(
                        "dataset {position} is not an object: {}",
                        kind_of(&other)
                    )))
                }
            };
            let key = match id_attribute {
                Some(attribute) => identity(&content, attribute).ok_or_else(|| {
                    IngestionError::Parse(format!(
                        "dataset {position} has no scalar value at {}",
                        attribute.join("/")
                    ))
                })?,
                None => object_key.unwrap_or_else(|| position.to_string()),
            };
            Ok(RawDataset { key, content })
        })
        .collect()
}

fn identity(content: &Record, attribute: &AttributePath) -> Option<String> {
    let (first, rest) = attribute.segments().split_first()?;
    let mut value = content.get(first)?;
    for segment in rest {
        value = value.as_object()?.get(segment)?;
    }
    scalar_text(value)
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn keys(datasets: &[RawDataset]) -> Vec<&str> {
        datasets.iter().map(|d| d.key.as_str()).collect()
    }

    #[test]
    fn test_concatenated_values() {
        let documents = parse_documents("{\"a\": 1}\n{\"a\": 2}\n").unwrap();
        assert_eq!(documents, vec![json!({"a": 1}), json!({"a": 2})]);

        let datasets = extract_datasets(documents, None, None).unwrap();
        assert_eq!(keys(&datasets), vec!["0", "1"]);
    }

    #[test]
    fn test_empty_body_is_a_parse_error() {
        assert!(matches!(parse_documents("  "), Err(IngestionError::Parse(_))));
        assert!(matches!(parse_documents("{\"a\":"), Err(IngestionError::Parse(_))));
    }

    #[test]
    fn test_pointer_to_keyed_object() {
        let document = json!({"data": {"x1": {"title": "a"}, "x2": {"title": "b"}}});
        let datasets = extract_datasets(vec![document], Some("/data"), None).unwrap();

        assert_eq!(keys(&datasets), vec!["x1", "x2"]);
        assert_eq!(datasets[1].content["title"], json!("b"));
    }

    #[test]
    fn test_id_attribute_overrides_position() {
        let document = json!([
            {"meta": {"id": "abc"}, "title": "a"},
            {"meta": {"id": 7}, "title": "b"}
        ]);
        let id = AttributePath::new(["meta", "id"]);
        let datasets = extract_datasets(vec![document], None, Some(&id)).unwrap();

        assert_eq!(keys(&datasets), vec!["abc", "7"]);
    }

    #[test]
    fn test_missing_identity_is_rejected() {
        let id = AttributePath::new(["id"]);
        let err = extract_datasets(vec![json!([{"title": "a"}])], None, Some(&id)).unwrap_err();
        assert!(err.to_string().contains("dataset 0"));
    }

    #[test]
    fn test_non_object_dataset_is_rejected() {
        let err = extract_datasets(vec![json!([{"a": 1}, "oops"])], None, None).unwrap_err();
        assert!(matches!(err, IngestionError::Parse(msg) if msg.contains("string")));
    }

    #[test]
    fn test_missing_pointer_is_rejected() {
        let err = extract_datasets(vec![json!({"data": []})], Some("/items"), None).unwrap_err();
        assert!(matches!(err, IngestionError::Parse(_)));
    }
}
