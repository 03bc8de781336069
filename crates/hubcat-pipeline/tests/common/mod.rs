//! Shared setup for pipeline integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use hubcat_config::{HubConfig, HubcatConfig, RepositoryConfig};
use hubcat_core::{
    IngestionError, MappingError, MetamodelStore, ReloadEvent, ReloadEventBus, ReloadListener,
};
use hubcat_pipeline::{DocumentFetcher, PipelineManager, ScriptEngine};
use hubcat_sqlite::{SqliteDatasetStore, SqlitePool};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One canned answer of [`FakeFetcher`]
pub enum Reply {
    Documents(Vec<Value>),
    Fail(String),
    Slow(Duration, Vec<Value>),
}

/// Fetcher answering from a queue and tracking overlapping calls
#[derive(Default)]
pub struct FakeFetcher {
    replies: Mutex<VecDeque<Reply>>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub calls: AtomicUsize,
}

impl FakeFetcher {
    pub fn push(&self, reply: Reply) {
        self.replies.lock().unwrap().push_back(reply);
    }
}

#[async_trait]
impl DocumentFetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<Value>, IngestionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let reply = self.replies.lock().unwrap().pop_front();
        let result = match reply {
            Some(Reply::Documents(documents)) => Ok(documents),
            Some(Reply::Slow(delay, documents)) => {
                tokio::time::sleep(delay).await;
                Ok(documents)
            }
            Some(Reply::Fail(message)) => Err(IngestionError::Fetch {
                url: url.to_string(),
                message,
            }),
            None => Err(IngestionError::Fetch {
                url: url.to_string(),
                message: "no reply queued".to_string(),
            }),
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

type ScriptFn = dyn Fn(&str) -> Result<String, MappingError> + Send + Sync;

/// Script engine for language `test` backed by a closure
pub struct FakeScripts {
    script: Box<ScriptFn>,
}

impl FakeScripts {
    pub fn new(script: impl Fn(&str) -> Result<String, MappingError> + Send + Sync + 'static) -> Self {
        Self {
            script: Box::new(script),
        }
    }
}

#[async_trait]
impl ScriptEngine for FakeScripts {
    fn supports(&self, language: &str) -> bool {
        language == "test"
    }

    async fn run(&self, _language: &str, _script: &str, input: &str) -> Result<String, MappingError> {
        (self.script)(input)
    }
}

#[derive(Default)]
pub struct EventLog {
    pub events: Mutex<Vec<ReloadEvent>>,
}

impl EventLog {
    pub fn count(&self) -> usize {
        self.events.lock().unwrap().len()
    }
}

impl ReloadListener for EventLog {
    fn on_reload(&self, event: &ReloadEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

pub struct Harness {
    pub manager: PipelineManager,
    pub store: Arc<SqliteDatasetStore>,
    pub fetcher: Arc<FakeFetcher>,
    pub metamodel: Arc<MetamodelStore>,
    pub events: Arc<EventLog>,
}

/// Repository `r` with hubs `h` and `g`, and repository `other` with hub `h`
pub fn config(timeout_secs: u64) -> HubcatConfig {
    let hub = |name: &str| HubConfig {
        name: name.to_string(),
        url: format!("https://upstream.test/{name}.json"),
        datasets_pointer: None,
    };

    let mut config = HubcatConfig::default();
    config.pipeline.operation_timeout_secs = timeout_secs;
    config.repositories = vec![
        RepositoryConfig {
            name: "r".to_string(),
            id_attribute: Some("id".to_string()),
            hubs: vec![hub("h"), hub("g")],
        },
        RepositoryConfig {
            name: "other".to_string(),
            id_attribute: None,
            hubs: vec![hub("h")],
        },
    ];
    config
}

pub fn harness() -> Harness {
    harness_with(config(600), FakeScripts::new(|input| Ok(input.to_string())))
}

pub fn harness_with(config: HubcatConfig, scripts: FakeScripts) -> Harness {
    let pool = SqlitePool::memory().unwrap();
    let store = Arc::new(SqliteDatasetStore::new(pool));
    let fetcher = Arc::new(FakeFetcher::default());
    let metamodel = Arc::new(MetamodelStore::new(
        store.clone(),
        config.metamodel.clone(),
    ));
    let events = Arc::new(EventLog::default());

    let bus = Arc::new(ReloadEventBus::new());
    bus.register(metamodel.clone());
    bus.register(events.clone());

    let manager = PipelineManager::new(
        &config,
        store.clone(),
        fetcher.clone(),
        Arc::new(scripts),
        bus,
    );

    Harness {
        manager,
        store,
        fetcher,
        metamodel,
        events,
    }
}
