//! Reload events
//!
//! The pipeline publishes a [`ReloadEvent`] after every committed crawl or
//! mapping run. Registered [`ReloadListener`]s are called synchronously, in
//! registration order, before `publish` returns; broadcast subscribers
//! receive the event afterwards.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

/// Capacity of the broadcast channel
const BROADCAST_CAPACITY: usize = 64;

/// Pipeline operation that changed a repository's content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operation {
    Crawling,
    Mapping,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Crawling => "CRAWLING",
            Operation::Mapping => "MAPPING",
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "CRAWLING" => Some(Operation::Crawling),
            "MAPPING" => Some(Operation::Mapping),
            _ => None,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReloadEvent {
    pub repository: String,
    pub operation: Operation,
}

impl ReloadEvent {
    pub fn new(repository: impl Into<String>, operation: Operation) -> Self {
        Self {
            repository: repository.into(),
            operation,
        }
    }
}

/// Reacts to committed repository changes
pub trait ReloadListener: Send + Sync {
    fn on_reload(&self, event: &ReloadEvent);
}

pub struct ReloadEventBus {
    listeners: RwLock<Vec<Arc<dyn ReloadListener>>>,
    sender: broadcast::Sender<ReloadEvent>,
}

impl ReloadEventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            listeners: RwLock::new(Vec::new()),
            sender,
        }
    }

    pub fn register(&self, listener: Arc<dyn ReloadListener>) {
        self.listeners.write().push(listener);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadEvent> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: ReloadEvent) {
        debug!(
            repository = %event.repository,
            operation = %event.operation,
            "Publishing reload event"
        );

        let listeners = self.listeners.read().clone();
        for listener in &listeners {
            listener.on_reload(&event);
        }

        // No receivers is fine
        let _ = self.sender.send(event);
    }
}

impl Default for ReloadEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<ReloadEvent>>,
    }

    impl ReloadListener for Recorder {
        fn on_reload(&self, event: &ReloadEvent) {
            self.seen.lock().push(event.clone());
        }
    }

    #[tokio::test]
    async fn test_listeners_run_before_broadcast() {
        let bus = ReloadEventBus::new();
        let recorder = Arc::new(Recorder::default());
        bus.register(recorder.clone());
        let mut receiver = bus.subscribe();

        bus.publish(ReloadEvent::new("cellxgene", Operation::Crawling));

        assert_eq!(
            recorder.seen.lock().as_slice(),
            &[ReloadEvent::new("cellxgene", Operation::Crawling)]
        );
        let received = receiver.recv().await.unwrap();
        assert_eq!(received.operation, Operation::Crawling);
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = ReloadEventBus::default();
        bus.publish(ReloadEvent::new("r", Operation::Mapping));
    }

    #[test]
    fn test_operation_round_trips_through_text() {
        assert_eq!(Operation::parse("MAPPING"), Some(Operation::Mapping));
        assert_eq!(Operation::Crawling.to_string(), "CRAWLING");
        assert_eq!(Operation::parse("crawl"), None);
    }
}
