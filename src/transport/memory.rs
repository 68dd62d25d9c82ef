//! In-memory publisher used by tests

use crate::transport::traits::Publisher;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Records every publish, optionally failing on demand
#[derive(Default)]
pub struct RecordingPublisher {
    published: Mutex<Vec<(String, Bytes)>>,
    failing: AtomicBool,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent publishes fail
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Published messages with their payloads decoded as JSON
    pub fn published(&self) -> Vec<(String, Value)> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .map(|(topic, payload)| {
                let value = serde_json::from_slice(payload).expect("published payload is JSON");
                (topic.clone(), value)
            })
            .collect()
    }

    pub fn count(&self) -> usize {
        self.published.lock().unwrap().len()
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish(&self, topic: &str, payload: Bytes) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(anyhow!("Connection closed"));
        }
        self.published
            .lock()
            .unwrap()
            .push((topic.to_string(), payload));
        Ok(())
    }

    fn name(&self) -> &'static str {
        "Memory"
    }
}

/// Holds every publish until released, to observe work that overlaps one
pub struct GatedPublisher {
    pub inner: RecordingPublisher,
    /// Signalled when a publish has started
    pub entered: Arc<Notify>,
    /// Notify once to let the pending publish finish
    pub release: Arc<Notify>,
}

impl GatedPublisher {
    pub fn new() -> Self {
        Self {
            inner: RecordingPublisher::new(),
            entered: Arc::new(Notify::new()),
            release: Arc::new(Notify::new()),
        }
    }
}

#[async_trait]
impl Publisher for GatedPublisher {
    async fn publish(&self, topic: &str, payload: Bytes) -> Result<()> {
        self.entered.notify_one();
        self.release.notified().await;
        self.inner.publish(topic, payload).await
    }

    fn name(&self) -> &'static str {
        "Gated"
    }
}
