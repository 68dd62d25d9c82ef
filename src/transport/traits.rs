//! Publisher trait abstraction for pluggable message backends

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;

/// Sink for outbound messages addressed by topic
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Hand an encoded payload to the backend for a topic.
    ///
    /// Backends may return before delivery; see the implementation.
    async fn publish(&self, topic: &str, payload: Bytes) -> Result<()>;

    /// Human-readable name for this backend
    fn name(&self) -> &'static str;
}
