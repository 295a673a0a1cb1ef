use anyhow::Result;
use async_trait::async_trait;

/// Publishing operations the document producer needs from JetStream.
/// Publishes must await the broker acknowledgment before returning.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait JetStreamPublisher: Send + Sync {
    async fn publish(&self, subject: String, payload: bytes::Bytes) -> Result<()>;
}
