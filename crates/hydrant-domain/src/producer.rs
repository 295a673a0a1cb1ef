use crate::document::{EventSummaryDocument, TelemetryDocument};
use crate::error::DomainResult;
use async_trait::async_trait;

/// Seam for the durable broker destination.
///
/// Implementations publish with persistence and must not report success
/// until the broker has acknowledged the message; the pipeline relies on
/// that to clear buffered fragments only after a confirmed publish.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait DocumentProducer: Send + Sync {
    /// Publish one per-sample document to the `telemetry` routing key.
    async fn publish_telemetry(&self, document: &TelemetryDocument) -> DomainResult<()>;

    /// Publish a burst summary to the `event` routing key.
    async fn publish_event(&self, summary: &EventSummaryDocument) -> DomainResult<()>;
}
