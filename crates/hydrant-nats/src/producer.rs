use crate::traits::JetStreamPublisher;
use anyhow::Context;
use async_trait::async_trait;
use hydrant_domain::{
    DocumentProducer, DomainError, DomainResult, EventSummaryDocument, TelemetryDocument,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

const TELEMETRY_ROUTING_KEY: &str = "telemetry";
const EVENT_ROUTING_KEY: &str = "event";

/// Publishes enriched documents as JSON to the durable egress stream:
/// `{base_subject}.telemetry` for per-sample documents and
/// `{base_subject}.event` for burst summaries.
pub struct NatsDocumentProducer {
    jetstream: Arc<dyn JetStreamPublisher>,
    base_subject: String,
}

impl NatsDocumentProducer {
    pub fn new(jetstream: Arc<dyn JetStreamPublisher>, base_subject: String) -> Self {
        Self {
            jetstream,
            base_subject,
        }
    }

    async fn publish_json<T: Serialize>(&self, routing_key: &str, body: &T) -> DomainResult<()> {
        let payload = serde_json::to_vec(body)
            .context("Failed to encode document")
            .map_err(DomainError::RepositoryError)?;
        let subject = format!("{}.{}", self.base_subject, routing_key);

        debug!(subject = %subject, size_bytes = payload.len(), "publishing document");

        self.jetstream
            .publish(subject, payload.into())
            .await
            .map_err(|e| DomainError::Publish(e.to_string()))
    }
}

#[async_trait]
impl DocumentProducer for NatsDocumentProducer {
    async fn publish_telemetry(&self, document: &TelemetryDocument) -> DomainResult<()> {
        self.publish_json(TELEMETRY_ROUTING_KEY, document).await
    }

    async fn publish_event(&self, summary: &EventSummaryDocument) -> DomainResult<()> {
        self.publish_json(EVENT_ROUTING_KEY, summary).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::MockJetStreamPublisher;
    use bytes::Bytes;
    use hydrant_domain::{
        AssetSnapshot, DataPayload, DeviceSnapshot, LocationSnapshot, SensorSnapshot,
        TagHierarchy,
    };
    use uuid::Uuid;

    fn tag() -> TagHierarchy {
        TagHierarchy {
            full: "KIT_HYD17_PRS".to_string(),
            client_tag_code: "ACME".to_string(),
            location_tag_code: "KIT".to_string(),
            asset_tag_code: "HYD17".to_string(),
            sensor_tag_code: "PRS".to_string(),
        }
    }

    fn document() -> TelemetryDocument {
        TelemetryDocument {
            timestamp: 1_622_548_800_000_000,
            tag: tag(),
            asset: AssetSnapshot {
                asset_id: "asset-1".to_string(),
                tag_code: "HYD17".to_string(),
                name: "Hydrant 17".to_string(),
                description: "corner hydrant".to_string(),
                location: LocationSnapshot {
                    tag_code: "KIT".to_string(),
                    description: "Kitchener yard".to_string(),
                    latitude: 43.45,
                    longitude: -80.49,
                },
            },
            device: DeviceSnapshot {
                device_id: "dev-1".to_string(),
                serial_number: "SN-0042".to_string(),
                kind: "logger".to_string(),
                description: "pole-mounted logger".to_string(),
            },
            sensor: SensorSnapshot {
                sensor_id: "sensor-1".to_string(),
                kind_code: 1,
                type_string: "pressure".to_string(),
                description: "transducer".to_string(),
                unit: "kPa".to_string(),
            },
            client: "client-1".to_string(),
            event: Some(Uuid::new_v4()),
            data: DataPayload::Sample {
                unit: "kPa".to_string(),
                value: 101.3,
            },
        }
    }

    fn summary() -> EventSummaryDocument {
        EventSummaryDocument {
            event_id: Uuid::new_v4(),
            start: 0,
            end: 1_000_000,
            count: 3,
            description: "pressure event".to_string(),
            tag: tag(),
            asset_id: "asset-1".to_string(),
            device_id: "dev-1".to_string(),
            sensor_id: "sensor-1".to_string(),
            client_id: "client-1".to_string(),
        }
    }

    #[tokio::test]
    async fn telemetry_goes_to_the_telemetry_routing_key() {
        let mut mock_jetstream = MockJetStreamPublisher::new();
        mock_jetstream
            .expect_publish()
            .withf(|subject: &String, payload: &Bytes| {
                subject == "telemetry.telemetry" && !payload.is_empty()
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let producer =
            NatsDocumentProducer::new(Arc::new(mock_jetstream), "telemetry".to_string());
        producer.publish_telemetry(&document()).await.unwrap();
    }

    #[tokio::test]
    async fn summaries_go_to_the_event_routing_key() {
        let mut mock_jetstream = MockJetStreamPublisher::new();
        mock_jetstream
            .expect_publish()
            .withf(|subject: &String, payload: &Bytes| {
                let body: serde_json::Value = serde_json::from_slice(payload).unwrap();
                subject == "telemetry.event" && body["count"] == 3
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let producer =
            NatsDocumentProducer::new(Arc::new(mock_jetstream), "telemetry".to_string());
        producer.publish_event(&summary()).await.unwrap();
    }

    #[tokio::test]
    async fn broker_failure_maps_to_publish_error() {
        let mut mock_jetstream = MockJetStreamPublisher::new();
        mock_jetstream
            .expect_publish()
            .times(1)
            .returning(|_, _| Err(anyhow::anyhow!("NATS publish failed")));

        let producer =
            NatsDocumentProducer::new(Arc::new(mock_jetstream), "telemetry".to_string());
        let result = producer.publish_telemetry(&document()).await;
        assert!(matches!(result, Err(DomainError::Publish(_))));
    }
}
