use crate::composer::{compose_burst, compose_single, ComposedEvent, EnrichmentContext};
use crate::dispatch::InboundRecord;
use crate::document::SampleValue;
use crate::error::{DomainError, DomainResult};
use crate::fragment::{BurstHeader, FragmentKey, FragmentStore};
use crate::metadata::{MetadataRepository, SensorKind};
use crate::producer::DocumentProducer;
use std::sync::Arc;
use tracing::{debug, info, instrument};

#[derive(Debug, Clone)]
pub struct IngestServiceConfig {
    /// Interval applied when a burst carries no usable sample rate.
    pub default_sample_interval_us: i64,
}

/// Sequential per-record pipeline: resolve metadata, compose, publish,
/// clear buffered state. One error boundary per record/key; callers log
/// failures and never retry through the transport.
pub struct IngestService {
    fragment_store: Arc<dyn FragmentStore>,
    metadata: Arc<dyn MetadataRepository>,
    producer: Arc<dyn DocumentProducer>,
    config: IngestServiceConfig,
}

impl IngestService {
    pub fn new(
        fragment_store: Arc<dyn FragmentStore>,
        metadata: Arc<dyn MetadataRepository>,
        producer: Arc<dyn DocumentProducer>,
        config: IngestServiceConfig,
    ) -> Self {
        Self {
            fragment_store,
            metadata,
            producer,
            config,
        }
    }

    #[instrument(skip(self, record), fields(source_id = %source_id))]
    pub async fn handle_record(&self, source_id: &str, record: InboundRecord) -> DomainResult<()> {
        match record {
            InboundRecord::Scalar {
                kind,
                timestamp_us,
                value,
            } => {
                self.handle_single(source_id, kind, timestamp_us, SampleValue::Point(value))
                    .await
            }
            InboundRecord::Aggregated {
                kind,
                timestamp_us,
                min,
                max,
                avg,
                samples,
            } => {
                let sample = SampleValue::Aggregate {
                    min,
                    max,
                    avg,
                    samples,
                };
                self.handle_single(source_id, kind, timestamp_us, sample).await
            }
            InboundRecord::Burst {
                kind,
                timestamp_us,
                part_index,
                part_total,
                values,
                sample_rate,
            } => {
                self.handle_burst(
                    source_id,
                    kind,
                    timestamp_us,
                    part_index,
                    part_total,
                    values,
                    sample_rate,
                )
                .await
            }
            InboundRecord::Location {
                latitude,
                longitude,
            } => {
                self.metadata
                    .update_device_geolocation(source_id, latitude, longitude)
                    .await
            }
            InboundRecord::Reset { entry } => {
                self.metadata.append_device_reset(source_id, entry).await
            }
        }
    }

    async fn handle_single(
        &self,
        source_id: &str,
        kind: SensorKind,
        timestamp_us: i64,
        sample: SampleValue,
    ) -> DomainResult<()> {
        let context = self.resolve(source_id, kind).await?;
        let document = compose_single(&context, timestamp_us, sample);
        self.producer.publish_telemetry(&document).await?;
        debug!(source_id = %source_id, timestamp_us, "published single-part document");
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    async fn handle_burst(
        &self,
        source_id: &str,
        kind: SensorKind,
        timestamp_us: i64,
        part_index: u32,
        part_total: u32,
        values: Vec<f64>,
        sample_rate: Option<(u32, u32)>,
    ) -> DomainResult<()> {
        // Single-part bursts never touch the shared buffer.
        if part_total <= 1 {
            let context = self.resolve(source_id, kind).await?;
            let composed = compose_burst(
                &context,
                &values,
                timestamp_us,
                sample_rate,
                self.config.default_sample_interval_us,
            );
            return self.publish_batch(composed, None).await;
        }

        let key = FragmentKey::from_base_timestamp(timestamp_us, source_id);
        let header = BurstHeader {
            base_timestamp_us: timestamp_us,
            sample_rate,
        };
        let outcome = self
            .fragment_store
            .append(&key, part_index, part_total, &header, &values)
            .await?;

        debug!(
            key = %key.storage_key(),
            part_index,
            stored = outcome.stored_parts,
            expected = outcome.expected_total,
            "buffered burst fragment"
        );

        if outcome.completed_now {
            self.finish_burst(&key, kind).await?;
        }
        Ok(())
    }

    /// Runs exactly once per burst, on whichever worker instance appended
    /// the completing fragment. Metadata failures and publish failures
    /// leave the buffered set in place; only the expiry policy reclaims it.
    async fn finish_burst(&self, key: &FragmentKey, kind: SensorKind) -> DomainResult<()> {
        let context = self.resolve(&key.source_id, kind).await?;
        let burst = self
            .fragment_store
            .load(key)
            .await?
            .ok_or_else(|| DomainError::FragmentGone(key.storage_key()))?;
        let composed = compose_burst(
            &context,
            &burst.values,
            burst.header.base_timestamp_us,
            burst.header.sample_rate,
            self.config.default_sample_interval_us,
        );
        self.publish_batch(composed, Some(key)).await
    }

    /// All per-sample documents are enqueued before the summary, so a
    /// consumer that sees the summary can assume the details exist. The
    /// buffer key is cleared only after both artifacts were acknowledged.
    async fn publish_batch(
        &self,
        composed: ComposedEvent,
        key: Option<&FragmentKey>,
    ) -> DomainResult<()> {
        for document in &composed.documents {
            self.producer.publish_telemetry(document).await?;
        }
        self.producer.publish_event(&composed.summary).await?;

        if let Some(key) = key {
            self.fragment_store.remove(key).await?;
        }

        info!(
            event_id = %composed.summary.event_id,
            count = composed.summary.count,
            tag = %composed.summary.tag.full,
            "published burst event"
        );
        Ok(())
    }

    async fn resolve(&self, source_id: &str, kind: SensorKind) -> DomainResult<EnrichmentContext> {
        let device = self
            .metadata
            .find_device_by_source(source_id)
            .await?
            .ok_or_else(|| DomainError::DeviceNotFound(source_id.to_string()))?;
        let asset = self
            .metadata
            .find_asset(&device.asset_id)
            .await?
            .ok_or_else(|| DomainError::AssetNotFound(device.asset_id.clone()))?;
        let sensor = self
            .metadata
            .find_sensor_by_kind(kind)
            .await?
            .ok_or_else(|| DomainError::SensorNotFound(kind.to_string()))?;
        Ok(EnrichmentContext {
            device,
            asset,
            sensor,
        })
    }
}
