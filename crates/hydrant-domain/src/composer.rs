use crate::document::{
    AssetSnapshot, DataPayload, DeviceSnapshot, EventSummaryDocument, LocationSnapshot,
    SampleValue, SensorSnapshot, TagHierarchy, TelemetryDocument,
};
use crate::metadata::{Asset, Device, SensorDescriptor};
use uuid::Uuid;

/// Metadata resolved for one record, in lookup order: device, then its
/// asset, then the sensor descriptor for the channel's kind.
#[derive(Debug, Clone)]
pub struct EnrichmentContext {
    pub device: Device,
    pub asset: Asset,
    pub sensor: SensorDescriptor,
}

impl EnrichmentContext {
    fn tag(&self) -> TagHierarchy {
        TagHierarchy::new(&self.device, &self.asset, &self.sensor)
    }

    fn asset_snapshot(&self) -> AssetSnapshot {
        AssetSnapshot {
            asset_id: self.asset.asset_id.clone(),
            tag_code: self.asset.tag_code.clone(),
            name: self.asset.name.clone(),
            description: self.asset.description.clone(),
            location: LocationSnapshot {
                tag_code: self.asset.location.tag_code.clone(),
                description: self.asset.location.description.clone(),
                latitude: self.asset.location.latitude,
                longitude: self.asset.location.longitude,
            },
        }
    }

    fn device_snapshot(&self) -> DeviceSnapshot {
        DeviceSnapshot {
            device_id: self.device.device_id.clone(),
            serial_number: self.device.serial_number.clone(),
            kind: self.device.kind.clone(),
            description: self.device.description.clone(),
        }
    }

    fn sensor_snapshot(&self) -> SensorSnapshot {
        SensorSnapshot {
            sensor_id: self.sensor.sensor_id.clone(),
            kind_code: self.sensor.kind.code(),
            type_string: self.sensor.type_string.clone(),
            description: self.sensor.description.clone(),
            unit: self.sensor.unit.clone(),
        }
    }
}

/// Per-sample documents plus the burst summary, ready for publication.
#[derive(Debug, Clone)]
pub struct ComposedEvent {
    pub documents: Vec<TelemetryDocument>,
    pub summary: EventSummaryDocument,
}

/// Microseconds between consecutive samples for a rational `samples per
/// second` rate. A missing or degenerate rate falls back to the configured
/// default interval.
pub fn sample_interval_us(sample_rate: Option<(u32, u32)>, default_interval_us: i64) -> i64 {
    match sample_rate {
        Some((num, den)) if num > 0 && den > 0 => 1_000_000 * i64::from(den) / i64::from(num),
        _ => default_interval_us,
    }
}

/// Build the per-sample documents and summary for a completed burst.
///
/// Document `i` (0-indexed) is stamped `base + i * interval`; every
/// document and the summary share one freshly generated correlation id and
/// the identical tag hierarchy.
pub fn compose_burst(
    context: &EnrichmentContext,
    values: &[f64],
    base_timestamp_us: i64,
    sample_rate: Option<(u32, u32)>,
    default_interval_us: i64,
) -> ComposedEvent {
    let interval_us = sample_interval_us(sample_rate, default_interval_us);
    let event_id = Uuid::new_v4();
    let tag = context.tag();

    let documents: Vec<TelemetryDocument> = values
        .iter()
        .enumerate()
        .map(|(i, value)| TelemetryDocument {
            timestamp: base_timestamp_us + i as i64 * interval_us,
            tag: tag.clone(),
            asset: context.asset_snapshot(),
            device: context.device_snapshot(),
            sensor: context.sensor_snapshot(),
            client: context.device.client.client_id.clone(),
            event: Some(event_id),
            data: DataPayload::Sample {
                unit: context.sensor.unit.clone(),
                value: *value,
            },
        })
        .collect();

    let start = documents
        .first()
        .map_or(base_timestamp_us, |d| d.timestamp);
    let end = documents.last().map_or(base_timestamp_us, |d| d.timestamp);

    let summary = EventSummaryDocument {
        event_id,
        start,
        end,
        count: documents.len(),
        description: format!("{} event", context.sensor.type_string),
        tag,
        asset_id: context.asset.asset_id.clone(),
        device_id: context.device.device_id.clone(),
        sensor_id: context.sensor.sensor_id.clone(),
        client_id: context.device.client.client_id.clone(),
    };

    ComposedEvent { documents, summary }
}

/// Build the single document for a single-part record. Same snapshot and
/// tag logic as a burst, one value, no interval stepping and no summary.
pub fn compose_single(
    context: &EnrichmentContext,
    timestamp_us: i64,
    sample: SampleValue,
) -> TelemetryDocument {
    TelemetryDocument {
        timestamp: timestamp_us,
        tag: context.tag(),
        asset: context.asset_snapshot(),
        device: context.device_snapshot(),
        sensor: context.sensor_snapshot(),
        client: context.device.client.client_id.clone(),
        event: None,
        data: DataPayload::window(&context.sensor.unit, sample),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{AssetLocation, ClientRef, SensorKind};

    pub(crate) fn context() -> EnrichmentContext {
        EnrichmentContext {
            device: Device {
                device_id: "dev-1".to_string(),
                source_id: "src-1".to_string(),
                serial_number: "SN-0042".to_string(),
                kind: "logger".to_string(),
                description: "pole-mounted logger".to_string(),
                asset_id: "asset-1".to_string(),
                client: ClientRef {
                    client_id: "client-1".to_string(),
                    tag_code: "ACME".to_string(),
                },
            },
            asset: Asset {
                asset_id: "asset-1".to_string(),
                tag_code: "HYD17".to_string(),
                name: "Hydrant 17".to_string(),
                description: "corner hydrant".to_string(),
                location: AssetLocation {
                    tag_code: "KIT".to_string(),
                    description: "Kitchener yard".to_string(),
                    latitude: 43.45,
                    longitude: -80.49,
                },
            },
            sensor: SensorDescriptor {
                sensor_id: "sensor-1".to_string(),
                kind: SensorKind::Pressure,
                type_string: "pressure".to_string(),
                tag_code: "PRS".to_string(),
                description: "pressure transducer".to_string(),
                unit: "kPa".to_string(),
            },
        }
    }

    #[test]
    fn burst_timestamps_step_by_sample_interval() {
        let base = 1_622_548_800_000_000;
        let composed = compose_burst(&context(), &[1.0, 2.0, 3.0], base, Some((2, 1)), 1_000);
        let timestamps: Vec<i64> = composed.documents.iter().map(|d| d.timestamp).collect();
        assert_eq!(timestamps, vec![base, base + 500_000, base + 1_000_000]);
    }

    #[test]
    fn invalid_rate_uses_configured_default() {
        let base = 7_000_000;
        for rate in [None, Some((0, 1)), Some((4, 0))] {
            let composed = compose_burst(&context(), &[1.0, 2.0], base, rate, 250_000);
            assert_eq!(composed.documents[1].timestamp, base + 250_000);
        }
    }

    #[test]
    fn summary_spans_first_to_last_document() {
        let base = 1_000_000;
        let composed = compose_burst(&context(), &[5.0; 4], base, Some((1, 1)), 0);
        assert_eq!(composed.summary.start, composed.documents[0].timestamp);
        assert_eq!(
            composed.summary.end,
            composed.documents.last().unwrap().timestamp
        );
        assert_eq!(composed.summary.count, 4);
        assert_eq!(composed.summary.description, "pressure event");
    }

    #[test]
    fn burst_shares_correlation_id_and_tag() {
        let composed = compose_burst(&context(), &[1.0, 2.0], 0, Some((1, 1)), 0);
        let event_id = composed.summary.event_id;
        for document in &composed.documents {
            assert_eq!(document.event, Some(event_id));
            assert_eq!(document.tag, composed.summary.tag);
            assert_eq!(document.tag.full, "KIT_HYD17_PRS");
        }
    }

    #[test]
    fn single_record_keeps_base_timestamp_and_has_no_event() {
        let document = compose_single(&context(), 42_000_000, SampleValue::Point(99.5));
        assert_eq!(document.timestamp, 42_000_000);
        assert_eq!(document.event, None);
        match document.data {
            DataPayload::Window { ref unit, ref values } => {
                assert_eq!(unit, "kPa");
                assert_eq!(values.point, Some(99.5));
                assert_eq!(values.min, None);
            }
            ref other => panic!("expected window payload, got {:?}", other),
        }
    }

    #[test]
    fn aggregate_sample_fills_the_window() {
        let sample = SampleValue::Aggregate {
            min: 1.0,
            max: 9.0,
            avg: 5.0,
            samples: 120,
        };
        let document = compose_single(&context(), 0, sample);
        match document.data {
            DataPayload::Window { ref values, .. } => {
                assert_eq!(values.min, Some(1.0));
                assert_eq!(values.max, Some(9.0));
                assert_eq!(values.average, Some(5.0));
                assert_eq!(values.samples, Some(120));
                assert_eq!(values.point, None);
            }
            ref other => panic!("expected window payload, got {:?}", other),
        }
    }
}
