use crate::metadata::{Asset, Device, SensorDescriptor};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Underscore-joined code path identifying location, asset and sensor.
/// Shared verbatim by a summary and all of its per-sample documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagHierarchy {
    pub full: String,
    pub client_tag_code: String,
    pub location_tag_code: String,
    pub asset_tag_code: String,
    pub sensor_tag_code: String,
}

impl TagHierarchy {
    pub fn new(device: &Device, asset: &Asset, sensor: &SensorDescriptor) -> Self {
        Self {
            full: format!(
                "{}_{}_{}",
                asset.location.tag_code, asset.tag_code, sensor.tag_code
            ),
            client_tag_code: device.client.tag_code.clone(),
            location_tag_code: asset.location.tag_code.clone(),
            asset_tag_code: asset.tag_code.clone(),
            sensor_tag_code: sensor.tag_code.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSnapshot {
    pub tag_code: String,
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetSnapshot {
    pub asset_id: String,
    pub tag_code: String,
    pub name: String,
    pub description: String,
    pub location: LocationSnapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    pub device_id: String,
    pub serial_number: String,
    pub kind: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorSnapshot {
    pub sensor_id: String,
    pub kind_code: i16,
    pub type_string: String,
    pub description: String,
    pub unit: String,
}

/// Single measurement attached to a telemetry document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SampleValue {
    Point(f64),
    Aggregate {
        min: f64,
        max: f64,
        avg: f64,
        samples: u32,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleWindow {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub point: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub samples: Option<u32>,
}

/// Measurement payload of a telemetry document: one burst sample, or the
/// value window of a single-part record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DataPayload {
    Sample { unit: String, value: f64 },
    Window { unit: String, values: SampleWindow },
}

impl DataPayload {
    pub fn window(unit: &str, sample: SampleValue) -> Self {
        let values = match sample {
            SampleValue::Point(point) => SampleWindow {
                point: Some(point),
                ..SampleWindow::default()
            },
            SampleValue::Aggregate {
                min,
                max,
                avg,
                samples,
            } => SampleWindow {
                min: Some(min),
                max: Some(max),
                average: Some(avg),
                samples: Some(samples),
                ..SampleWindow::default()
            },
        };
        DataPayload::Window {
            unit: unit.to_string(),
            values,
        }
    }
}

/// Fully enriched per-sample document published to the `telemetry` routing
/// destination. Timestamps are fixed-point microseconds since epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryDocument {
    pub timestamp: i64,
    pub tag: TagHierarchy,
    pub asset: AssetSnapshot,
    pub device: DeviceSnapshot,
    pub sensor: SensorSnapshot,
    pub client: String,
    /// Correlation id joining this document to its burst summary. Absent
    /// for single-part records, which publish no summary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<Uuid>,
    pub data: DataPayload,
}

/// One summary per completed burst, published to the `event` routing
/// destination after all of its telemetry documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSummaryDocument {
    pub event_id: Uuid,
    pub start: i64,
    pub end: i64,
    pub count: usize,
    pub description: String,
    pub tag: TagHierarchy,
    pub asset_id: String,
    pub device_id: String,
    pub sensor_id: String,
    pub client_id: String,
}
