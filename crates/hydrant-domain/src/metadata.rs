use crate::error::DomainResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Physical quantity a sensor measures, keyed by the numeric code stored in
/// the metadata store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorKind {
    Pressure,
    Temperature,
    SignalStrength,
    Battery,
    Acoustic,
}

impl SensorKind {
    pub fn code(&self) -> i16 {
        match self {
            SensorKind::Pressure => 1,
            SensorKind::Temperature => 2,
            SensorKind::SignalStrength => 3,
            SensorKind::Battery => 4,
            SensorKind::Acoustic => 11,
        }
    }

    pub fn from_code(code: i16) -> Option<SensorKind> {
        match code {
            1 => Some(SensorKind::Pressure),
            2 => Some(SensorKind::Temperature),
            3 => Some(SensorKind::SignalStrength),
            4 => Some(SensorKind::Battery),
            11 => Some(SensorKind::Acoustic),
            _ => None,
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SensorKind::Pressure => "pressure",
            SensorKind::Temperature => "temperature",
            SensorKind::SignalStrength => "signal-strength",
            SensorKind::Battery => "battery",
            SensorKind::Acoustic => "acoustic",
        };
        write!(f, "{}", name)
    }
}

/// Client owning a device, embedded in device lookups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientRef {
    pub client_id: String,
    pub tag_code: String,
}

/// Device registration resolved from a transport source id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub device_id: String,
    pub source_id: String,
    pub serial_number: String,
    pub kind: String,
    pub description: String,
    pub asset_id: String,
    pub client: ClientRef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetLocation {
    pub tag_code: String,
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Asset a device is mounted on, with its location embedded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub asset_id: String,
    pub tag_code: String,
    pub name: String,
    pub description: String,
    pub location: AssetLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorDescriptor {
    pub sensor_id: String,
    pub kind: SensorKind,
    pub type_string: String,
    pub tag_code: String,
    pub description: String,
    pub unit: String,
}

/// Read-mostly metadata lookups the pipeline performs once a record is
/// ready: source -> device -> asset -> sensor descriptor.
///
/// A `None` from any lookup aborts processing for that record; the caller
/// logs and leaves buffered fragment state untouched.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait MetadataRepository: Send + Sync {
    async fn find_device_by_source(&self, source_id: &str) -> DomainResult<Option<Device>>;

    async fn find_asset(&self, asset_id: &str) -> DomainResult<Option<Asset>>;

    async fn find_sensor_by_kind(&self, kind: SensorKind) -> DomainResult<Option<SensorDescriptor>>;

    /// Write back a device-reported position, also refreshing the linked
    /// location when the device is bound to one.
    async fn update_device_geolocation(
        &self,
        source_id: &str,
        latitude: f64,
        longitude: f64,
    ) -> DomainResult<()>;

    /// Append an opaque reset-log entry to the device record.
    async fn append_device_reset(
        &self,
        source_id: &str,
        entry: serde_json::Value,
    ) -> DomainResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sensor_codes_round_trip() {
        for kind in [
            SensorKind::Pressure,
            SensorKind::Temperature,
            SensorKind::SignalStrength,
            SensorKind::Battery,
            SensorKind::Acoustic,
        ] {
            assert_eq!(SensorKind::from_code(kind.code()), Some(kind));
        }
        assert_eq!(SensorKind::from_code(99), None);
    }
}
