use crate::error::DomainResult;
use serde::{Deserialize, Serialize};

/// Decoded binary envelope as delivered by the transport.
///
/// Every message carries a timestamp; the remaining fields depend on the
/// channel and are validated by the dispatcher when the envelope is
/// classified into an [`crate::InboundRecord`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub date: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg: Option<f64>,

    #[serde(default, rename = "n", skip_serializing_if = "Option::is_none")]
    pub samples: Option<u32>,

    /// `[part_index, part_total]` for multi-part bursts. Indices are 1-based.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part: Option<[u32; 2]>,

    /// Rational sample rate `[numerator, denominator]` in samples per second.
    #[serde(default, rename = "sample-rate", skip_serializing_if = "Option::is_none")]
    pub sample_rate: Option<[u32; 2]>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

/// Seam for the generic binary envelope decoder.
///
/// The wire format is owned by the device firmware; the worker only depends
/// on getting an [`Envelope`] or a decode error out of the raw bytes.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait EnvelopeDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> DomainResult<Envelope>;
}
