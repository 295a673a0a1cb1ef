use hydrant_domain::{DomainError, DomainResult, Envelope, EnvelopeDecoder};

/// CBOR implementation of the envelope decoder seam. Devices publish
/// compact CBOR maps; anything that fails shape validation here is dropped
/// by the subscriber and never retried.
pub struct CborEnvelopeDecoder;

impl EnvelopeDecoder for CborEnvelopeDecoder {
    fn decode(&self, bytes: &[u8]) -> DomainResult<Envelope> {
        ciborium::de::from_reader(bytes)
            .map_err(|e| DomainError::Decode(format!("undecodable envelope: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn encode(envelope: &Envelope) -> Vec<u8> {
        let mut bytes = Vec::new();
        ciborium::ser::into_writer(envelope, &mut bytes).unwrap();
        bytes
    }

    #[test]
    fn decodes_a_scalar_envelope() {
        let envelope = Envelope {
            date: "2021-06-01T12:00:00.123456Z".to_string(),
            value: Some(json!(101.3)),
            ..Envelope::default()
        };
        let decoded = CborEnvelopeDecoder.decode(&encode(&envelope)).unwrap();
        assert_eq!(decoded, envelope);
    }

    #[test]
    fn decodes_a_burst_fragment_envelope() {
        let envelope = Envelope {
            date: "2021-06-01T12:00:00.000Z".to_string(),
            part: Some([2, 4]),
            value: Some(json!([1.0, 2.0, 3.0])),
            sample_rate: Some([2, 1]),
            ..Envelope::default()
        };
        let decoded = CborEnvelopeDecoder.decode(&encode(&envelope)).unwrap();
        assert_eq!(decoded.part, Some([2, 4]));
        assert_eq!(decoded.sample_rate, Some([2, 1]));
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let result = CborEnvelopeDecoder.decode(&[0xff, 0x00, 0x13, 0x37]);
        assert!(matches!(result, Err(DomainError::Decode(_))));
    }
}
