use crate::channel::Channel;
use crate::envelope::Envelope;
use crate::error::{DomainError, DomainResult};
use crate::metadata::SensorKind;
use crate::microtime;

/// Normalized inbound record produced by classifying a decoded envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundRecord {
    Scalar {
        kind: SensorKind,
        timestamp_us: i64,
        value: f64,
    },
    Aggregated {
        kind: SensorKind,
        timestamp_us: i64,
        min: f64,
        max: f64,
        avg: f64,
        samples: u32,
    },
    Burst {
        kind: SensorKind,
        timestamp_us: i64,
        part_index: u32,
        part_total: u32,
        values: Vec<f64>,
        sample_rate: Option<(u32, u32)>,
    },
    Location {
        latitude: f64,
        longitude: f64,
    },
    Reset {
        entry: serde_json::Value,
    },
}

/// Classify a decoded envelope by its logical channel.
///
/// Pure shape validation: no I/O, no side effects. A payload whose shape
/// does not match the channel fails with [`DomainError::Decode`].
pub fn classify(channel: Channel, envelope: &Envelope) -> DomainResult<InboundRecord> {
    match channel {
        Channel::Location => {
            let latitude = require(envelope.latitude, "latitude")?;
            let longitude = require(envelope.longitude, "longitude")?;
            Ok(InboundRecord::Location {
                latitude,
                longitude,
            })
        }
        Channel::ResetLog => {
            // Reset payloads are opaque; carry the whole envelope through.
            let entry = serde_json::to_value(envelope)
                .map_err(|e| DomainError::Decode(format!("unserializable reset payload: {}", e)))?;
            Ok(InboundRecord::Reset { entry })
        }
        Channel::BurstEvent | Channel::AcousticBurst => {
            let kind = sensor_kind(channel)?;
            let timestamp_us = microtime::parse_micros(&envelope.date)?;
            let [part_index, part_total] = envelope
                .part
                .ok_or_else(|| missing(channel, "part"))?;
            if part_index == 0 || part_index > part_total {
                return Err(DomainError::Decode(format!(
                    "part index {} out of range for total {}",
                    part_index, part_total
                )));
            }
            let values = number_array(envelope.value.as_ref().ok_or_else(|| missing(channel, "value"))?)?;
            let sample_rate = envelope.sample_rate.map(|[num, den]| (num, den));
            Ok(InboundRecord::Burst {
                kind,
                timestamp_us,
                part_index,
                part_total,
                values,
                sample_rate,
            })
        }
        Channel::Pressure
        | Channel::Temperature
        | Channel::Battery
        | Channel::SignalStrength
        | Channel::AcousticSummary => {
            let kind = sensor_kind(channel)?;
            let timestamp_us = microtime::parse_micros(&envelope.date)?;
            match (envelope.min, envelope.max, envelope.avg) {
                (Some(min), Some(max), Some(avg)) => Ok(InboundRecord::Aggregated {
                    kind,
                    timestamp_us,
                    min,
                    max,
                    avg,
                    samples: envelope.samples.unwrap_or(0),
                }),
                (None, None, None) => {
                    let value = envelope
                        .value
                        .as_ref()
                        .and_then(serde_json::Value::as_f64)
                        .ok_or_else(|| missing(channel, "value"))?;
                    Ok(InboundRecord::Scalar {
                        kind,
                        timestamp_us,
                        value,
                    })
                }
                _ => Err(DomainError::Decode(format!(
                    "partial aggregate window on channel {}",
                    channel.as_str()
                ))),
            }
        }
    }
}

fn sensor_kind(channel: Channel) -> DomainResult<SensorKind> {
    channel.sensor_kind().ok_or_else(|| {
        DomainError::Decode(format!("channel {} carries no sensor data", channel.as_str()))
    })
}

fn require(field: Option<f64>, name: &str) -> DomainResult<f64> {
    field.ok_or_else(|| DomainError::Decode(format!("missing field '{}'", name)))
}

fn missing(channel: Channel, name: &str) -> DomainError {
    DomainError::Decode(format!(
        "missing field '{}' on channel {}",
        name,
        channel.as_str()
    ))
}

fn number_array(value: &serde_json::Value) -> DomainResult<Vec<f64>> {
    let items = value
        .as_array()
        .ok_or_else(|| DomainError::Decode("burst value is not an array".to_string()))?;
    items
        .iter()
        .map(|item| {
            item.as_f64()
                .ok_or_else(|| DomainError::Decode("non-numeric burst sample".to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope() -> Envelope {
        Envelope {
            date: "2021-06-01T12:00:00.000000Z".to_string(),
            ..Envelope::default()
        }
    }

    #[test]
    fn classifies_scalar() {
        let mut env = envelope();
        env.value = Some(json!(101.3));
        let record = classify(Channel::Pressure, &env).unwrap();
        match record {
            InboundRecord::Scalar { kind, value, .. } => {
                assert_eq!(kind, SensorKind::Pressure);
                assert_eq!(value, 101.3);
            }
            other => panic!("expected scalar, got {:?}", other),
        }
    }

    #[test]
    fn classifies_aggregate_window() {
        let mut env = envelope();
        env.min = Some(1.0);
        env.max = Some(3.0);
        env.avg = Some(2.0);
        env.samples = Some(60);
        let record = classify(Channel::Temperature, &env).unwrap();
        assert!(matches!(
            record,
            InboundRecord::Aggregated {
                kind: SensorKind::Temperature,
                min: 1.0,
                max: 3.0,
                avg: 2.0,
                samples: 60,
                ..
            }
        ));
    }

    #[test]
    fn partial_window_is_a_decode_error() {
        let mut env = envelope();
        env.min = Some(1.0);
        assert!(matches!(
            classify(Channel::Temperature, &env),
            Err(DomainError::Decode(_))
        ));
    }

    #[test]
    fn classifies_burst_fragment() {
        let mut env = envelope();
        env.part = Some([2, 4]);
        env.value = Some(json!([1.0, 2.0, 3.0]));
        env.sample_rate = Some([2, 1]);
        let record = classify(Channel::AcousticBurst, &env).unwrap();
        match record {
            InboundRecord::Burst {
                kind,
                part_index,
                part_total,
                values,
                sample_rate,
                ..
            } => {
                assert_eq!(kind, SensorKind::Acoustic);
                assert_eq!((part_index, part_total), (2, 4));
                assert_eq!(values, vec![1.0, 2.0, 3.0]);
                assert_eq!(sample_rate, Some((2, 1)));
            }
            other => panic!("expected burst, got {:?}", other),
        }
    }

    #[test]
    fn burst_with_non_numeric_values_is_rejected() {
        let mut env = envelope();
        env.part = Some([1, 2]);
        env.value = Some(json!([1.0, "x"]));
        assert!(matches!(
            classify(Channel::BurstEvent, &env),
            Err(DomainError::Decode(_))
        ));
    }

    #[test]
    fn burst_part_index_must_be_in_range() {
        let mut env = envelope();
        env.part = Some([0, 2]);
        env.value = Some(json!([1.0]));
        assert!(classify(Channel::BurstEvent, &env).is_err());

        env.part = Some([3, 2]);
        assert!(classify(Channel::BurstEvent, &env).is_err());
    }

    #[test]
    fn classifies_location() {
        let mut env = envelope();
        env.latitude = Some(43.45);
        env.longitude = Some(-80.49);
        assert_eq!(
            classify(Channel::Location, &env).unwrap(),
            InboundRecord::Location {
                latitude: 43.45,
                longitude: -80.49
            }
        );
    }

    #[test]
    fn location_without_coordinates_is_rejected() {
        let env = envelope();
        assert!(classify(Channel::Location, &env).is_err());
    }

    #[test]
    fn reset_carries_opaque_payload() {
        let mut env = envelope();
        env.value = Some(json!({"reason": "watchdog"}));
        let record = classify(Channel::ResetLog, &env).unwrap();
        match record {
            InboundRecord::Reset { entry } => {
                assert_eq!(entry["value"]["reason"], "watchdog");
            }
            other => panic!("expected reset, got {:?}", other),
        }
    }

    #[test]
    fn bad_timestamp_is_a_decode_error() {
        let mut env = envelope();
        env.date = "yesterday".to_string();
        env.value = Some(json!(1.0));
        assert!(matches!(
            classify(Channel::Pressure, &env),
            Err(DomainError::Decode(_))
        ));
    }
}
