use crate::error::{DomainError, DomainResult};
use chrono::{DateTime, SecondsFormat, Utc};

/// Parse an RFC 3339 timestamp into fixed-point microseconds since epoch.
///
/// Device firmware emits millisecond timestamps with up to three extra
/// fractional digits of sub-millisecond precision. Fractions beyond six
/// digits are truncated to microseconds.
pub fn parse_micros(text: &str) -> DomainResult<i64> {
    let parsed = DateTime::parse_from_rfc3339(text)
        .map_err(|e| DomainError::Decode(format!("invalid timestamp '{}': {}", text, e)))?;
    Ok(parsed.timestamp_micros())
}

/// Format fixed-point microseconds as an RFC 3339 UTC timestamp with
/// exactly six zero-padded fractional digits.
///
/// Inverse of [`parse_micros`]: `format_micros(parse_micros(s)?)? == s`
/// for any string this function produced.
pub fn format_micros(micros: i64) -> DomainResult<String> {
    let timestamp = DateTime::<Utc>::from_timestamp_micros(micros).ok_or_else(|| {
        DomainError::Decode(format!("timestamp {}us is out of range", micros))
    })?;
    Ok(timestamp.to_rfc3339_opts(SecondsFormat::Micros, true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_millisecond_timestamp() {
        let micros = parse_micros("2021-06-01T12:00:00.123Z").unwrap();
        assert_eq!(micros % 1_000_000, 123_000);
    }

    #[test]
    fn parses_extra_fractional_digits() {
        let base = parse_micros("2021-06-01T12:00:00.123Z").unwrap();
        assert_eq!(parse_micros("2021-06-01T12:00:00.1234Z").unwrap(), base + 400);
        assert_eq!(parse_micros("2021-06-01T12:00:00.12345Z").unwrap(), base + 450);
        assert_eq!(
            parse_micros("2021-06-01T12:00:00.123456Z").unwrap(),
            base + 456
        );
    }

    #[test]
    fn truncates_beyond_microseconds() {
        let six = parse_micros("2021-06-01T12:00:00.123456Z").unwrap();
        let nine = parse_micros("2021-06-01T12:00:00.123456789Z").unwrap();
        assert_eq!(six, nine);
    }

    #[test]
    fn format_is_zero_padded_microseconds() {
        let micros = parse_micros("2021-06-01T12:00:00.000001Z").unwrap();
        assert_eq!(format_micros(micros).unwrap(), "2021-06-01T12:00:00.000001Z");
    }

    #[test]
    fn round_trips_codec_produced_strings() {
        for text in [
            "2021-06-01T12:00:00.000000Z",
            "2021-06-01T12:00:00.123456Z",
            "1999-12-31T23:59:59.999999Z",
        ] {
            let micros = parse_micros(text).unwrap();
            assert_eq!(format_micros(micros).unwrap(), text);
        }
    }

    #[test]
    fn short_fractions_preserve_the_instant() {
        // 0-3 extra digits beyond millisecond precision all land on the
        // same instant once normalized to six digits.
        let micros = parse_micros("2021-06-01T12:00:00.1230Z").unwrap();
        assert_eq!(format_micros(micros).unwrap(), "2021-06-01T12:00:00.123000Z");
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_micros("not a timestamp").is_err());
        assert!(parse_micros("2021-06-01 12:00:00").is_err());
    }
}
