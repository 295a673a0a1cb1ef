use hydrant_domain::{DomainError, DomainResult};

/// Parsed MQTT topic `{source_id}/{channel}`.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTopic {
    pub source_id: String,
    pub channel_label: String,
}

pub fn parse_topic(topic: &str) -> DomainResult<ParsedTopic> {
    let parts: Vec<&str> = topic.split('/').collect();

    if parts.len() != 2 {
        return Err(DomainError::Decode(format!(
            "invalid topic '{}': expected '{{source_id}}/{{channel}}'",
            topic
        )));
    }

    let source_id = parts[0].trim();
    let channel_label = parts[1].trim();

    if source_id.is_empty() || channel_label.is_empty() {
        return Err(DomainError::Decode(format!(
            "invalid topic '{}': empty segment",
            topic
        )));
    }

    Ok(ParsedTopic {
        source_id: source_id.to_string(),
        channel_label: channel_label.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_topic() {
        let parsed = parse_topic("src-001/pressure").unwrap();
        assert_eq!(parsed.source_id, "src-001");
        assert_eq!(parsed.channel_label, "pressure");
    }

    #[test]
    fn test_parse_topic_with_unknown_channel() {
        // Unknown channels parse fine; the subscriber ignores them later.
        let parsed = parse_topic("src-001/humidity").unwrap();
        assert_eq!(parsed.channel_label, "humidity");
    }

    #[test]
    fn test_parse_topic_missing_channel() {
        assert!(parse_topic("src-001").is_err());
    }

    #[test]
    fn test_parse_topic_too_many_segments() {
        assert!(parse_topic("a/b/c").is_err());
    }

    #[test]
    fn test_parse_topic_empty_segments() {
        assert!(parse_topic("/pressure").is_err());
        assert!(parse_topic("src-001/").is_err());
        assert!(parse_topic("").is_err());
    }
}
