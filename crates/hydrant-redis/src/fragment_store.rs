use anyhow::{Context, Result};
use async_trait::async_trait;
use hydrant_domain::{
    AppendOutcome, BufferedBurst, BurstHeader, DomainError, DomainResult, FragmentKey,
    FragmentStore,
};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tracing::{debug, info, instrument};

const HEADER_FIELD: &str = "header";
const TOTAL_FIELD: &str = "total";
const PART_FIELD_PREFIX: &str = "field_";

/// One Redis hash per fragment key: `header`, `total`, and one
/// `field_<partIndex>` entry per received fragment.
///
/// The append runs as a single Lua script so that concurrent workers on a
/// load-balanced subscription cannot lose an update or both observe the
/// completing transition. Every append refreshes the expiry so sets whose
/// sibling fragments never arrive are eventually reclaimed.
const APPEND_SCRIPT: &str = r#"
local key = KEYS[1]
redis.call('HSETNX', key, 'header', ARGV[1])
redis.call('HSETNX', key, 'total', ARGV[2])
local total = tonumber(redis.call('HGET', key, 'total'))
local before = redis.call('HLEN', key) - 2
redis.call('HSET', key, 'field_' .. ARGV[3], ARGV[4])
local after = redis.call('HLEN', key) - 2
if tonumber(ARGV[5]) > 0 then
  redis.call('PEXPIRE', key, ARGV[5])
end
local completed = 0
if after == total and after > before then
  completed = 1
end
return {after, total, completed}
"#;

pub struct RedisFragmentStore {
    conn: ConnectionManager,
    append_script: Script,
    ttl: Option<Duration>,
}

impl RedisFragmentStore {
    pub async fn connect(url: &str, ttl: Option<Duration>) -> Result<Self> {
        info!(url = %url, "Connecting to Redis");
        let client = redis::Client::open(url).context("Invalid Redis URL")?;
        let conn = ConnectionManager::new(client)
            .await
            .context("Failed to connect to Redis")?;
        info!("Successfully connected to Redis");
        Ok(Self {
            conn,
            append_script: Script::new(APPEND_SCRIPT),
            ttl,
        })
    }

    fn ttl_millis(&self) -> u64 {
        self.ttl.map(|ttl| ttl.as_millis() as u64).unwrap_or(0)
    }
}

#[async_trait]
impl FragmentStore for RedisFragmentStore {
    #[instrument(skip(self, header, values), fields(key = %key.storage_key(), part_index, part_total))]
    async fn append(
        &self,
        key: &FragmentKey,
        part_index: u32,
        part_total: u32,
        header: &BurstHeader,
        values: &[f64],
    ) -> DomainResult<AppendOutcome> {
        let header_json =
            serde_json::to_string(header).context("Failed to encode burst header")?;
        let values_json =
            serde_json::to_string(values).context("Failed to encode fragment values")?;

        let mut conn = self.conn.clone();
        let (stored_parts, expected_total, completed): (u32, u32, u32) = self
            .append_script
            .key(key.storage_key())
            .arg(header_json)
            .arg(part_total)
            .arg(part_index)
            .arg(values_json)
            .arg(self.ttl_millis())
            .invoke_async(&mut conn)
            .await
            .context("Failed to append fragment")?;

        debug!(stored_parts, expected_total, completed, "fragment appended");
        Ok(AppendOutcome {
            stored_parts,
            expected_total,
            completed_now: completed == 1,
        })
    }

    #[instrument(skip(self), fields(key = %key.storage_key()))]
    async fn load(&self, key: &FragmentKey) -> DomainResult<Option<BufferedBurst>> {
        let mut conn = self.conn.clone();
        let entries: HashMap<String, String> = conn
            .hgetall(key.storage_key())
            .await
            .context("Failed to load fragment set")?;
        decode_entries(&entries)
    }

    #[instrument(skip(self), fields(key = %key.storage_key()))]
    async fn remove(&self, key: &FragmentKey) -> DomainResult<()> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .del(key.storage_key())
            .await
            .context("Failed to remove fragment set")?;
        Ok(())
    }
}

/// Decode a fragment hash into a burst, concatenating part slots in index
/// order regardless of arrival order.
fn decode_entries(entries: &HashMap<String, String>) -> DomainResult<Option<BufferedBurst>> {
    if entries.is_empty() {
        return Ok(None);
    }

    let header_json = entries.get(HEADER_FIELD).ok_or_else(|| {
        DomainError::Decode("fragment set is missing its header field".to_string())
    })?;
    let header: BurstHeader = serde_json::from_str(header_json)
        .map_err(|e| DomainError::Decode(format!("corrupt burst header: {}", e)))?;

    let mut slots: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
    for (field, payload) in entries {
        let Some(index) = field.strip_prefix(PART_FIELD_PREFIX) else {
            continue;
        };
        let index: u32 = index
            .parse()
            .map_err(|_| DomainError::Decode(format!("corrupt part field '{}'", field)))?;
        let values: Vec<f64> = serde_json::from_str(payload)
            .map_err(|e| DomainError::Decode(format!("corrupt part payload: {}", e)))?;
        slots.insert(index, values);
    }

    Ok(Some(BufferedBurst {
        header,
        values: slots.into_values().flatten().collect(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn empty_hash_means_no_fragment_set() {
        assert_eq!(decode_entries(&HashMap::new()).unwrap(), None);
    }

    #[test]
    fn decodes_slots_in_part_index_order() {
        let map = entries(&[
            (
                "header",
                r#"{"base_timestamp_us":1000,"sample_rate":[2,1]}"#,
            ),
            ("total", "3"),
            ("field_3", "[5.0,6.0]"),
            ("field_1", "[1.0,2.0]"),
            ("field_2", "[3.0,4.0]"),
        ]);
        let burst = decode_entries(&map).unwrap().unwrap();
        assert_eq!(burst.values, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(burst.header.base_timestamp_us, 1000);
        assert_eq!(burst.header.sample_rate, Some((2, 1)));
    }

    #[test]
    fn part_indices_sort_numerically_not_lexically() {
        let map = entries(&[
            ("header", r#"{"base_timestamp_us":0,"sample_rate":null}"#),
            ("total", "10"),
            ("field_10", "[10.0]"),
            ("field_2", "[2.0]"),
        ]);
        let burst = decode_entries(&map).unwrap().unwrap();
        assert_eq!(burst.values, vec![2.0, 10.0]);
    }

    #[test]
    fn missing_header_is_a_decode_error() {
        let map = entries(&[("total", "2"), ("field_1", "[1.0]")]);
        assert!(matches!(
            decode_entries(&map),
            Err(DomainError::Decode(_))
        ));
    }

    #[test]
    fn corrupt_payload_is_a_decode_error() {
        let map = entries(&[
            ("header", r#"{"base_timestamp_us":0,"sample_rate":null}"#),
            ("total", "1"),
            ("field_1", "not json"),
        ]);
        assert!(matches!(
            decode_entries(&map),
            Err(DomainError::Decode(_))
        ));
    }
}
