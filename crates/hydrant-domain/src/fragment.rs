use crate::error::DomainResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

/// Composite identifier for one in-flight burst: the millisecond time
/// bucket of the burst's base timestamp plus the transport source id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FragmentKey {
    pub bucket_ms: i64,
    pub source_id: String,
}

impl FragmentKey {
    /// Derive the key for a fragment from its base timestamp. All fragments
    /// of one burst share the base timestamp, so they land in one bucket.
    pub fn from_base_timestamp(base_timestamp_us: i64, source_id: &str) -> Self {
        Self {
            bucket_ms: base_timestamp_us / 1_000,
            source_id: source_id.to_string(),
        }
    }

    pub fn storage_key(&self) -> String {
        format!("fragments:{}:{}", self.bucket_ms, self.source_id)
    }
}

/// Burst header captured from the first fragment of a set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BurstHeader {
    pub base_timestamp_us: i64,
    pub sample_rate: Option<(u32, u32)>,
}

/// Result of appending one fragment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AppendOutcome {
    pub stored_parts: u32,
    pub expected_total: u32,
    /// True for exactly the one append that transitioned the set to
    /// complete. Racing appends of the final fragment (same or different
    /// processes) observe this at most once, which is what keeps two
    /// workers from both draining the same burst.
    pub completed_now: bool,
}

/// A fully buffered burst: header plus values concatenated in part-index
/// order, independent of arrival order.
#[derive(Debug, Clone, PartialEq)]
pub struct BufferedBurst {
    pub header: BurstHeader,
    pub values: Vec<f64>,
}

/// Durable, cross-instance accumulator for multi-part bursts.
///
/// `append` must be atomic against the shared store: the expected total and
/// header are fixed by the first fragment, a repeated `(key, part_index)`
/// overwrites its slot rather than duplicating it, and the completion
/// signal fires exactly once per set. State is removed only by `remove`,
/// after both downstream artifacts were published; an expiry policy
/// reclaims sets whose sibling fragments never arrive.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait FragmentStore: Send + Sync {
    async fn append(
        &self,
        key: &FragmentKey,
        part_index: u32,
        part_total: u32,
        header: &BurstHeader,
        values: &[f64],
    ) -> DomainResult<AppendOutcome>;

    async fn load(&self, key: &FragmentKey) -> DomainResult<Option<BufferedBurst>>;

    async fn remove(&self, key: &FragmentKey) -> DomainResult<()>;
}

#[derive(Debug)]
struct FragmentEntry {
    header: BurstHeader,
    expected_total: u32,
    slots: BTreeMap<u32, Vec<f64>>,
}

/// Process-local fragment store for tests.
///
/// Only safe when a single worker instance consumes the subscription, and
/// it implements no expiry: a set whose sibling fragments never arrive
/// stays buffered until the process exits. Deployments use the
/// Redis-backed store.
#[derive(Debug, Default)]
pub struct InMemoryFragmentStore {
    entries: Mutex<HashMap<String, FragmentEntry>>,
}

impl InMemoryFragmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of buffered (incomplete or unpublished) fragment sets.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl FragmentStore for InMemoryFragmentStore {
    async fn append(
        &self,
        key: &FragmentKey,
        part_index: u32,
        part_total: u32,
        header: &BurstHeader,
        values: &[f64],
    ) -> DomainResult<AppendOutcome> {
        let mut entries = self.entries.lock().unwrap();
        let entry = entries
            .entry(key.storage_key())
            .or_insert_with(|| FragmentEntry {
                header: *header,
                expected_total: part_total,
                slots: BTreeMap::new(),
            });

        let before = entry.slots.len() as u32;
        entry.slots.insert(part_index, values.to_vec());
        let after = entry.slots.len() as u32;

        Ok(AppendOutcome {
            stored_parts: after,
            expected_total: entry.expected_total,
            completed_now: after == entry.expected_total && after > before,
        })
    }

    async fn load(&self, key: &FragmentKey) -> DomainResult<Option<BufferedBurst>> {
        let entries = self.entries.lock().unwrap();
        Ok(entries.get(&key.storage_key()).map(|entry| BufferedBurst {
            header: entry.header,
            values: entry.slots.values().flatten().copied().collect(),
        }))
    }

    async fn remove(&self, key: &FragmentKey) -> DomainResult<()> {
        self.entries.lock().unwrap().remove(&key.storage_key());
        Ok(())
    }
}
