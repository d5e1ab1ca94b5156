//! Cache containers
//!
//! [`TwoLevelIndex`] is the `outer key -> inner key -> record` shape used for
//! account-partitioned namespaces and device-partitioned filesets. Both levels
//! keep the order in which the array listed the entries.
//!
//! [`CacheCell`] holds one cache behind a read/write lock. Refreshes build the
//! new value off-lock and swap it in, so readers see either the old or the new
//! generation, never a partial rebuild.

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

// =============================================================================
// Two-Level Index
// =============================================================================

/// Ordered map of ordered maps
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TwoLevelIndex<V> {
    partitions: IndexMap<String, IndexMap<String, V>>,
}

impl<V> Default for TwoLevelIndex<V> {
    fn default() -> Self {
        Self {
            partitions: IndexMap::new(),
        }
    }
}

impl<V> TwoLevelIndex<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// An index with an empty partition for every key, in the given order
    pub fn with_partitions<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        let mut index = Self::new();
        for key in keys {
            index.ensure_partition(key);
        }
        index
    }

    /// Get or create the partition for `key`
    pub fn ensure_partition(&mut self, key: impl Into<String>) -> &mut IndexMap<String, V> {
        self.partitions.entry(key.into()).or_default()
    }

    pub fn insert(
        &mut self,
        outer: impl Into<String>,
        inner: impl Into<String>,
        value: V,
    ) -> Option<V> {
        self.ensure_partition(outer).insert(inner.into(), value)
    }

    pub fn partition(&self, outer: &str) -> Option<&IndexMap<String, V>> {
        self.partitions.get(outer)
    }

    pub fn get(&self, outer: &str, inner: &str) -> Option<&V> {
        self.partitions.get(outer)?.get(inner)
    }

    /// Number of partitions
    pub fn len(&self) -> usize {
        self.partitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }

    /// Number of records across all partitions
    pub fn entry_count(&self) -> usize {
        self.partitions.values().map(IndexMap::len).sum()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.partitions.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &IndexMap<String, V>)> {
        self.partitions.iter()
    }

    /// Every record, partition by partition
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.partitions.values().flat_map(IndexMap::values)
    }
}

impl<V: Clone> TwoLevelIndex<V> {
    /// Sub-index for the requested outer keys, in request order
    ///
    /// Keys missing from this index yield an empty partition.
    pub fn select<S: AsRef<str>>(&self, keys: &[S]) -> Self {
        let mut selected = Self::new();
        for key in keys {
            let key = key.as_ref();
            let partition = selected.ensure_partition(key);
            if let Some(existing) = self.partitions.get(key) {
                partition.extend(existing.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
        }
        selected
    }

    /// Copy keeping every partition but only the records matching `keep`
    pub fn filter_records(&self, mut keep: impl FnMut(&V) -> bool) -> Self {
        let partitions = self
            .partitions
            .iter()
            .map(|(outer, inner)| {
                let kept = inner
                    .iter()
                    .filter(|(_, v)| keep(v))
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                (outer.clone(), kept)
            })
            .collect();
        Self { partitions }
    }
}

// =============================================================================
// Cache Cell
// =============================================================================

/// One cache generation behind a read/write lock
///
/// `None` until the first refresh or explicit [`CacheCell::replace`].
#[derive(Debug)]
pub struct CacheCell<T> {
    value: RwLock<Option<T>>,
}

impl<T> Default for CacheCell<T> {
    fn default() -> Self {
        Self {
            value: RwLock::new(None),
        }
    }
}

impl<T: Clone> CacheCell<T> {
    /// Current generation, if any
    pub fn get(&self) -> Option<T> {
        self.value.read().clone()
    }

    /// Swap in a new generation
    pub fn replace(&self, value: T) {
        *self.value.write() = Some(value);
    }

    /// Store `value` only if the cell has never been filled
    ///
    /// Returns the generation the cell holds afterwards, which is the existing
    /// one when another caller filled or overwrote it first.
    pub fn fill_if_empty(&self, value: T) -> T {
        self.value.write().get_or_insert(value).clone()
    }
}

/// Swap new generations into two cells at once
///
/// Both write locks are held for the swap, `first` before `second`.
pub fn replace_pair<A, B>(first: &CacheCell<A>, a: A, second: &CacheCell<B>, b: B) {
    let mut first_guard = first.value.write();
    let mut second_guard = second.value.write();
    *first_guard = Some(a);
    *second_guard = Some(b);
}
