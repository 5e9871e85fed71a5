//! In-process LRU tier, checked before the disk tier (§4.1). Each
//! namespace gets its own bounded LRU so a namespace's configured
//! `memory_limit` (§4.1 "Namespaces") evicts only within that namespace,
//! while still living behind the one lock the whole tier shares ("A
//! single lock per cache instance suffices" — §4.1 "Concurrency").

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use lru::LruCache;

/// Memory-tier record. `raw` is the decompressed payload — recompressing on
/// every memory hit would defeat the point of a fast tier.
#[derive(Clone)]
pub(crate) struct MemoryEntry {
    pub raw: Vec<u8>,
    pub expires_at: Option<DateTime<Utc>>,
}

pub(crate) struct MemoryTier {
    inner: Mutex<HashMap<String, LruCache<String, MemoryEntry>>>,
}

impl MemoryTier {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, namespace: &str, key: &str) -> Option<MemoryEntry> {
        let mut guard = self.inner.lock().expect("memory tier lock poisoned");
        let ns_cache = guard.get_mut(namespace)?;
        match ns_cache.get(key) {
            Some(entry) if !is_expired(entry) => Some(entry.clone()),
            Some(_) => {
                ns_cache.pop(key);
                None
            }
            None => None,
        }
    }

    /// Insert into `namespace`'s own LRU, sized to `capacity` entries.
    /// The `lru` crate evicts the namespace's least-recently-used entry
    /// on `put` once it is over capacity — the one eviction routine this
    /// tier has, shared by every namespace (§4.1 "Eviction").
    pub fn put(&self, namespace: &str, key: String, entry: MemoryEntry, capacity: usize) {
        let mut guard = self.inner.lock().expect("memory tier lock poisoned");
        let ns_cache = guard.entry(namespace.to_string()).or_insert_with(|| {
            LruCache::new(NonZeroUsize::new(capacity.max(1)).expect("capacity clamped to >= 1"))
        });
        ns_cache.put(key, entry);
    }

    pub fn remove(&self, namespace: &str, key: &str) {
        let mut guard = self.inner.lock().expect("memory tier lock poisoned");
        if let Some(ns_cache) = guard.get_mut(namespace) {
            ns_cache.pop(key);
        }
    }

    #[cfg(test)]
    pub fn namespace_len(&self, namespace: &str) -> usize {
        self.inner
            .lock()
            .expect("memory tier lock poisoned")
            .get(namespace)
            .map(|c| c.len())
            .unwrap_or(0)
    }
}

fn is_expired(entry: &MemoryEntry) -> bool {
    matches!(entry.expires_at, Some(expires_at) if expires_at <= Utc::now())
}
