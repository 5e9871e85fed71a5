//! Two-tier cache with request coalescing (§4.1).

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use lex_core::{CacheConfig as CacheSettings, CacheError, LexError, LexResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::OnceCell;
use tracing::{debug, instrument};

use crate::compress::{compress, decompress};
use crate::disk::DiskTier;
use crate::memory::{MemoryEntry, MemoryTier};
use crate::namespaces::NamespaceRegistry;

/// A handle to the single builder computing a key's value, shared by every
/// caller that asks for the same key while it is in flight. `OnceCell`
/// gives us coalescing for free: the first caller runs the future, every
/// other caller just awaits the same cell.
type InFlight = Arc<OnceCell<LexResult<Vec<u8>>>>;

#[derive(Debug, Default, Clone, Copy)]
pub struct CacheStats {
    pub memory_hits: u64,
    pub disk_hits: u64,
    pub misses: u64,
    pub builds: u64,
    pub coalesced: u64,
}

struct Counters {
    memory_hits: AtomicU64,
    disk_hits: AtomicU64,
    misses: AtomicU64,
    builds: AtomicU64,
    coalesced: AtomicU64,
}

impl Default for Counters {
    fn default() -> Self {
        Self {
            memory_hits: AtomicU64::new(0),
            disk_hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            builds: AtomicU64::new(0),
            coalesced: AtomicU64::new(0),
        }
    }
}

/// Namespaced two-tier cache: in-process LRU in front of an LMDB-backed
/// disk tier, with at-most-one-builder-per-key coalescing (§4.1). Every
/// namespace's memory cap, memory TTL, disk TTL, and disk compression
/// codec come from the one shared [`NamespaceRegistry`] — there is no
/// per-call-site override of those fields.
pub struct Cache {
    memory: MemoryTier,
    disk: DiskTier,
    namespaces: NamespaceRegistry,
    inflight: DashMap<String, InFlight>,
    counters: Counters,
}

impl Cache {
    pub fn open(settings: &CacheSettings) -> LexResult<Self> {
        let disk = DiskTier::open(&settings.disk_root, settings.disk_limit_bytes as usize)
            .map_err(|e| LexError::Cache(CacheError::DiskIo {
                namespace: "*".to_string(),
                reason: e.to_string(),
            }))?;
        Ok(Self {
            memory: MemoryTier::new(),
            disk,
            namespaces: NamespaceRegistry::default(),
            inflight: DashMap::new(),
            counters: Counters::default(),
        })
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            memory_hits: self.counters.memory_hits.load(Ordering::Relaxed),
            disk_hits: self.counters.disk_hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            builds: self.counters.builds.load(Ordering::Relaxed),
            coalesced: self.counters.coalesced.load(Ordering::Relaxed),
        }
    }

    fn inflight_key(namespace: &str, key: &str) -> String {
        format!("{namespace}:{key}")
    }

    /// Raw bytes lookup, checking memory then disk. Promotes disk hits back
    /// into the memory tier, evicted per the namespace's own `memory_limit`
    /// (§4.1 "on disk hit promotes to memory (evicting LRU as needed)").
    #[instrument(skip(self), fields(namespace, key))]
    pub fn get_bytes(&self, namespace: &str, key: &str) -> LexResult<Option<Vec<u8>>> {
        if let Some(entry) = self.memory.get(namespace, key) {
            self.counters.memory_hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Some(entry.raw));
        }

        match self.disk.get(namespace, key)? {
            Some((compression, expires_at, compressed)) => {
                if let Some(expires_at) = expires_at {
                    if expires_at <= Utc::now() {
                        self.disk.remove(namespace, key)?;
                        self.counters.misses.fetch_add(1, Ordering::Relaxed);
                        return Ok(None);
                    }
                }
                self.counters.disk_hits.fetch_add(1, Ordering::Relaxed);
                let raw = decompress(compression, &compressed)?;
                let spec = self.namespaces.spec(namespace);
                self.memory.put(
                    namespace,
                    key.to_string(),
                    MemoryEntry {
                        raw: raw.clone(),
                        expires_at: expires_at.or_else(|| Some(Utc::now() + chrono_duration(spec.memory_ttl()))),
                    },
                    spec.memory_limit(),
                );
                Ok(Some(raw))
            }
            None => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
        }
    }

    /// Store raw bytes in both tiers, per the namespace's own config
    /// (§4.1 "set(ns, key, value, ttl_override?)"): `ttl` overrides both
    /// tiers' expiry when given; otherwise the memory tier uses the
    /// namespace's `memory_ttl` and the disk tier uses its `disk_ttl` (a
    /// namespace with no `disk_ttl` is memory-only). Disk payloads are
    /// compressed with the namespace's own codec, never a process-wide
    /// default.
    pub fn put_bytes(
        &self,
        namespace: &str,
        key: &str,
        bytes: &[u8],
        ttl: Option<Duration>,
    ) -> LexResult<()> {
        let spec = self.namespaces.spec(namespace);

        let memory_ttl = ttl.unwrap_or_else(|| spec.memory_ttl());
        let memory_expires_at = Some(Utc::now() + chrono_duration(memory_ttl));
        self.memory.put(
            namespace,
            key.to_string(),
            MemoryEntry {
                raw: bytes.to_vec(),
                expires_at: memory_expires_at,
            },
            spec.memory_limit(),
        );

        if let Some(disk_ttl) = ttl.or(spec.disk_ttl) {
            let compression = spec.compression();
            let compressed = compress(compression, bytes)?;
            let expires_at = Some(Utc::now() + chrono_duration(disk_ttl));
            self.disk.put(namespace, key, compression, expires_at, &compressed)?;
        }
        Ok(())
    }

    pub fn invalidate(&self, namespace: &str, key: &str) -> LexResult<()> {
        self.memory.remove(namespace, key);
        self.disk.remove(namespace, key)
    }

    /// Get-or-build with coalescing: concurrent callers for the same
    /// `(namespace, key)` share a single in-flight builder (§4.1). A
    /// builder's error is not cached — it is returned to every waiter and
    /// the slot is cleared so the next caller retries.
    pub async fn get_or_build<F, Fut>(
        &self,
        namespace: &str,
        key: &str,
        ttl: Option<Duration>,
        build: F,
    ) -> LexResult<Vec<u8>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = LexResult<Vec<u8>>>,
    {
        if let Some(bytes) = self.get_bytes(namespace, key)? {
            return Ok(bytes);
        }

        let inflight_key = Self::inflight_key(namespace, key);
        let cell = {
            let mut first = false;
            let entry = self.inflight.entry(inflight_key.clone()).or_insert_with(|| {
                first = true;
                Arc::new(OnceCell::new())
            });
            if !first {
                self.counters.coalesced.fetch_add(1, Ordering::Relaxed);
            }
            Arc::clone(entry.value())
        };

        self.counters.builds.fetch_add(1, Ordering::Relaxed);
        let result = cell.get_or_try_init(|| async { Ok::<_, LexError>(build().await) }).await;

        // Always drop our slot once the build settles, win or lose, so a
        // later request (e.g. after a transient upstream failure) retries
        // rather than replaying a stale OnceCell forever.
        self.inflight.remove_if(&inflight_key, |_, v| Arc::ptr_eq(v, &cell));

        let built: LexResult<Vec<u8>> = result
            .expect("build future is infallible at the OnceCell layer")
            .clone();
        let built = built?;

        if let Err(e) = self.put_bytes(namespace, key, &built, ttl) {
            debug!(error = %e, namespace, key, "failed to persist freshly built cache entry");
        }

        Ok(built)
    }

    pub async fn get_or_build_json<T, F, Fut>(
        &self,
        namespace: &str,
        key: &str,
        ttl: Option<Duration>,
        build: F,
    ) -> LexResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = LexResult<T>>,
    {
        let bytes = self
            .get_or_build(namespace, key, ttl, || async {
                let value = build().await?;
                serde_json::to_vec(&value).map_err(|e| LexError::Internal(format!("serialize cache value: {e}")))
            })
            .await?;
        serde_json::from_slice(&bytes).map_err(|e| LexError::Internal(format!("deserialize cache value: {e}")))
    }
}

fn chrono_duration(std_duration: Duration) -> chrono::Duration {
    chrono::Duration::from_std(std_duration).unwrap_or(chrono::Duration::zero())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc as StdArc;

    fn test_cache() -> (Cache, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = lex_core::LexConfig::development().cache;
        settings.disk_root = dir.path().to_string_lossy().to_string();
        settings.disk_limit_bytes = 16 << 20;
        (Cache::open(&settings).unwrap(), dir)
    }

    #[tokio::test]
    async fn put_then_get_roundtrips() {
        let (cache, _dir) = test_cache();
        cache
            .put_bytes("provider:wiktionary", "cogent:en", b"hello", None)
            .unwrap();
        let got = cache.get_bytes("provider:wiktionary", "cogent:en").unwrap();
        assert_eq!(got, Some(b"hello".to_vec()));
    }

    #[tokio::test]
    async fn expired_entries_are_not_returned() {
        let (cache, _dir) = test_cache();
        cache
            .put_bytes("ns", "k", b"v", Some(Duration::from_millis(1)))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(cache.get_bytes("ns", "k").unwrap(), None);
    }

    #[tokio::test]
    async fn concurrent_get_or_build_calls_coalesce() {
        let (cache, _dir) = test_cache();
        let cache = StdArc::new(cache);
        let call_count = StdArc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = StdArc::clone(&cache);
            let call_count = StdArc::clone(&call_count);
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_build("ns", "shared-key", None, || {
                        let call_count = StdArc::clone(&call_count);
                        async move {
                            call_count.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(20)).await;
                            Ok(b"built".to_vec())
                        }
                    })
                    .await
                    .unwrap()
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap(), b"built".to_vec());
        }
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_build_is_retried_on_next_call() {
        let (cache, _dir) = test_cache();
        let attempt = AtomicUsize::new(0);

        let first = cache
            .get_or_build("ns", "flaky", None, || async {
                attempt.fetch_add(1, Ordering::SeqCst);
                Err(LexError::UpstreamUnavailable)
            })
            .await;
        assert!(first.is_err());

        let second = cache
            .get_or_build("ns", "flaky", None, || async {
                attempt.fetch_add(1, Ordering::SeqCst);
                Ok(b"recovered".to_vec())
            })
            .await
            .unwrap();
        assert_eq!(second, b"recovered");
        assert_eq!(attempt.load(Ordering::SeqCst), 2);
    }

    /// `search:queries` is registered `Small` (1,000-entry memory cap, §4.1
    /// "evicts memory LRU down to `memory_limit`"); a namespace other than
    /// the one filling up keeps its own cap and is unaffected (§4.1 "one
    /// eviction routine", applied per namespace).
    #[tokio::test]
    async fn memory_eviction_is_scoped_to_its_own_namespace() {
        let (cache, _dir) = test_cache();
        for i in 0..(crate::namespaces::SizeClass::Small.memory_limit() + 10) {
            cache
                .put_bytes("search:queries", &format!("q{i}"), b"v", None)
                .unwrap();
        }
        cache.put_bytes("llm:response", "untouched", b"v", None).unwrap();

        assert_eq!(cache.memory.namespace_len("search:queries"), crate::namespaces::SizeClass::Small.memory_limit());
        assert_eq!(
            cache.get_bytes("llm:response", "untouched").unwrap(),
            Some(b"v".to_vec())
        );
    }

    #[test]
    fn namespace_without_disk_entry_defaults_to_generic_small() {
        let registry = NamespaceRegistry::default();
        let spec = registry.spec("some-ad-hoc-namespace");
        assert_eq!(spec.memory_limit(), crate::namespaces::SizeClass::Small.memory_limit());
    }
}
