//! Versioned storage: small values live inline in the cache's own record,
//! large ones get a content-addressed location instead (§4.1, §3). Centralizing
//! the inline-vs-external decision here keeps callers ignorant of cache
//! internals — they just call `store`/`load` on a `Versioned<T>`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use lex_core::{LexError, LexResult};

use crate::store::Cache;

/// Payloads at or above this size are stored under a content-addressed key
/// in the `content:*` namespace instead of inline in the entry record.
pub const INLINE_THRESHOLD_BYTES: usize = 16 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Location {
    Inline(Vec<u8>),
    External { namespace: String, key: String },
}

/// A cache record that knows how to place its own payload: inline when
/// small, content-addressed when large.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Versioned<T> {
    location: Location,
    #[serde(skip)]
    _marker: std::marker::PhantomData<T>,
}

impl<T: Serialize + DeserializeOwned> Versioned<T> {
    /// Serialize `value` and place it: inline if small, external otherwise.
    /// `content_namespace` names the namespace used for external blobs
    /// (callers typically pass something like `"content:v1"`).
    pub async fn store(
        cache: &Cache,
        content_namespace: &str,
        content_key: &str,
        ttl: Option<Duration>,
        value: &T,
    ) -> LexResult<Self> {
        let bytes = serde_json::to_vec(value)
            .map_err(|e| LexError::Internal(format!("serialize versioned value: {e}")))?;

        let location = if bytes.len() < INLINE_THRESHOLD_BYTES {
            Location::Inline(bytes)
        } else {
            cache.put_bytes(content_namespace, content_key, &bytes, ttl)?;
            Location::External {
                namespace: content_namespace.to_string(),
                key: content_key.to_string(),
            }
        };

        Ok(Self {
            location,
            _marker: std::marker::PhantomData,
        })
    }

    /// Resolve back to `T`, fetching from the content namespace if this
    /// record pointed externally.
    pub fn load(&self, cache: &Cache) -> LexResult<T> {
        let bytes = match &self.location {
            Location::Inline(bytes) => bytes.clone(),
            Location::External { namespace, key } => {
                cache.get_bytes(namespace, key)?.ok_or_else(|| {
                    LexError::Cache(lex_core::CacheError::ContentLocationMissing {
                        namespace: namespace.clone(),
                        key: key.clone(),
                    })
                })?
            }
        };
        serde_json::from_slice(&bytes)
            .map_err(|e| LexError::Internal(format!("deserialize versioned value: {e}")))
    }

    pub fn is_inline(&self) -> bool {
        matches!(self.location, Location::Inline(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Small {
        word: String,
    }

    fn test_cache() -> (Cache, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = lex_core::LexConfig::development().cache;
        settings.disk_root = dir.path().to_string_lossy().to_string();
        (Cache::open(&settings).unwrap(), dir)
    }

    #[tokio::test]
    async fn small_values_store_inline() {
        let (cache, _dir) = test_cache();
        let value = Small { word: "cogent".to_string() };
        let versioned = Versioned::store(&cache, "content:v1", "k1", None, &value)
            .await
            .unwrap();
        assert!(versioned.is_inline());
        assert_eq!(versioned.load(&cache).unwrap(), value);
    }

    #[tokio::test]
    async fn large_values_store_externally_and_still_load() {
        let (cache, _dir) = test_cache();
        let value = Small {
            word: "x".repeat(INLINE_THRESHOLD_BYTES * 2),
        };
        let versioned = Versioned::store(&cache, "content:v1", "k2", None, &value)
            .await
            .unwrap();
        assert!(!versioned.is_inline());
        assert_eq!(versioned.load(&cache).unwrap(), value);
    }
}
