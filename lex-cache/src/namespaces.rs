//! Namespace registry (§4.1): "Configuration is data-driven: each
//! namespace declares size class (small/medium/large) and disk TTL; all
//! other fields derive from the size class." One registry, consulted by
//! every read/write/eviction call site — not a pile of per-namespace
//! constants scattered through the crate.

use std::collections::HashMap;
use std::time::Duration;

use lex_core::Compression;

/// Coarse size class a namespace belongs to. Everything except
/// `disk_ttl` (memory entry cap, memory TTL, disk compression codec)
/// derives from this alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeClass {
    Small,
    Medium,
    Large,
}

impl SizeClass {
    pub fn memory_limit(self) -> usize {
        match self {
            SizeClass::Small => 1_000,
            SizeClass::Medium => 10_000,
            SizeClass::Large => 50_000,
        }
    }

    pub fn memory_ttl(self) -> Duration {
        match self {
            SizeClass::Small => Duration::from_secs(5 * 60),
            SizeClass::Medium => Duration::from_secs(30 * 60),
            SizeClass::Large => Duration::from_secs(2 * 60 * 60),
        }
    }

    pub fn compression(self) -> Compression {
        match self {
            SizeClass::Small => Compression::None,
            SizeClass::Medium => Compression::Lz4,
            SizeClass::Large => Compression::Zstd,
        }
    }
}

/// A namespace's resolved configuration (§4.1 "Namespaces").
#[derive(Debug, Clone, Copy)]
pub struct NamespaceSpec {
    pub size_class: SizeClass,
    pub disk_ttl: Option<Duration>,
}

impl NamespaceSpec {
    pub fn memory_limit(&self) -> usize {
        self.size_class.memory_limit()
    }

    pub fn memory_ttl(&self) -> Duration {
        self.size_class.memory_ttl()
    }

    pub fn compression(&self) -> Compression {
        self.size_class.compression()
    }
}

const fn spec(size_class: SizeClass, disk_ttl_secs: Option<u64>) -> NamespaceSpec {
    NamespaceSpec {
        size_class,
        disk_ttl: match disk_ttl_secs {
            Some(secs) => Some(Duration::from_secs(secs)),
            None => None,
        },
    }
}

/// Namespace registry: one lookup table consulted by `Cache::get_bytes`,
/// `put_bytes`, and memory-tier eviction alike (§4.1 "one implementation,
/// not per-decorator variants"). Unregistered namespaces fall back to
/// `generic-default`.
pub struct NamespaceRegistry {
    specs: HashMap<&'static str, NamespaceSpec>,
    default: NamespaceSpec,
}

impl NamespaceRegistry {
    pub fn spec(&self, namespace: &str) -> NamespaceSpec {
        self.specs.get(namespace).copied().unwrap_or(self.default)
    }
}

impl Default for NamespaceRegistry {
    fn default() -> Self {
        builtin()
    }
}

const ONE_HOUR: u64 = 60 * 60;
const ONE_DAY: u64 = 24 * ONE_HOUR;
const ONE_WEEK: u64 = 7 * ONE_DAY;
const THIRTY_DAYS: u64 = 30 * ONE_DAY;

/// The namespaces §4.1 names explicitly, plus the concrete namespace
/// strings the rest of the crate family actually writes under.
fn builtin() -> NamespaceRegistry {
    let mut specs = HashMap::new();

    // generic-default: small, short-lived, uncompressed — the fallback
    // for anything not covered below.
    let default = spec(SizeClass::Small, Some(ONE_HOUR));

    // provider-raw (§4.5 "TTL at least 24 hours").
    specs.insert("provider:raw", spec(SizeClass::Medium, Some(ONE_DAY)));

    // resolver/lexicon: the resolver's normalized vocabulary index.
    specs.insert("resolver:lexicon", spec(SizeClass::Large, Some(ONE_WEEK)));

    // search-queries: ranked search results for a raw query string.
    specs.insert("search:queries", spec(SizeClass::Small, Some(10 * 60)));

    // semantic-vectors: the embedding index backing the resolver's
    // semantic leg.
    specs.insert("semantic:vectors", spec(SizeClass::Large, Some(ONE_WEEK)));

    // LLM-responses (§4.6 "cached... for at least 24 hours").
    specs.insert("llm:response", spec(SizeClass::Medium, Some(ONE_DAY)));
    specs.insert("llm:embedding", spec(SizeClass::Medium, Some(ONE_DAY)));

    // language lookups: per-(word, language) resolved lexicon entries.
    specs.insert("lexicon:language", spec(SizeClass::Medium, Some(ONE_WEEK)));

    // synthesized entries: version-specific records never go stale
    // (content-addressed by fingerprint) but still need a disk TTL so
    // abandoned versions age out; the "latest" pointer shares the class.
    specs.insert("synthesized:entry", spec(SizeClass::Large, Some(THIRTY_DAYS)));
    specs.insert("content:synthesized-entry", spec(SizeClass::Large, Some(THIRTY_DAYS)));
    specs.insert("content:v1", spec(SizeClass::Large, Some(THIRTY_DAYS)));

    NamespaceRegistry { specs, default }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_namespace_resolves_its_own_spec() {
        let registry = NamespaceRegistry::default();
        let provider = registry.spec("provider:raw");
        assert_eq!(provider.size_class, SizeClass::Medium);
        assert_eq!(provider.disk_ttl, Some(Duration::from_secs(ONE_DAY)));
    }

    #[test]
    fn unknown_namespace_falls_back_to_generic_default() {
        let registry = NamespaceRegistry::default();
        let fallback = registry.spec("some-namespace-nobody-registered");
        assert_eq!(fallback.size_class, SizeClass::Small);
        assert_eq!(fallback.disk_ttl, Some(Duration::from_secs(ONE_HOUR)));
    }

    #[test]
    fn size_class_derives_everything_but_disk_ttl() {
        assert_eq!(SizeClass::Small.memory_limit(), 1_000);
        assert_eq!(SizeClass::Medium.memory_limit(), 10_000);
        assert_eq!(SizeClass::Large.memory_limit(), 50_000);
        assert_eq!(SizeClass::Large.compression(), Compression::Zstd);
    }
}
