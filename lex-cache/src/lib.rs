//! lex-cache — namespaced two-tier cache (spec §4.1).
//!
//! Every entry lives in a namespace (`provider:wiktionary`, `llm:cluster`,
//! `entry:v1`, ...) and is addressed by a hex cache key built from
//! [`cache_key`]. Reads check an in-process LRU first, then an
//! LMDB-backed disk tier; writes go to both. [`Cache::get_or_build`]
//! coalesces concurrent builders for the same key so that a cache
//! stampede on a hot word produces exactly one upstream fetch.

mod compress;
mod disk;
mod key;
mod memory;
mod namespaces;
mod store;
mod versioned;

pub use compress::{compress, decompress};
pub use key::cache_key;
pub use namespaces::{NamespaceRegistry, NamespaceSpec, SizeClass};
pub use store::{Cache, CacheStats};
pub use versioned::{Versioned, INLINE_THRESHOLD_BYTES};
