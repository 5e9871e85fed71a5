//! Cache key construction (§4.1 "Keys").
//!
//! A key is the hex SHA-256 of the namespace and an ordered list of
//! argument parts, each length-prefixed so `["ab", "c"]` and `["a", "bc"]`
//! never collide. Callers are responsible for putting arguments in a
//! canonical order (e.g. sorted provider names) before calling.

use lex_core::{CacheKey, Fingerprint};

/// Build a cache key scoped to `namespace` from an ordered list of parts.
pub fn cache_key(namespace: &str, parts: &[&str]) -> CacheKey {
    let mut owned: Vec<&[u8]> = Vec::with_capacity(parts.len() + 1);
    owned.push(namespace.as_bytes());
    for part in parts {
        owned.push(part.as_bytes());
    }
    Fingerprint::compute(owned).to_hex()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_inputs_produce_same_key() {
        let a = cache_key("provider:wiktionary", &["cogent", "en"]);
        let b = cache_key("provider:wiktionary", &["cogent", "en"]);
        assert_eq!(a, b);
    }

    #[test]
    fn different_namespaces_produce_different_keys() {
        let a = cache_key("provider:wiktionary", &["cogent", "en"]);
        let b = cache_key("provider:dictionary_api", &["cogent", "en"]);
        assert_ne!(a, b);
    }

    #[test]
    fn part_boundaries_are_not_ambiguous() {
        let a = cache_key("ns", &["ab", "c"]);
        let b = cache_key("ns", &["a", "bc"]);
        assert_ne!(a, b);
    }
}
