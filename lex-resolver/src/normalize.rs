//! Query normalization (§4.4 step 1). One single-pass pure function;
//! intermediate strings are not observable outside this module.

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Common English contractions, expanded before scoring so `"don't"` and
/// `"do not"` resolve to the same canonical query.
static CONTRACTIONS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("don't", "do not"),
        ("doesn't", "does not"),
        ("didn't", "did not"),
        ("can't", "cannot"),
        ("won't", "will not"),
        ("isn't", "is not"),
        ("aren't", "are not"),
        ("wasn't", "was not"),
        ("weren't", "were not"),
        ("it's", "it is"),
        ("i'm", "i am"),
        ("we're", "we are"),
        ("they're", "they are"),
        ("you're", "you are"),
        ("that's", "that is"),
        ("there's", "there is"),
        ("let's", "let us"),
    ])
});

/// Normalize a raw user query into its canonical form (§4.4 step 1).
///
/// Steps, in order: transliterate to ASCII (folds diacritics and the
/// small Unicode-compatibility mappings `deunicode` carries), lowercase,
/// strip punctuation other than `'` and `-`, collapse whitespace, expand
/// contractions. Input is already valid UTF-8 by the time it reaches this
/// function (invalid-byte recovery happens at the HTTP decoding boundary,
/// not here), so "fix broken encoding" has no separate step in this pass.
pub fn normalize_query(raw: &str) -> String {
    let transliterated = deunicode::deunicode(raw);
    let lowered = transliterated.to_lowercase();

    let stripped: String = lowered
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '\'' || c == '-' || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();

    let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");

    collapsed
        .split(' ')
        .map(|word| CONTRACTIONS.get(word).copied().unwrap_or(word))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_trims() {
        assert_eq!(normalize_query("  Cogent  "), "cogent");
    }

    #[test]
    fn strips_punctuation_but_keeps_apostrophe_and_hyphen() {
        assert_eq!(normalize_query("well-being!"), "well-being");
        assert_eq!(normalize_query("rock'n'roll?"), "rock'n'roll");
    }

    #[test]
    fn folds_diacritics() {
        assert_eq!(normalize_query("café"), "cafe");
        assert_eq!(normalize_query("naïve"), "naive");
    }

    #[test]
    fn expands_contractions() {
        assert_eq!(normalize_query("don't"), "do not");
    }

    #[test]
    fn collapses_internal_whitespace() {
        assert_eq!(normalize_query("a    big   word"), "a big word");
    }

    #[test]
    fn is_idempotent() {
        let once = normalize_query("Café don't Worry!");
        let twice = normalize_query(&once);
        assert_eq!(once, twice);
    }
}
