//! The pipeline's unary request/response shapes (§4.8, §6).

use lex_core::ModelTier;
use serde::{Deserialize, Serialize};

/// One lookup request, independent of transport (unary JSON or SSE both
/// build one of these and hand it to [`crate::Pipeline::lookup`]).
#[derive(Debug, Clone)]
pub struct LookupRequest {
    pub query: String,
    /// `None` means "use `providers.selected` from config" (§6).
    pub providers: Option<Vec<String>>,
    /// The resolver indexes one flat vocabulary (no per-language split, see
    /// DESIGN.md); the first language named here (default `"en"`) is used
    /// as the `Word.language` tag carried through synthesis and caching.
    pub languages: Vec<String>,
    pub force_refresh: bool,
    pub no_ai: bool,
    pub model_tier: ModelTier,
}

impl LookupRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            providers: None,
            languages: Vec::new(),
            force_refresh: false,
            no_ai: false,
            model_tier: ModelTier::Medium,
        }
    }

    pub fn language(&self) -> &str {
        self.languages.first().map(String::as_str).unwrap_or("en")
    }
}

/// Outcome of one resolved-and-built entry (§4.8 step 4): either the full
/// synthesizer ran, or providers returned data with AI disabled and the
/// entry is a raw pass-through with no enhancement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryOrigin {
    Synthesized,
    RawPassthrough,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_defaults_to_en() {
        let req = LookupRequest::new("cogent");
        assert_eq!(req.language(), "en");
    }

    #[test]
    fn language_uses_first_requested() {
        let mut req = LookupRequest::new("cogent");
        req.languages = vec!["fr".to_string(), "en".to_string()];
        assert_eq!(req.language(), "fr");
    }
}
