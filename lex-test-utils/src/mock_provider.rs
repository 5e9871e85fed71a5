//! A configurable [`DictionaryProvider`] double, generalized from the
//! one-off mock each crate's own test module used to hand-roll (see
//! `lex-pipeline`'s `orchestrator.rs` tests, which this is grounded on).

use async_trait::async_trait;
use lex_core::{ProviderData, ProviderError, Word};
use lex_providers::DictionaryProvider;

/// What a [`MockProvider`] does when asked to fetch.
pub enum MockBehavior {
    Ok(ProviderData),
    Error(ProviderError),
    /// Panics if called — use this to assert a provider is never reached
    /// (e.g. because a cache hit should have short-circuited the fetch).
    Unreachable,
}

pub struct MockProvider {
    name: &'static str,
    host: &'static str,
    behavior: MockBehavior,
}

impl MockProvider {
    pub fn new(name: &'static str, behavior: MockBehavior) -> Self {
        Self { name, host: "mock.invalid", behavior }
    }

    pub fn ok(name: &'static str, data: ProviderData) -> Self {
        Self::new(name, MockBehavior::Ok(data))
    }

    pub fn error(name: &'static str, reason: &str) -> Self {
        Self::new(
            name,
            MockBehavior::Error(ProviderError::RequestFailed { provider: name.to_string(), reason: reason.to_string() }),
        )
    }

    pub fn unreachable(name: &'static str) -> Self {
        Self::new(name, MockBehavior::Unreachable)
    }
}

#[async_trait]
impl DictionaryProvider for MockProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    fn host(&self) -> &'static str {
        self.host
    }

    async fn fetch_raw(&self, _word: &Word) -> Result<ProviderData, ProviderError> {
        match &self.behavior {
            MockBehavior::Ok(data) => Ok(data.clone()),
            MockBehavior::Error(err) => Err(err.clone()),
            MockBehavior::Unreachable => panic!("provider {} should not have been called", self.name),
        }
    }
}
