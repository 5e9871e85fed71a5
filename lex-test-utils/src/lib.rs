//! lex-test-utils — shared fixtures and mocks for the workspace's test
//! suites: sample data-model values, a configurable mock
//! `DictionaryProvider`, and harness builders for a scratch cache,
//! resolver, and assembled pipeline.

mod fixtures;
mod harness;
mod mock_provider;

pub use fixtures::{
    provider_data, provider_error, raw_definition, synthesized_definition, synthesized_entry, word,
};
pub use harness::{test_cache, test_config, test_fetcher, test_llm, test_pipeline, test_resolver, TestCache};
pub use mock_provider::{MockBehavior, MockProvider};
