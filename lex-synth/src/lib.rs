//! lex-synth — clustering, definition-text synthesis, and parallel
//! per-definition enhancement over raw provider data (§4.7), plus
//! write-through into the versioned cache.

mod cluster;
mod components;
mod definitions;
mod enhance;
mod synthesizer;

pub use cluster::{cluster_definitions, flatten_raw_definitions};
pub use components::{
    missing_word_components, ComponentDef, ComponentScope, DefinitionComponentOutput, WordComponentOutput,
    DEFINITION_COMPONENTS, WORD_COMPONENTS,
};
pub use definitions::synthesize_cluster;
pub use enhance::{enhance_definition, enhance_word, WordEnhancement};
pub use synthesizer::{load_latest, publish, synthesize, PartialSink, PIPELINE_VERSION};
