//! lex-llm — structured-output LLM RPC client (§4.6).
//!
//! [`LlmClient::chat_structured`] is the single entry point every other
//! crate in the workspace calls: it resolves a task's complexity tier to a
//! concrete model, renders a named prompt template, computes the
//! token-budget field the target model actually accepts, and caches the
//! response (coalescing concurrent identical requests) the same way the
//! provider fetcher caches HTTP fetches.

mod client;
mod templates;
mod tiering;
mod types;

pub use client::{ChatRequest, LlmClient};
pub use templates::{PromptTemplate, TemplateRegistry};
pub use tiering::{token_budget, TokenBudget};
pub use types::Usage;
