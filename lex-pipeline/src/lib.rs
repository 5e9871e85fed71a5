//! lex-pipeline — end-to-end lookup orchestration (§4.8): resolve, fetch,
//! conditionally synthesize, publish, with cancellation and deadlines
//! (§5) threaded through every suspension point.

mod orchestrator;
mod passthrough;
mod request;

pub use orchestrator::{with_call_timeout, Pipeline};
pub use passthrough::build_passthrough_entry;
pub use request::{EntryOrigin, LookupRequest};
