//! lex-events — per-request progress/stage state tracker feeding the SSE
//! streaming transport (§4.2).
//!
//! A [`tracker::StateTracker`] is created once per request and is the only
//! writer to its own broadcast channel, so the monotone-progress,
//! single-terminal-event invariants (§8) hold by construction rather than
//! by convention.

mod registry;
mod tracker;

pub use registry::{sequence_for, StageDef, StageSequence};
pub use tracker::{StateTracker, TrackerEvent};
