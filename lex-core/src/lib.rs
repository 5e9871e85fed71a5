//! lex-core — data types for the word-lookup service.
//!
//! Pure data structures and error/config types, no I/O. All other crates
//! in the workspace depend on this one.

mod config;
mod error;
mod identity;
mod model;

pub use config::*;
pub use error::*;
pub use identity::*;
pub use model::*;
