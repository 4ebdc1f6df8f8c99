//! Shared types for the ping bot and its message purge engine

pub mod errors;
pub mod purge;

pub use errors::{DiscordErrorCode, ErrorCategory};
pub use purge::*;
