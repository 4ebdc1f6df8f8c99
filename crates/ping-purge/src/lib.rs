//! # ping-purge
//!
//! Deletes every message a bot has authored across a guild's text channels.
//!
//! ## How a run works
//!
//! - Channels are processed one at a time, in listing order.
//! - Each channel's history is streamed a page at a time; only the bot's own
//!   messages are kept, and only until they are deleted.
//! - Messages younger than 14 days (relative to the run's start) are
//!   bulk-deleted in batches of up to 99; older ones are deleted one by one.
//! - A failed batch falls back to single deletes; nothing is dropped.
//! - Destructive calls are paced per class (batch ≈1s, single ≈1.5s, ≈5s
//!   after a transient failure).
//! - Per-channel trouble is recorded in the report; only failing to list
//!   channels aborts the run.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ping_purge::{BulkDeletionEngine, Pacer, PurgeConfig, SystemClock};
//!
//! let config = PurgeConfig::default();
//! let pacer = Arc::new(Pacer::new(SystemClock, config.pacing));
//! let engine = BulkDeletionEngine::new(platform, pacer, bot_user_id, config);
//! let report = engine.run(guild_id).await?;
//! println!("{report}");
//! ```

pub mod batch;
pub mod classifier;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod gate;
#[cfg(any(test, feature = "test-support"))]
pub mod mocks;
pub mod pacer;
pub mod platform;
pub mod report;
pub mod scanner;

pub use batch::BatchDeletionBuffer;
pub use classifier::{MessageClassifier, classify};
pub use clock::{Clock, SystemClock};
pub use config::{PacingConfig, PurgeConfig};
pub use engine::BulkDeletionEngine;
pub use error::PurgeError;
pub use gate::{AuthorizationContext, GateDenial, Invoker, OwnerCache, OwnerSource};
pub use pacer::{OperationClass, Pacer};
pub use platform::{
    GuildDirectory, HistoryPage, MessageDeleter, MessageHistory, Platform, PlatformError,
};
pub use report::{ScanReport, ScanSession};
pub use scanner::{ChannelScanner, ScanEnd, ScanObserver, ScanSummary, TracingObserver};
