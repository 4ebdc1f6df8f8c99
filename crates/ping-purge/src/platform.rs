//! Platform seams consumed by the purge engine.
//!
//! One concern per trait; the bot implements them over serenity and the
//! `test-support` mocks implement them in memory.

use std::future::Future;

use ping_types::{ChannelInfo, ChannelPermissions, HistoryMessage};
use thiserror::Error;
use tokio::time::Duration;

/// Failure of a single platform call, already classified.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlatformError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("rate limited (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    #[error("transient platform error: {0}")]
    Transient(String),
}

/// One page of channel history, newest first.
#[derive(Debug, Clone, Default)]
pub struct HistoryPage {
    pub messages: Vec<HistoryMessage>,
    /// Cursor for the next (older) page; `None` at the end of history.
    pub next: Option<u64>,
}

pub trait MessageHistory: Send + Sync {
    /// Fetch up to `limit` messages older than `before` (newest first).
    fn fetch_page(
        &self,
        channel_id: u64,
        before: Option<u64>,
        limit: usize,
    ) -> impl Future<Output = Result<HistoryPage, PlatformError>> + Send;
}

pub trait MessageDeleter: Send + Sync {
    /// Bulk delete. Rejected by the platform for messages 14 days or older.
    fn delete_batch(
        &self,
        channel_id: u64,
        message_ids: &[u64],
    ) -> impl Future<Output = Result<(), PlatformError>> + Send;

    fn delete_one(
        &self,
        channel_id: u64,
        message_id: u64,
    ) -> impl Future<Output = Result<(), PlatformError>> + Send;
}

pub trait GuildDirectory: Send + Sync {
    /// Text channels of a guild in listing order.
    fn text_channels(
        &self,
        guild_id: u64,
    ) -> impl Future<Output = Result<Vec<ChannelInfo>, PlatformError>> + Send;

    /// The bot's own capabilities in one channel.
    fn channel_permissions(
        &self,
        channel_id: u64,
    ) -> impl Future<Output = Result<ChannelPermissions, PlatformError>> + Send;
}

/// Everything the engine needs from the platform.
pub trait Platform: MessageHistory + MessageDeleter + GuildDirectory {}

impl<T: MessageHistory + MessageDeleter + GuildDirectory> Platform for T {}
