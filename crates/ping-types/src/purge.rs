//! Purge domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A guild text channel as seen by the purge engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChannelInfo {
    pub id: u64,
    pub name: String,
}

/// Channel-scoped capabilities of the bot.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChannelPermissions {
    pub can_view_history: bool,
    pub can_manage_messages: bool,
}

impl ChannelPermissions {
    /// Both capabilities the purge needs in a channel.
    pub fn allows_purge(&self) -> bool {
        self.can_view_history && self.can_manage_messages
    }
}

/// One entry of a channel history page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryMessage {
    pub id: u64,
    pub author_id: u64,
    pub created_at: DateTime<Utc>,
}

/// A bot-authored message found during a history scan.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CandidateMessage {
    pub id: u64,
    pub created_at: DateTime<Utc>,
    pub channel_id: u64,
}

/// Which deletion path a candidate qualifies for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MessageBand {
    /// Younger than the bulk-delete age limit.
    Recent,
    /// At or past the bulk-delete age limit; single delete only.
    Aged,
}

/// Why a channel was not (fully) processed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    MissingPermission,
    AccessDenied,
    UnexpectedError,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingPermission => write!(f, "missing permission"),
            Self::AccessDenied => write!(f, "access denied"),
            Self::UnexpectedError => write!(f, "unexpected error"),
        }
    }
}

/// Outcome of purging one channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChannelResult {
    pub channel_id: u64,
    pub channel_name: String,
    pub deleted: u64,
    pub failed: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<SkipReason>,
}

impl ChannelResult {
    /// A channel that was never scanned.
    pub fn skipped(channel: &ChannelInfo, reason: SkipReason) -> Self {
        Self {
            channel_id: channel.id,
            channel_name: channel.name.clone(),
            deleted: 0,
            failed: 0,
            skipped: Some(reason),
        }
    }

    pub fn touched(&self) -> bool {
        self.deleted > 0 || self.failed > 0
    }
}
