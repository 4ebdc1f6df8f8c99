//! Discord API error taxonomy.
//!
//! Maps the JSON error codes the purge and mention paths actually hit onto a
//! small set of categories the engine can act on.

use serde::{Deserialize, Serialize};

/// High-level category of a Discord API error.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Rate limit hit: must wait before retrying.
    RateLimit,
    /// Target resource (channel, message, guild …) not found.
    NotFound,
    /// Insufficient bot permissions for the requested action.
    PermissionDenied,
    /// The bulk-delete request itself was rejected (too old, bad count …).
    BulkRejected,
    /// Malformed or semantically invalid input.
    InvalidInput,
    /// Network or I/O error (transient).
    Network,
    /// Unknown or uncategorised error.
    Unknown,
}

/// Discord-specific error code (subset relevant to history and deletion).
///
/// Maps the actionable Discord JSON error codes
/// (<https://discord.com/developers/docs/topics/opcodes-and-status-codes#json>)
/// to named variants; everything else falls through to [`DiscordErrorCode::Unknown`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DiscordErrorCode {
    // ── Not found ─────────────────────────────────────────────────────────────
    /// 10003: Unknown channel.
    UnknownChannel,
    /// 10004: Unknown guild.
    UnknownGuild,
    /// 10008: Unknown message (already deleted).
    UnknownMessage,
    /// 10062: Unknown interaction (token expired or already acknowledged).
    UnknownInteraction,

    // ── Permission errors ──────────────────────────────────────────────────────
    /// 50001: Missing access.
    MissingAccess,
    /// 50013: Missing permissions.
    MissingPermissions,

    // ── Rate limiting ──────────────────────────────────────────────────────────
    /// HTTP 429: Global or per-route rate limit.
    RateLimited,

    // ── Bulk delete ────────────────────────────────────────────────────────────
    /// 50016: Provided too few or too many messages to delete.
    BulkDeleteCount,
    /// 50034: A message in the batch is older than two weeks.
    BulkDeleteTooOld,

    // ── Input errors ───────────────────────────────────────────────────────────
    /// 50035: Invalid form body (validation failed).
    InvalidFormBody,

    // ── Auth ───────────────────────────────────────────────────────────────────
    /// 50014 / 40001: Invalid or expired token.
    InvalidToken,

    // ── Server errors ──────────────────────────────────────────────────────────
    /// 130000: API resource overloaded.
    ApiOverloaded,

    // ── Client errors ─────────────────────────────────────────────────────────
    /// Network or I/O error on the client side.
    NetworkError,

    // ── Catch-all ─────────────────────────────────────────────────────────────
    /// Any Discord JSON error code not listed above.
    Unknown,
}

impl DiscordErrorCode {
    /// Derive the code from a raw Discord JSON error code integer.
    pub fn from_raw(code: u32) -> Self {
        match code {
            10003 => Self::UnknownChannel,
            10004 => Self::UnknownGuild,
            10008 => Self::UnknownMessage,
            10062 => Self::UnknownInteraction,
            40001 | 50014 => Self::InvalidToken,
            50001 => Self::MissingAccess,
            50013 => Self::MissingPermissions,
            50016 => Self::BulkDeleteCount,
            50034 => Self::BulkDeleteTooOld,
            50035 => Self::InvalidFormBody,
            130000 => Self::ApiOverloaded,
            _ => Self::Unknown,
        }
    }

    /// Derive the code from an HTTP status when the body carried no JSON code.
    pub fn from_status(status: u16) -> Self {
        match status {
            429 => Self::RateLimited,
            403 => Self::MissingPermissions,
            404 => Self::UnknownMessage,
            _ => Self::Unknown,
        }
    }

    /// The high-level category for this code.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::UnknownChannel
            | Self::UnknownGuild
            | Self::UnknownMessage
            | Self::UnknownInteraction => ErrorCategory::NotFound,

            Self::MissingAccess | Self::MissingPermissions => ErrorCategory::PermissionDenied,

            Self::RateLimited => ErrorCategory::RateLimit,

            Self::BulkDeleteCount | Self::BulkDeleteTooOld => ErrorCategory::BulkRejected,

            Self::InvalidFormBody => ErrorCategory::InvalidInput,

            Self::NetworkError => ErrorCategory::Network,

            Self::InvalidToken | Self::ApiOverloaded | Self::Unknown => ErrorCategory::Unknown,
        }
    }

    /// True if the operation should **not** be retried (the error is permanent).
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            Self::UnknownChannel
                | Self::UnknownGuild
                | Self::UnknownMessage
                | Self::MissingAccess
                | Self::MissingPermissions
                | Self::InvalidToken
        )
    }

    /// True if retrying the operation after a delay is worthwhile.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited | Self::NetworkError | Self::ApiOverloaded
        )
    }
}
