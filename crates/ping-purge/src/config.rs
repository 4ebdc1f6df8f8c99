//! Purge tuning knobs

use serde::{Deserialize, Serialize};
use tokio::time::Duration;

/// Hard platform cap on ids per bulk-delete call.
pub const BULK_DELETE_LIMIT: usize = 100;

/// Hard platform cap on messages per history page.
pub const HISTORY_PAGE_LIMIT: usize = 100;

/// Configuration for one purge engine.
///
/// Defaults mirror the production command: batches of 99, at most 5000
/// messages inspected per channel, a progress line every 500 messages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PurgeConfig {
    /// Recent messages per bulk-delete call. Clamped to `2..=100`.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Messages inspected per channel before the scan stops. `0` scans the
    /// full history.
    #[serde(default = "default_max_messages")]
    pub max_messages_per_channel: usize,
    /// Notify the scan observer every N inspected messages (0 disables).
    #[serde(default = "default_progress_every")]
    pub progress_every: usize,
    /// Messages requested per history page. Clamped to `1..=100`.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default)]
    pub pacing: PacingConfig,
}

/// Minimum spacing between destructive calls, per operation class.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PacingConfig {
    #[serde(default = "default_batch_interval_ms")]
    pub batch_interval_ms: u64,
    #[serde(default = "default_single_interval_ms")]
    pub single_interval_ms: u64,
    /// Interval used once after a rate-limit or transient failure.
    #[serde(default = "default_backoff_interval_ms")]
    pub backoff_interval_ms: u64,
}

impl PurgeConfig {
    pub fn effective_batch_size(&self) -> usize {
        self.batch_size.clamp(2, BULK_DELETE_LIMIT)
    }

    pub fn inspection_cap(&self) -> Option<usize> {
        match self.max_messages_per_channel {
            0 => None,
            cap => Some(cap),
        }
    }

    pub fn effective_page_size(&self) -> usize {
        self.page_size.clamp(1, HISTORY_PAGE_LIMIT)
    }
}

impl Default for PurgeConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_messages_per_channel: default_max_messages(),
            progress_every: default_progress_every(),
            page_size: default_page_size(),
            pacing: PacingConfig::default(),
        }
    }
}

impl PacingConfig {
    pub fn batch_interval(&self) -> Duration {
        Duration::from_millis(self.batch_interval_ms)
    }

    pub fn single_interval(&self) -> Duration {
        Duration::from_millis(self.single_interval_ms)
    }

    pub fn backoff_interval(&self) -> Duration {
        Duration::from_millis(self.backoff_interval_ms)
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            batch_interval_ms: default_batch_interval_ms(),
            single_interval_ms: default_single_interval_ms(),
            backoff_interval_ms: default_backoff_interval_ms(),
        }
    }
}

fn default_batch_size() -> usize {
    99
}

fn default_max_messages() -> usize {
    5000
}

fn default_progress_every() -> usize {
    500
}

fn default_page_size() -> usize {
    HISTORY_PAGE_LIMIT
}

fn default_batch_interval_ms() -> u64 {
    1000
}

fn default_single_interval_ms() -> u64 {
    1500
}

fn default_backoff_interval_ms() -> u64 {
    5000
}
