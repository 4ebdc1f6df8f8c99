//! Bounded-memory streaming over a channel's history.
//!
//! A [`ChannelScan`] pulls one page at a time, keeps only the bot's own
//! messages from it, and hands them out one by one. The next page is not
//! requested until the current one is drained.

use std::collections::VecDeque;

use ping_types::{CandidateMessage, ChannelInfo};
use tracing::{debug, error, info, warn};

use crate::platform::{MessageHistory, PlatformError};

/// Receives periodic scan progress. Errors are logged and ignored.
pub trait ScanObserver: Send + Sync {
    fn scanned(&self, channel: &ChannelInfo, inspected: usize) -> anyhow::Result<()>;
}

/// Writes progress to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl ScanObserver for TracingObserver {
    fn scanned(&self, channel: &ChannelInfo, inspected: usize) -> anyhow::Result<()> {
        info!("[#{}] Scanned {} messages...", channel.name, inspected);
        Ok(())
    }
}

/// Scan parameters, derived from `PurgeConfig`.
#[derive(Debug, Clone, Copy)]
pub struct ScanLimits {
    pub page_size: usize,
    pub cap: Option<usize>,
    pub progress_every: usize,
}

/// How a scan ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEnd {
    /// Reached the start of the channel.
    Exhausted,
    /// Stopped at the per-channel inspection cap.
    CapReached,
    /// The platform refused history access.
    AccessDenied,
    /// Any other fetch failure.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSummary {
    pub inspected: usize,
    pub end: ScanEnd,
}

pub struct ChannelScanner<'a, H, O> {
    history: &'a H,
    observer: &'a O,
    bot_id: u64,
    limits: ScanLimits,
}

impl<'a, H: MessageHistory, O: ScanObserver> ChannelScanner<'a, H, O> {
    pub fn new(history: &'a H, observer: &'a O, bot_id: u64, limits: ScanLimits) -> Self {
        Self {
            history,
            observer,
            bot_id,
            limits,
        }
    }

    /// Start a fresh, non-restartable scan of `channel`.
    pub fn scan(&self, channel: &'a ChannelInfo) -> ChannelScan<'a, H, O> {
        ChannelScan {
            history: self.history,
            observer: self.observer,
            bot_id: self.bot_id,
            limits: self.limits,
            channel,
            cursor: None,
            pending: VecDeque::new(),
            inspected: 0,
            end: None,
        }
    }
}

pub struct ChannelScan<'a, H, O> {
    history: &'a H,
    observer: &'a O,
    bot_id: u64,
    limits: ScanLimits,
    channel: &'a ChannelInfo,
    cursor: Option<u64>,
    pending: VecDeque<CandidateMessage>,
    inspected: usize,
    end: Option<ScanEnd>,
}

impl<H: MessageHistory, O: ScanObserver> ChannelScan<'_, H, O> {
    /// Next bot-authored message, or `None` once the scan has ended.
    pub async fn next(&mut self) -> Option<CandidateMessage> {
        loop {
            if let Some(candidate) = self.pending.pop_front() {
                return Some(candidate);
            }
            if self.end.is_some() {
                return None;
            }
            self.fetch_page().await;
        }
    }

    pub fn inspected(&self) -> usize {
        self.inspected
    }

    pub fn finish(self) -> ScanSummary {
        ScanSummary {
            inspected: self.inspected,
            end: self.end.unwrap_or(ScanEnd::Exhausted),
        }
    }

    async fn fetch_page(&mut self) {
        let remaining = match self.limits.cap {
            Some(cap) => cap.saturating_sub(self.inspected),
            None => usize::MAX,
        };
        if remaining == 0 {
            debug!(
                "[#{}] Inspection cap of {} reached",
                self.channel.name, self.inspected
            );
            self.end = Some(ScanEnd::CapReached);
            return;
        }
        let limit = remaining.min(self.limits.page_size);

        let page = match self
            .history
            .fetch_page(self.channel.id, self.cursor, limit)
            .await
        {
            Ok(page) => page,
            Err(PlatformError::PermissionDenied(reason)) => {
                warn!(
                    "Skipping channel #{} - Permission denied accessing history: {}",
                    self.channel.name, reason
                );
                self.end = Some(ScanEnd::AccessDenied);
                return;
            }
            Err(e) => {
                error!(
                    "History fetch failed in channel #{} after {} messages: {}",
                    self.channel.name, self.inspected, e
                );
                self.end = Some(ScanEnd::Failed(e.to_string()));
                return;
            }
        };

        let fetched = page.messages.len();
        for message in page.messages {
            self.inspected += 1;
            self.report_progress();
            if message.author_id == self.bot_id {
                self.pending.push_back(CandidateMessage {
                    id: message.id,
                    created_at: message.created_at,
                    channel_id: self.channel.id,
                });
            }
        }

        match page.next {
            Some(cursor) if fetched > 0 => self.cursor = Some(cursor),
            _ => self.end = Some(ScanEnd::Exhausted),
        }
    }

    fn report_progress(&self) {
        let every = self.limits.progress_every;
        if every == 0 || self.inspected % every != 0 {
            return;
        }
        if let Err(e) = self.observer.scanned(self.channel, self.inspected) {
            debug!("Scan observer failed for #{}: {}", self.channel.name, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{MockPlatform, RecordingObserver};
    use chrono::Utc;

    const BOT: u64 = 1;
    const OTHER: u64 = 2;

    fn channel() -> ChannelInfo {
        ChannelInfo {
            id: 10,
            name: "general".to_string(),
        }
    }

    fn limits(cap: Option<usize>) -> ScanLimits {
        ScanLimits {
            page_size: 100,
            cap,
            progress_every: 500,
        }
    }

    async fn collect<H: MessageHistory, O: ScanObserver>(
        scan: &mut ChannelScan<'_, H, O>,
    ) -> Vec<CandidateMessage> {
        let mut out = Vec::new();
        while let Some(c) = scan.next().await {
            out.push(c);
        }
        out
    }

    #[tokio::test]
    async fn test_filters_out_other_authors() {
        let platform = MockPlatform::new();
        let now = Utc::now();
        platform.add_channel(channel());
        platform.push_history(10, OTHER, 3, now);
        platform.push_history(10, BOT, 2, now);
        platform.push_history(10, OTHER, 1, now);

        let observer = RecordingObserver::default();
        let scanner = ChannelScanner::new(&platform, &observer, BOT, limits(None));
        let ch = channel();
        let mut scan = scanner.scan(&ch);
        let found = collect(&mut scan).await;

        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|c| c.channel_id == 10));
        let summary = scan.finish();
        assert_eq!(summary.inspected, 6);
        assert_eq!(summary.end, ScanEnd::Exhausted);
    }

    #[tokio::test]
    async fn test_pages_are_requested_lazily() {
        let platform = MockPlatform::new();
        platform.add_channel(channel());
        platform.push_history(10, BOT, 250, Utc::now());

        let observer = RecordingObserver::default();
        let scanner = ChannelScanner::new(&platform, &observer, BOT, limits(None));
        let ch = channel();
        let mut scan = scanner.scan(&ch);

        assert!(scan.next().await.is_some());
        assert_eq!(platform.page_requests(), 1);

        let rest = collect(&mut scan).await;
        assert_eq!(rest.len(), 249);
        assert_eq!(platform.page_requests(), 3);
    }

    #[tokio::test]
    async fn test_cap_ends_scan_without_error() {
        let platform = MockPlatform::new();
        platform.add_channel(channel());
        platform.push_history(10, OTHER, 6000, Utc::now());
        platform.push_history(10, BOT, 10, Utc::now());

        let observer = RecordingObserver::default();
        let scanner = ChannelScanner::new(&platform, &observer, BOT, limits(Some(5000)));
        let ch = channel();
        let mut scan = scanner.scan(&ch);
        let found = collect(&mut scan).await;

        assert!(found.is_empty());
        let summary = scan.finish();
        assert_eq!(summary.inspected, 5000);
        assert_eq!(summary.end, ScanEnd::CapReached);
    }

    #[tokio::test]
    async fn test_cap_shrinks_last_page() {
        let platform = MockPlatform::new();
        platform.add_channel(channel());
        platform.push_history(10, BOT, 300, Utc::now());

        let observer = RecordingObserver::default();
        let scanner = ChannelScanner::new(&platform, &observer, BOT, limits(Some(150)));
        let ch = channel();
        let mut scan = scanner.scan(&ch);
        let found = collect(&mut scan).await;

        assert_eq!(found.len(), 150);
        assert_eq!(platform.requested_limits(), vec![100, 50]);
    }

    #[tokio::test]
    async fn test_access_denied_ends_sequence() {
        let platform = MockPlatform::new();
        platform.add_channel(channel());
        platform.push_history(10, BOT, 5, Utc::now());
        platform.deny_history(10);

        let observer = RecordingObserver::default();
        let scanner = ChannelScanner::new(&platform, &observer, BOT, limits(None));
        let ch = channel();
        let mut scan = scanner.scan(&ch);

        assert!(scan.next().await.is_none());
        assert_eq!(scan.finish().end, ScanEnd::AccessDenied);
    }

    #[tokio::test]
    async fn test_progress_reported_every_n_messages() {
        let platform = MockPlatform::new();
        platform.add_channel(channel());
        platform.push_history(10, OTHER, 1200, Utc::now());

        let observer = RecordingObserver::default();
        let scanner = ChannelScanner::new(&platform, &observer, BOT, limits(None));
        let ch = channel();
        let mut scan = scanner.scan(&ch);
        collect(&mut scan).await;

        assert_eq!(observer.reports(), vec![500, 1000]);
    }

    #[tokio::test]
    async fn test_failing_observer_is_not_fatal() {
        let platform = MockPlatform::new();
        platform.add_channel(channel());
        platform.push_history(10, BOT, 600, Utc::now());

        let observer = RecordingObserver::failing();
        let scanner = ChannelScanner::new(&platform, &observer, BOT, limits(None));
        let ch = channel();
        let mut scan = scanner.scan(&ch);
        let found = collect(&mut scan).await;

        assert_eq!(found.len(), 600);
        assert_eq!(scan.finish().end, ScanEnd::Exhausted);
    }
}
