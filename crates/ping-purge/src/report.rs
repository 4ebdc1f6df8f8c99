//! Session accounting and the final summary.

use chrono::{DateTime, Utc};
use ping_types::ChannelResult;
use serde::Serialize;
use tokio::time::Duration;

use crate::classifier::bulk_cutoff;

/// One invocation of the purge. Only the engine folds results into it.
#[derive(Debug, Clone, Serialize)]
pub struct ScanSession {
    guild_id: u64,
    started_at: DateTime<Utc>,
    cutoff: DateTime<Utc>,
    total_deleted: u64,
    total_failed: u64,
    channel_results: Vec<ChannelResult>,
}

impl ScanSession {
    pub fn new(guild_id: u64, started_at: DateTime<Utc>) -> Self {
        Self {
            guild_id,
            started_at,
            cutoff: bulk_cutoff(started_at),
            total_deleted: 0,
            total_failed: 0,
            channel_results: Vec::new(),
        }
    }

    pub fn guild_id(&self) -> u64 {
        self.guild_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Bulk-delete age cutoff, fixed for the whole session.
    pub fn cutoff(&self) -> DateTime<Utc> {
        self.cutoff
    }

    pub fn total_deleted(&self) -> u64 {
        self.total_deleted
    }

    pub fn total_failed(&self) -> u64 {
        self.total_failed
    }

    /// Results in scan order.
    pub fn channel_results(&self) -> &[ChannelResult] {
        &self.channel_results
    }

    pub fn result_for(&self, channel_id: u64) -> Option<&ChannelResult> {
        self.channel_results
            .iter()
            .find(|r| r.channel_id == channel_id)
    }

    pub fn fold(&mut self, result: ChannelResult) {
        self.total_deleted += result.deleted;
        self.total_failed += result.failed;
        self.channel_results.push(result);
    }
}

/// What the caller gets back once every channel has been processed.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub guild_id: u64,
    pub deleted: u64,
    pub failed: u64,
    pub channels_scanned: usize,
    pub channels_skipped: usize,
    pub elapsed: Duration,
    pub channels: Vec<ChannelResult>,
}

impl ScanReport {
    pub fn summarize(session: ScanSession, finished_at: DateTime<Utc>) -> Self {
        let elapsed = (finished_at - session.started_at)
            .to_std()
            .unwrap_or_default();
        let channels_skipped = session
            .channel_results
            .iter()
            .filter(|r| r.skipped.is_some())
            .count();
        Self {
            guild_id: session.guild_id,
            deleted: session.total_deleted,
            failed: session.total_failed,
            channels_scanned: session.channel_results.len() - channels_skipped,
            channels_skipped,
            elapsed,
            channels: session.channel_results,
        }
    }
}

impl std::fmt::Display for ScanReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Deletion scan complete!")?;
        writeln!(f, "Deleted approx: {} messages.", self.deleted)?;
        writeln!(f, "Failed/Skipped approx: {} messages.", self.failed)?;
        if self.channels_skipped > 0 {
            writeln!(f, "Channels skipped: {}", self.channels_skipped)?;
        }
        write!(f, "Time taken: {}", format_elapsed(self.elapsed))
    }
}

/// `H:MM:SS`, the way operators read long-running scans.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use ping_types::SkipReason;

    fn result(id: u64, deleted: u64, failed: u64, skipped: Option<SkipReason>) -> ChannelResult {
        ChannelResult {
            channel_id: id,
            channel_name: format!("ch-{id}"),
            deleted,
            failed,
            skipped,
        }
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_fold_keeps_totals_in_sync() {
        let mut session = ScanSession::new(1, start());
        session.fold(result(10, 5, 1, None));
        session.fold(result(11, 0, 0, Some(SkipReason::MissingPermission)));
        session.fold(result(12, 7, 2, Some(SkipReason::UnexpectedError)));

        let sum: u64 = session
            .channel_results()
            .iter()
            .map(|r| r.deleted + r.failed)
            .sum();
        assert_eq!(session.total_deleted() + session.total_failed(), sum);
        assert_eq!(session.total_deleted(), 12);
        assert_eq!(session.total_failed(), 3);
    }

    #[test]
    fn test_results_keep_scan_order() {
        let mut session = ScanSession::new(1, start());
        for id in [30, 10, 20] {
            session.fold(result(id, 1, 0, None));
        }
        let order: Vec<u64> = session.channel_results().iter().map(|r| r.channel_id).collect();
        assert_eq!(order, vec![30, 10, 20]);
        assert_eq!(session.result_for(10).map(|r| r.deleted), Some(1));
    }

    #[test]
    fn test_cutoff_fixed_at_creation() {
        let session = ScanSession::new(1, start());
        assert_eq!(session.cutoff(), start() - chrono::Duration::days(14));
    }

    #[test]
    fn test_summarize_counts_and_elapsed() {
        let mut session = ScanSession::new(9, start());
        session.fold(result(10, 150, 0, None));
        session.fold(result(11, 0, 0, Some(SkipReason::AccessDenied)));

        let report = ScanReport::summarize(session, start() + chrono::Duration::seconds(3725));
        assert_eq!(report.guild_id, 9);
        assert_eq!(report.deleted, 150);
        assert_eq!(report.failed, 0);
        assert_eq!(report.channels_scanned, 1);
        assert_eq!(report.channels_skipped, 1);
        assert_eq!(report.elapsed, Duration::from_secs(3725));
    }

    #[test]
    fn test_display() {
        let mut session = ScanSession::new(9, start());
        session.fold(result(10, 3, 1, None));
        let report = ScanReport::summarize(session, start() + chrono::Duration::seconds(65));

        assert_eq!(
            report.to_string(),
            "Deletion scan complete!\n\
             Deleted approx: 3 messages.\n\
             Failed/Skipped approx: 1 messages.\n\
             Time taken: 0:01:05"
        );
    }

    #[test]
    fn test_clock_skew_does_not_panic() {
        let session = ScanSession::new(9, start());
        let report = ScanReport::summarize(session, start() - chrono::Duration::seconds(5));
        assert_eq!(report.elapsed, Duration::ZERO);
    }
}
