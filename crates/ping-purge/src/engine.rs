//! The purge protocol: per-channel scan, classify, batch delete with
//! single-delete fallback, and per-guild orchestration.

#[cfg(test)]
#[path = "engine_tests.rs"]
mod engine_tests;

use std::sync::Arc;

use ping_types::{ChannelInfo, ChannelResult, MessageBand, SkipReason};
use tracing::{debug, error, info, warn};

use crate::batch::BatchDeletionBuffer;
use crate::classifier::MessageClassifier;
use crate::clock::Clock;
use crate::config::PurgeConfig;
use crate::error::{PurgeError, Result};
use crate::pacer::{OperationClass, Pacer};
use crate::platform::{Platform, PlatformError};
use crate::report::{ScanReport, ScanSession};
use crate::scanner::{ChannelScanner, ScanEnd, ScanLimits, ScanObserver, TracingObserver};

/// Running counters for one channel.
#[derive(Debug, Default)]
struct Tally {
    deleted: u64,
    failed: u64,
}

/// Deletes every message the bot authored in a guild.
///
/// Channels are processed one at a time in listing order; all mutable state
/// (buffer, single queue, counters) lives on the stack of one invocation.
/// The pacer is the only thing shared between invocations.
pub struct BulkDeletionEngine<P, C: Clock, O = TracingObserver> {
    platform: P,
    pacer: Arc<Pacer<C>>,
    observer: O,
    bot_id: u64,
    config: PurgeConfig,
}

impl<P: Platform, C: Clock> BulkDeletionEngine<P, C, TracingObserver> {
    pub fn new(platform: P, pacer: Arc<Pacer<C>>, bot_id: u64, config: PurgeConfig) -> Self {
        Self {
            platform,
            pacer,
            observer: TracingObserver,
            bot_id,
            config,
        }
    }
}

impl<P: Platform, C: Clock, O: ScanObserver> BulkDeletionEngine<P, C, O> {
    pub fn with_observer<O2: ScanObserver>(self, observer: O2) -> BulkDeletionEngine<P, C, O2> {
        BulkDeletionEngine {
            platform: self.platform,
            pacer: self.pacer,
            observer,
            bot_id: self.bot_id,
            config: self.config,
        }
    }

    pub fn config(&self) -> &PurgeConfig {
        &self.config
    }

    fn scan_limits(&self) -> ScanLimits {
        ScanLimits {
            page_size: self.config.effective_page_size(),
            cap: self.config.inspection_cap(),
            progress_every: self.config.progress_every,
        }
    }

    /// Purge the whole guild. Only a failure to enumerate channels is
    /// returned as an error; per-channel trouble ends up in the report.
    pub async fn run(&self, guild_id: u64) -> Result<ScanReport> {
        let clock = self.pacer.clock();
        let mut session = ScanSession::new(guild_id, clock.utc_now());

        let channels = self
            .platform
            .text_channels(guild_id)
            .await
            .map_err(|source| PurgeError::ListChannels { guild_id, source })?;

        info!(
            "Starting message deletion scan in guild {} ({} text channels)",
            guild_id,
            channels.len()
        );

        for channel in &channels {
            let result = self.process_channel(channel, &session).await;
            if result.touched() {
                info!(
                    "Finished channel #{}: Deleted={}, Failed={}",
                    channel.name, result.deleted, result.failed
                );
            }
            session.fold(result);
        }

        let report = ScanReport::summarize(session, clock.utc_now());
        info!(
            "Deletion process completed in {:?}. Total Deleted: {}, Total Failed: {}",
            report.elapsed, report.deleted, report.failed
        );
        Ok(report)
    }

    /// Purge one channel. Always returns a result, reflecting whatever
    /// progress was made before the channel ended.
    pub async fn process_channel(
        &self,
        channel: &ChannelInfo,
        session: &ScanSession,
    ) -> ChannelResult {
        info!("Scanning channel: #{} ({})", channel.name, channel.id);

        match self.platform.channel_permissions(channel.id).await {
            Ok(perms) if perms.allows_purge() => {}
            Ok(_) => {
                info!(
                    "Skipping channel #{} - Missing Read History or Manage Messages permission.",
                    channel.name
                );
                return ChannelResult::skipped(channel, SkipReason::MissingPermission);
            }
            Err(PlatformError::PermissionDenied(reason)) => {
                warn!("Skipping channel #{} - Access denied: {}", channel.name, reason);
                return ChannelResult::skipped(channel, SkipReason::AccessDenied);
            }
            Err(e) => {
                error!("Skipping channel #{} - Permission lookup failed: {}", channel.name, e);
                return ChannelResult::skipped(channel, SkipReason::UnexpectedError);
            }
        }

        let classifier = MessageClassifier::with_cutoff(session.cutoff());
        let scanner = ChannelScanner::new(
            &self.platform,
            &self.observer,
            self.bot_id,
            self.scan_limits(),
        );
        let mut scan = scanner.scan(channel);

        let mut tally = Tally::default();
        let mut buffer = BatchDeletionBuffer::new(self.config.effective_batch_size());
        let mut singles: Vec<u64> = Vec::new();

        while let Some(candidate) = scan.next().await {
            match classifier.classify(candidate.created_at) {
                MessageBand::Recent => {
                    if let Some(batch) = buffer.push(candidate.id) {
                        self.flush_batch(channel, batch, &mut tally, &mut singles).await;
                    }
                }
                MessageBand::Aged => singles.push(candidate.id),
            }
        }

        let summary = scan.finish();
        info!(
            "[#{}] Finished history scan ({} messages). Processing remaining deletes...",
            channel.name, summary.inspected
        );

        if let Some(batch) = buffer.drain() {
            self.flush_batch(channel, batch, &mut tally, &mut singles).await;
        }
        self.drain_singles(channel, singles, &mut tally).await;

        let skipped = match summary.end {
            ScanEnd::Exhausted | ScanEnd::CapReached => None,
            ScanEnd::AccessDenied => Some(SkipReason::AccessDenied),
            ScanEnd::Failed(_) => Some(SkipReason::UnexpectedError),
        };

        ChannelResult {
            channel_id: channel.id,
            channel_name: channel.name.clone(),
            deleted: tally.deleted,
            failed: tally.failed,
            skipped,
        }
    }

    /// One bulk-delete call. A failed batch is never dropped: its ids go to
    /// the single-delete queue.
    async fn flush_batch(
        &self,
        channel: &ChannelInfo,
        batch: Vec<u64>,
        tally: &mut Tally,
        singles: &mut Vec<u64>,
    ) {
        self.pacer.throttle(OperationClass::BatchDelete).await;

        match self.platform.delete_batch(channel.id, &batch).await {
            Ok(()) => {
                tally.deleted += batch.len() as u64;
                info!("[#{}] Bulk deleted {} messages.", channel.name, batch.len());
            }
            Err(e) => {
                if let PlatformError::RateLimited { retry_after } = &e {
                    self.pacer.escalate(OperationClass::BatchDelete, *retry_after);
                }
                warn!(
                    "[#{}] Bulk delete of {} messages failed: {}. Adding to single delete queue.",
                    channel.name,
                    batch.len(),
                    e
                );
                singles.extend(batch);
            }
        }
    }

    async fn drain_singles(&self, channel: &ChannelInfo, singles: Vec<u64>, tally: &mut Tally) {
        if singles.is_empty() {
            return;
        }
        info!(
            "[#{}] Processing {} messages for single delete...",
            channel.name,
            singles.len()
        );

        for message_id in singles {
            self.pacer.throttle(OperationClass::SingleDelete).await;

            match self.platform.delete_one(channel.id, message_id).await {
                Ok(()) => tally.deleted += 1,
                Err(PlatformError::NotFound(_)) => {
                    debug!("[#{}] Message {} already gone", channel.name, message_id);
                }
                Err(PlatformError::PermissionDenied(reason)) => {
                    tally.failed += 1;
                    warn!(
                        "[#{}] Failed single delete {} (Forbidden): {}",
                        channel.name, message_id, reason
                    );
                }
                Err(PlatformError::RateLimited { retry_after }) => {
                    tally.failed += 1;
                    warn!(
                        "[#{}] Failed single delete {} (rate limited), backing off",
                        channel.name, message_id
                    );
                    self.pacer.escalate(OperationClass::SingleDelete, retry_after);
                }
                Err(PlatformError::Transient(reason)) => {
                    tally.failed += 1;
                    warn!(
                        "[#{}] Failed single delete {}: {}, backing off",
                        channel.name, message_id, reason
                    );
                    self.pacer.escalate(OperationClass::SingleDelete, None);
                }
            }
        }
    }
}
