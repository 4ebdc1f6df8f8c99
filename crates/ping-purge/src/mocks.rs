//! In-memory platform for unit testing without a Discord connection.
//!
//! Enabled with the `test-support` feature:
//!
//! ```toml
//! [dev-dependencies]
//! ping-purge = { path = "...", features = ["test-support"] }
//! ```

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use ping_types::{ChannelInfo, ChannelPermissions, HistoryMessage};

use crate::gate::OwnerSource;
use crate::platform::{GuildDirectory, HistoryPage, MessageDeleter, MessageHistory, PlatformError};
use crate::scanner::ScanObserver;

// ── MockPlatform ──────────────────────────────────────────────────────────────

/// Scriptable guild: channels, histories, permission grants and failures.
/// Every history request and delete call is recorded.
///
/// Channels without explicit permissions grant everything.
#[derive(Clone, Default)]
pub struct MockPlatform {
    state: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    channels: Vec<ChannelInfo>,
    permissions: HashMap<u64, Result<ChannelPermissions, PlatformError>>,
    histories: HashMap<u64, Vec<HistoryMessage>>,
    denied_history: HashSet<u64>,
    history_errors: HashMap<u64, PlatformError>,
    list_error: Option<PlatformError>,
    batch_failures: VecDeque<PlatformError>,
    single_failures: HashMap<u64, VecDeque<PlatformError>>,
    next_id: u64,
    page_limits: Vec<usize>,
    permission_checks: Vec<u64>,
    batch_calls: Vec<BatchCall>,
    single_calls: Vec<SingleCall>,
    calls: Vec<PlatformCall>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchCall {
    pub channel_id: u64,
    pub message_ids: Vec<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SingleCall {
    pub channel_id: u64,
    pub message_id: u64,
}

/// History and delete calls in the order the platform received them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformCall {
    FetchPage { channel_id: u64, limit: usize },
    DeleteBatch { channel_id: u64, count: usize },
    DeleteOne { channel_id: u64, message_id: u64 },
}

impl MockPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_channel(&self, channel: ChannelInfo) {
        self.state.lock().unwrap().channels.push(channel);
    }

    pub fn set_permissions(&self, channel_id: u64, perms: ChannelPermissions) {
        self.state
            .lock()
            .unwrap()
            .permissions
            .insert(channel_id, Ok(perms));
    }

    pub fn fail_permissions(&self, channel_id: u64, err: PlatformError) {
        self.state
            .lock()
            .unwrap()
            .permissions
            .insert(channel_id, Err(err));
    }

    /// Append `count` messages by `author_id`, older than everything already
    /// in the channel. Returns their ids, newest first.
    pub fn push_history(
        &self,
        channel_id: u64,
        author_id: u64,
        count: usize,
        created_at: DateTime<Utc>,
    ) -> Vec<u64> {
        let mut state = self.state.lock().unwrap();
        let mut ids = Vec::with_capacity(count);
        for _ in 0..count {
            state.next_id += 1;
            ids.push(state.next_id);
        }
        let history = state.histories.entry(channel_id).or_default();
        history.extend(ids.iter().map(|&id| HistoryMessage {
            id,
            author_id,
            created_at,
        }));
        ids
    }

    /// History requests for this channel fail with `PermissionDenied`.
    pub fn deny_history(&self, channel_id: u64) {
        self.state.lock().unwrap().denied_history.insert(channel_id);
    }

    /// The next history request for this channel fails with `err`.
    pub fn fail_history(&self, channel_id: u64, err: PlatformError) {
        self.state
            .lock()
            .unwrap()
            .history_errors
            .insert(channel_id, err);
    }

    pub fn fail_list_channels(&self, err: PlatformError) {
        self.state.lock().unwrap().list_error = Some(err);
    }

    /// Queue a failure for the next bulk-delete call.
    pub fn fail_next_batch(&self, err: PlatformError) {
        self.state.lock().unwrap().batch_failures.push_back(err);
    }

    /// Queue a failure for the next single delete of `message_id`.
    pub fn fail_single(&self, message_id: u64, err: PlatformError) {
        self.state
            .lock()
            .unwrap()
            .single_failures
            .entry(message_id)
            .or_default()
            .push_back(err);
    }

    pub fn page_requests(&self) -> usize {
        self.state.lock().unwrap().page_limits.len()
    }

    pub fn requested_limits(&self) -> Vec<usize> {
        self.state.lock().unwrap().page_limits.clone()
    }

    pub fn permission_checks(&self) -> Vec<u64> {
        self.state.lock().unwrap().permission_checks.clone()
    }

    pub fn batch_calls(&self) -> Vec<BatchCall> {
        self.state.lock().unwrap().batch_calls.clone()
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batch_calls()
            .iter()
            .map(|c| c.message_ids.len())
            .collect()
    }

    pub fn single_calls(&self) -> Vec<SingleCall> {
        self.state.lock().unwrap().single_calls.clone()
    }

    pub fn calls(&self) -> Vec<PlatformCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn delete_calls_for(&self, channel_id: u64) -> usize {
        let state = self.state.lock().unwrap();
        state
            .batch_calls
            .iter()
            .filter(|c| c.channel_id == channel_id)
            .count()
            + state
                .single_calls
                .iter()
                .filter(|c| c.channel_id == channel_id)
                .count()
    }
}

impl MessageHistory for MockPlatform {
    async fn fetch_page(
        &self,
        channel_id: u64,
        before: Option<u64>,
        limit: usize,
    ) -> Result<HistoryPage, PlatformError> {
        let mut state = self.state.lock().unwrap();
        state.page_limits.push(limit);
        state.calls.push(PlatformCall::FetchPage { channel_id, limit });

        if state.denied_history.contains(&channel_id) {
            return Err(PlatformError::PermissionDenied(
                "Missing Access".to_string(),
            ));
        }
        if let Some(err) = state.history_errors.remove(&channel_id) {
            return Err(err);
        }

        let history = state
            .histories
            .get(&channel_id)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        let start = match before {
            None => 0,
            Some(id) => history
                .iter()
                .position(|m| m.id == id)
                .map_or(history.len(), |p| p + 1),
        };
        let end = (start + limit).min(history.len());
        let messages = history[start..end].to_vec();
        let next = if messages.len() == limit {
            messages.last().map(|m| m.id)
        } else {
            None
        };
        Ok(HistoryPage { messages, next })
    }
}

impl MessageDeleter for MockPlatform {
    async fn delete_batch(&self, channel_id: u64, message_ids: &[u64]) -> Result<(), PlatformError> {
        let mut state = self.state.lock().unwrap();
        state.batch_calls.push(BatchCall {
            channel_id,
            message_ids: message_ids.to_vec(),
        });
        state.calls.push(PlatformCall::DeleteBatch {
            channel_id,
            count: message_ids.len(),
        });
        match state.batch_failures.pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn delete_one(&self, channel_id: u64, message_id: u64) -> Result<(), PlatformError> {
        let mut state = self.state.lock().unwrap();
        state.single_calls.push(SingleCall {
            channel_id,
            message_id,
        });
        state.calls.push(PlatformCall::DeleteOne {
            channel_id,
            message_id,
        });
        match state
            .single_failures
            .get_mut(&message_id)
            .and_then(VecDeque::pop_front)
        {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl GuildDirectory for MockPlatform {
    async fn text_channels(&self, _guild_id: u64) -> Result<Vec<ChannelInfo>, PlatformError> {
        let state = self.state.lock().unwrap();
        match &state.list_error {
            Some(err) => Err(err.clone()),
            None => Ok(state.channels.clone()),
        }
    }

    async fn channel_permissions(&self, channel_id: u64) -> Result<ChannelPermissions, PlatformError> {
        let mut state = self.state.lock().unwrap();
        state.permission_checks.push(channel_id);
        state
            .permissions
            .get(&channel_id)
            .cloned()
            .unwrap_or(Ok(ChannelPermissions {
                can_view_history: true,
                can_manage_messages: true,
            }))
    }
}

// ── MockOwnerSource ───────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct MockOwnerSource(pub Result<u64, PlatformError>);

impl OwnerSource for MockOwnerSource {
    async fn fetch_owner(&self) -> Result<u64, PlatformError> {
        self.0.clone()
    }
}

// ── RecordingObserver ─────────────────────────────────────────────────────────

/// Records the inspected count of every progress notification.
#[derive(Clone, Default)]
pub struct RecordingObserver {
    reports: Arc<Mutex<Vec<usize>>>,
    fail: bool,
}

impl RecordingObserver {
    /// An observer whose every notification errors.
    pub fn failing() -> Self {
        Self {
            reports: Arc::default(),
            fail: true,
        }
    }

    pub fn reports(&self) -> Vec<usize> {
        self.reports.lock().unwrap().clone()
    }
}

impl ScanObserver for RecordingObserver {
    fn scanned(&self, _channel: &ChannelInfo, inspected: usize) -> anyhow::Result<()> {
        self.reports.lock().unwrap().push(inspected);
        if self.fail {
            anyhow::bail!("observer unavailable");
        }
        Ok(())
    }
}
