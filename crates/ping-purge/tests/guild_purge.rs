//! End-to-end purge runs against the in-memory platform.

use std::sync::Arc;

use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use ping_purge::clock::MockClock;
use ping_purge::mocks::{MockOwnerSource, MockPlatform};
use ping_purge::{
    BulkDeletionEngine, GateDenial, Invoker, OwnerCache, Pacer, PlatformError, PurgeConfig,
};
use ping_types::{ChannelInfo, SkipReason};

const BOT: u64 = 900;
const OWNER: u64 = 42;
const GUILD: u64 = 7;

fn channel(id: u64, name: &str) -> ChannelInfo {
    ChannelInfo {
        id,
        name: name.to_string(),
    }
}

#[tokio::test]
async fn owner_purges_whole_guild() {
    let start = Utc.with_ymd_and_hms(2025, 1, 20, 9, 30, 0).unwrap();
    let clock = MockClock::at(start);
    let platform = MockPlatform::new();
    platform.add_channel(channel(1, "general"));
    platform.add_channel(channel(2, "archive"));
    platform.add_channel(channel(3, "locked"));

    platform.push_history(1, BOT, 150, start - ChronoDuration::hours(1));
    platform.push_history(1, 5, 40, start - ChronoDuration::hours(2));
    platform.push_history(2, BOT, 3, start - ChronoDuration::days(20));
    platform.deny_history(3);

    let cache = OwnerCache::new();
    let ctx = cache.resolve(&MockOwnerSource(Ok(OWNER))).await;
    let guild = ctx
        .authorize_purge(&Invoker {
            user_id: OWNER,
            guild_id: Some(GUILD),
            can_manage_messages: false,
        })
        .unwrap();

    let config = PurgeConfig::default();
    let pacer = Arc::new(Pacer::new(clock.clone(), config.pacing));
    let engine = BulkDeletionEngine::new(platform.clone(), pacer, BOT, config);
    let report = engine.run(guild).await.unwrap();

    assert_eq!(platform.batch_sizes(), vec![99, 51]);
    assert_eq!(platform.single_calls().len(), 3);
    assert_eq!(report.deleted, 153);
    assert_eq!(report.failed, 0);
    assert_eq!(report.channels_skipped, 1);
    assert_eq!(report.channels[2].skipped, Some(SkipReason::AccessDenied));

    let text = report.to_string();
    assert!(text.starts_with("Deletion scan complete!"));
    assert!(text.contains("Deleted approx: 153 messages."));
}

#[tokio::test]
async fn non_moderator_is_refused_before_any_call() {
    let cache = OwnerCache::new();
    let ctx = cache.resolve(&MockOwnerSource(Ok(OWNER))).await;

    let denial = ctx
        .authorize_purge(&Invoker {
            user_id: 8,
            guild_id: Some(GUILD),
            can_manage_messages: false,
        })
        .unwrap_err();
    assert_eq!(denial, GateDenial::MissingManageMessages);
}

#[tokio::test]
async fn shared_pacer_spaces_consecutive_runs() {
    let start = Utc.with_ymd_and_hms(2025, 1, 20, 9, 30, 0).unwrap();
    let clock = MockClock::at(start);
    let platform = MockPlatform::new();
    platform.add_channel(channel(1, "general"));
    platform.push_history(1, BOT, 2, start - ChronoDuration::minutes(5));

    let config = PurgeConfig::default();
    let pacer = Arc::new(Pacer::new(clock.clone(), config.pacing));

    let first = BulkDeletionEngine::new(platform.clone(), pacer.clone(), BOT, config.clone());
    first.run(GUILD).await.unwrap();

    let second = BulkDeletionEngine::new(platform.clone(), pacer, BOT, config);
    second.run(GUILD).await.unwrap();

    // Both runs issue one batch; the second waits out the batch interval.
    assert_eq!(platform.batch_sizes(), vec![2, 2]);
    assert_eq!(clock.sleeps(), vec![std::time::Duration::from_secs(1)]);
}

#[tokio::test]
async fn unlisted_guild_surfaces_error() {
    let platform = MockPlatform::new();
    platform.fail_list_channels(PlatformError::PermissionDenied("Missing Access".to_string()));

    let config = PurgeConfig::default();
    let pacer = Arc::new(Pacer::new(MockClock::new(), config.pacing));
    let engine = BulkDeletionEngine::new(platform, pacer, BOT, config);

    assert!(engine.run(GUILD).await.is_err());
}
