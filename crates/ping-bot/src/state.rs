//! Process-wide state shared with the event handler through the client's
//! `TypeMap`.

use std::sync::Arc;

use ping_purge::{OwnerCache, Pacer, SystemClock};
use serenity::gateway::ShardManager;
use serenity::prelude::TypeMapKey;

use crate::config::Config;

pub struct BotState {
    pub config: Config,
    pub owner: OwnerCache,
    /// Shared by every purge so concurrent runs still respect the pacing.
    pub pacer: Arc<Pacer<SystemClock>>,
}

impl BotState {
    pub fn new(config: Config) -> Self {
        let pacer = Arc::new(Pacer::new(SystemClock, config.purge.pacing));
        Self {
            config,
            owner: OwnerCache::new(),
            pacer,
        }
    }
}

impl TypeMapKey for BotState {
    type Value = Arc<BotState>;
}

pub struct ShardManagerContainer;

impl TypeMapKey for ShardManagerContainer {
    type Value = Arc<ShardManager>;
}
