use thiserror::Error;

use crate::platform::PlatformError;

pub type Result<T> = std::result::Result<T, PurgeError>;

/// Operation-level failures. Everything narrower is folded into a
/// `ChannelResult` instead.
#[derive(Debug, Error)]
pub enum PurgeError {
    #[error("failed to list channels for guild {guild_id}: {source}")]
    ListChannels {
        guild_id: u64,
        #[source]
        source: PlatformError,
    },
}
