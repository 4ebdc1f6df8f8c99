//! Serenity-backed implementation of the purge engine's platform traits.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use ping_purge::config::HISTORY_PAGE_LIMIT;
use ping_purge::{
    GuildDirectory, HistoryPage, MessageDeleter, MessageHistory, OwnerSource, PlatformError,
};
use ping_types::{ChannelInfo, ChannelPermissions, HistoryMessage};
use serenity::builder::GetMessages;
use serenity::cache::Cache;
use serenity::http::Http;
use serenity::model::channel::{Channel, ChannelType};
use serenity::model::id::{ChannelId, GuildId, MessageId, UserId};

use crate::errors::to_platform_error;

/// Milliseconds between the Unix epoch and the first second of 2015.
const DISCORD_EPOCH_MS: i64 = 1_420_070_400_000;

/// Creation instant encoded in a snowflake id.
pub fn snowflake_created_at(id: u64) -> DateTime<Utc> {
    let ms = (id >> 22) as i64 + DISCORD_EPOCH_MS;
    DateTime::from_timestamp_millis(ms).unwrap_or(DateTime::UNIX_EPOCH)
}

/// Gateway client handles plus the bot's own user id.
#[derive(Clone)]
pub struct SerenityPlatform {
    http: Arc<Http>,
    cache: Arc<Cache>,
    bot_id: UserId,
}

impl SerenityPlatform {
    pub fn new(http: Arc<Http>, cache: Arc<Cache>, bot_id: UserId) -> Self {
        Self { http, cache, bot_id }
    }
}

impl MessageHistory for SerenityPlatform {
    async fn fetch_page(
        &self,
        channel_id: u64,
        before: Option<u64>,
        limit: usize,
    ) -> Result<HistoryPage, PlatformError> {
        let limit = limit.clamp(1, HISTORY_PAGE_LIMIT);
        let mut request = GetMessages::new().limit(limit as u8);
        if let Some(before) = before {
            request = request.before(MessageId::new(before));
        }

        let messages = ChannelId::new(channel_id)
            .messages(&*self.http, request)
            .await
            .map_err(|e| to_platform_error("fetch history", &e))?;

        let next = if messages.len() == limit {
            messages.last().map(|m| m.id.get())
        } else {
            None
        };

        Ok(HistoryPage {
            messages: messages
                .iter()
                .map(|m| HistoryMessage {
                    id: m.id.get(),
                    author_id: m.author.id.get(),
                    created_at: snowflake_created_at(m.id.get()),
                })
                .collect(),
            next,
        })
    }
}

impl MessageDeleter for SerenityPlatform {
    async fn delete_batch(
        &self,
        channel_id: u64,
        message_ids: &[u64],
    ) -> Result<(), PlatformError> {
        let channel = ChannelId::new(channel_id);
        // Bulk delete rejects fewer than two ids.
        if let [only] = message_ids {
            return self.delete_one(channel_id, *only).await;
        }

        let ids: Vec<MessageId> = message_ids.iter().copied().map(MessageId::new).collect();
        channel
            .delete_messages(&*self.http, &ids)
            .await
            .map_err(|e| to_platform_error("bulk delete", &e))
    }

    async fn delete_one(&self, channel_id: u64, message_id: u64) -> Result<(), PlatformError> {
        ChannelId::new(channel_id)
            .delete_message(&*self.http, MessageId::new(message_id))
            .await
            .map_err(|e| to_platform_error("delete message", &e))
    }
}

impl GuildDirectory for SerenityPlatform {
    async fn text_channels(&self, guild_id: u64) -> Result<Vec<ChannelInfo>, PlatformError> {
        let channels = GuildId::new(guild_id)
            .channels(&*self.http)
            .await
            .map_err(|e| to_platform_error("list channels", &e))?;

        let mut text: Vec<_> = channels
            .into_values()
            .filter(|c| c.kind == ChannelType::Text)
            .collect();
        text.sort_by_key(|c| (c.position, c.id));

        Ok(text
            .into_iter()
            .map(|c| ChannelInfo {
                id: c.id.get(),
                name: c.name,
            })
            .collect())
    }

    async fn channel_permissions(
        &self,
        channel_id: u64,
    ) -> Result<ChannelPermissions, PlatformError> {
        let channel = self
            .http
            .get_channel(ChannelId::new(channel_id))
            .await
            .map_err(|e| to_platform_error("resolve channel", &e))?;

        let Channel::Guild(channel) = channel else {
            return Err(PlatformError::NotFound(format!(
                "channel {} is not a guild channel",
                channel_id
            )));
        };

        let perms = channel
            .permissions_for_user(&self.cache, self.bot_id)
            .map_err(|e| to_platform_error("compute permissions", &e))?;

        Ok(ChannelPermissions {
            can_view_history: perms.view_channel() && perms.read_message_history(),
            can_manage_messages: perms.manage_messages(),
        })
    }
}

impl OwnerSource for SerenityPlatform {
    async fn fetch_owner(&self) -> Result<u64, PlatformError> {
        let info = self
            .http
            .get_current_application_info()
            .await
            .map_err(|e| to_platform_error("fetch application info", &e))?;

        info.owner
            .map(|u| u.id.get())
            .or_else(|| info.team.map(|t| t.owner_user_id.get()))
            .ok_or_else(|| PlatformError::NotFound("application has no owner".to_string()))
    }
}
