//! Serenity event handler implementation

use std::sync::Arc;

use ping_purge::{BulkDeletionEngine, Invoker, PlatformError};
use serenity::async_trait;
use serenity::builder::{
    CreateAllowedMentions, CreateInteractionResponse, CreateInteractionResponseFollowup,
    CreateInteractionResponseMessage, CreateMessage,
};
use serenity::cache::Cache;
use serenity::gateway::ActivityData;
use serenity::http::Http;
use serenity::model::application::{CommandInteraction, Interaction};
use serenity::model::channel::{ChannelType, Message};
use serenity::model::gateway::Ready;
use serenity::model::id::{ChannelId, GuildId, UserId};
use serenity::model::user::OnlineStatus;
use serenity::prelude::*;
use tokio::time::Duration;
use tracing::{debug, error, info, warn};

use crate::commands::{self, COMMAND_ERROR, SHUTDOWN_ACK};
use crate::errors::{log_error, to_platform_error};
use crate::mention::{self, MentionCandidate};
use crate::platform::SerenityPlatform;
use crate::state::{BotState, ShardManagerContainer};

/// Grace period between acknowledging a shutdown and closing the shards.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

pub struct Handler;

async fn bot_state(ctx: &Context) -> Option<Arc<BotState>> {
    let data = ctx.data.read().await;
    let state = data.get::<BotState>().cloned();
    if state.is_none() {
        error!("BotState not found in context data");
    }
    state
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("Logged in as {} ({})", ready.user.name, ready.user.id);

        let Some(state) = bot_state(&ctx).await else {
            return;
        };

        // A reconnect may follow an ownership transfer.
        state.owner.invalidate().await;
        let platform = SerenityPlatform::new(ctx.http.clone(), ctx.cache.clone(), ready.user.id);
        if state.owner.resolve(&platform).await.owner_id().is_none() {
            warn!("Owner checks for /shutdownserver and /delete_pings will fail until the owner is known");
        }

        match commands::register(&ctx.http).await {
            Ok(registered) => info!("Registered {} global commands", registered.len()),
            Err(e) => log_error("register commands", &e),
        }

        ctx.set_presence(
            Some(ActivityData::custom(state.config.discord.status_text.clone())),
            OnlineStatus::Idle,
        );
        info!("Bot is ready and listening for mentions");
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }

        let bot_id = ctx.cache.current_user().id;
        if !msg.mentions_user_id(bot_id) {
            return;
        }

        let Some(guild_id) = msg.guild_id else {
            debug!("Ignoring mention in DM from {}", msg.author.name);
            return;
        };

        let Some(state) = bot_state(&ctx).await else {
            return;
        };

        reply_to_mention(&ctx, &msg, guild_id, &state).await;
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let Interaction::Command(cmd) = interaction else {
            return;
        };

        let Some(state) = bot_state(&ctx).await else {
            return;
        };

        match cmd.data.name.as_str() {
            commands::DELETE_PINGS => {
                tokio::spawn(delete_pings(ctx, cmd, state));
            }
            commands::SHUTDOWN => shutdown(ctx, cmd, state).await,
            other => {
                error!("Unknown command '{}' from {}", other, cmd.user.id);
                respond(&ctx, &cmd, COMMAND_ERROR).await;
            }
        }
    }
}

// ── Mention reply ─────────────────────────────────────────────────────────────

enum ChannelMembers {
    /// Not a guild text channel; mentions there are ignored.
    NotText,
    Unavailable,
    Members(Vec<MentionCandidate>),
}

/// Members who can see the channel, with their cached presence.
fn channel_members(cache: &Cache, guild_id: GuildId, channel_id: ChannelId) -> ChannelMembers {
    let Some(guild) = cache.guild(guild_id) else {
        return ChannelMembers::Unavailable;
    };
    let Some(channel) = guild.channels.get(&channel_id) else {
        return ChannelMembers::NotText;
    };
    if channel.kind != ChannelType::Text {
        return ChannelMembers::NotText;
    }

    let members = guild
        .members
        .values()
        .filter(|m| guild.user_permissions_in(channel, m).view_channel())
        .map(|m| MentionCandidate {
            user_id: m.user.id.get(),
            is_bot: m.user.bot,
            status: guild
                .presences
                .get(&m.user.id)
                .map_or(OnlineStatus::Offline, |p| p.status),
        })
        .collect();
    ChannelMembers::Members(members)
}

async fn reply_to_mention(ctx: &Context, msg: &Message, guild_id: GuildId, state: &BotState) {
    let ttl = Duration::from_secs(state.config.mention.notice_ttl_secs);
    let author_id = msg.author.id.get();

    let candidates = match channel_members(&ctx.cache, guild_id, msg.channel_id) {
        ChannelMembers::NotText => {
            debug!("Ignoring mention from {} outside a text channel", msg.author.name);
            return;
        }
        ChannelMembers::Unavailable => {
            error!("Member list for guild {} is not cached", guild_id);
            let notice = quiet_reply(msg, mention::member_list_notice(author_id));
            send_notice(ctx.http.clone(), msg.channel_id, notice, ttl).await;
            return;
        }
        ChannelMembers::Members(members) => members,
    };

    info!("Bot mentioned by {} in channel {}", msg.author.name, msg.channel_id);

    let eligible = mention::eligible_targets(&candidates, author_id, &state.config.mention);
    let picked = mention::pick_target(&eligible, &mut rand::thread_rng());
    let Some(target) = picked else {
        info!("No eligible members to ping in channel {}", msg.channel_id);
        let notice = quiet_reply(msg, mention::not_found_notice(author_id));
        send_notice(ctx.http.clone(), msg.channel_id, notice, ttl).await;
        return;
    };

    let reply = quiet_reply(msg, format!("<@{}>", target)).allowed_mentions(
        CreateAllowedMentions::new()
            .users(vec![UserId::new(target)])
            .replied_user(false),
    );

    match msg.channel_id.send_message(&ctx.http, reply).await {
        Ok(_) => info!("Replied to mention from {}, pinged {}", msg.author.name, target),
        Err(e) => match to_platform_error("mention reply", &e) {
            PlatformError::PermissionDenied(_) => {
                error!("Missing permissions to reply in channel {}", msg.channel_id);
                let fallback =
                    CreateMessage::new().content(mention::reply_forbidden_notice(author_id));
                send_notice(ctx.http.clone(), msg.channel_id, fallback, ttl).await;
            }
            other => error!("Failed to send mention reply: {}", other),
        },
    }
}

/// A reply that does not ping the message author.
fn quiet_reply(msg: &Message, content: String) -> CreateMessage {
    CreateMessage::new()
        .content(content)
        .reference_message(msg)
        .allowed_mentions(CreateAllowedMentions::new().replied_user(false))
}

/// Send a message that deletes itself after `ttl`.
async fn send_notice(http: Arc<Http>, channel_id: ChannelId, notice: CreateMessage, ttl: Duration) {
    let sent = match channel_id.send_message(&*http, notice).await {
        Ok(sent) => sent,
        Err(e) => {
            log_error("send notice", &e);
            return;
        }
    };

    tokio::spawn(async move {
        tokio::time::sleep(ttl).await;
        if let Err(e) = sent.channel_id.delete_message(&*http, sent.id).await {
            log_error("delete notice", &e);
        }
    });
}

// ── Slash commands ────────────────────────────────────────────────────────────

fn invoker(cmd: &CommandInteraction) -> Invoker {
    Invoker {
        user_id: cmd.user.id.get(),
        guild_id: cmd.guild_id.map(|g| g.get()),
        can_manage_messages: cmd
            .member
            .as_ref()
            .and_then(|m| m.permissions)
            .is_some_and(|p| p.manage_messages()),
    }
}

async fn delete_pings(ctx: Context, cmd: CommandInteraction, state: Arc<BotState>) {
    if let Err(e) = cmd.defer_ephemeral(&ctx.http).await {
        log_error("defer delete_pings", &e);
        return;
    }

    let bot_id = ctx.cache.current_user().id;
    let platform = SerenityPlatform::new(ctx.http.clone(), ctx.cache.clone(), bot_id);

    let auth = state.owner.resolve(&platform).await;
    let guild_id = match auth.authorize_purge(&invoker(&cmd)) {
        Ok(guild_id) => guild_id,
        Err(denial) => {
            info!("Refused /delete_pings for {}: {:?}", cmd.user.id, denial);
            followup(&ctx, &cmd, &denial.to_string()).await;
            return;
        }
    };

    info!("Deletion scan initiated by {} in guild {}", cmd.user.name, guild_id);

    let engine = BulkDeletionEngine::new(
        platform,
        state.pacer.clone(),
        bot_id.get(),
        state.config.purge.clone(),
    );

    let summary = match engine.run(guild_id).await {
        Ok(report) => {
            info!(
                guild_id,
                deleted = report.deleted,
                failed = report.failed,
                skipped_channels = report.channels_skipped,
                "Deletion scan finished"
            );
            report.to_string()
        }
        Err(e) => {
            error!("Deletion scan for guild {} failed: {}", guild_id, e);
            COMMAND_ERROR.to_string()
        }
    };

    followup(&ctx, &cmd, &summary).await;
}

async fn shutdown(ctx: Context, cmd: CommandInteraction, state: Arc<BotState>) {
    let bot_id = ctx.cache.current_user().id;
    let platform = SerenityPlatform::new(ctx.http.clone(), ctx.cache.clone(), bot_id);

    let auth = state.owner.resolve(&platform).await;
    if let Err(denial) = auth.authorize_shutdown(&invoker(&cmd)) {
        warn!("Unauthorized shutdown attempt by {} ({})", cmd.user.name, cmd.user.id);
        respond(&ctx, &cmd, &denial.to_string()).await;
        return;
    }

    warn!("Shutdown command received from owner {}", cmd.user.id);
    respond(&ctx, &cmd, SHUTDOWN_ACK).await;
    tokio::time::sleep(SHUTDOWN_GRACE).await;

    let manager = ctx.data.read().await.get::<ShardManagerContainer>().cloned();
    match manager {
        Some(manager) => manager.shutdown_all().await,
        None => error!("ShardManager not found in context data; cannot shut down"),
    }
}

/// Ephemeral initial response.
async fn respond(ctx: &Context, cmd: &CommandInteraction, content: &str) {
    let response = CreateInteractionResponse::Message(
        CreateInteractionResponseMessage::new()
            .content(content)
            .ephemeral(true),
    );
    if let Err(e) = cmd.create_response(&ctx.http, response).await {
        log_error("interaction response", &e);
    }
}

/// Ephemeral follow-up to a deferred interaction.
async fn followup(ctx: &Context, cmd: &CommandInteraction, content: &str) {
    let message = CreateInteractionResponseFollowup::new()
        .content(content)
        .ephemeral(true);
    if let Err(e) = cmd.create_followup(&ctx.http, message).await {
        log_error("interaction follow-up", &e);
    }
}
