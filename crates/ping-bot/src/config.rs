//! Configuration management for ping-bot

#[path = "config_tests.rs"]
mod config_tests;

use anyhow::{Context, Result};
use ping_purge::PurgeConfig;
use serde::{Deserialize, Serialize};
use std::fs;

/// Complete bot configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub discord: DiscordBotConfig,
    #[serde(default)]
    pub purge: PurgeConfig,
    #[serde(default)]
    pub mention: MentionConfig,
}

/// Gateway and presence settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordBotConfig {
    /// Bot token from the Discord developer portal
    #[serde(default)]
    pub bot_token: String,
    /// Custom status shown while the bot is idle
    #[serde(default = "default_status_text")]
    pub status_text: String,
}

/// How the bot answers when someone mentions it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MentionConfig {
    /// Offline members are eligible ping targets
    #[serde(default = "default_include_offline")]
    pub include_offline: bool,
    /// Lifetime of apology notices before they delete themselves
    #[serde(default = "default_notice_ttl_secs")]
    pub notice_ttl_secs: u64,
}

impl Default for MentionConfig {
    fn default() -> Self {
        Self {
            include_offline: default_include_offline(),
            notice_ttl_secs: default_notice_ttl_secs(),
        }
    }
}

/// Source of environment variables.
pub trait ReadEnv {
    fn var(&self, key: &str) -> Option<String>;
}

/// The process environment.
pub struct SystemEnv;

impl ReadEnv for SystemEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path))?;

        Ok(config)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_env_with(&SystemEnv)
    }

    pub fn from_env_with(env: &impl ReadEnv) -> Result<Self> {
        let bot_token = env
            .var("DISCORD_BOT_TOKEN")
            .context("DISCORD_BOT_TOKEN not set")?;

        let status_text = env
            .var("BOT_STATUS_TEXT")
            .unwrap_or_else(default_status_text);

        let mut purge = PurgeConfig::default();
        if let Some(v) = parse_number(env, "PURGE_BATCH_SIZE")? {
            purge.batch_size = v;
        }
        if let Some(v) = parse_number(env, "PURGE_MAX_MESSAGES_PER_CHANNEL")? {
            purge.max_messages_per_channel = v;
        }
        if let Some(v) = parse_number(env, "PURGE_PROGRESS_EVERY")? {
            purge.progress_every = v;
        }

        let include_offline = env
            .var("MENTION_INCLUDE_OFFLINE")
            .map(|v| v.trim().to_lowercase() != "false")
            .unwrap_or_else(default_include_offline);

        Ok(Config {
            discord: DiscordBotConfig {
                bot_token,
                status_text,
            },
            purge,
            mention: MentionConfig {
                include_offline,
                ..MentionConfig::default()
            },
        })
    }
}

fn parse_number(env: &impl ReadEnv, key: &str) -> Result<Option<usize>> {
    match env.var(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<usize>()
            .map(Some)
            .with_context(|| format!("{} must be a non-negative integer, got {:?}", key, raw)),
    }
}

fn default_status_text() -> String {
    "I'm probably broken...".to_string()
}

fn default_include_offline() -> bool {
    true
}

fn default_notice_ttl_secs() -> u64 {
    15
}
