//! Picking someone to ping when the bot is mentioned.

use rand::Rng;
use rand::seq::SliceRandom;
use serenity::model::user::OnlineStatus;

use crate::config::MentionConfig;

/// A channel member as seen at the moment of the mention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MentionCandidate {
    pub user_id: u64,
    pub is_bot: bool,
    pub status: OnlineStatus,
}

/// Members the reply may ping: humans other than the author whose presence
/// is online, idle or do-not-disturb, plus offline ones when configured.
pub fn eligible_targets(
    candidates: &[MentionCandidate],
    author_id: u64,
    config: &MentionConfig,
) -> Vec<u64> {
    candidates
        .iter()
        .filter(|c| !c.is_bot && c.user_id != author_id)
        .filter(|c| match c.status {
            OnlineStatus::Online | OnlineStatus::Idle | OnlineStatus::DoNotDisturb => true,
            _ => config.include_offline,
        })
        .map(|c| c.user_id)
        .collect()
}

/// Uniformly random pick among the eligible members.
pub fn pick_target<R: Rng + ?Sized>(eligible: &[u64], rng: &mut R) -> Option<u64> {
    eligible.choose(rng).copied()
}

pub fn not_found_notice(author_id: u64) -> String {
    format!(
        "Sorry <@{}>, couldn't find anyone online and eligible to ping right now!",
        author_id
    )
}

pub fn member_list_notice(author_id: u64) -> String {
    format!(
        "Sorry <@{}>, I had trouble getting the member list for this channel.",
        author_id
    )
}

pub fn reply_forbidden_notice(author_id: u64) -> String {
    format!(
        "Sorry <@{}>, I couldn't reply here (missing permissions).",
        author_id
    )
}
