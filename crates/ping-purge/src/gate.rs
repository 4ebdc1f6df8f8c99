//! Authorization for the privileged commands.
//!
//! The owner id is cached process-wide in an [`OwnerCache`] and copied into
//! an [`AuthorizationContext`] once per invocation, so a concurrent
//! re-resolution can never change the answer halfway through a command.

use std::future::Future;

use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::platform::PlatformError;

/// Resolves the application owner.
pub trait OwnerSource: Send + Sync {
    fn fetch_owner(&self) -> impl Future<Output = Result<u64, PlatformError>> + Send;
}

/// Who invoked a command and from where.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Invoker {
    pub user_id: u64,
    pub guild_id: Option<u64>,
    /// Manage-messages at guild level.
    pub can_manage_messages: bool,
}

/// Why a command was refused. The message is shown to the invoker.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GateDenial {
    #[error("This command can only be used in a server.")]
    NotInGuild,

    #[error("Error: Could not verify owner ID for permissions check.")]
    OwnerUnknown,

    #[error("You need the 'Manage Messages' permission or be the bot owner to use this command.")]
    MissingManageMessages,

    #[error("Error: You do not have permission to use this command.")]
    NotOwner,
}

/// Authorization facts resolved once for one command invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthorizationContext {
    owner_id: Option<u64>,
}

impl AuthorizationContext {
    pub fn new(owner_id: Option<u64>) -> Self {
        Self { owner_id }
    }

    pub fn owner_id(&self) -> Option<u64> {
        self.owner_id
    }

    fn is_owner(&self, invoker: &Invoker) -> bool {
        self.owner_id == Some(invoker.user_id)
    }

    /// Owner or manage-messages holder, inside a guild. Returns the guild.
    pub fn authorize_purge(&self, invoker: &Invoker) -> Result<u64, GateDenial> {
        let guild_id = invoker.guild_id.ok_or(GateDenial::NotInGuild)?;
        if self.is_owner(invoker) || invoker.can_manage_messages {
            return Ok(guild_id);
        }
        match self.owner_id {
            None => Err(GateDenial::OwnerUnknown),
            Some(_) => Err(GateDenial::MissingManageMessages),
        }
    }

    /// Owner only.
    pub fn authorize_shutdown(&self, invoker: &Invoker) -> Result<(), GateDenial> {
        match self.owner_id {
            None => Err(GateDenial::OwnerUnknown),
            Some(_) if self.is_owner(invoker) => Ok(()),
            Some(_) => Err(GateDenial::NotOwner),
        }
    }
}

/// Process-wide owner id with explicit invalidation.
#[derive(Debug, Default)]
pub struct OwnerCache {
    owner: RwLock<Option<u64>>,
}

impl OwnerCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the cached owner (e.g. on reconnect).
    pub async fn invalidate(&self) {
        *self.owner.write().await = None;
    }

    /// Cached owner, fetched through `source` when unset. A failed fetch
    /// yields a context without an owner rather than an error.
    pub async fn resolve<S: OwnerSource>(&self, source: &S) -> AuthorizationContext {
        if let Some(owner) = *self.owner.read().await {
            return AuthorizationContext::new(Some(owner));
        }

        match source.fetch_owner().await {
            Ok(owner) => {
                info!("Resolved owner ID: {}", owner);
                *self.owner.write().await = Some(owner);
                AuthorizationContext::new(Some(owner))
            }
            Err(e) => {
                warn!("Could not fetch owner ID: {}", e);
                AuthorizationContext::new(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const OWNER: u64 = 100;
    const GUILD: u64 = 7;

    fn invoker(user_id: u64, guild_id: Option<u64>, can_manage_messages: bool) -> Invoker {
        Invoker {
            user_id,
            guild_id,
            can_manage_messages,
        }
    }

    struct CountingSource {
        result: Result<u64, PlatformError>,
        calls: AtomicUsize,
    }

    impl CountingSource {
        fn new(result: Result<u64, PlatformError>) -> Self {
            Self {
                result,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl OwnerSource for CountingSource {
        async fn fetch_owner(&self) -> Result<u64, PlatformError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone()
        }
    }

    // ── purge ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_purge_owner_allowed() {
        let ctx = AuthorizationContext::new(Some(OWNER));
        assert_eq!(ctx.authorize_purge(&invoker(OWNER, Some(GUILD), false)), Ok(GUILD));
    }

    #[test]
    fn test_purge_manage_messages_allowed() {
        let ctx = AuthorizationContext::new(Some(OWNER));
        assert_eq!(ctx.authorize_purge(&invoker(5, Some(GUILD), true)), Ok(GUILD));
    }

    #[test]
    fn test_purge_denied_without_permission() {
        let ctx = AuthorizationContext::new(Some(OWNER));
        assert_eq!(
            ctx.authorize_purge(&invoker(5, Some(GUILD), false)),
            Err(GateDenial::MissingManageMessages)
        );
    }

    #[test]
    fn test_purge_requires_guild() {
        let ctx = AuthorizationContext::new(Some(OWNER));
        assert_eq!(
            ctx.authorize_purge(&invoker(OWNER, None, true)),
            Err(GateDenial::NotInGuild)
        );
    }

    #[test]
    fn test_purge_unknown_owner_still_allows_manage_messages() {
        let ctx = AuthorizationContext::new(None);
        assert_eq!(ctx.authorize_purge(&invoker(5, Some(GUILD), true)), Ok(GUILD));
        assert_eq!(
            ctx.authorize_purge(&invoker(5, Some(GUILD), false)),
            Err(GateDenial::OwnerUnknown)
        );
    }

    // ── shutdown ──────────────────────────────────────────────────────────────

    #[test]
    fn test_shutdown_owner_only() {
        let ctx = AuthorizationContext::new(Some(OWNER));
        assert_eq!(ctx.authorize_shutdown(&invoker(OWNER, None, false)), Ok(()));
        assert_eq!(
            ctx.authorize_shutdown(&invoker(5, Some(GUILD), true)),
            Err(GateDenial::NotOwner)
        );
    }

    #[test]
    fn test_shutdown_refused_when_owner_unknown() {
        let ctx = AuthorizationContext::new(None);
        assert_eq!(
            ctx.authorize_shutdown(&invoker(OWNER, None, false)),
            Err(GateDenial::OwnerUnknown)
        );
    }

    // ── OwnerCache ────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_cache_fetches_once() {
        let cache = OwnerCache::new();
        let source = CountingSource::new(Ok(OWNER));

        assert_eq!(cache.resolve(&source).await.owner_id(), Some(OWNER));
        assert_eq!(cache.resolve(&source).await.owner_id(), Some(OWNER));
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let cache = OwnerCache::new();
        let source = CountingSource::new(Ok(OWNER));

        cache.resolve(&source).await;
        cache.invalidate().await;
        cache.resolve(&source).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_fetch_is_not_cached() {
        let cache = OwnerCache::new();
        let failing = CountingSource::new(Err(PlatformError::Transient("down".to_string())));

        assert_eq!(cache.resolve(&failing).await.owner_id(), None);
        assert_eq!(cache.resolve(&failing).await.owner_id(), None);
        assert_eq!(failing.calls.load(Ordering::SeqCst), 2);
    }
}
