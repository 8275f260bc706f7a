//! Local identity resolution hook.
//!
//! After the provider vouches for a user, a resolver may look up or create
//! the matching local account keyed by email. No store ships with the
//! server; [`NoopResolver`] is the default. Whether a failing resolver
//! blocks the login is decided by [`IdentityPolicy`](crate::config::IdentityPolicy).

use async_trait::async_trait;
use login_types::UserProfile;

#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Look up or create the local user for `profile.email`.
    async fn resolve(&self, profile: &UserProfile) -> anyhow::Result<()>;
}

/// Resolver that accepts every profile without touching any store.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopResolver;

#[async_trait]
impl IdentityResolver for NoopResolver {
    fn name(&self) -> &str {
        "noop"
    }

    async fn resolve(&self, _profile: &UserProfile) -> anyhow::Result<()> {
        Ok(())
    }
}
