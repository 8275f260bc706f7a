//! Authorization code to session token exchange.

use std::sync::Arc;

use anyhow::Context;
use login_types::UserProfile;

use crate::auth::types::SessionConfig;
use crate::config::IdentityPolicy;
use crate::error::ApiError;
use crate::identity::IdentityResolver;
use crate::provider::GoogleClient;

/// Result of a successful login: the provider profile and a freshly
/// signed session token bound to its email.
#[derive(Debug)]
pub struct LoginOutcome {
    pub profile: UserProfile,
    pub session_token: String,
}

pub struct LoginExchange {
    provider: GoogleClient,
    session: Arc<SessionConfig>,
    resolver: Arc<dyn IdentityResolver>,
    policy: IdentityPolicy,
}

impl LoginExchange {
    pub fn new(
        provider: GoogleClient,
        session: Arc<SessionConfig>,
        resolver: Arc<dyn IdentityResolver>,
        policy: IdentityPolicy,
    ) -> Self {
        Self {
            provider,
            session,
            resolver,
            policy,
        }
    }

    /// Run the full exchange for one authorization code.
    ///
    /// The userinfo call is only made once the token exchange succeeded, and
    /// a session token is only signed once both calls succeeded.
    pub async fn exchange(&self, code: &str) -> Result<LoginOutcome, ApiError> {
        if code.trim().is_empty() {
            return Err(ApiError::malformed("`code` must not be empty"));
        }

        let tokens = self
            .provider
            .exchange_code(code)
            .await
            .map_err(|e| ApiError::ProviderExchangeFailed {
                status: e.upstream_status(),
            })?;

        let profile = self
            .provider
            .fetch_profile(&tokens.access_token)
            .await
            .map_err(|e| ApiError::ProfileFetchFailed(e.to_string()))?;
        drop(tokens);

        tracing::info!("OAuth login attempt from: {}", profile.email);

        self.resolve_identity(&profile).await?;

        let session_token = self
            .session
            .keys
            .create_token(&profile.email)
            .context("Failed to create session token")?;

        tracing::info!("Successful login for: {}", profile.email);

        Ok(LoginOutcome {
            profile,
            session_token,
        })
    }

    async fn resolve_identity(&self, profile: &UserProfile) -> Result<(), ApiError> {
        match self.resolver.resolve(profile).await {
            Ok(()) => Ok(()),
            Err(e) => match self.policy {
                IdentityPolicy::Required => Err(ApiError::IdentityResolutionFailed(e)),
                IdentityPolicy::BestEffort => {
                    tracing::warn!(
                        "Identity resolver '{}' failed for {}, continuing with login: {:?}",
                        self.resolver.name(),
                        profile.email,
                        e
                    );
                    Ok(())
                }
            },
        }
    }
}
