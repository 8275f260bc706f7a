//! Server configuration loaded from flags and environment variables.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::builder::NonEmptyStringValueParser;
use clap::{ArgAction, Parser, ValueEnum};

pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v3/userinfo";

/// Signing secrets shorter than this get a startup warning.
const MIN_RECOMMENDED_SECRET_LEN: usize = 32;

/// Longest accepted session lifetime: one year.
pub const MAX_SESSION_TTL_SECS: u64 = 365 * 24 * 60 * 60;

/// Where the session token travels between server and client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SessionTransport {
    /// Returned as `user.jwt` in the login response, presented back as a bearer token.
    Body,
    /// Set as the `access_token_cookie` cookie.
    Cookie,
}

/// What a failing identity resolver does to a login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum IdentityPolicy {
    /// Log the failure and issue the session anyway.
    BestEffort,
    /// Abort the login; no session is issued.
    Required,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "login-server")]
#[command(about = "Exchanges Google authorization codes for session tokens")]
pub struct ServerConfig {
    /// Address to listen on.
    #[arg(long, env = "BIND_ADDRESS", default_value = "0.0.0.0:5000")]
    pub bind: SocketAddr,

    /// OAuth client id from the Google developer console.
    #[arg(long, env = "GOOGLE_CLIENT_ID", value_parser = NonEmptyStringValueParser::new())]
    pub google_client_id: String,

    /// OAuth client secret from the Google developer console.
    #[arg(
        long,
        env = "GOOGLE_SECRET_KEY",
        hide_env_values = true,
        value_parser = NonEmptyStringValueParser::new()
    )]
    pub google_secret_key: String,

    /// Secret used to sign session tokens.
    #[arg(
        long,
        env = "JWT_SECRET",
        hide_env_values = true,
        value_parser = NonEmptyStringValueParser::new()
    )]
    pub jwt_secret: String,

    /// Redirect URI sent with the code exchange. `postmessage` for popup flows.
    #[arg(long, env = "GOOGLE_REDIRECT_URI", default_value = "postmessage")]
    pub google_redirect_uri: String,

    #[arg(long, env = "GOOGLE_TOKEN_URL", default_value = GOOGLE_TOKEN_URL)]
    pub google_token_url: String,

    #[arg(long, env = "GOOGLE_USERINFO_URL", default_value = GOOGLE_USERINFO_URL)]
    pub google_userinfo_url: String,

    #[arg(long, env = "SESSION_TRANSPORT", value_enum, default_value_t = SessionTransport::Cookie)]
    pub session_transport: SessionTransport,

    /// Session token lifetime in seconds.
    #[arg(long, env = "SESSION_TTL_SECS", default_value_t = 900)]
    pub session_ttl_secs: u64,

    /// Mark the session cookie `Secure`. Only disable for local plain-HTTP development.
    #[arg(long, env = "COOKIE_SECURE", default_value_t = true, action = ArgAction::Set)]
    pub cookie_secure: bool,

    /// Per-request timeout for calls to the identity provider, in seconds.
    #[arg(long, env = "PROVIDER_TIMEOUT_SECS", default_value_t = 10)]
    pub provider_timeout_secs: u64,

    #[arg(long, env = "PROVIDER_CONNECT_TIMEOUT_SECS", default_value_t = 5)]
    pub provider_connect_timeout_secs: u64,

    /// Retries for transport failures and 5xx answers. 4xx answers are never retried.
    #[arg(long, env = "PROVIDER_MAX_RETRIES", default_value_t = 2)]
    pub provider_max_retries: u32,

    /// Base backoff between retries, in milliseconds.
    #[arg(long, env = "PROVIDER_RETRY_BASE_MS", default_value_t = 200)]
    pub provider_retry_base_ms: u64,

    #[arg(long, env = "IDENTITY_POLICY", value_enum, default_value_t = IdentityPolicy::BestEffort)]
    pub identity_policy: IdentityPolicy,

    /// Comma-separated list of allowed CORS origins. Permissive when unset.
    #[arg(long, env = "CORS_ALLOWED_ORIGINS")]
    pub cors_allowed_origins: Option<String>,
}

impl ServerConfig {
    /// Check values clap cannot express and warn about risky settings.
    pub fn validate(&self) -> Result<()> {
        if self.session_ttl_secs == 0 {
            anyhow::bail!("SESSION_TTL_SECS must be greater than zero");
        }
        if self.session_ttl_secs > MAX_SESSION_TTL_SECS {
            anyhow::bail!(
                "SESSION_TTL_SECS must not exceed {} (one year)",
                MAX_SESSION_TTL_SECS
            );
        }
        if self.provider_timeout_secs == 0 {
            anyhow::bail!("PROVIDER_TIMEOUT_SECS must be greater than zero");
        }

        if self.jwt_secret.len() < MIN_RECOMMENDED_SECRET_LEN {
            tracing::warn!(
                "JWT_SECRET is shorter than {} bytes, use a longer random secret in production",
                MIN_RECOMMENDED_SECRET_LEN
            );
        }
        if !self.cookie_secure {
            tracing::warn!("COOKIE_SECURE is disabled, session cookies will be sent over plain HTTP");
        }

        Ok(())
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }

    pub fn provider_connect_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_connect_timeout_secs)
    }

    pub fn session_ttl(&self) -> Result<chrono::Duration> {
        if self.session_ttl_secs > MAX_SESSION_TTL_SECS {
            anyhow::bail!("SESSION_TTL_SECS is too large");
        }
        let secs = i64::try_from(self.session_ttl_secs).context("SESSION_TTL_SECS is too large")?;
        chrono::Duration::try_seconds(secs).context("SESSION_TTL_SECS is out of range")
    }
}
