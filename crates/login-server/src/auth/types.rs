//! Session-related types and configuration.

use serde::{Deserialize, Serialize};

use crate::config::{ServerConfig, SessionTransport};

use super::jwt::SessionKeys;

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "access_token_cookie";

/// Value of the `type` claim on session tokens.
pub const ACCESS_TOKEN_TYPE: &str = "access";

/// JWT Claims structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user email)
    pub sub: String,
    /// Issued at timestamp
    pub iat: i64,
    /// Not before timestamp
    pub nbf: i64,
    /// Expiration timestamp
    pub exp: i64,
    /// Unique token id
    pub jti: String,
    #[serde(rename = "type")]
    pub token_type: String,
}

/// Identity extracted from a verified session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub email: String,
}

/// Everything needed to issue, deliver and check session tokens.
pub struct SessionConfig {
    pub keys: SessionKeys,
    pub transport: SessionTransport,
    pub cookie_secure: bool,
}

impl SessionConfig {
    pub fn from_config(config: &ServerConfig) -> anyhow::Result<Self> {
        Ok(Self {
            keys: SessionKeys::new(config.jwt_secret.as_bytes(), config.session_ttl()?),
            transport: config.session_transport,
            cookie_secure: config.cookie_secure,
        })
    }
}
