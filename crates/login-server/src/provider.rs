//! Client for the identity provider's token and userinfo endpoints.

use std::time::Duration;

use anyhow::Context;
use login_types::UserProfile;
use rand::Rng;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ServerConfig;

/// Upstream bodies are cut to this many bytes before being logged.
const MAX_LOGGED_BODY: usize = 512;

/// Longest backoff step, whatever the attempt number.
const MAX_BACKOFF_SHIFT: u32 = 6;

/// Static OAuth client credentials, loaded once at startup.
#[derive(Clone)]
pub struct ProviderCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

#[derive(Debug, Clone)]
pub struct ProviderEndpoints {
    pub token_url: String,
    pub userinfo_url: String,
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Exponential backoff with up to one extra base delay of random jitter.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as u64;
        let backoff = base_ms.saturating_mul(1 << attempt.min(MAX_BACKOFF_SHIFT));
        let jitter = rand::thread_rng().gen_range(0..=base_ms);
        Duration::from_millis(backoff.saturating_add(jitter))
    }
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    code: &'a str,
    client_id: &'a str,
    client_secret: &'a str,
    redirect_uri: &'a str,
    grant_type: &'static str,
}

/// Answer of the token endpoint. Only `access_token` is used.
#[derive(Deserialize)]
pub struct ProviderTokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl std::fmt::Debug for ProviderTokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderTokenResponse")
            .field("access_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("scope", &self.scope)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("upstream returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("invalid response: {0}")]
    Decode(String),
}

impl ProviderError {
    /// Only network-level failures and upstream 5xx are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Transport(e) => e.is_timeout() || e.is_connect(),
            ProviderError::Status { status, .. } => status.is_server_error(),
            ProviderError::Decode(_) => false,
        }
    }

    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            ProviderError::Status { status, .. } => Some(status.as_u16()),
            ProviderError::Transport(e) => e.status().map(|s| s.as_u16()),
            ProviderError::Decode(_) => None,
        }
    }
}

/// Google OAuth client performing the two-hop code exchange.
pub struct GoogleClient {
    http: reqwest::Client,
    credentials: ProviderCredentials,
    endpoints: ProviderEndpoints,
    retry: RetryPolicy,
}

impl GoogleClient {
    pub fn new(
        credentials: ProviderCredentials,
        endpoints: ProviderEndpoints,
        retry: RetryPolicy,
        timeout: Duration,
        connect_timeout: Duration,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            credentials,
            endpoints,
            retry,
        })
    }

    pub fn from_config(config: &ServerConfig) -> anyhow::Result<Self> {
        Self::new(
            ProviderCredentials {
                client_id: config.google_client_id.clone(),
                client_secret: config.google_secret_key.clone(),
                redirect_uri: config.google_redirect_uri.clone(),
            },
            ProviderEndpoints {
                token_url: config.google_token_url.clone(),
                userinfo_url: config.google_userinfo_url.clone(),
            },
            RetryPolicy {
                max_retries: config.provider_max_retries,
                base_delay: Duration::from_millis(config.provider_retry_base_ms),
            },
            config.provider_timeout(),
            config.provider_connect_timeout(),
        )
    }

    /// Exchange an authorization code for a provider access token.
    pub async fn exchange_code(&self, code: &str) -> Result<ProviderTokenResponse, ProviderError> {
        let form = TokenRequest {
            code,
            client_id: &self.credentials.client_id,
            client_secret: &self.credentials.client_secret,
            redirect_uri: &self.credentials.redirect_uri,
            grant_type: "authorization_code",
        };

        let response = self
            .send_with_retry("token exchange", || {
                self.http.post(&self.endpoints.token_url).form(&form)
            })
            .await?;

        let tokens: ProviderTokenResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;

        if tokens.access_token.is_empty() {
            return Err(ProviderError::Decode("empty access_token".to_string()));
        }

        Ok(tokens)
    }

    /// Fetch the user's profile with a provider access token.
    pub async fn fetch_profile(&self, access_token: &str) -> Result<UserProfile, ProviderError> {
        let response = self
            .send_with_retry("profile fetch", || {
                self.http
                    .get(&self.endpoints.userinfo_url)
                    .bearer_auth(access_token)
            })
            .await?;

        let profile: UserProfile = response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;

        if profile.email.trim().is_empty() {
            return Err(ProviderError::Decode("empty email".to_string()));
        }

        Ok(profile)
    }

    async fn send_with_retry<F>(&self, what: &str, build: F) -> Result<Response, ProviderError>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut attempt = 0;
        loop {
            let error = match build().send().await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    ProviderError::Status {
                        status,
                        body: truncate(body),
                    }
                }
                Err(e) => ProviderError::Transport(e),
            };

            if attempt >= self.retry.max_retries || !error.is_retryable() {
                tracing::warn!("Provider {} failed after {} attempt(s): {}", what, attempt + 1, error);
                return Err(error);
            }

            let delay = self.retry.delay_for(attempt);
            tracing::info!(
                "Provider {} failed ({}), retrying in {:?}",
                what,
                error,
                delay
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

fn truncate(mut body: String) -> String {
    if body.len() > MAX_LOGGED_BODY {
        let mut end = MAX_LOGGED_BODY;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        body.truncate(end);
        body.push_str("...");
    }
    body
}
