//! Google login exchange service.
//!
//! Exchanges an OAuth authorization code for a provider access token, fetches
//! the user's profile with it, and issues a stateless session token bound to
//! the profile email.

use std::sync::Arc;

use axum::{
    http::{header, Method, StatusCode},
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

pub mod auth;
pub mod config;
pub mod error;
pub mod identity;
pub mod login;
pub mod provider;

use auth::SessionConfig;
use config::ServerConfig;
use identity::{IdentityResolver, NoopResolver};
use login::LoginExchange;
use provider::GoogleClient;

/// Immutable state shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    pub login: Arc<LoginExchange>,
    pub session: Arc<SessionConfig>,
}

impl AppState {
    pub fn from_config(config: &ServerConfig) -> anyhow::Result<Self> {
        Self::with_resolver(config, Arc::new(NoopResolver))
    }

    pub fn with_resolver(
        config: &ServerConfig,
        resolver: Arc<dyn IdentityResolver>,
    ) -> anyhow::Result<Self> {
        let session = Arc::new(SessionConfig::from_config(config)?);
        let provider = GoogleClient::from_config(config)?;
        let login = LoginExchange::new(provider, session.clone(), resolver, config.identity_policy);

        Ok(Self {
            login: Arc::new(login),
            session,
        })
    }
}

pub fn router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/", get(hello_world))
        .route("/health", get(health_check))
        .route("/google_login", post(auth::google_login))
        .route("/protected", get(auth::protected))
        .route("/logout", post(auth::logout))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn hello_world() -> &'static str {
    "hello world"
}

async fn health_check() -> StatusCode {
    StatusCode::OK
}

/// Build CORS layer from the configured origin list.
///
/// If origins are given, only those are allowed and credentials (the session
/// cookie) may be sent. Otherwise defaults to permissive CORS, which cannot
/// carry cookies and is meant for development only.
pub fn build_cors_layer(allowed_origins: Option<&str>) -> CorsLayer {
    match allowed_origins {
        Some(origins) => {
            let origins: Vec<_> = origins
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();

            if origins.is_empty() {
                tracing::warn!(
                    "CORS_ALLOWED_ORIGINS is set but empty, using permissive CORS (not recommended for production)"
                );
                CorsLayer::permissive()
            } else {
                tracing::info!("CORS configured for origins: {:?}", origins);
                CorsLayer::new()
                    .allow_origin(AllowOrigin::list(origins))
                    .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                    .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
                    .allow_credentials(true)
            }
        }
        None => {
            tracing::warn!(
                "CORS_ALLOWED_ORIGINS not set, using permissive CORS (not recommended for production)"
            );
            CorsLayer::permissive()
        }
    }
}
