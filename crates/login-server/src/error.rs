//! Unified error handling for the login API.
//!
//! Handlers return [`ApiError`] and use `?` freely. The response body is
//! always a generic [`ErrorResponse`]; upstream bodies, token validation
//! reasons and internal causes stay in the server log.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// API error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Unified error type for API handlers
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request body missing, not JSON, or without a usable `code`
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    /// The provider's token endpoint failed or returned an unusable answer
    #[error("Token exchange failed (upstream status: {status:?})")]
    ProviderExchangeFailed { status: Option<u16> },

    /// The provider's userinfo endpoint failed or returned no email
    #[error("Profile fetch failed: {0}")]
    ProfileFetchFailed(String),

    /// The identity resolver failed under the `required` policy
    #[error("Identity resolution failed: {0}")]
    IdentityResolutionFailed(#[source] anyhow::Error),

    /// Session token absent, malformed, expired or forged
    #[error("Unauthenticated")]
    Unauthenticated,

    #[error("{0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn malformed(message: impl Into<String>) -> Self {
        ApiError::MalformedRequest(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::ProviderExchangeFailed { .. } | ApiError::ProfileFetchFailed(_) => {
                StatusCode::BAD_GATEWAY
            }
            ApiError::IdentityResolutionFailed(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_message = match &self {
            ApiError::MalformedRequest(msg) => msg.clone(),
            ApiError::ProviderExchangeFailed { status } => {
                tracing::warn!(upstream_status = ?status, "Token exchange failed");
                "Identity provider rejected the authorization code".to_string()
            }
            ApiError::ProfileFetchFailed(reason) => {
                tracing::warn!("Profile fetch failed: {}", reason);
                "Could not fetch user profile from identity provider".to_string()
            }
            ApiError::IdentityResolutionFailed(e) => {
                tracing::error!("Identity resolution failed: {:?}", e);
                "User account is temporarily unavailable".to_string()
            }
            ApiError::Unauthenticated => "Unauthorized".to_string(),
            ApiError::Internal(e) => {
                tracing::error!("Internal error: {:?}", e);
                "Internal server error".to_string()
            }
        };

        let body = Json(ErrorResponse {
            error: error_message,
            details: None,
        });

        (status, body).into_response()
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
