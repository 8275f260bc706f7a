//! Authentication HTTP handlers.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use login_types::{LoginRequest, LoginResponse, LoginUser, ProtectedResponse};

use crate::config::SessionTransport;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

use super::guard::{build_removal_cookie, build_session_cookie};
use super::types::Identity;

/// Exchange a Google authorization code for a session.
///
/// Depending on the configured transport the session token is returned as
/// `user.jwt` or set as the session cookie.
pub async fn google_login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::debug!("Rejected login body: {}", rejection.body_text());
        ApiError::malformed("Request body must be JSON with a string `code` field")
    })?;

    let outcome = state.login.exchange(&request.code).await?;
    let session = &state.session;

    let response = match session.transport {
        SessionTransport::Body => Json(LoginResponse {
            user: LoginUser {
                profile: outcome.profile,
                jwt: Some(outcome.session_token),
            },
        })
        .into_response(),
        SessionTransport::Cookie => {
            let cookie = build_session_cookie(
                &outcome.session_token,
                session.keys.ttl().num_seconds(),
                session.cookie_secure,
            );
            (
                [(header::SET_COOKIE, cookie)],
                Json(LoginResponse {
                    user: LoginUser {
                        profile: outcome.profile,
                        jwt: None,
                    },
                }),
            )
                .into_response()
        }
    };

    Ok(response)
}

/// Example of a route that requires a valid session.
pub async fn protected(identity: Identity) -> Json<ProtectedResponse> {
    Json(ProtectedResponse {
        logged_in_as: identity.email,
    })
}

/// Logout - clear the session cookie.
pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    let cookie = build_removal_cookie(state.session.cookie_secure);

    (StatusCode::NO_CONTENT, [(header::SET_COOKIE, cookie)])
}
