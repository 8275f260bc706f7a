//! Session guard for protecting routes.
//!
//! Handlers take an [`Identity`] argument to require a valid session.
//! Extraction fails with a generic 401 whatever the reason; the reason
//! itself is only logged.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, HeaderMap},
};
use cookie::{time, Cookie, SameSite};

use crate::config::SessionTransport;
use crate::error::ApiError;
use crate::AppState;

use super::types::{Identity, SessionConfig, SESSION_COOKIE};

#[async_trait]
impl<S> FromRequestParts<S> for Identity
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        authenticate(&parts.headers, &state.session)
    }
}

/// Extract and verify the session token carried by a request.
pub fn authenticate(headers: &HeaderMap, session: &SessionConfig) -> Result<Identity, ApiError> {
    let token = match session.transport {
        SessionTransport::Cookie => extract_token_from_cookie(headers, SESSION_COOKIE),
        SessionTransport::Body => extract_token_from_header(headers),
    };

    let Some(token) = token else {
        tracing::debug!("Rejected request without session token");
        return Err(ApiError::Unauthenticated);
    };

    let claims = session.keys.validate_token(&token).map_err(|e| {
        tracing::debug!("Rejected session token: {}", e);
        ApiError::Unauthenticated
    })?;

    Ok(Identity { email: claims.sub })
}

fn extract_token_from_cookie(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|cookie_str| Cookie::parse(cookie_str.trim()).ok())
        .find(|cookie| cookie.name() == cookie_name)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}

fn extract_token_from_header(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim_start().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("Bearer") {
        return None;
    }

    Some(token.trim().to_string()).filter(|s| !s.is_empty())
}

/// Build the `Set-Cookie` value carrying a session token.
pub fn build_session_cookie(token: &str, max_age_secs: i64, secure: bool) -> String {
    Cookie::build((SESSION_COOKIE, token.to_string()))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(max_age_secs))
        .build()
        .to_string()
}

/// Build the `Set-Cookie` value that clears the session cookie.
pub fn build_removal_cookie(secure: bool) -> String {
    let mut cookie = Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .build();
    cookie.make_removal();
    cookie.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::SessionKeys;
    use axum::http::HeaderValue;

    fn session(transport: SessionTransport) -> SessionConfig {
        SessionConfig {
            keys: SessionKeys::new(b"guard-test-secret", chrono::Duration::minutes(5)),
            transport,
            cookie_secure: true,
        }
    }

    #[test]
    fn test_cookie_extraction_among_other_cookies() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; access_token_cookie=abc.def.ghi; lang=en"),
        );

        assert_eq!(
            extract_token_from_cookie(&headers, SESSION_COOKIE).as_deref(),
            Some("abc.def.ghi")
        );
        assert_eq!(extract_token_from_cookie(&headers, "missing"), None);
    }

    #[test]
    fn test_bearer_extraction() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_token_from_header(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic xyz"));
        assert_eq!(extract_token_from_header(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(extract_token_from_header(&headers).as_deref(), Some("abc"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("bearer abc"));
        assert_eq!(extract_token_from_header(&headers).as_deref(), Some("abc"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("BEARER abc"));
        assert_eq!(extract_token_from_header(&headers).as_deref(), Some("abc"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(extract_token_from_header(&headers), None);
    }

    #[test]
    fn test_authenticate_uses_configured_transport() {
        let cookie_session = session(SessionTransport::Cookie);
        let token = cookie_session.keys.create_token("a@b.com").unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );
        assert!(matches!(
            authenticate(&headers, &cookie_session),
            Err(ApiError::Unauthenticated)
        ));

        let body_session = session(SessionTransport::Body);
        let identity = authenticate(&headers, &body_session).expect("bearer token accepted");
        assert_eq!(identity.email, "a@b.com");
    }

    #[test]
    fn test_session_cookie_flags() {
        let cookie = build_session_cookie("abc.def.ghi", 900, true);

        assert!(cookie.starts_with("access_token_cookie=abc.def.ghi"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Secure"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("Max-Age=900"));

        let insecure = build_session_cookie("abc.def.ghi", 900, false);
        assert!(!insecure.contains("Secure"));
        assert!(insecure.contains("HttpOnly"));
    }

    #[test]
    fn test_removal_cookie_expires_immediately() {
        let cookie = build_removal_cookie(true);

        assert!(cookie.starts_with("access_token_cookie=;"));
        assert!(cookie.contains("Max-Age=0"));
    }
}
