//! Shared helpers for driving the router against a mocked identity provider.

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, HeaderMap, Request, StatusCode},
    Router,
};
use clap::Parser;
use login_server::{
    build_cors_layer, config::ServerConfig, identity::IdentityResolver, router, AppState,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{body_string_contains, header as header_eq, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const JWT_SECRET: &str = "integration-test-secret-0123456789abcdef";

pub struct TestApp {
    pub provider: MockServer,
    pub state: AppState,
    pub app: Router,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn set_cookie(&self) -> Option<String> {
        self.headers
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    /// Session token value from the `Set-Cookie` header.
    pub fn session_cookie_value(&self) -> Option<String> {
        let cookie = self.set_cookie()?;
        let pair = cookie.split(';').next()?;
        pair.strip_prefix("access_token_cookie=")
            .map(str::to_string)
    }
}

pub fn test_config(provider: &MockServer, extra: &[&str]) -> ServerConfig {
    let token_url = format!("{}/token", provider.uri());
    let userinfo_url = format!("{}/userinfo", provider.uri());

    let mut args = vec![
        "login-server",
        "--google-client-id",
        "test-client-id",
        "--google-secret-key",
        "test-client-secret",
        "--jwt-secret",
        JWT_SECRET,
        "--google-token-url",
        token_url.as_str(),
        "--google-userinfo-url",
        userinfo_url.as_str(),
        "--provider-retry-base-ms",
        "1",
    ];
    args.extend_from_slice(extra);

    ServerConfig::try_parse_from(args).expect("valid test config")
}

pub async fn spawn_app(extra: &[&str]) -> TestApp {
    let provider = MockServer::start().await;
    let config = test_config(&provider, extra);
    let state = AppState::from_config(&config).expect("state builds");
    let app = router(state.clone(), build_cors_layer(None));

    TestApp {
        provider,
        state,
        app,
    }
}

pub async fn spawn_app_with_resolver(
    extra: &[&str],
    resolver: Arc<dyn IdentityResolver>,
) -> TestApp {
    let provider = MockServer::start().await;
    let config = test_config(&provider, extra);
    let state = AppState::with_resolver(&config, resolver).expect("state builds");
    let app = router(state.clone(), build_cors_layer(None));

    TestApp {
        provider,
        state,
        app,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn login(&self, code: &str) -> TestResponse {
        self.post_login(json!({ "code": code }).to_string()).await
    }

    pub async fn post_login(&self, raw_body: String) -> TestResponse {
        let request = Request::post("/google_login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(raw_body))
            .unwrap();
        self.send(request).await
    }

    pub async fn get_protected(&self, headers: &[(header::HeaderName, String)]) -> TestResponse {
        let mut builder = Request::get("/protected");
        for (name, value) in headers {
            builder = builder.header(name, value);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    /// Token endpoint answering `code` with `access_token`.
    pub async fn mock_token(&self, code: &str, access_token: &str, expected_calls: u64) {
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains(format!("code={}", code)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": access_token,
                "token_type": "Bearer",
                "expires_in": 3599,
                "scope": "openid email profile"
            })))
            .expect(expected_calls)
            .mount(&self.provider)
            .await;
    }

    /// Userinfo endpoint answering `access_token` with `profile`.
    pub async fn mock_userinfo(&self, access_token: &str, profile: Value, expected_calls: u64) {
        Mock::given(method("GET"))
            .and(path("/userinfo"))
            .and(header_eq("authorization", format!("Bearer {}", access_token).as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(profile))
            .expect(expected_calls)
            .mount(&self.provider)
            .await;
    }

    pub async fn token_calls(&self) -> usize {
        self.calls_to("/token").await
    }

    pub async fn userinfo_calls(&self) -> usize {
        self.calls_to("/userinfo").await
    }

    async fn calls_to(&self, target: &str) -> usize {
        self.provider
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.url.path() == target)
            .count()
    }
}

pub fn google_profile(email: &str) -> Value {
    json!({
        "sub": "110169484474386276334",
        "email": email,
        "email_verified": true,
        "name": "Ada Lovelace",
        "given_name": "Ada",
        "family_name": "Lovelace",
        "picture": "https://lh3.googleusercontent.com/a/photo.jpg",
        "locale": "en"
    })
}
