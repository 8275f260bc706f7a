//! Session handling for the Google login flow.
//!
//! This module provides:
//! - JWT session token creation and validation
//! - The `/google_login`, `/protected` and `/logout` handlers
//! - The [`Identity`] extractor guarding protected routes
//! - Session cookie building

mod guard;
mod handlers;
pub mod jwt;
pub mod types;

pub use guard::{authenticate, build_removal_cookie, build_session_cookie};
pub use handlers::{google_login, logout, protected};
pub use types::{Claims, Identity, SessionConfig, SESSION_COOKIE};
