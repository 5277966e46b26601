//! HTTP API definitions.

pub mod admin;
pub mod auth;

use axum::{
    routing::{get, post},
    Router,
};
use serde::Serialize;

/// Builds the [`Router`] of the whole HTTP API.
pub fn router() -> Router {
    Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/me", get(auth::me))
        .route("/api/admin/secret", get(admin::secret))
        .route("/api/moderation/queue", get(admin::moderation_queue))
}

/// Plain message response.
#[derive(Clone, Debug, Serialize)]
pub struct Message {
    /// Text of this [`Message`].
    pub message: &'static str,
}
