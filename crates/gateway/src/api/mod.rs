//! HTTP surface.
//!
//! Session and message CRUD mirror the conversation store; the one
//! endpoint with custom plumbing is `POST /chat/:id/stream`.

pub mod chat;
pub mod health;
pub mod messages;
pub mod sessions;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{delete, get, patch, post, put};
use axum::Router;

use cr_domain::error::Error;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        // Sessions
        .route("/chat", post(sessions::create_session))
        .route("/chat", get(sessions::list_sessions))
        .route("/chat/:session_id", get(sessions::get_session))
        .route("/chat/:session_id", patch(sessions::rename_session))
        .route("/chat/:session_id", delete(sessions::delete_session))
        .route(
            "/chat/:session_id/with_messages",
            get(sessions::get_session_with_messages),
        )
        // Messages
        .route("/chat/:session_id/messages", get(messages::list_messages))
        .route("/chat/:session_id/messages", post(messages::create_message))
        .route(
            "/chat/:session_id/messages/:message_id",
            delete(messages::delete_message),
        )
        .route("/messages/:message_id", put(messages::update_message))
        // Streaming chat turn
        .route("/chat/:session_id/stream", post(chat::stream_turn))
}

/// Map a domain error to `{ "error": "<message>" }` with the right status.
pub(crate) fn error_response(err: &Error) -> Response {
    let status = match err {
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        tracing::error!(error = %err, "request failed");
    }
    (status, Json(serde_json::json!({ "error": err.to_string() }))).into_response()
}
