//! Message CRUD endpoints.
//!
//! - `GET    /chat/:id/messages`              — list (paged)
//! - `POST   /chat/:id/messages`              — append one message
//! - `DELETE /chat/:id/messages/:message_id`  — delete from a session
//! - `PUT    /messages/:message_id`           — edit content

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use serde::Deserialize;

use cr_domain::chat::Role;
use cr_domain::error::Error;

use super::error_response;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListMessagesQuery {
    #[serde(default = "d_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
    #[serde(default = "d_true")]
    pub ascending: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateMessageRequest {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateMessageRequest {
    pub content: String,
}

fn d_limit() -> usize {
    100
}
fn d_true() -> bool {
    true
}

pub async fn list_messages(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Query(q): Query<ListMessagesQuery>,
) -> impl IntoResponse {
    match state
        .store
        .list_messages(&session_id, q.limit, q.offset, q.ascending)
    {
        Ok(messages) => Json(messages).into_response(),
        Err(e) => error_response(&e),
    }
}

pub async fn create_message(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(body): Json<CreateMessageRequest>,
) -> impl IntoResponse {
    match state
        .store
        .append_message(&session_id, body.role, &body.content)
    {
        Ok(message) => (StatusCode::CREATED, Json(message)).into_response(),
        Err(e) => error_response(&e),
    }
}

pub async fn delete_message(
    State(state): State<AppState>,
    Path((session_id, message_id)): Path<(String, String)>,
) -> impl IntoResponse {
    // The message must belong to the addressed session.
    match state.store.get_message(&message_id) {
        Ok(m) if m.session_id == session_id => {}
        Ok(_) => {
            return error_response(&Error::NotFound(format!(
                "message {message_id} in session {session_id}"
            )))
        }
        Err(e) => return error_response(&e),
    }
    match state.store.delete_message(&message_id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(&e),
    }
}

pub async fn update_message(
    State(state): State<AppState>,
    Path(message_id): Path<String>,
    Json(body): Json<UpdateMessageRequest>,
) -> impl IntoResponse {
    match state.store.update_message(&message_id, &body.content) {
        Ok(message) => Json(message).into_response(),
        Err(e) => error_response(&e),
    }
}
