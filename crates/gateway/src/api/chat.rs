//! The streaming chat turn endpoint.
//!
//! `POST /chat/:session_id/stream` with `{ "content": String, "mode": u8 }`.
//! Responds as `text/event-stream`; every content delta is one
//! `data:<text>\n\n` frame and the single terminal event is
//! `event:done\ndata:ok\n\n`. Nothing else is ever emitted; an upstream
//! failure mid-turn shows up as the body ending without the terminal
//! event.

use axum::body::{Body, Bytes};
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;
use std::convert::Infallible;

use cr_domain::mode::ChatMode;

use super::error_response;
use crate::runtime::{self, TurnEvent, TurnInput};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StreamTurnRequest {
    pub content: String,
    pub mode: ChatMode,
}

pub async fn stream_turn(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(body): Json<StreamTurnRequest>,
) -> Response {
    let input = TurnInput {
        session_id,
        content: body.content,
        mode: body.mode,
    };

    // Everything that can fail with a structured status happens here,
    // before the response body starts.
    let prepared = match runtime::prepare(&state, input).await {
        Ok(p) => p,
        Err(e) => return error_response(&e),
    };

    let mut rx = runtime::spawn(state.clone(), prepared);

    let stream = async_stream::stream! {
        while let Some(event) = rx.recv().await {
            yield Ok::<Bytes, Infallible>(frame(&event));
        }
    };

    (
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(stream),
    )
        .into_response()
}

/// Encode one turn event in the exact wire framing callers parse.
fn frame(event: &TurnEvent) -> Bytes {
    match event {
        TurnEvent::Delta { text } => Bytes::from(format!("data:{text}\n\n")),
        TurnEvent::Done => Bytes::from_static(b"event:done\ndata:ok\n\n"),
    }
}
