use std::pin::Pin;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, KeepAliveStream, Sse},
        IntoResponse,
    },
    Json,
};
use futures::{Stream, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::{api_state::ApiState, error::ApiError};

const DEFAULT_SESSION: &str = "default";

#[derive(Deserialize)]
pub struct StreamParams {
    message: Option<String>,
    session_id: Option<String>,
}

type EventStream = Pin<Box<dyn Stream<Item = Result<Event, axum::Error>> + Send>>;

/// Streams the escalation ladder for one question as server-sent events.
/// Each event is one JSON-encoded `ChatEvent`.
pub async fn chat_stream(
    State(state): State<ApiState>,
    Query(params): Query<StreamParams>,
) -> Result<Sse<KeepAliveStream<EventStream>>, ApiError> {
    let message = params.message.unwrap_or_default();
    if message.trim().is_empty() {
        return Err(ApiError::ValidationError("Vui lòng nhập tin nhắn".to_string()));
    }
    let session_id = params
        .session_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_SESSION.to_string());

    info!(session_id, "Starting chat stream");
    let stream = state
        .chat
        .answer_stream(message, session_id)
        .map(|event| Event::default().json_data(&event))
        .boxed();

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

#[derive(Deserialize)]
pub struct ClearParams {
    session_id: Option<String>,
}

/// Drops a conversation's history. The body is optional; without one the
/// default session clears. Unknown sessions clear silently.
pub async fn chat_clear(
    State(state): State<ApiState>,
    payload: Option<Json<ClearParams>>,
) -> impl IntoResponse {
    let session_id = payload
        .and_then(|Json(params)| params.session_id)
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_SESSION.to_string());
    state.sessions.clear(&session_id);
    info!(session_id, "Cleared chat session");

    (
        StatusCode::OK,
        Json(json!({
            "status": "success",
            "message": "Lịch sử chat đã được xóa"
        })),
    )
}
