//! Text chat endpoints
//!
//! Handles advisor chat, session clearing and the upstream connection check.

use agriguide_core::{Message, Role, TextChatRequest};
use axum::{extract::State, http::StatusCode, Json};
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Chat request
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

/// A prior message supplied by the client
#[derive(Debug, Deserialize)]
pub struct HistoryEntry {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub parts: Vec<String>,
}

impl From<HistoryEntry> for Message {
    fn from(entry: HistoryEntry) -> Self {
        Message {
            role: Role::from_client(&entry.role),
            parts: entry.parts,
        }
    }
}

/// Chat response
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ClearRequest {
    #[serde(default)]
    pub session_id: Option<String>,
}

pub async fn chat(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    WithRejection(Json(req), _): WithRejection<Json<ChatRequest>, ApiError>,
) -> Result<Json<ChatResponse>, ApiError> {
    let request = TextChatRequest {
        message: req.message,
        session_id: req.session_id,
        history: req.history.into_iter().map(Message::from).collect(),
    };

    let reply = state.assistant.text_chat(&user, request).await?;

    Ok(Json(ChatResponse {
        response: reply.response,
        session_id: reply.session_id,
    }))
}

pub async fn clear(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    WithRejection(Json(req), _): WithRejection<Json<ClearRequest>, ApiError>,
) -> Result<Json<Value>, ApiError> {
    let session_id = req
        .session_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::bad_request("session_id is required"))?;

    state.assistant.clear_session(&user, &session_id).await?;
    Ok(Json(json!({ "message": "Session cleared" })))
}

pub async fn test_connection(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> (StatusCode, Json<Value>) {
    info!("Connection test requested by {}", user);

    match state.assistant.test_connection().await {
        Ok(response) => (
            StatusCode::OK,
            Json(json!({ "status": "connected", "response": response })),
        ),
        Err(e) => {
            warn!("Connection test failed: {}", e);
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "status": "error", "error": e.to_string() })),
            )
        }
    }
}
