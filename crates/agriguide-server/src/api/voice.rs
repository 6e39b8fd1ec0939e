//! Voice chat endpoints
//!
//! Replies carry the spoken answer either as a stored file (`audio_url`) or
//! inline as base64 WAV.

use agriguide_core::{AudioContainer, VoiceChatRequest, VOICES};
use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    Json,
};
use axum_extra::extract::WithRejection;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

pub const AUDIO_ROUTE_PREFIX: &str = "/api/voice/audio/";

/// Voice chat request
#[derive(Debug, Deserialize)]
pub struct VoiceRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub voice: Option<String>,
}

impl From<VoiceRequest> for VoiceChatRequest {
    fn from(req: VoiceRequest) -> Self {
        VoiceChatRequest {
            message: req.message,
            session_id: req.session_id,
            voice: req.voice,
        }
    }
}

/// Voice chat response with a link to the stored audio
#[derive(Debug, Serialize)]
pub struct VoiceResponse {
    pub session_id: String,
    pub text_response: String,
    pub audio_url: Option<String>,
    pub voice_used: String,
}

/// Voice chat response with the audio inline
#[derive(Debug, Serialize)]
pub struct VoiceStreamResponse {
    pub session_id: String,
    pub text_response: String,
    pub audio_base64: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_format: Option<&'static str>,
    pub voice_used: String,
}

pub async fn voice_chat(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    WithRejection(Json(req), _): WithRejection<Json<VoiceRequest>, ApiError>,
) -> Result<Json<VoiceResponse>, ApiError> {
    let reply = state.assistant.voice_chat_stored(&user, req.into()).await?;

    let audio_url = reply.audio_file.map(|file_name| {
        info!("Voice reply for {} stored as {}", user, file_name);
        format!("{}{}", AUDIO_ROUTE_PREFIX, file_name)
    });

    Ok(Json(VoiceResponse {
        session_id: reply.session_id,
        text_response: reply.text,
        audio_url,
        voice_used: reply.voice,
    }))
}

pub async fn voice_chat_stream(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    WithRejection(Json(req), _): WithRejection<Json<VoiceRequest>, ApiError>,
) -> Result<Json<VoiceStreamResponse>, ApiError> {
    let reply = state.assistant.voice_chat(&user, req.into()).await?;

    let audio_base64 = reply.audio.map(|container| {
        debug!("Encoding {} bytes of WAV inline", container.len());
        STANDARD.encode(container.as_bytes())
    });
    let audio_format = audio_base64.as_ref().map(|_| "wav");

    Ok(Json(VoiceStreamResponse {
        session_id: reply.session_id,
        text_response: reply.text,
        audio_base64,
        audio_format,
        voice_used: reply.voice,
    }))
}

pub async fn voices(AuthUser(_): AuthUser) -> Json<Value> {
    Json(json!({ "voices": VOICES }))
}

pub async fn audio_file(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    Path(file_name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let container = state.audio.load(&file_name).await?;
    Ok((
        [(header::CONTENT_TYPE, AudioContainer::content_type())],
        container.into_bytes(),
    ))
}
