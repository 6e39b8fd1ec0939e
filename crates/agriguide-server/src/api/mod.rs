//! HTTP API routes

mod chat;
mod community;
mod profile;
mod tips;
mod voice;

use axum::{
    http::HeaderValue,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::state::AppState;

pub fn create_router(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/chat", post(chat::chat))
        .route("/api/chat/clear", post(chat::clear))
        .route("/api/test", get(chat::test_connection))
        .route("/api/voice/chat", post(voice::voice_chat))
        .route("/api/voice/chat/stream", post(voice::voice_chat_stream))
        .route("/api/voice/voices", get(voice::voices))
        .route("/api/voice/audio/:file", get(voice::audio_file))
        .route("/api/tips/daily", get(tips::daily_tip))
        .route("/api/auth/profile", get(profile::profile))
        .route(
            "/api/auth/profile/update",
            put(profile::update_profile).patch(profile::update_profile),
        )
        .route("/api/auth/verify", get(profile::verify_token))
        .route(
            "/api/community/posts",
            get(community::list_posts).post(community::create_post),
        )
        .route(
            "/api/community/posts/:id",
            get(community::get_post).delete(community::delete_post),
        )
        .route("/api/community/posts/:id/like", post(community::toggle_like))
        .route(
            "/api/community/posts/:id/comments",
            get(community::list_comments).post(community::add_comment),
        )
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}
