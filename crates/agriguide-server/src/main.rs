//! AgriGuide Server - HTTP API for the farming assistant

use agriguide_core::{
    store, AppConfig, Assistant, AssistantConfig, AudioStore, CommunityService, GeminiClient,
    ProfileService, TipService,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod auth;
mod error;
mod state;

use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "agriguide_server=debug,agriguide_core=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting AgriGuide Server");

    // Config path: first argument, then AGRIGUIDE_CONFIG, then ./agriguide.toml if present
    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("AGRIGUIDE_CONFIG").ok())
        .map(PathBuf::from);
    let config = AppConfig::load(config_path.as_deref())?;
    info!(
        "Text model: {}, voice model: {}",
        config.genai.text_model, config.genai.voice_model
    );

    let stores = store::connect(&config.storage).await?;
    let backend = Arc::new(GeminiClient::new(&config.genai)?);

    let audio = AudioStore::new(&config.storage.audio_dir);
    audio.init().await?;

    let assistant = Assistant::new(
        backend.clone(),
        stores.sessions.clone(),
        audio.clone(),
        AssistantConfig {
            text_model: config.genai.text_model.clone(),
            voice_model: config.genai.voice_model.clone(),
        },
    );
    let tips = TipService::new(backend, stores.sessions, config.genai.text_model.clone());
    let profiles = ProfileService::new(stores.profiles);
    let community = CommunityService::new(stores.community);
    let state = AppState::new(
        assistant,
        tips,
        profiles,
        community,
        audio,
        config.auth.clone(),
    );

    // Build router
    let app = api::create_router(state, &config.server.cors_origins);

    // Start server
    let addr = config.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
