//! Application state management

use agriguide_core::config::AuthConfig;
use agriguide_core::{Assistant, AudioStore, CommunityService, ProfileService, TipService};
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub assistant: Arc<Assistant>,
    pub tips: Arc<TipService>,
    pub profiles: Arc<ProfileService>,
    pub community: Arc<CommunityService>,
    pub audio: Arc<AudioStore>,
    pub auth: Arc<AuthConfig>,
}

impl AppState {
    pub fn new(
        assistant: Assistant,
        tips: TipService,
        profiles: ProfileService,
        community: CommunityService,
        audio: AudioStore,
        auth: AuthConfig,
    ) -> Self {
        Self {
            assistant: Arc::new(assistant),
            tips: Arc::new(tips),
            profiles: Arc::new(profiles),
            community: Arc::new(community),
            audio: Arc::new(audio),
            auth: Arc::new(auth),
        }
    }
}
