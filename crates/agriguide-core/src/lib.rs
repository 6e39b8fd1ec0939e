//! AgriGuide Core - conversation engine for the farming assistant
//!
//! This crate turns streamed generative-AI output into playable audio and
//! keeps the conversations around it.
//!
//! # Architecture
//!
//! - [`audio`]: MIME descriptor parsing, RIFF/WAVE packing, chunk accumulation
//!   and on-disk audio storage
//! - [`genai`]: the [`GenerationBackend`] seam and its Gemini client
//! - [`store`]: sessions, turns, the tip cache, profiles and community posts
//!   (memory or Redis)
//! - [`assistant`], [`tips`], [`profiles`] and [`community`]: the operations
//!   served over HTTP
//!
//! # Example
//!
//! ```ignore
//! use agriguide_core::audio::AudioStreamDescriptor;
//! use agriguide_core::audio::AudioContainer;
//!
//! let descriptor = AudioStreamDescriptor::parse("audio/L16;codec=pcm;rate=24000");
//! let wav = AudioContainer::build(&pcm, descriptor)?;
//! ```

pub mod assistant;
pub mod audio;
pub mod community;
pub mod config;
pub mod error;
pub mod genai;
pub mod profiles;
pub mod prompts;
pub mod store;
pub mod tips;
pub mod voices;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use assistant::{
    Assistant, AssistantConfig, StoredVoiceReply, TextChatRequest, TextReply, VoiceChatRequest,
    VoiceReply,
};
pub use audio::{wav_from_mime, AudioContainer, AudioStore, AudioStreamDescriptor};
pub use community::{CommunityPost, CommunityService, NewPost, PostComment, PostView};
pub use config::AppConfig;
pub use error::{Error, Result};
pub use genai::{GeminiClient, GenerationBackend, Message, Role};
pub use profiles::{ProfileService, ProfileUpdate, UserProfile};
pub use store::{CommunityStore, MemoryStore, ProfileStore, RedisStore, Store, Stores};
pub use tips::{DailyTip, TipService};
pub use voices::{find_voice, Voice, DEFAULT_VOICE, VOICES};
