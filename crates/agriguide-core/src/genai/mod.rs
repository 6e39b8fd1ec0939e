//! Upstream generative-AI service
//!
//! [`GenerationBackend`] is the seam between the assistant logic and the
//! provider; [`GeminiClient`] is the production implementation.

mod gemini;
mod sse;
mod types;

use futures::future::BoxFuture;
use futures::stream::BoxStream;

use crate::error::Result;

pub use gemini::GeminiClient;
pub use sse::SseDecoder;
pub use types::{
    AudioFragment, GenerationChunk, GenerationRequest, Message, Modality, Role,
};

/// Finite, non-restartable sequence of chunks from one generation call
pub type ChunkStream = BoxStream<'static, Result<GenerationChunk>>;

/// A provider that can answer prompts with text, optionally streaming speech
pub trait GenerationBackend: Send + Sync {
    /// Run a generation to completion and return its text
    fn generate_text(&self, request: GenerationRequest) -> BoxFuture<'_, Result<String>>;

    /// Start a streamed generation; chunks arrive as the provider emits them
    fn generate_stream(&self, request: GenerationRequest) -> BoxFuture<'_, Result<ChunkStream>>;
}
