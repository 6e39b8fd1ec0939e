//! Scripted generation backend for tests

use futures::future::BoxFuture;
use futures::stream::{self, StreamExt};
use std::sync::Mutex;

use crate::error::{Error, Result};
use crate::genai::{ChunkStream, GenerationBackend, GenerationChunk, GenerationRequest};

/// Replays canned responses and records every request it receives
pub struct ScriptedBackend {
    text: std::result::Result<String, String>,
    stream: std::result::Result<Vec<std::result::Result<GenerationChunk, String>>, String>,
    stall: bool,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self {
            text: Ok(String::new()),
            stream: Ok(Vec::new()),
            stall: false,
            requests: Mutex::new(Vec::new()),
        }
    }
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Ok(text.into());
        self
    }

    pub fn with_chunks(mut self, chunks: Vec<GenerationChunk>) -> Self {
        self.stream = Ok(chunks.into_iter().map(Ok).collect());
        self
    }

    /// Emit `chunks` and then fail mid-stream
    pub fn with_chunks_then_error(mut self, chunks: Vec<GenerationChunk>, error: &str) -> Self {
        let mut items: Vec<_> = chunks.into_iter().map(Ok).collect();
        items.push(Err(error.to_string()));
        self.stream = Ok(items);
        self
    }

    /// Emit `chunks` and then never finish, like a stalled upstream
    pub fn with_chunks_then_stall(mut self, chunks: Vec<GenerationChunk>) -> Self {
        self.stream = Ok(chunks.into_iter().map(Ok).collect());
        self.stall = true;
        self
    }

    /// Make every call fail before producing anything
    pub fn failing(mut self, error: &str) -> Self {
        self.text = Err(error.to_string());
        self.stream = Err(error.to_string());
        self
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    fn record(&self, request: GenerationRequest) {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
    }
}

impl GenerationBackend for ScriptedBackend {
    fn generate_text(&self, request: GenerationRequest) -> BoxFuture<'_, Result<String>> {
        self.record(request);
        let reply = self.text.clone().map_err(Error::UpstreamError);
        Box::pin(async move { reply })
    }

    fn generate_stream(&self, request: GenerationRequest) -> BoxFuture<'_, Result<ChunkStream>> {
        self.record(request);
        let stall = self.stall;
        let reply = self.stream.clone().map_err(Error::UpstreamError).map(|items| {
            let items: Vec<Result<GenerationChunk>> = items
                .into_iter()
                .map(|item| item.map_err(Error::UpstreamError))
                .collect();
            let scripted = stream::iter(items);
            if stall {
                Box::pin(scripted.chain(stream::pending())) as ChunkStream
            } else {
                Box::pin(scripted) as ChunkStream
            }
        });
        Box::pin(async move { reply })
    }
}
