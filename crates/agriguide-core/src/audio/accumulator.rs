//! Accumulation of streamed text and audio fragments into one response

use bytes::BytesMut;
use futures::{Stream, StreamExt};
use tracing::{debug, warn};

use super::mime::AudioStreamDescriptor;
use super::wav::AudioContainer;
use crate::error::Result;
use crate::genai::GenerationChunk;

/// Text and audio gathered from a complete upstream stream
#[derive(Debug, Clone)]
pub struct AssembledResponse {
    pub text: String,
    /// `None` when the stream carried no audio fragment at all
    pub audio: Option<AudioContainer>,
    pub chunks: usize,
}

impl AssembledResponse {
    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }
}

/// Concatenates fragments in arrival order
#[derive(Debug, Default)]
pub struct ChunkAccumulator {
    text: String,
    audio: Option<BytesMut>,
    mime_type: Option<String>,
    chunks: usize,
}

impl ChunkAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: GenerationChunk) {
        self.chunks += 1;

        if let Some(text) = chunk.text {
            self.text.push_str(&text);
        }

        for fragment in chunk.audio {
            if let Some(mime) = fragment.mime_type {
                match &self.mime_type {
                    Some(current) if *current != mime => warn!(
                        "Audio fragment declares {:?} but stream started as {:?}; keeping the first",
                        mime, current
                    ),
                    Some(_) => {}
                    None => self.mime_type = Some(mime),
                }
            }

            self.audio
                .get_or_insert_with(BytesMut::new)
                .extend_from_slice(&fragment.data);
        }
    }

    pub fn descriptor(&self) -> AudioStreamDescriptor {
        AudioStreamDescriptor::parse_opt(self.mime_type.as_deref())
    }

    /// Build the container, or skip it entirely when no audio arrived
    pub fn finish(self) -> Result<AssembledResponse> {
        let descriptor = self.descriptor();
        let audio = match self.audio {
            Some(payload) => Some(AudioContainer::build(&payload, descriptor)?),
            None => None,
        };

        debug!(
            "Assembled {} chunks: {} text chars, audio {:?} bytes",
            self.chunks,
            self.text.len(),
            audio.as_ref().map(|a| a.header().data_size)
        );

        Ok(AssembledResponse {
            text: self.text,
            audio,
            chunks: self.chunks,
        })
    }
}

/// Drain an upstream stream and assemble its response.
///
/// An error from the stream aborts the whole call and drops everything
/// gathered so far; so does dropping the returned future.
pub async fn accumulate<S>(stream: S) -> Result<AssembledResponse>
where
    S: Stream<Item = Result<GenerationChunk>>,
{
    futures::pin_mut!(stream);

    let mut accumulator = ChunkAccumulator::new();
    while let Some(chunk) = stream.next().await {
        accumulator.push(chunk?);
    }
    accumulator.finish()
}
