//! Assembly of streamed PCM audio into WAV responses

mod accumulator;
mod mime;
mod storage;
mod wav;

pub use accumulator::{accumulate, AssembledResponse, ChunkAccumulator};
pub use mime::{AudioStreamDescriptor, DEFAULT_BITS_PER_SAMPLE, DEFAULT_SAMPLE_RATE};
pub use storage::AudioStore;
pub use wav::{wav_from_mime, AudioContainer, WavHeader, WAV_HEADER_LEN};
