//! Parsing of `audio/L<bits>;rate=<hz>` descriptors attached to upstream audio

use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_BITS_PER_SAMPLE: u16 = 16;
pub const DEFAULT_SAMPLE_RATE: u32 = 24000;

const LINEAR_PCM_PREFIX: &str = "audio/L";
const RATE_KEY: &str = "rate=";

/// Encoding parameters that govern how raw PCM bytes are framed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioStreamDescriptor {
    pub bits_per_sample: u16,
    pub sample_rate: u32,
}

impl Default for AudioStreamDescriptor {
    fn default() -> Self {
        Self {
            bits_per_sample: DEFAULT_BITS_PER_SAMPLE,
            sample_rate: DEFAULT_SAMPLE_RATE,
        }
    }
}

impl AudioStreamDescriptor {
    pub fn new(bits_per_sample: u16, sample_rate: u32) -> Self {
        Self {
            bits_per_sample,
            sample_rate,
        }
    }

    /// Parse a MIME type such as `audio/L16;codec=pcm;rate=24000`.
    ///
    /// Never fails. Each field falls back to its default independently when
    /// its parameter is missing or malformed; unknown parameters are ignored.
    pub fn parse(mime_type: &str) -> Self {
        let mut descriptor = Self::default();

        for param in mime_type.split(';').map(str::trim) {
            if param.is_empty() {
                continue;
            }

            if starts_with_ignore_case(param, RATE_KEY) {
                match param[RATE_KEY.len()..].trim().parse::<u32>() {
                    Ok(rate) => descriptor.sample_rate = rate,
                    Err(e) => debug!("Ignoring malformed rate parameter {:?}: {}", param, e),
                }
            } else if let Some(bits) = param.strip_prefix(LINEAR_PCM_PREFIX) {
                match bits.trim().parse::<u16>() {
                    Ok(bits) => descriptor.bits_per_sample = bits,
                    Err(e) => debug!("Ignoring malformed sample width {:?}: {}", param, e),
                }
            }
        }

        descriptor
    }

    /// Parse an optional MIME type, using defaults when absent
    pub fn parse_opt(mime_type: Option<&str>) -> Self {
        mime_type.map(Self::parse).unwrap_or_default()
    }

    pub fn bytes_per_sample(&self) -> u16 {
        self.bits_per_sample / 8
    }
}

fn starts_with_ignore_case(s: &str, prefix: &str) -> bool {
    s.len() >= prefix.len()
        && s.is_char_boundary(prefix.len())
        && s[..prefix.len()].eq_ignore_ascii_case(prefix)
}
