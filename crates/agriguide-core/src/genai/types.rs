//! Provider-neutral request and chunk types

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Who authored a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }

    /// Lenient parse used for client-supplied history; anything unknown is a user turn
    pub fn from_client(role: &str) -> Self {
        if role.eq_ignore_ascii_case("model") || role.eq_ignore_ascii_case("assistant") {
            Role::Model
        } else {
            Role::User
        }
    }
}

/// One message of the conversation sent upstream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub parts: Vec<String>,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![text.into()],
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            parts: vec![text.into()],
        }
    }
}

/// Output kinds the upstream model is asked to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Modality {
    Text,
    Audio,
}

/// A single generation call
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub model: String,
    pub contents: Vec<Message>,
    pub system_instruction: Option<String>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub max_output_tokens: Option<u32>,
    pub modalities: Vec<Modality>,
    /// Prebuilt voice for speech output
    pub voice: Option<String>,
}

impl GenerationRequest {
    pub fn new(model: impl Into<String>, contents: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            contents,
            system_instruction: None,
            temperature: None,
            top_p: None,
            max_output_tokens: None,
            modalities: Vec::new(),
            voice: None,
        }
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    pub fn with_max_output_tokens(mut self, max: u32) -> Self {
        self.max_output_tokens = Some(max);
        self
    }

    /// Ask for text and speech, spoken with `voice`
    pub fn with_speech(mut self, voice: impl Into<String>) -> Self {
        self.modalities = vec![Modality::Text, Modality::Audio];
        self.voice = Some(voice.into());
        self
    }
}

/// Raw audio bytes carried by one chunk, tagged with their encoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFragment {
    pub mime_type: Option<String>,
    pub data: Bytes,
}

/// One incremental unit of a streamed generation response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationChunk {
    pub text: Option<String>,
    pub audio: Vec<AudioFragment>,
}

impl GenerationChunk {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            audio: Vec::new(),
        }
    }

    pub fn audio(mime_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            text: None,
            audio: vec![AudioFragment {
                mime_type: Some(mime_type.into()),
                data: data.into(),
            }],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.as_deref().map_or(true, str::is_empty) && self.audio.is_empty()
    }
}
