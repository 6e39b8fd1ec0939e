//! Text and voice conversations with the farming advisor

use std::sync::Arc;
use tracing::{debug, info};

use crate::audio::{accumulate, AudioContainer, AudioStore};
use crate::error::{Error, Result};
use crate::genai::{GenerationBackend, GenerationRequest, Message, Role};
use crate::prompts::{
    ADVISOR_INSTRUCTION, CONNECTION_TEST_INSTRUCTION, CONNECTION_TEST_MESSAGE, VOICE_INSTRUCTION,
};
use crate::store::{ChatTurn, Store};
use crate::voices::{find_voice, DEFAULT_VOICE};

/// Prior turns included in a voice prompt
pub const VOICE_HISTORY_TURNS: usize = 5;
/// Prior turns replayed for text chat when the client sends no history
pub const TEXT_HISTORY_TURNS: usize = 20;

const CHAT_TEMPERATURE: f32 = 0.7;

#[derive(Debug, Clone)]
pub struct AssistantConfig {
    pub text_model: String,
    pub voice_model: String,
}

#[derive(Debug, Clone, Default)]
pub struct VoiceChatRequest {
    pub message: String,
    pub session_id: Option<String>,
    pub voice: Option<String>,
}

#[derive(Debug, Clone)]
pub struct VoiceReply {
    pub session_id: String,
    pub text: String,
    /// `None` when the model produced no audio at all
    pub audio: Option<AudioContainer>,
    pub voice: String,
}

#[derive(Debug, Clone, Default)]
pub struct TextChatRequest {
    pub message: String,
    pub session_id: Option<String>,
    /// Client-held history; replaces stored turns when non-empty
    pub history: Vec<Message>,
}

#[derive(Debug, Clone)]
pub struct TextReply {
    pub response: String,
    pub session_id: Option<String>,
}

/// A voice answer whose audio was written to the [`AudioStore`]
#[derive(Debug, Clone)]
pub struct StoredVoiceReply {
    pub session_id: String,
    pub text: String,
    /// `None` when the model produced no audio at all
    pub audio_file: Option<String>,
    pub voice: String,
}

/// A finished generation whose turns are not yet recorded
struct VoiceDraft {
    session_id: String,
    message: String,
    text: String,
    audio: Option<AudioContainer>,
    voice: &'static str,
}

pub struct Assistant {
    backend: Arc<dyn GenerationBackend>,
    store: Arc<dyn Store>,
    audio: AudioStore,
    config: AssistantConfig,
}

impl Assistant {
    pub fn new(
        backend: Arc<dyn GenerationBackend>,
        store: Arc<dyn Store>,
        audio: AudioStore,
        config: AssistantConfig,
    ) -> Self {
        Self {
            backend,
            store,
            audio,
            config,
        }
    }

    /// Answer with text and synthesized speech, returning the audio inline.
    ///
    /// Both turns are persisted only after the upstream stream completed with
    /// text; a failed or cancelled generation leaves the session untouched.
    pub async fn voice_chat(&self, user: &str, request: VoiceChatRequest) -> Result<VoiceReply> {
        let draft = self.draft_voice(user, request).await?;
        self.record_exchange(&draft.session_id, &draft.message, &draft.text)
            .await?;

        Ok(VoiceReply {
            session_id: draft.session_id,
            text: draft.text,
            audio: draft.audio,
            voice: draft.voice.to_string(),
        })
    }

    /// Like [`Assistant::voice_chat`], but the audio is saved to disk and
    /// referenced by file name. The audio is written before the turns are
    /// recorded, so a failed save leaves the session untouched.
    pub async fn voice_chat_stored(
        &self,
        user: &str,
        request: VoiceChatRequest,
    ) -> Result<StoredVoiceReply> {
        let draft = self.draft_voice(user, request).await?;
        let audio_file = match &draft.audio {
            Some(container) => {
                let file_name = self.audio.save(container).await?;
                debug!(
                    "Saved {:.0} ms of audio as {}",
                    container.duration_ms(),
                    file_name
                );
                Some(file_name)
            }
            None => None,
        };
        self.record_exchange(&draft.session_id, &draft.message, &draft.text)
            .await?;

        Ok(StoredVoiceReply {
            session_id: draft.session_id,
            text: draft.text,
            audio_file,
            voice: draft.voice.to_string(),
        })
    }

    async fn draft_voice(&self, user: &str, request: VoiceChatRequest) -> Result<VoiceDraft> {
        let message = require_message(&request.message)?;
        let voice = match request.voice.as_deref() {
            None => DEFAULT_VOICE,
            Some(name) => find_voice(name)
                .map(|v| v.name)
                .ok_or_else(|| Error::InvalidRequest(format!("Unknown voice: {}", name)))?,
        };

        let session = self
            .store
            .open_session(user, request.session_id.as_deref())
            .await?;
        let history = self
            .store
            .recent_turns(&session.session_id, VOICE_HISTORY_TURNS)
            .await?;

        let prompt = voice_prompt(&history, message);
        let generation =
            GenerationRequest::new(&self.config.voice_model, vec![Message::user(prompt)])
                .with_temperature(CHAT_TEMPERATURE)
                .with_speech(voice);

        info!(
            "Voice chat for {} in session {} ({} prior turns, voice {})",
            user,
            session.session_id,
            history.len(),
            voice
        );

        let stream = self.backend.generate_stream(generation).await?;
        let response = accumulate(stream).await?;
        if !response.has_text() {
            return Err(Error::EmptyResponse);
        }

        Ok(VoiceDraft {
            session_id: session.session_id,
            message: message.to_string(),
            text: response.text,
            audio: response.audio,
            voice,
        })
    }

    /// Answer with text only, using the advisor persona
    pub async fn text_chat(&self, user: &str, request: TextChatRequest) -> Result<TextReply> {
        let message = require_message(&request.message)?;

        let session = match request.session_id.as_deref() {
            Some(id) => Some(self.store.open_session(user, Some(id)).await?),
            None => None,
        };

        let mut contents = if !request.history.is_empty() {
            request.history
        } else if let Some(session) = &session {
            self.store
                .recent_turns(&session.session_id, TEXT_HISTORY_TURNS)
                .await?
                .into_iter()
                .map(|turn| Message {
                    role: turn.role,
                    parts: vec![turn.message],
                })
                .collect()
        } else {
            Vec::new()
        };
        contents.retain(|m| !m.parts.is_empty());
        contents.push(Message::user(message));

        debug!("Text chat for {} with {} messages", user, contents.len());

        let generation = GenerationRequest::new(&self.config.text_model, contents)
            .with_system_instruction(ADVISOR_INSTRUCTION)
            .with_temperature(CHAT_TEMPERATURE);

        let response = self.backend.generate_text(generation).await?;
        if response.trim().is_empty() {
            return Err(Error::EmptyResponse);
        }

        if let Some(session) = &session {
            self.record_exchange(&session.session_id, message, &response)
                .await?;
        }

        Ok(TextReply {
            response,
            session_id: session.map(|s| s.session_id),
        })
    }

    pub async fn clear_session(&self, user: &str, session_id: &str) -> Result<()> {
        if self.store.clear_session(user, session_id).await? {
            info!("Cleared session {}", session_id);
            Ok(())
        } else {
            Err(Error::SessionNotFound(session_id.to_string()))
        }
    }

    /// Round-trip a trivial prompt to verify upstream credentials
    pub async fn test_connection(&self) -> Result<String> {
        let generation = GenerationRequest::new(
            &self.config.text_model,
            vec![Message::user(CONNECTION_TEST_MESSAGE)],
        )
        .with_system_instruction(CONNECTION_TEST_INSTRUCTION);

        self.backend.generate_text(generation).await
    }

    async fn record_exchange(&self, session_id: &str, message: &str, reply: &str) -> Result<()> {
        self.store
            .append_turn(session_id, ChatTurn::new(Role::User, message))
            .await?;
        self.store
            .append_turn(session_id, ChatTurn::new(Role::Model, reply))
            .await
    }
}

fn require_message(message: &str) -> Result<&str> {
    let message = message.trim();
    if message.is_empty() {
        return Err(Error::InvalidRequest("Message is required".to_string()));
    }
    Ok(message)
}

fn voice_prompt(history: &[ChatTurn], message: &str) -> String {
    let mut context = String::new();
    for turn in history {
        let speaker = match turn.role {
            Role::User => "User",
            Role::Model => "Assistant",
        };
        context.push_str(speaker);
        context.push_str(": ");
        context.push_str(&turn.message);
        context.push('\n');
    }

    format!(
        "{}\n\nConversation History:\n{}\n\nUser: {}\n\nRespond naturally and concisely:",
        VOICE_INSTRUCTION, context, message
    )
}
