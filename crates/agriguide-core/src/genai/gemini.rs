//! HTTPS client for the Gemini `generateContent` API

use async_stream::try_stream;
use base64::Engine;
use bytes::Bytes;
use futures::future::BoxFuture;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::sse::SseDecoder;
use super::types::{AudioFragment, GenerationChunk, GenerationRequest, Message, Modality};
use super::{ChunkStream, GenerationBackend};
use crate::config::GenAiConfig;
use crate::error::{Error, Result};

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Gemini REST client
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(config: &GenAiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        format!("{}/models/{}:{}", self.base_url, model, method)
    }

    async fn post(&self, url: String, body: &GenerateContentBody) -> Result<reqwest::Response> {
        let response = self
            .http
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Gemini request to {} failed with {}", url, status);
            return Err(Error::UpstreamStatus {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }

    async fn text(&self, request: GenerationRequest) -> Result<String> {
        let url = self.endpoint(&request.model, "generateContent");
        let body = GenerateContentBody::from(&request);
        debug!("Gemini generateContent: model {}", request.model);

        let response: GenerateContentResponse = self.post(url, &body).await?.json().await?;
        Ok(response.into_chunk()?.text.unwrap_or_default())
    }

    async fn stream(&self, request: GenerationRequest) -> Result<ChunkStream> {
        let url = self.endpoint(&request.model, "streamGenerateContent?alt=sse");
        let body = GenerateContentBody::from(&request);
        info!(
            "Gemini streamGenerateContent: model {}, voice {:?}",
            request.model, request.voice
        );

        let response = self.post(url, &body).await?;
        Ok(Box::pin(chunk_stream(response)))
    }
}

/// Decode an SSE response body into chunks as bytes arrive
fn chunk_stream(
    response: reqwest::Response,
) -> impl Stream<Item = Result<GenerationChunk>> + Send + 'static {
    try_stream! {
        let mut bytes = response.bytes_stream();
        let mut decoder = SseDecoder::new();

        while let Some(piece) = bytes.next().await {
            let piece = piece?;
            for event in decoder.feed(&piece) {
                let chunk = parse_event(&event)?;
                if !chunk.is_empty() {
                    yield chunk;
                }
            }
        }
        for event in decoder.finish() {
            let chunk = parse_event(&event)?;
            if !chunk.is_empty() {
                yield chunk;
            }
        }
    }
}

impl GenerationBackend for GeminiClient {
    fn generate_text(&self, request: GenerationRequest) -> BoxFuture<'_, Result<String>> {
        Box::pin(self.text(request))
    }

    fn generate_stream(&self, request: GenerationRequest) -> BoxFuture<'_, Result<ChunkStream>> {
        Box::pin(self.stream(request))
    }
}

/// Decode one SSE payload into a chunk
pub(crate) fn parse_event(event: &str) -> Result<GenerationChunk> {
    let response: GenerateContentResponse = serde_json::from_str(event)
        .map_err(|e| Error::UpstreamError(format!("malformed stream chunk: {}", e)))?;
    response.into_chunk()
}

// Wire format

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentBody {
    contents: Vec<WireContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<WireContent>,
    generation_config: WireGenerationConfig,
}

#[derive(Debug, Serialize)]
struct WireContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<WireTextPart>,
}

#[derive(Debug, Serialize)]
struct WireTextPart {
    text: String,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    response_modalities: Vec<Modality>,
    #[serde(skip_serializing_if = "Option::is_none")]
    speech_config: Option<WireSpeechConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireSpeechConfig {
    voice_config: WireVoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireVoiceConfig {
    prebuilt_voice_config: WirePrebuiltVoice,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WirePrebuiltVoice {
    voice_name: String,
}

impl From<&Message> for WireContent {
    fn from(message: &Message) -> Self {
        Self {
            role: Some(message.role.as_str()),
            parts: message
                .parts
                .iter()
                .map(|text| WireTextPart { text: text.clone() })
                .collect(),
        }
    }
}

impl From<&GenerationRequest> for GenerateContentBody {
    fn from(request: &GenerationRequest) -> Self {
        Self {
            contents: request.contents.iter().map(WireContent::from).collect(),
            system_instruction: request.system_instruction.as_ref().map(|text| WireContent {
                role: None,
                parts: vec![WireTextPart { text: text.clone() }],
            }),
            generation_config: WireGenerationConfig {
                temperature: request.temperature,
                top_p: request.top_p,
                max_output_tokens: request.max_output_tokens,
                response_modalities: request.modalities.clone(),
                speech_config: request.voice.as_ref().map(|voice| WireSpeechConfig {
                    voice_config: WireVoiceConfig {
                        prebuilt_voice_config: WirePrebuiltVoice {
                            voice_name: voice.clone(),
                        },
                    },
                }),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    data: String,
}

impl GenerateContentResponse {
    /// Flatten the first candidate's parts, in order, into one chunk
    fn into_chunk(self) -> Result<GenerationChunk> {
        let mut chunk = GenerationChunk::default();

        let parts = self
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts)
            .unwrap_or_default();

        for part in parts {
            if let Some(text) = part.text.filter(|t| !t.is_empty()) {
                chunk.text.get_or_insert_with(String::new).push_str(&text);
            }
            if let Some(inline) = part.inline_data {
                let data = base64::engine::general_purpose::STANDARD
                    .decode(inline.data.as_bytes())?;
                // an empty inline part carries no audio
                if data.is_empty() {
                    continue;
                }
                chunk.audio.push(AudioFragment {
                    mime_type: inline.mime_type,
                    data: Bytes::from(data),
                });
            }
        }

        Ok(chunk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::accumulate;
    use serde_json::json;

    #[test]
    fn test_request_body_shape() {
        let request = GenerationRequest::new(
            "gemini-2.0-flash-exp",
            vec![Message::user("How do I test soil pH?"), Message::model("Use a kit.")],
        )
        .with_system_instruction("You are AgriGuide AI")
        .with_temperature(0.5)
        .with_speech("Zephyr");

        let body = serde_json::to_value(GenerateContentBody::from(&request)).unwrap();
        assert_eq!(
            body,
            json!({
                "contents": [
                    {"role": "user", "parts": [{"text": "How do I test soil pH?"}]},
                    {"role": "model", "parts": [{"text": "Use a kit."}]}
                ],
                "systemInstruction": {"parts": [{"text": "You are AgriGuide AI"}]},
                "generationConfig": {
                    "temperature": 0.5,
                    "responseModalities": ["TEXT", "AUDIO"],
                    "speechConfig": {
                        "voiceConfig": {"prebuiltVoiceConfig": {"voiceName": "Zephyr"}}
                    }
                }
            })
        );
    }

    #[test]
    fn test_text_only_body_omits_speech() {
        let request = GenerationRequest::new("gemini-2.5-flash", vec![Message::user("tip")])
            .with_top_p(0.75)
            .with_max_output_tokens(150);
        let body = serde_json::to_value(GenerateContentBody::from(&request)).unwrap();

        assert!(body.get("systemInstruction").is_none());
        assert_eq!(body["generationConfig"], json!({"topP": 0.75, "maxOutputTokens": 150}));
    }

    #[test]
    fn test_parse_event_with_text_and_audio() {
        let audio = base64::engine::general_purpose::STANDARD.encode([1u8, 2, 3, 4]);
        let event = json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        {"text": "Mulch "},
                        {"inlineData": {"mimeType": "audio/L16;codec=pcm;rate=24000", "data": audio}},
                        {"text": "helps."}
                    ]
                }
            }]
        })
        .to_string();

        let chunk = parse_event(&event).unwrap();
        assert_eq!(chunk.text.as_deref(), Some("Mulch helps."));
        assert_eq!(chunk.audio.len(), 1);
        assert_eq!(chunk.audio[0].data.as_ref(), &[1, 2, 3, 4]);
        assert_eq!(
            chunk.audio[0].mime_type.as_deref(),
            Some("audio/L16;codec=pcm;rate=24000")
        );
    }

    #[tokio::test]
    async fn test_empty_inline_data_is_not_audio() {
        let event = json!({
            "candidates": [{
                "content": {
                    "parts": [
                        {"text": "Hi"},
                        {"inlineData": {"mimeType": "audio/L16;rate=24000", "data": ""}}
                    ]
                }
            }]
        })
        .to_string();

        let chunk = parse_event(&event).unwrap();
        assert_eq!(chunk.text.as_deref(), Some("Hi"));
        assert!(chunk.audio.is_empty());

        let response = accumulate(futures::stream::iter(vec![Ok(chunk)]))
            .await
            .unwrap();
        assert_eq!(response.text, "Hi");
        assert!(response.audio.is_none());
    }

    #[test]
    fn test_parse_event_without_candidates() {
        let chunk = parse_event(r#"{"usageMetadata": {"totalTokenCount": 12}}"#).unwrap();
        assert!(chunk.is_empty());
    }

    #[test]
    fn test_parse_event_rejects_malformed_input() {
        assert!(matches!(
            parse_event("{not json"),
            Err(Error::UpstreamError(_))
        ));

        let bad_audio = json!({
            "candidates": [{"content": {"parts": [{"inlineData": {"mimeType": "audio/L16", "data": "!!!"}}]}}]
        })
        .to_string();
        assert!(matches!(parse_event(&bad_audio), Err(Error::UpstreamError(_))));
    }

    #[test]
    fn test_endpoint() {
        let config = GenAiConfig {
            base_url: "https://example.test/v1beta/".to_string(),
            api_key: "k".to_string(),
            ..Default::default()
        };
        let client = GeminiClient::new(&config).unwrap();
        assert_eq!(
            client.endpoint("gemini-2.5-flash", "generateContent"),
            "https://example.test/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }
}
