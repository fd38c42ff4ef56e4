//! OpenAI-compatible HTTP backends.
//!
//! Transcription goes to `/audio/transcriptions` as a multipart WAV
//! upload; dialogue replies come from `/chat/completions`, optionally
//! with synthesized speech when an audio-capable model is configured.
//! Any server speaking the same wire format works via the `endpoint`
//! setting.

use crate::config::{BackendConfig, DialogueConfig, ReplyMode};
use crate::dialogue::Message;
use crate::error::{Result, VoxgateError};
use crate::stt::{DialogueReply, DialogueResponder, IncrementalText, SpeechBackend};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

fn build_client(timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| VoxgateError::BackendRequest {
            message: format!("http client construction failed: {}", e),
        })
}

fn require_api_key(config: &BackendConfig) -> Result<String> {
    config
        .api_key
        .clone()
        .filter(|key| !key.is_empty())
        .ok_or_else(|| VoxgateError::BackendAuth {
            message: "no API key configured; set backend.api_key or OPENAI_API_KEY".to_string(),
        })
}

/// Map an HTTP status to the error family session teardown cares about:
/// credential problems are fatal, everything else is retryable.
fn status_error(context: &str, status: StatusCode) -> VoxgateError {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        VoxgateError::BackendAuth {
            message: format!("{} returned {}", context, status),
        }
    } else {
        VoxgateError::BackendRequest {
            message: format!("{} returned {}", context, status),
        }
    }
}

/// Speech recognition over the OpenAI transcription API.
#[derive(Debug)]
pub struct OpenAiSpeechBackend {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    language: String,
}

impl OpenAiSpeechBackend {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config.request_timeout_secs)?,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: require_api_key(config)?,
            model: config.model.clone(),
            language: config.language.clone(),
        })
    }

    async fn upload(&self, wav: Vec<u8>) -> Result<String> {
        let part = Part::bytes(wav)
            .file_name("utterance.wav")
            .mime_str("audio/wav")
            .map_err(|e| VoxgateError::BackendRequest {
                message: format!("multipart assembly failed: {}", e),
            })?;
        let form = Form::new()
            .part("file", part)
            .text("model", self.model.clone())
            .text("language", self.language.clone())
            .text("response_format", "text");

        let response = self
            .client
            .post(format!("{}/audio/transcriptions", self.endpoint))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| VoxgateError::BackendRequest {
                message: format!("transcription request failed: {}", e),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error("transcription endpoint", status));
        }
        let body = response
            .text()
            .await
            .map_err(|e| VoxgateError::BackendResponse {
                message: format!("transcription body unreadable: {}", e),
            })?;
        Ok(body.trim().to_string())
    }
}

#[async_trait]
impl SpeechBackend for OpenAiSpeechBackend {
    async fn transcribe(&self, wav: Vec<u8>) -> Result<String> {
        self.upload(wav).await
    }

    /// The API has no partial-commit notion, so each pass re-uploads the
    /// whole span and everything returned counts as committed text.
    async fn transcribe_incremental(&self, wav: Vec<u8>) -> Result<IncrementalText> {
        Ok(IncrementalText {
            text: self.upload(wav).await?,
            buffer: String::new(),
        })
    }

    fn name(&self) -> &str {
        &self.model
    }
}

/// Dialogue replies over the OpenAI chat-completions API.
#[derive(Debug)]
pub struct OpenAiDialogueResponder {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    voice: String,
    want_audio: bool,
}

impl OpenAiDialogueResponder {
    pub fn new(backend: &BackendConfig, dialogue: &DialogueConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(backend.request_timeout_secs)?,
            endpoint: backend.endpoint.trim_end_matches('/').to_string(),
            api_key: require_api_key(backend)?,
            model: dialogue.model.clone(),
            voice: dialogue.voice.clone(),
            want_audio: dialogue.reply == ReplyMode::Audio,
        })
    }
}

#[async_trait]
impl DialogueResponder for OpenAiDialogueResponder {
    async fn respond(&self, history: &[Message]) -> Result<DialogueReply> {
        let body = chat_body(&self.model, &self.voice, self.want_audio, history);
        let response = self
            .client
            .post(format!("{}/chat/completions", self.endpoint))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| VoxgateError::BackendRequest {
                message: format!("chat request failed: {}", e),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error("chat endpoint", status));
        }
        let parsed: ChatResponse =
            response
                .json()
                .await
                .map_err(|e| VoxgateError::BackendResponse {
                    message: format!("chat body unreadable: {}", e),
                })?;
        extract_reply(parsed)
    }
}

/// Assemble the chat-completions request body. Audio modality and voice
/// are only attached when a spoken reply is wanted.
fn chat_body(
    model: &str,
    voice: &str,
    want_audio: bool,
    history: &[Message],
) -> serde_json::Value {
    let mut body = serde_json::json!({
        "model": model,
        "messages": history,
    });
    if want_audio {
        body["modalities"] = serde_json::json!(["text", "audio"]);
        body["audio"] = serde_json::json!({ "voice": voice, "format": "wav" });
    }
    body
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Default, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    audio: Option<ChatAudio>,
}

#[derive(Debug, Deserialize)]
struct ChatAudio {
    #[serde(default)]
    data: Option<String>,
    #[serde(default)]
    transcript: Option<String>,
}

/// Pull the reply out of the first choice. Audio-capable models put the
/// reply text in `audio.transcript` and leave `content` null, so the
/// transcript wins when both are present.
fn extract_reply(response: ChatResponse) -> Result<DialogueReply> {
    let message = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| VoxgateError::BackendResponse {
            message: "chat response held no choices".to_string(),
        })?
        .message;

    let audio = match message.audio.as_ref().and_then(|a| a.data.as_deref()) {
        Some(data) => Some(STANDARD.decode(data).map_err(|e| {
            VoxgateError::BackendResponse {
                message: format!("reply audio was not valid base64: {}", e),
            }
        })?),
        None => None,
    };
    let text = message
        .audio
        .and_then(|a| a.transcript)
        .or(message.content)
        .unwrap_or_default();

    Ok(DialogueReply { text, audio })
}
