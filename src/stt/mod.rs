//! Speech-recognition and dialogue-reply backends.
//!
//! Both collaborators sit behind traits so sessions can run against the
//! OpenAI-compatible HTTP implementations or the in-process mocks. The
//! mocks live here (not under `#[cfg(test)]`) so integration tests can
//! script whole sessions without network access.

pub mod openai;

use crate::dialogue::Message;
use crate::error::{Result, VoxgateError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Result of an incremental transcription pass: text the recognizer has
/// committed plus a trailing span it may still revise.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IncrementalText {
    pub text: String,
    pub buffer: String,
}

/// A dialogue turn from the responder: always text, optionally the same
/// reply as synthesized speech.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogueReply {
    pub text: String,
    pub audio: Option<Vec<u8>>,
}

/// Trait for speech-to-text backends.
///
/// Implementations may have unbounded latency and fail transiently;
/// callers decide which failures end the session via
/// [`VoxgateError::fatal`].
#[async_trait]
pub trait SpeechBackend: Send + Sync {
    /// Transcribe one complete utterance (WAV bytes) to final text.
    async fn transcribe(&self, wav: Vec<u8>) -> Result<String>;

    /// Transcribe one pass of an ongoing utterance. The backend may
    /// hold back a trailing buffer of not-yet-committed text.
    async fn transcribe_incremental(&self, wav: Vec<u8>) -> Result<IncrementalText>;

    /// Short backend label for logs.
    fn name(&self) -> &str;
}

/// Trait for dialogue-reply backends.
#[async_trait]
pub trait DialogueResponder: Send + Sync {
    /// Produce the assistant turn for the given ordered history.
    async fn respond(&self, history: &[Message]) -> Result<DialogueReply>;
}

/// One scripted mock outcome.
#[derive(Debug, Clone)]
pub enum MockReply {
    Text(String),
    Incremental { text: String, buffer: String },
    TransientError,
    AuthError,
}

/// Mock speech backend for testing.
///
/// Replies are consumed from a script in order; once the script is
/// exhausted every call returns the default text. Upload sizes are
/// recorded so tests can assert what was sent.
#[derive(Clone)]
pub struct MockSpeechBackend {
    script: Arc<Mutex<VecDeque<MockReply>>>,
    default_text: String,
    uploads: Arc<Mutex<Vec<usize>>>,
}

impl MockSpeechBackend {
    pub fn new() -> Self {
        Self {
            script: Arc::new(Mutex::new(VecDeque::new())),
            default_text: "mock transcription".to_string(),
            uploads: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queue a plain-text reply.
    pub fn with_response(self, text: &str) -> Self {
        self.push(MockReply::Text(text.to_string()));
        self
    }

    /// Queue an incremental reply with committed text and a held-back
    /// buffer.
    pub fn with_partial(self, text: &str, buffer: &str) -> Self {
        self.push(MockReply::Incremental {
            text: text.to_string(),
            buffer: buffer.to_string(),
        });
        self
    }

    /// Queue a transient (retryable) failure.
    pub fn with_transient_failure(self) -> Self {
        self.push(MockReply::TransientError);
        self
    }

    /// Queue a fatal authentication failure.
    pub fn with_auth_failure(self) -> Self {
        self.push(MockReply::AuthError);
        self
    }

    /// Change the text returned once the script runs out.
    pub fn with_default_text(mut self, text: &str) -> Self {
        self.default_text = text.to_string();
        self
    }

    /// Byte sizes of every upload received so far.
    pub fn uploads(&self) -> Vec<usize> {
        self.uploads.lock().map(|u| u.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.uploads().len()
    }

    fn push(&self, reply: MockReply) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(reply);
        }
    }

    fn next_reply(&self, wav_len: usize) -> Result<IncrementalText> {
        if let Ok(mut uploads) = self.uploads.lock() {
            uploads.push(wav_len);
        }
        let next = self.script.lock().ok().and_then(|mut s| s.pop_front());
        match next {
            Some(MockReply::TransientError) => Err(VoxgateError::BackendRequest {
                message: "mock transient failure".to_string(),
            }),
            Some(MockReply::AuthError) => Err(VoxgateError::BackendAuth {
                message: "mock auth failure".to_string(),
            }),
            Some(MockReply::Text(text)) => Ok(IncrementalText {
                text,
                buffer: String::new(),
            }),
            Some(MockReply::Incremental { text, buffer }) => {
                Ok(IncrementalText { text, buffer })
            }
            None => Ok(IncrementalText {
                text: self.default_text.clone(),
                buffer: String::new(),
            }),
        }
    }
}

impl Default for MockSpeechBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SpeechBackend for MockSpeechBackend {
    async fn transcribe(&self, wav: Vec<u8>) -> Result<String> {
        self.next_reply(wav.len()).map(|r| r.text)
    }

    async fn transcribe_incremental(&self, wav: Vec<u8>) -> Result<IncrementalText> {
        self.next_reply(wav.len())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Mock dialogue responder for testing.
#[derive(Clone)]
pub struct MockDialogueResponder {
    reply_text: String,
    reply_audio: Option<Vec<u8>>,
    should_fail: bool,
    history_lens: Arc<Mutex<Vec<usize>>>,
}

impl MockDialogueResponder {
    pub fn new() -> Self {
        Self {
            reply_text: "Mock reply.".to_string(),
            reply_audio: None,
            should_fail: false,
            history_lens: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_reply(mut self, text: &str) -> Self {
        self.reply_text = text.to_string();
        self
    }

    pub fn with_audio(mut self, audio: Vec<u8>) -> Self {
        self.reply_audio = Some(audio);
        self
    }

    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    /// History length observed on each `respond` call.
    pub fn history_lens(&self) -> Vec<usize> {
        self.history_lens
            .lock()
            .map(|h| h.clone())
            .unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.history_lens().len()
    }
}

impl Default for MockDialogueResponder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DialogueResponder for MockDialogueResponder {
    async fn respond(&self, history: &[Message]) -> Result<DialogueReply> {
        if self.should_fail {
            return Err(VoxgateError::BackendResponse {
                message: "mock reply failure".to_string(),
            });
        }
        if let Ok(mut lens) = self.history_lens.lock() {
            lens.push(history.len());
        }
        Ok(DialogueReply {
            text: self.reply_text.clone(),
            audio: self.reply_audio.clone(),
        })
    }
}
