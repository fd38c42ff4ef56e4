//! Transcription dispatch and result policy.
//!
//! The dispatcher owns everything that happens between a finalized
//! utterance and a result on the wire: WAV encoding, the backend call,
//! filler suppression, the streaming turn accumulator, and the
//! dialogue-reply round trip. One dispatcher per session, driven only
//! by the decode loop, so calls are serialized by construction.

use crate::audio::wav::encode_wav;
use crate::config::Config;
use crate::dialogue::ConversationState;
use crate::error::Result;
use crate::segmenter::Utterance;
use crate::stt::{DialogueResponder, SpeechBackend};
use std::sync::Arc;

/// What a session sends back to its client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptionResult {
    pub text: String,
    /// False for streaming partial passes, true for completed turns.
    pub is_final: bool,
    pub reply_text: Option<String>,
    pub reply_audio: Option<Vec<u8>>,
}

pub struct TranscriptionDispatcher {
    backend: Arc<dyn SpeechBackend>,
    responder: Option<Arc<dyn DialogueResponder>>,
    conversation: ConversationState,
    /// Lowercased up front; matching is case-insensitive.
    denylist: Vec<String>,
    sample_rate: u32,
    /// Committed text of the current streaming turn.
    turn_text: String,
    label: String,
    quiet: bool,
    verbosity: u8,
}

impl TranscriptionDispatcher {
    pub fn new(
        config: &Config,
        backend: Arc<dyn SpeechBackend>,
        responder: Option<Arc<dyn DialogueResponder>>,
        label: String,
        quiet: bool,
        verbosity: u8,
    ) -> Self {
        Self {
            backend,
            responder,
            conversation: ConversationState::new(&config.dialogue.persona),
            denylist: config
                .session
                .filler_denylist
                .iter()
                .map(|entry| entry.to_lowercase())
                .collect(),
            sample_rate: config.audio.sample_rate,
            turn_text: String::new(),
            label,
            quiet,
            verbosity,
        }
    }

    /// Transcribe one finalized utterance and, when configured, fetch a
    /// dialogue reply for it.
    ///
    /// Returns `Ok(None)` for suppressed results and for transient
    /// failures; `Err` only for failures that should end the session.
    pub async fn dispatch(&mut self, utterance: &Utterance) -> Result<Option<TranscriptionResult>> {
        if self.verbosity >= 2 {
            eprintln!(
                "{}: utterance {:.2}s, loudness {:.4}",
                self.label,
                utterance.duration_secs(self.sample_rate),
                utterance.loudness
            );
        }
        let wav = match encode_wav(&utterance.pcm, self.sample_rate) {
            Ok(wav) => wav,
            Err(e) => {
                eprintln!("voxgate: wav encoding failed: {e}");
                return Ok(None);
            }
        };

        let text = match self.backend.transcribe(wav).await {
            Ok(text) => text.trim().to_string(),
            Err(e) if !e.fatal() => {
                eprintln!("voxgate: transcription failed: {e}");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        if self.suppressed(&text) {
            if self.verbosity >= 1 {
                eprintln!("{}: suppressed filler result {:?}", self.label, text);
            }
            return Ok(None);
        }
        if !self.quiet {
            eprintln!(
                "{}: transcribed {:.1}s of audio: {}",
                self.label,
                utterance.duration_secs(self.sample_rate),
                text
            );
        }

        let (reply_text, reply_audio) = self.fetch_reply(&text).await?;
        Ok(Some(TranscriptionResult {
            text,
            is_final: true,
            reply_text,
            reply_audio,
        }))
    }

    /// Transcribe one streaming pass and fold it into the turn.
    ///
    /// The returned result carries the whole turn so far (committed
    /// text plus any still-tentative buffer); `None` when there is
    /// nothing visible yet.
    pub async fn dispatch_partial(&mut self, pcm: Vec<u8>) -> Result<Option<TranscriptionResult>> {
        let wav = match encode_wav(&pcm, self.sample_rate) {
            Ok(wav) => wav,
            Err(e) => {
                eprintln!("voxgate: wav encoding failed: {e}");
                return Ok(None);
            }
        };

        let incremental = match self.backend.transcribe_incremental(wav).await {
            Ok(incremental) => incremental,
            Err(e) if !e.fatal() => {
                eprintln!("voxgate: transcription failed: {e}");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let committed = incremental.text.trim();
        if !committed.is_empty() && !self.suppressed(committed) {
            if self.turn_text.is_empty() {
                self.turn_text = committed.to_string();
            } else {
                self.turn_text.push(' ');
                self.turn_text.push_str(committed);
            }
        }

        // A buffer the recognizer already committed is a lagging
        // re-offer, not new text. Known to mis-clear a legitimate
        // repeat now and then; accepted.
        let mut buffer = incremental.buffer.trim().to_string();
        if !buffer.is_empty() && self.turn_text.contains(&buffer) {
            buffer.clear();
        }

        let visible = match (self.turn_text.is_empty(), buffer.is_empty()) {
            (true, true) => return Ok(None),
            (false, true) => self.turn_text.clone(),
            (true, false) => buffer,
            (false, false) => format!("{} {}", self.turn_text, buffer),
        };
        if self.verbosity >= 1 {
            eprintln!("{}: partial: {}", self.label, visible);
        }
        Ok(Some(TranscriptionResult {
            text: visible,
            is_final: false,
            reply_text: None,
            reply_audio: None,
        }))
    }

    /// Close the current streaming turn, handing back its committed
    /// text. `None` when the turn never produced any.
    pub fn complete_turn(&mut self) -> Option<TranscriptionResult> {
        let text = std::mem::take(&mut self.turn_text);
        if text.trim().is_empty() {
            return None;
        }
        if !self.quiet {
            eprintln!("{}: turn complete: {}", self.label, text);
        }
        Some(TranscriptionResult {
            text,
            is_final: true,
            reply_text: None,
            reply_audio: None,
        })
    }

    /// Whether the current streaming turn has committed text. The
    /// segmenter uses this to tell a turn boundary from leading silence.
    pub fn turn_has_text(&self) -> bool {
        !self.turn_text.trim().is_empty()
    }

    /// Identity of the recognition backend, for session logs.
    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Empty results and known recognizer filler are dropped before
    /// they can reach the client or the conversation history.
    fn suppressed(&self, text: &str) -> bool {
        text.is_empty() || self.denylist.contains(&text.to_lowercase())
    }

    /// Run the dialogue round trip for a batch result. The user turn is
    /// appended before the call so the responder sees it; a transient
    /// reply failure keeps the user turn and drops only the reply.
    async fn fetch_reply(&mut self, text: &str) -> Result<(Option<String>, Option<Vec<u8>>)> {
        let Some(responder) = self.responder.clone() else {
            return Ok((None, None));
        };
        self.conversation.push_user(text);
        match responder.respond(self.conversation.messages()).await {
            Ok(reply) => {
                self.conversation.push_assistant(&reply.text);
                if !self.quiet {
                    eprintln!("{}: reply: {}", self.label, reply.text);
                }
                Ok((Some(reply.text), reply.audio))
            }
            Err(e) if !e.fatal() => {
                eprintln!("voxgate: dialogue reply failed: {e}");
                Ok((None, None))
            }
            Err(e) => Err(e),
        }
    }

    #[cfg(test)]
    fn conversation_len(&self) -> usize {
        self.conversation.len()
    }
}
