//! Default configuration constants for voxgate.
//!
//! This module provides shared constants used across different configuration types
//! to ensure consistency and eliminate duplication.

/// Reference audio sample rate in Hz.
///
/// 16kHz is the standard for speech recognition; the decoder resamples
/// every input container to this rate before segmentation.
pub const SAMPLE_RATE: u32 = 16000;

/// Bytes per sample for the s16le PCM the decoder emits.
pub const BYTES_PER_SAMPLE: usize = 2;

/// Silence threshold on normalized RMS loudness (0.0 to 1.0).
///
/// A chunk whose RMS falls strictly below this value counts as silent.
/// 0.01 is tuned for browser microphone capture; raising it makes
/// segmentation fire on quieter speech, lowering it tolerates more
/// ambient noise before an utterance is considered over.
pub const SILENCE_THRESHOLD: f32 = 0.01;

/// Cumulative silence, in seconds, that finalizes a batch-mode utterance.
///
/// 1.0 second allows natural mid-sentence pauses without cutting the
/// speaker off. Useful range is roughly 1-2 seconds.
pub const SILENCE_DURATION_SECS: f32 = 1.0;

/// Buffered-byte threshold for a streaming-mode partial pass.
///
/// 32 000 bytes is one second of audio at the reference format; each
/// voiced second of speech triggers one incremental recognition pass.
pub const STREAMING_PASS_BYTES: usize = 32_000;

/// Maximum seconds of audio buffered before forced finalization.
///
/// Caps per-session memory when a client streams continuous loud audio
/// that never crosses a silence boundary.
pub const MAX_BUFFER_SECS: u64 = 10;

/// Idle gap, in milliseconds, after which buffered audio is force-finalized.
///
/// Browser capture stops sending frames the moment recording pauses, so
/// the silence-based policy alone would leave the last utterance stuck
/// in the buffer. 700ms matches typical capture-restart gaps.
pub const IDLE_TIMEOUT_MS: u64 = 700;

/// Interval at which the idle monitor samples the last-activity timestamp.
pub const IDLE_POLL_MS: u64 = 250;

/// Default decoder command.
pub const DECODER_COMMAND: &str = "ffmpeg";

/// Bytes read from the decoder's stdout per chunk.
///
/// 1024 bytes is 32ms of audio at the reference format, fine enough
/// granularity for silence accumulation without per-read overhead.
pub const READ_CHUNK_BYTES: usize = 1024;

/// Default decoder argument template.
///
/// `{format}` is replaced with the sniffed container demuxer name and
/// `{rate}` with the configured sample rate. Output is always raw
/// s16le mono on stdout.
pub fn decoder_args() -> Vec<String> {
    [
        "-f", "{format}", "-i", "pipe:0", "-f", "s16le", "-acodec", "pcm_s16le", "-ac", "1",
        "-ar", "{rate}", "pipe:1",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Default listen host.
pub const LISTEN_HOST: &str = "0.0.0.0";

/// Default listen port.
pub const LISTEN_PORT: u16 = 8000;

/// Default recognition endpoint (OpenAI-compatible API root).
pub const BACKEND_ENDPOINT: &str = "https://api.openai.com/v1";

/// Default recognition model.
pub const BACKEND_MODEL: &str = "whisper-1";

/// Default recognition language hint.
pub const BACKEND_LANGUAGE: &str = "en";

/// Default HTTP request timeout in seconds for backend calls.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default dialogue model.
pub const DIALOGUE_MODEL: &str = "gpt-4o-audio-preview";

/// Default synthesized-reply voice.
pub const DIALOGUE_VOICE: &str = "alloy";

/// Default system persona seeded into every conversation.
pub const PERSONA: &str = "You are a concise in-car voice assistant. Answer the driver's \
     question directly in one or two short sentences and skip anything they did not ask for.";

/// Filler transcriptions the recognizer produces for silence or noise.
///
/// Matched exactly and case-insensitively against the trimmed result;
/// matching results are dropped before they reach the conversation.
pub const FILLER_DENYLIST: &[&str] = &[
    "you",
    "bye",
    "bye.",
    "oh",
    "thank you.",
    "thanks for watching!",
];

/// Bytes of raw PCM per second at the reference format.
pub const fn bytes_per_second(sample_rate: u32) -> usize {
    sample_rate as usize * BYTES_PER_SAMPLE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_per_second_at_reference_rate() {
        assert_eq!(bytes_per_second(SAMPLE_RATE), 32_000);
    }

    #[test]
    fn test_streaming_pass_is_one_second() {
        assert_eq!(STREAMING_PASS_BYTES, bytes_per_second(SAMPLE_RATE));
    }

    #[test]
    fn test_decoder_args_carry_placeholders() {
        let args = decoder_args();
        assert!(args.iter().any(|a| a == "{format}"));
        assert!(args.iter().any(|a| a == "{rate}"));
        assert!(args.iter().any(|a| a == "pipe:0"));
        assert!(args.iter().any(|a| a == "pipe:1"));
    }

    #[test]
    fn test_denylist_entries_are_lowercase() {
        for entry in FILLER_DENYLIST {
            assert_eq!(*entry, entry.to_lowercase());
        }
    }
}
