//! Silence-driven utterance segmentation.
//!
//! The segmenter owns the per-session PCM accumulator and the silence
//! counter. Every decoded chunk is classified and appended; the timing
//! policy then decides whether the buffer keeps growing, becomes a
//! finalized utterance (batch), or is handed off as a partial pass
//! (streaming). Exactly one task drives a segmenter, so it needs no
//! interior locking.

use crate::audio::buffer::AudioBuffer;
use crate::audio::vad::{bytes_to_samples, calculate_rms, VoiceActivityDetector};
use crate::config::{AudioConfig, SegmenterConfig, SegmenterMode};
use crate::decoder::AudioChunk;
use crate::defaults::BYTES_PER_SAMPLE;

/// A finalized span of PCM ready for transcription.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub pcm: Vec<u8>,
    /// RMS loudness over the whole span, for logging.
    pub loudness: f32,
}

impl Utterance {
    fn from_pcm(pcm: Vec<u8>) -> Self {
        let loudness = calculate_rms(&bytes_to_samples(&pcm));
        Self { pcm, loudness }
    }

    pub fn duration_secs(&self, sample_rate: u32) -> f32 {
        self.pcm.len() as f32 / crate::defaults::bytes_per_second(sample_rate) as f32
    }
}

/// What the segmenter decided about the chunk just pushed.
#[derive(Debug, PartialEq)]
pub enum SegmentEvent {
    /// Chunk absorbed, nothing to dispatch yet.
    Buffered,
    /// A silence boundary (or the growth cap) closed an utterance.
    Finalized(Utterance),
    /// Streaming mode: the accumulated bytes go out as an incremental
    /// pass; the turn stays open.
    PartialPass(Vec<u8>),
    /// Streaming mode: silence after committed text ends the turn.
    TurnBoundary,
}

pub struct Segmenter {
    mode: SegmenterMode,
    vad: VoiceActivityDetector,
    buffer: AudioBuffer,
    sample_rate: u32,
    silence_duration_secs: f32,
    streaming_pass_bytes: usize,
    max_buffer_secs: u64,
    /// Cumulative trailing silence; any voiced chunk resets it.
    silence_secs: f32,
}

impl Segmenter {
    pub fn new(segmenter: &SegmenterConfig, audio: &AudioConfig) -> Self {
        Self {
            mode: segmenter.mode,
            vad: VoiceActivityDetector::new(audio.silence_threshold),
            buffer: AudioBuffer::new(),
            sample_rate: audio.sample_rate,
            silence_duration_secs: segmenter.silence_duration_secs,
            streaming_pass_bytes: segmenter.streaming_pass_bytes,
            max_buffer_secs: segmenter.max_buffer_secs,
            silence_secs: 0.0,
        }
    }

    /// Absorb one decoded chunk and report what it triggered.
    ///
    /// `turn_has_text` is the dispatcher's word on whether the current
    /// streaming turn already produced committed text; batch mode
    /// ignores it.
    pub fn push(&mut self, chunk: &AudioChunk, turn_has_text: bool) -> SegmentEvent {
        let measure = self.vad.classify(&chunk.pcm);
        self.buffer.append(&chunk.pcm);

        match self.mode {
            SegmenterMode::Batch => {
                if measure.is_silent {
                    self.silence_secs += chunk.duration_secs;
                } else {
                    self.silence_secs = 0.0;
                }
                if self.silence_secs >= self.silence_duration_secs || self.at_growth_cap() {
                    return self.finalize_trimmed();
                }
                SegmentEvent::Buffered
            }
            SegmenterMode::Streaming => {
                if !measure.is_silent && self.buffer.len() >= self.streaming_pass_bytes {
                    return SegmentEvent::PartialPass(self.buffer.take_all());
                }
                if measure.is_silent && turn_has_text {
                    self.buffer.reset();
                    return SegmentEvent::TurnBoundary;
                }
                if self.at_growth_cap() {
                    return SegmentEvent::PartialPass(self.buffer.take_all());
                }
                SegmentEvent::Buffered
            }
        }
    }

    /// Close the current utterance as if a silence boundary had been
    /// reached, trimming whatever trailing silence has accumulated.
    /// Used by the idle monitor.
    pub fn force_finalize(&mut self) -> Option<Utterance> {
        match self.finalize_trimmed() {
            SegmentEvent::Finalized(utterance) => Some(utterance),
            _ => None,
        }
    }

    /// Hand back everything still buffered, untrimmed. Silence gating
    /// does not apply at end of stream.
    pub fn flush(&mut self) -> Option<Utterance> {
        self.silence_secs = 0.0;
        if self.buffer.is_empty() {
            return None;
        }
        Some(Utterance::from_pcm(self.buffer.take_all()))
    }

    pub fn buffered_bytes(&self) -> usize {
        self.buffer.len()
    }

    fn at_growth_cap(&self) -> bool {
        self.buffer.duration_secs(self.sample_rate) >= self.max_buffer_secs as f32
    }

    /// Take the buffer minus the trailing silent span. The trim is
    /// clamped: a span at least as long as the buffer means the whole
    /// buffer is kept. Resets the silence counter either way.
    fn finalize_trimmed(&mut self) -> SegmentEvent {
        let trailing =
            (self.silence_secs * self.sample_rate as f32) as usize * BYTES_PER_SAMPLE;
        self.silence_secs = 0.0;
        let pcm = self.buffer.take_trimmed(trailing);
        if pcm.is_empty() {
            return SegmentEvent::Buffered;
        }
        SegmentEvent::Finalized(Utterance::from_pcm(pcm))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: u32 = 16_000;
    /// 0.25 s of audio at the reference format.
    const QUARTER_SEC_BYTES: usize = 8_000;

    fn batch_config() -> SegmenterConfig {
        SegmenterConfig {
            mode: SegmenterMode::Batch,
            silence_duration_secs: 1.0,
            streaming_pass_bytes: 32_000,
            max_buffer_secs: 10,
        }
    }

    fn streaming_config() -> SegmenterConfig {
        SegmenterConfig {
            mode: SegmenterMode::Streaming,
            ..batch_config()
        }
    }

    fn audio_config() -> AudioConfig {
        AudioConfig {
            sample_rate: RATE,
            silence_threshold: 0.01,
        }
    }

    fn chunk_of(amplitude: i16, bytes: usize) -> AudioChunk {
        let pcm: Vec<u8> = std::iter::repeat(amplitude.to_le_bytes())
            .take(bytes / 2)
            .flatten()
            .collect();
        AudioChunk {
            duration_secs: bytes as f32 / 32_000.0,
            pcm,
        }
    }

    fn speech_chunk() -> AudioChunk {
        chunk_of(3_000, QUARTER_SEC_BYTES)
    }

    fn silence_chunk() -> AudioChunk {
        chunk_of(0, QUARTER_SEC_BYTES)
    }

    #[test]
    fn test_batch_finalizes_after_one_second_of_silence() {
        let mut seg = Segmenter::new(&batch_config(), &audio_config());

        for _ in 0..3 {
            assert_eq!(seg.push(&speech_chunk(), false), SegmentEvent::Buffered);
        }
        for _ in 0..3 {
            assert_eq!(seg.push(&silence_chunk(), false), SegmentEvent::Buffered);
        }
        // Fourth silent chunk crosses the 1.0 s threshold.
        match seg.push(&silence_chunk(), false) {
            SegmentEvent::Finalized(utterance) => {
                // Trailing 1.0 s (32 000 bytes) trimmed; the voiced
                // 0.75 s survives.
                assert_eq!(utterance.pcm.len(), 3 * QUARTER_SEC_BYTES);
                assert!(utterance.loudness > 0.01);
            }
            other => panic!("expected Finalized, got {:?}", other),
        }
        assert_eq!(seg.buffered_bytes(), 0);
    }

    #[test]
    fn test_voiced_chunk_resets_the_silence_counter() {
        let mut seg = Segmenter::new(&batch_config(), &audio_config());

        seg.push(&speech_chunk(), false);
        for _ in 0..3 {
            seg.push(&silence_chunk(), false);
        }
        // 0.75 s of silence so far; speech resets the counter.
        assert_eq!(seg.push(&speech_chunk(), false), SegmentEvent::Buffered);
        for _ in 0..3 {
            assert_eq!(seg.push(&silence_chunk(), false), SegmentEvent::Buffered);
        }
        match seg.push(&silence_chunk(), false) {
            SegmentEvent::Finalized(utterance) => {
                // 9 chunks buffered, trailing 4 trimmed.
                assert_eq!(utterance.pcm.len(), 5 * QUARTER_SEC_BYTES);
            }
            other => panic!("expected Finalized, got {:?}", other),
        }
    }

    #[test]
    fn test_all_silent_buffer_is_kept_whole_rather_than_underflowing() {
        let mut seg = Segmenter::new(&batch_config(), &audio_config());

        for _ in 0..3 {
            seg.push(&silence_chunk(), false);
        }
        match seg.push(&silence_chunk(), false) {
            SegmentEvent::Finalized(utterance) => {
                // Trim span equals the buffer; clamp keeps everything.
                assert_eq!(utterance.pcm.len(), 4 * QUARTER_SEC_BYTES);
                assert_eq!(utterance.loudness, 0.0);
            }
            other => panic!("expected Finalized, got {:?}", other),
        }
    }

    #[test]
    fn test_exactly_one_utterance_for_speech_followed_by_long_silence() {
        let mut seg = Segmenter::new(&batch_config(), &audio_config());
        let mut finalized = Vec::new();

        // 3.0 s of speech, then 1.5 s of silence.
        for _ in 0..12 {
            seg.push(&speech_chunk(), false);
        }
        for _ in 0..6 {
            if let SegmentEvent::Finalized(u) = seg.push(&silence_chunk(), false) {
                finalized.push(u);
            }
        }

        assert_eq!(finalized.len(), 1);
        assert_eq!(finalized[0].pcm.len(), 12 * QUARTER_SEC_BYTES);
        assert!((finalized[0].duration_secs(RATE) - 3.0).abs() < 1e-6);
        // The post-boundary silent tail stays buffered for the
        // end-of-stream flush.
        assert_eq!(seg.buffered_bytes(), 2 * QUARTER_SEC_BYTES);
    }

    #[test]
    fn test_force_finalize_trims_partial_silence() {
        let mut seg = Segmenter::new(&batch_config(), &audio_config());

        seg.push(&speech_chunk(), false);
        seg.push(&speech_chunk(), false);
        seg.push(&silence_chunk(), false);

        let utterance = seg.force_finalize().unwrap();
        assert_eq!(utterance.pcm.len(), 2 * QUARTER_SEC_BYTES);

        // Nothing left to finalize.
        assert!(seg.force_finalize().is_none());
        assert_eq!(seg.buffered_bytes(), 0);
    }

    #[test]
    fn test_flush_returns_everything_without_gating() {
        let mut seg = Segmenter::new(&batch_config(), &audio_config());

        seg.push(&silence_chunk(), false);
        seg.push(&silence_chunk(), false);

        let utterance = seg.flush().unwrap();
        assert_eq!(utterance.pcm.len(), 2 * QUARTER_SEC_BYTES);
        assert!(seg.flush().is_none());
    }

    #[test]
    fn test_growth_cap_finalizes_early() {
        let config = SegmenterConfig {
            max_buffer_secs: 1,
            ..batch_config()
        };
        let mut seg = Segmenter::new(&config, &audio_config());

        for _ in 0..3 {
            assert_eq!(seg.push(&speech_chunk(), false), SegmentEvent::Buffered);
        }
        match seg.push(&speech_chunk(), false) {
            SegmentEvent::Finalized(utterance) => {
                // No trailing silence, so nothing is trimmed.
                assert_eq!(utterance.pcm.len(), 4 * QUARTER_SEC_BYTES);
            }
            other => panic!("expected Finalized, got {:?}", other),
        }
    }

    #[test]
    fn test_streaming_passes_buffer_once_threshold_met_on_voiced_chunk() {
        let mut seg = Segmenter::new(&streaming_config(), &audio_config());

        for _ in 0..3 {
            assert_eq!(seg.push(&speech_chunk(), false), SegmentEvent::Buffered);
        }
        match seg.push(&speech_chunk(), false) {
            SegmentEvent::PartialPass(bytes) => assert_eq!(bytes.len(), 32_000),
            other => panic!("expected PartialPass, got {:?}", other),
        }
        assert_eq!(seg.buffered_bytes(), 0);
    }

    #[test]
    fn test_streaming_threshold_does_not_fire_on_silent_chunk() {
        let mut seg = Segmenter::new(&streaming_config(), &audio_config());

        for _ in 0..3 {
            seg.push(&speech_chunk(), false);
        }
        // Over the byte threshold but silent, and no turn text yet.
        assert_eq!(seg.push(&silence_chunk(), false), SegmentEvent::Buffered);
        assert_eq!(seg.buffered_bytes(), 4 * QUARTER_SEC_BYTES);
    }

    #[test]
    fn test_streaming_silence_with_turn_text_ends_the_turn() {
        let mut seg = Segmenter::new(&streaming_config(), &audio_config());

        seg.push(&speech_chunk(), true);
        assert_eq!(seg.push(&silence_chunk(), true), SegmentEvent::TurnBoundary);
        // The boundary discards the tail so the next turn starts clean.
        assert_eq!(seg.buffered_bytes(), 0);
    }

    #[test]
    fn test_streaming_growth_cap_passes_silent_audio() {
        let config = SegmenterConfig {
            max_buffer_secs: 1,
            ..streaming_config()
        };
        let mut seg = Segmenter::new(&config, &audio_config());

        for _ in 0..3 {
            assert_eq!(seg.push(&silence_chunk(), false), SegmentEvent::Buffered);
        }
        match seg.push(&silence_chunk(), false) {
            SegmentEvent::PartialPass(bytes) => assert_eq!(bytes.len(), 32_000),
            other => panic!("expected PartialPass, got {:?}", other),
        }
    }
}
