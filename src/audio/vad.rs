//! Voice activity detection.
//!
//! Classifies raw PCM chunks as voiced or silent from normalized RMS
//! loudness. Classification is stateless per chunk; silence-duration
//! accumulation belongs to the segmenter.

use crate::defaults;

/// Loudness measurement for one PCM chunk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChunkMeasure {
    /// Normalized RMS loudness (0.0 to 1.0).
    pub loudness: f32,
    /// True when loudness falls strictly below the silence threshold.
    pub is_silent: bool,
}

/// RMS-threshold voice activity detector.
#[derive(Debug, Clone, Copy)]
pub struct VoiceActivityDetector {
    threshold: f32,
}

impl VoiceActivityDetector {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    /// Classify one chunk of raw s16le PCM bytes.
    pub fn classify(&self, pcm: &[u8]) -> ChunkMeasure {
        let loudness = calculate_rms(&bytes_to_samples(pcm));
        ChunkMeasure {
            loudness,
            is_silent: loudness < self.threshold,
        }
    }
}

impl Default for VoiceActivityDetector {
    fn default() -> Self {
        Self::new(defaults::SILENCE_THRESHOLD)
    }
}

/// Root-mean-square of sample amplitudes normalized to [-1.0, 1.0].
///
/// Returns 0.0 for an empty slice. Accumulates in f64 so long buffers
/// do not lose precision.
pub fn calculate_rms(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f64 = samples
        .iter()
        .map(|&s| {
            let normalized = s as f64 / 32768.0;
            normalized * normalized
        })
        .sum();
    (sum_squares / samples.len() as f64).sqrt() as f32
}

/// Reinterpret little-endian s16 PCM bytes as samples.
///
/// A trailing odd byte is ignored.
pub fn bytes_to_samples(pcm: &[u8]) -> Vec<i16> {
    pcm.chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}
