//! Raw PCM accumulation between segmentation decisions.

use crate::defaults;

/// Growable byte buffer for decoded PCM.
///
/// One buffer exists per session, owned by the decode loop; nothing
/// else touches it.
#[derive(Debug, Default)]
pub struct AudioBuffer {
    bytes: Vec<u8>,
}

impl AudioBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, chunk: &[u8]) {
        self.bytes.extend_from_slice(chunk);
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Copy of everything accumulated so far.
    pub fn snapshot(&self) -> Vec<u8> {
        self.bytes.clone()
    }

    /// Seconds of audio buffered at the given sample rate.
    pub fn duration_secs(&self, sample_rate: u32) -> f32 {
        self.bytes.len() as f32 / defaults::bytes_per_second(sample_rate) as f32
    }

    /// Take everything buffered, leaving the buffer empty.
    pub fn take_all(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.bytes)
    }

    /// Take the buffer minus `trailing` bytes from the end, then reset.
    ///
    /// When `trailing` is the whole buffer or more, nothing is trimmed
    /// and the full contents are returned.
    pub fn take_trimmed(&mut self, trailing: usize) -> Vec<u8> {
        let keep = if trailing < self.bytes.len() {
            self.bytes.len() - trailing
        } else {
            self.bytes.len()
        };
        let mut out = std::mem::take(&mut self.bytes);
        out.truncate(keep);
        out
    }

    pub fn reset(&mut self) {
        self.bytes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_snapshot_round_trip() {
        let mut buffer = AudioBuffer::new();
        buffer.append(&[1, 2, 3]);
        buffer.append(&[4, 5]);

        assert_eq!(buffer.len(), 5);
        assert_eq!(buffer.snapshot(), vec![1, 2, 3, 4, 5]);
        // Snapshot does not consume
        assert_eq!(buffer.len(), 5);
    }

    #[test]
    fn test_reset_empties_the_buffer() {
        let mut buffer = AudioBuffer::new();
        buffer.append(&[9; 100]);
        buffer.reset();
        assert!(buffer.is_empty());
        assert_eq!(buffer.len(), 0);
    }

    #[test]
    fn test_take_all_consumes() {
        let mut buffer = AudioBuffer::new();
        buffer.append(&[7; 10]);
        let taken = buffer.take_all();
        assert_eq!(taken.len(), 10);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_take_trimmed_removes_trailing_bytes() {
        let mut buffer = AudioBuffer::new();
        buffer.append(&[1, 2, 3, 4, 5, 6]);
        let taken = buffer.take_trimmed(2);
        assert_eq!(taken, vec![1, 2, 3, 4]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_take_trimmed_clamps_when_trailing_exceeds_length() {
        let mut buffer = AudioBuffer::new();
        buffer.append(&[1, 2, 3]);
        let taken = buffer.take_trimmed(10);
        assert_eq!(taken, vec![1, 2, 3]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_take_trimmed_keeps_everything_at_exact_length() {
        // Trailing equal to the buffered length trims nothing.
        let mut buffer = AudioBuffer::new();
        buffer.append(&[1, 2, 3, 4]);
        let taken = buffer.take_trimmed(4);
        assert_eq!(taken, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_duration_tracks_reference_format() {
        let mut buffer = AudioBuffer::new();
        buffer.append(&vec![0u8; 32_000]);
        assert!((buffer.duration_secs(16_000) - 1.0).abs() < f32::EPSILON);
        assert!((buffer.duration_secs(8_000) - 2.0).abs() < f32::EPSILON);
    }
}
