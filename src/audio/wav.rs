//! WAV encoding for recognition upload.
//!
//! Recognition backends take file uploads; utterances exist here as raw
//! s16le mono PCM. This wraps the bytes in a RIFF container without
//! touching the samples.

use crate::error::{Result, VoxgateError};
use std::io::Cursor;

/// Wrap raw s16le mono PCM bytes in a WAV container.
///
/// A trailing odd byte (half a sample) is dropped.
pub fn encode_wav(pcm: &[u8], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    let mut writer = hound::WavWriter::new(&mut cursor, spec).map_err(|e| VoxgateError::Encode {
        message: format!("Failed to open WAV writer: {}", e),
    })?;
    for pair in pcm.chunks_exact(2) {
        writer
            .write_sample(i16::from_le_bytes([pair[0], pair[1]]))
            .map_err(|e| VoxgateError::Encode {
                message: format!("Failed to write WAV sample: {}", e),
            })?;
    }
    writer.finalize().map_err(|e| VoxgateError::Encode {
        message: format!("Failed to finalize WAV data: {}", e),
    })?;

    Ok(cursor.into_inner())
}
