//! Audio primitives: loudness analysis, PCM buffering, container
//! sniffing, and WAV encoding for backend upload.

pub mod buffer;
pub mod format;
pub mod vad;
pub mod wav;
