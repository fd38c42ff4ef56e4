//! voxgate - Voice-session gateway
//!
//! WebSocket audio in, segmented transcriptions and spoken replies out.

// Enforce error handling discipline
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod audio;
pub mod cli;
pub mod config;
pub mod decoder;
pub mod defaults;
pub mod diagnostics;
pub mod dialogue;
pub mod dispatch;
pub mod error;
pub mod segmenter;
pub mod server;
pub mod session;
pub mod stt;

// Core traits (ingest → recognize → reply)
pub use stt::{DialogueResponder, SpeechBackend};

// Session pipeline
pub use dispatch::{TranscriptionDispatcher, TranscriptionResult};
pub use segmenter::{SegmentEvent, Segmenter};
pub use session::{SessionContext, run_session};

// Error handling
pub use error::{Result, VoxgateError};

// Config
pub use config::{Config, ReplyMode, SegmenterMode};

/// Build version string with optional git commit hash.
///
/// Returns `"0.2.0+abc1234"` when git hash is available, `"0.2.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}
