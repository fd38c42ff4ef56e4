//! Error types for voxgate.

use thiserror::Error;

/// Errors that can occur anywhere in the gateway.
#[derive(Error, Debug)]
pub enum VoxgateError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    // Transport errors
    #[error("Transport error: {message}")]
    Transport { message: String },

    // Decoder subprocess errors
    #[error("Failed to start decoder '{command}': {message}")]
    DecoderSpawn { command: String, message: String },

    #[error("Decoder pipe error: {message}")]
    DecoderIo { message: String },

    // Backend errors (recognition and dialogue)
    #[error("Backend authentication failed: {message}")]
    BackendAuth { message: String },

    #[error("Backend request failed: {message}")]
    BackendRequest { message: String },

    #[error("Backend returned an unusable response: {message}")]
    BackendResponse { message: String },

    // Audio errors
    #[error("Audio encode failed: {message}")]
    Encode { message: String },

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl VoxgateError {
    /// Whether this error must terminate the session.
    ///
    /// Transient backend trouble (network, rate limit, garbled body) and
    /// encode failures cost one round and nothing else; everything else
    /// means the session cannot make further progress.
    pub fn fatal(&self) -> bool {
        !matches!(
            self,
            VoxgateError::BackendRequest { .. }
                | VoxgateError::BackendResponse { .. }
                | VoxgateError::Encode { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, VoxgateError>;
