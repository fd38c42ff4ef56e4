//! Deployment diagnostics and dependency checking.
//!
//! Verifies the external pieces a running gateway needs: the decoder
//! binary, backend credentials, and endpoint shape.

use crate::config::{Config, ReplyMode, SegmenterMode};
use std::process::Command;

/// Result of a dependency check.
#[derive(Debug, PartialEq)]
pub enum CheckResult {
    /// Tool is installed and working
    Ok,
    /// Tool is not found
    NotFound,
    /// Tool is found but has issues
    Warning(String),
}

/// Check that the decoder binary exists and answers `-version`.
///
/// Single-dash flag because the default decoder is ffmpeg, which does
/// not speak `--version`.
pub fn check_decoder(command: &str) -> CheckResult {
    match Command::new(command).arg("-version").output() {
        Ok(output) if output.status.success() => CheckResult::Ok,
        Ok(_) => CheckResult::Warning(format!("'{}' found but -version failed", command)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => CheckResult::NotFound,
        Err(e) => CheckResult::Warning(format!("Error checking '{}': {}", command, e)),
    }
}

/// Run all dependency checks and print results.
pub fn check_dependencies(config: &Config) {
    println!("Checking gateway dependencies...\n");

    print!("{} (audio decoder): ", config.decoder.command);
    let decoder_ok = match check_decoder(&config.decoder.command) {
        CheckResult::Ok => {
            println!("✓ OK");
            true
        }
        CheckResult::NotFound => {
            println!("✗ NOT FOUND");
            println!("  Install: sudo apt install ffmpeg  (Debian/Ubuntu)");
            println!("           sudo pacman -S ffmpeg    (Arch)");
            false
        }
        CheckResult::Warning(msg) => {
            println!("⚠ WARNING: {}", msg);
            false
        }
    };

    print!("backend API key: ");
    let key_set = match &config.backend.api_key {
        Some(key) if !key.is_empty() => {
            println!("✓ set");
            true
        }
        _ => {
            println!("✗ missing");
            println!("  Set backend.api_key in the config file or export OPENAI_API_KEY.");
            false
        }
    };

    print!("backend endpoint: ");
    if config.backend.endpoint.starts_with("http://")
        || config.backend.endpoint.starts_with("https://")
    {
        println!("✓ {}", config.backend.endpoint);
    } else {
        println!(
            "⚠ WARNING: '{}' does not look like an HTTP endpoint",
            config.backend.endpoint
        );
    }

    println!();
    let mode = match config.segmenter.mode {
        SegmenterMode::Batch => "batch",
        SegmenterMode::Streaming => "streaming",
    };
    println!("Segmentation mode: {}", mode);
    match config.dialogue.reply {
        ReplyMode::Audio => println!(
            "Replies: audio via {} (voice '{}')",
            config.dialogue.model, config.dialogue.voice
        ),
        ReplyMode::None => println!("Replies: disabled (results surface in logs only)"),
    }

    println!();
    if decoder_ok && key_set {
        println!("✓ Ready to accept sessions.");
    }
    if !decoder_ok {
        println!("⚠ Sessions cannot start without the decoder binary.");
    }
    if !key_set {
        println!("⚠ Transcription will fail until an API key is configured.");
    }
}
