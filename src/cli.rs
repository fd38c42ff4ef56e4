//! Command-line interface for voxgate
//!
//! Provides argument parsing using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Voice-session gateway
#[derive(Parser, Debug)]
#[command(
    name = "voxgate",
    version,
    about = "Voice-session gateway: WebSocket audio in, segmented transcriptions out"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Suppress output (quiet mode)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose output (-v: session events, -vv: decoder diagnostics)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the gateway server (default when no command is given)
    Serve {
        /// Listen host override
        #[arg(long, value_name = "HOST")]
        host: Option<String>,

        /// Listen port override
        #[arg(long, value_name = "PORT")]
        port: Option<u16>,
    },

    /// Check deployment dependencies
    Check,

    /// View and modify configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration management actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Get a configuration value by key (e.g., backend.model)
    Get {
        /// Dotted key path (e.g., backend.model, audio.sample_rate)
        key: String,
    },
    /// Set a configuration value by key
    Set {
        /// Dotted key path (e.g., backend.model, audio.sample_rate)
        key: String,
        /// Value to set
        value: String,
    },
    /// Dump a commented configuration template
    Dump,
}
