use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use voxgate::cli::{Cli, Commands, ConfigAction};
use voxgate::config::{Config, ReplyMode};
use voxgate::diagnostics::check_dependencies;
use voxgate::server;
use voxgate::session::SessionContext;
use voxgate::stt::openai::{OpenAiDialogueResponder, OpenAiSpeechBackend};
use voxgate::stt::{DialogueResponder, SpeechBackend};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        None => {
            let config = load_config(cli.config.as_deref())?;
            run_serve(config, None, None, cli.quiet, cli.verbose).await?;
        }
        Some(Commands::Serve { host, port }) => {
            let config = load_config(cli.config.as_deref())?;
            run_serve(config, host, port, cli.quiet, cli.verbose).await?;
        }
        Some(Commands::Check) => {
            let config = load_config(cli.config.as_deref())?;
            check_dependencies(&config);
        }
        Some(Commands::Config { action }) => {
            handle_config_command(action, cli.config.as_deref())?;
        }
    }

    Ok(())
}

/// Start the gateway server.
async fn run_serve(
    mut config: Config,
    host: Option<String>,
    port: Option<u16>,
    quiet: bool,
    verbosity: u8,
) -> Result<()> {
    // CLI flags win over the config file
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let backend: Arc<dyn SpeechBackend> = Arc::new(OpenAiSpeechBackend::new(&config.backend)?);
    let responder: Option<Arc<dyn DialogueResponder>> =
        if config.dialogue.reply == ReplyMode::Audio {
            Some(Arc::new(OpenAiDialogueResponder::new(
                &config.backend,
                &config.dialogue,
            )?))
        } else {
            None
        };

    let ctx = SessionContext {
        config,
        backend,
        responder,
        quiet,
        verbosity,
    };

    server::serve(Arc::new(ctx)).await?;
    Ok(())
}

/// Load configuration from file or use defaults.
///
/// Priority order:
/// 1. Custom config path from CLI (--config)
/// 2. Default config path (~/.config/voxgate/config.toml)
/// 3. Built-in defaults with environment variable overrides
fn load_config(custom_path: Option<&std::path::Path>) -> Result<Config> {
    let config = if let Some(path) = custom_path {
        // Load from custom path
        Config::load(path)?
    } else {
        // Try default path, fall back to defaults
        let default_path = Config::default_path();
        Config::load_or_default(&default_path)
    };

    // Apply environment variable overrides
    Ok(config.with_env_overrides())
}

/// Handle configuration commands.
fn handle_config_command(
    action: ConfigAction,
    custom_path: Option<&std::path::Path>,
) -> Result<()> {
    let config_path = custom_path
        .map(std::path::PathBuf::from)
        .unwrap_or_else(Config::default_path);

    match action {
        ConfigAction::Get { key } => {
            let config = Config::load_or_default(&config_path).with_env_overrides();
            match config.get_value_by_path(&key) {
                Ok(value) => println!("{}", value),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }
        ConfigAction::Set { key, value } => {
            Config::set_value_by_path(&config_path, &key, &value)?;
            println!("Set {} = {}", key, value);
        }
        ConfigAction::Dump => {
            print!("{}", Config::dump_template());
        }
    }
    Ok(())
}
