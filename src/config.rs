use crate::defaults;
use crate::error::{Result, VoxgateError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub audio: AudioConfig,
    pub decoder: DecoderConfig,
    pub segmenter: SegmenterConfig,
    pub backend: BackendConfig,
    pub dialogue: DialogueConfig,
    pub session: SessionConfig,
}

/// Listen address configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Audio analysis configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub silence_threshold: f32,
}

/// Decoder subprocess configuration
///
/// `args` is a template: `{format}` expands to the sniffed container
/// demuxer and `{rate}` to the configured sample rate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DecoderConfig {
    pub command: String,
    pub args: Vec<String>,
    pub read_chunk_bytes: usize,
}

/// Utterance segmentation configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SegmenterConfig {
    pub mode: SegmenterMode,
    pub silence_duration_secs: f32,
    pub streaming_pass_bytes: usize,
    pub max_buffer_secs: u64,
}

/// Recognition backend configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BackendConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub language: String,
    pub request_timeout_secs: u64,
}

/// Dialogue responder configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DialogueConfig {
    pub reply: ReplyMode,
    pub model: String,
    pub voice: String,
    pub persona: String,
}

/// Session lifecycle configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    pub idle_timeout_ms: u64,
    pub filler_denylist: Vec<String>,
}

/// Segmentation policy enumeration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SegmenterMode {
    Batch,
    Streaming,
}

/// Outbound reply policy enumeration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReplyMode {
    Audio,
    None,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: defaults::LISTEN_HOST.to_string(),
            port: defaults::LISTEN_PORT,
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: defaults::SAMPLE_RATE,
            silence_threshold: defaults::SILENCE_THRESHOLD,
        }
    }
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            command: defaults::DECODER_COMMAND.to_string(),
            args: defaults::decoder_args(),
            read_chunk_bytes: defaults::READ_CHUNK_BYTES,
        }
    }
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            mode: SegmenterMode::Batch,
            silence_duration_secs: defaults::SILENCE_DURATION_SECS,
            streaming_pass_bytes: defaults::STREAMING_PASS_BYTES,
            max_buffer_secs: defaults::MAX_BUFFER_SECS,
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            endpoint: defaults::BACKEND_ENDPOINT.to_string(),
            api_key: None,
            model: defaults::BACKEND_MODEL.to_string(),
            language: defaults::BACKEND_LANGUAGE.to_string(),
            request_timeout_secs: defaults::REQUEST_TIMEOUT_SECS,
        }
    }
}

impl Default for DialogueConfig {
    fn default() -> Self {
        Self {
            reply: ReplyMode::Audio,
            model: defaults::DIALOGUE_MODEL.to_string(),
            voice: defaults::DIALOGUE_VOICE.to_string(),
            persona: defaults::PERSONA.to_string(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_ms: defaults::IDLE_TIMEOUT_MS,
            filler_denylist: defaults::FILLER_DENYLIST
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only returns defaults if the file is missing.
    /// Returns errors for invalid TOML.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                if e.downcast_ref::<std::io::Error>()
                    .map(|io_err| io_err.kind() == std::io::ErrorKind::NotFound)
                    .unwrap_or(false)
                {
                    Self::default()
                } else {
                    // Re-panic on invalid TOML or other errors
                    panic!("Failed to load config from {}: {}", path.display(), e);
                }
            }
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - VOXGATE_HOST → server.host
    /// - VOXGATE_PORT → server.port (ignored when unparseable)
    /// - VOXGATE_DECODER → decoder.command
    /// - VOXGATE_ENDPOINT → backend.endpoint
    /// - VOXGATE_MODEL → backend.model
    /// - VOXGATE_API_KEY → backend.api_key
    /// - OPENAI_API_KEY → backend.api_key (fallback, only when still unset)
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(host) = std::env::var("VOXGATE_HOST")
            && !host.is_empty()
        {
            self.server.host = host;
        }

        if let Ok(port) = std::env::var("VOXGATE_PORT")
            && let Ok(port) = port.parse()
        {
            self.server.port = port;
        }

        if let Ok(command) = std::env::var("VOXGATE_DECODER")
            && !command.is_empty()
        {
            self.decoder.command = command;
        }

        if let Ok(endpoint) = std::env::var("VOXGATE_ENDPOINT")
            && !endpoint.is_empty()
        {
            self.backend.endpoint = endpoint;
        }

        if let Ok(model) = std::env::var("VOXGATE_MODEL")
            && !model.is_empty()
        {
            self.backend.model = model;
        }

        if let Ok(key) = std::env::var("VOXGATE_API_KEY")
            && !key.is_empty()
        {
            self.backend.api_key = Some(key);
        }

        if self.backend.api_key.is_none()
            && let Ok(key) = std::env::var("OPENAI_API_KEY")
            && !key.is_empty()
        {
            self.backend.api_key = Some(key);
        }

        self
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/voxgate/config.toml on Linux
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .expect("Could not determine config directory")
            .join("voxgate")
            .join("config.toml")
    }

    /// Look up a value by dotted key path, e.g. "segmenter.mode".
    pub fn get_value_by_path(&self, key: &str) -> Result<String> {
        let root = toml::Value::try_from(self)
            .map_err(|e| VoxgateError::Other(format!("Failed to serialize configuration: {e}")))?;
        let mut current = &root;
        for part in key.split('.') {
            current = current
                .get(part)
                .ok_or_else(|| VoxgateError::ConfigInvalidValue {
                    key: key.to_string(),
                    message: "unknown key".to_string(),
                })?;
        }
        Ok(match current {
            toml::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }

    /// Set a value by dotted key path, writing it back to `path`.
    ///
    /// The existing file (when present) is preserved apart from the
    /// updated key. The merged result is validated before writing so a
    /// typo cannot corrupt the file.
    pub fn set_value_by_path(path: &Path, key: &str, value: &str) -> Result<()> {
        let parts: Vec<&str> = key.split('.').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(VoxgateError::ConfigInvalidValue {
                key: key.to_string(),
                message: "empty key segment".to_string(),
            });
        }

        let mut root: toml::Value = if path.exists() {
            toml::from_str(&fs::read_to_string(path)?)?
        } else {
            toml::Value::Table(toml::map::Map::new())
        };

        let (last, tables) = parts.split_last().ok_or_else(|| {
            VoxgateError::ConfigInvalidValue {
                key: key.to_string(),
                message: "empty key".to_string(),
            }
        })?;
        let mut current = &mut root;
        for part in tables {
            current = current
                .as_table_mut()
                .ok_or_else(|| VoxgateError::ConfigInvalidValue {
                    key: key.to_string(),
                    message: format!("'{part}' is not a table"),
                })?
                .entry(part.to_string())
                .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
        }
        current
            .as_table_mut()
            .ok_or_else(|| VoxgateError::ConfigInvalidValue {
                key: key.to_string(),
                message: "key does not address a table entry".to_string(),
            })?
            .insert(last.to_string(), parse_scalar(value));

        // Reject values the typed Config cannot hold.
        let _: Config =
            root.clone()
                .try_into()
                .map_err(|e: toml::de::Error| VoxgateError::ConfigInvalidValue {
                    key: key.to_string(),
                    message: e.to_string(),
                })?;

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let rendered = toml::to_string_pretty(&root)
            .map_err(|e| VoxgateError::Other(format!("Failed to render configuration: {e}")))?;
        fs::write(path, rendered)?;
        Ok(())
    }

    /// A commented configuration template with every default spelled out.
    pub fn dump_template() -> String {
        format!(
            r#"# voxgate configuration
# Place at ~/.config/voxgate/config.toml (or pass --config PATH).
# Every key is optional; omitted keys keep the defaults shown here.

[server]
# Listen address for the WebSocket/HTTP front end.
host = "{host}"
port = {port}

[audio]
# PCM format the decoder is asked to emit.
sample_rate = {sample_rate}
# Normalized RMS below which a chunk counts as silent (0.0 to 1.0).
silence_threshold = {silence_threshold:?}

[decoder]
# External transcoder. {{format}} and {{rate}} expand per session.
command = "{command}"
args = [{args}]
read_chunk_bytes = {read_chunk_bytes}

[segmenter]
# "batch" finalizes whole utterances on silence gaps;
# "streaming" emits incremental partial passes.
mode = "batch"
silence_duration_secs = {silence_duration_secs:?}
streaming_pass_bytes = {streaming_pass_bytes}
max_buffer_secs = {max_buffer_secs}

[backend]
# OpenAI-compatible API root for speech recognition.
endpoint = "{endpoint}"
# api_key = "sk-..."   # or set VOXGATE_API_KEY / OPENAI_API_KEY
model = "{model}"
language = "{language}"
request_timeout_secs = {request_timeout_secs}

[dialogue]
# "audio" sends the synthesized assistant reply back over the socket;
# "none" disables the dialogue round-trip entirely.
reply = "audio"
model = "{dialogue_model}"
voice = "{voice}"
persona = "{persona}"

[session]
# Idle gap (ms) after which buffered audio is force-finalized.
idle_timeout_ms = {idle_timeout_ms}
# Recognizer filler suppressed before dispatch (exact, case-insensitive).
filler_denylist = [{denylist}]
"#,
            host = defaults::LISTEN_HOST,
            port = defaults::LISTEN_PORT,
            sample_rate = defaults::SAMPLE_RATE,
            silence_threshold = defaults::SILENCE_THRESHOLD,
            command = defaults::DECODER_COMMAND,
            args = quote_list(&defaults::decoder_args()),
            read_chunk_bytes = defaults::READ_CHUNK_BYTES,
            silence_duration_secs = defaults::SILENCE_DURATION_SECS,
            streaming_pass_bytes = defaults::STREAMING_PASS_BYTES,
            max_buffer_secs = defaults::MAX_BUFFER_SECS,
            endpoint = defaults::BACKEND_ENDPOINT,
            model = defaults::BACKEND_MODEL,
            language = defaults::BACKEND_LANGUAGE,
            request_timeout_secs = defaults::REQUEST_TIMEOUT_SECS,
            dialogue_model = defaults::DIALOGUE_MODEL,
            voice = defaults::DIALOGUE_VOICE,
            persona = defaults::PERSONA,
            idle_timeout_ms = defaults::IDLE_TIMEOUT_MS,
            denylist = quote_list(
                &defaults::FILLER_DENYLIST
                    .iter()
                    .map(|s| s.to_string())
                    .collect::<Vec<_>>()
            ),
        )
    }
}

fn quote_list(items: &[String]) -> String {
    items
        .iter()
        .map(|s| format!("\"{s}\""))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse a CLI-supplied scalar into the narrowest TOML type it fits.
fn parse_scalar(value: &str) -> toml::Value {
    if let Ok(b) = value.parse::<bool>() {
        toml::Value::Boolean(b)
    } else if let Ok(i) = value.parse::<i64>() {
        toml::Value::Integer(i)
    } else if let Ok(f) = value.parse::<f64>() {
        toml::Value::Float(f)
    } else {
        toml::Value::String(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::NamedTempFile;

    // Mutex to serialize tests that modify environment variables
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    // SAFETY: These helpers are only used in tests with ENV_LOCK held,
    // ensuring no concurrent access to environment variables.
    fn set_env(key: &str, value: &str) {
        unsafe { std::env::set_var(key, value) }
    }

    fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) }
    }

    fn clear_voxgate_env() {
        remove_env("VOXGATE_HOST");
        remove_env("VOXGATE_PORT");
        remove_env("VOXGATE_DECODER");
        remove_env("VOXGATE_ENDPOINT");
        remove_env("VOXGATE_MODEL");
        remove_env("VOXGATE_API_KEY");
        remove_env("OPENAI_API_KEY");
    }

    #[test]
    fn test_default_config_has_correct_values() {
        let config = Config::default();

        // Server defaults
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8000);

        // Audio defaults
        assert_eq!(config.audio.sample_rate, 16000);
        assert_eq!(config.audio.silence_threshold, 0.01);

        // Decoder defaults
        assert_eq!(config.decoder.command, "ffmpeg");
        assert_eq!(config.decoder.read_chunk_bytes, 1024);
        assert!(config.decoder.args.iter().any(|a| a == "{format}"));

        // Segmenter defaults
        assert_eq!(config.segmenter.mode, SegmenterMode::Batch);
        assert_eq!(config.segmenter.silence_duration_secs, 1.0);
        assert_eq!(config.segmenter.streaming_pass_bytes, 32_000);
        assert_eq!(config.segmenter.max_buffer_secs, 10);

        // Backend defaults
        assert_eq!(config.backend.endpoint, "https://api.openai.com/v1");
        assert_eq!(config.backend.api_key, None);
        assert_eq!(config.backend.model, "whisper-1");
        assert_eq!(config.backend.language, "en");
        assert_eq!(config.backend.request_timeout_secs, 30);

        // Dialogue defaults
        assert_eq!(config.dialogue.reply, ReplyMode::Audio);
        assert_eq!(config.dialogue.voice, "alloy");
        assert!(!config.dialogue.persona.is_empty());

        // Session defaults
        assert_eq!(config.session.idle_timeout_ms, 700);
        assert!(config.session.filler_denylist.contains(&"you".to_string()));
    }

    #[test]
    fn test_load_from_toml_file() {
        let toml_content = r#"
            [server]
            host = "127.0.0.1"
            port = 9000

            [audio]
            sample_rate = 8000
            silence_threshold = 0.05

            [segmenter]
            mode = "streaming"
            silence_duration_secs = 1.5

            [backend]
            endpoint = "http://localhost:4000/v1"
            api_key = "test-key"

            [dialogue]
            reply = "none"

            [session]
            idle_timeout_ms = 500
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = Config::load(temp_file.path()).unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.audio.sample_rate, 8000);
        assert_eq!(config.audio.silence_threshold, 0.05);
        assert_eq!(config.segmenter.mode, SegmenterMode::Streaming);
        assert_eq!(config.segmenter.silence_duration_secs, 1.5);
        assert_eq!(config.backend.endpoint, "http://localhost:4000/v1");
        assert_eq!(config.backend.api_key, Some("test-key".to_string()));
        assert_eq!(config.dialogue.reply, ReplyMode::None);
        assert_eq!(config.session.idle_timeout_ms, 500);
    }

    #[test]
    fn test_load_partial_config_uses_defaults() {
        let toml_content = r#"
            [segmenter]
            mode = "streaming"
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = Config::load(temp_file.path()).unwrap();

        // Only mode should be overridden
        assert_eq!(config.segmenter.mode, SegmenterMode::Streaming);

        // Everything else should be defaults
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.audio.silence_threshold, 0.01);
        assert_eq!(config.segmenter.silence_duration_secs, 1.0);
        assert_eq!(config.backend.model, "whisper-1");
        assert_eq!(config.dialogue.reply, ReplyMode::Audio);
    }

    #[test]
    fn test_env_override_backend() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_voxgate_env();

        set_env("VOXGATE_MODEL", "whisper-large");
        set_env("VOXGATE_API_KEY", "sk-env");
        let config = Config::default().with_env_overrides();

        assert_eq!(config.backend.model, "whisper-large");
        assert_eq!(config.backend.api_key, Some("sk-env".to_string()));
        assert_eq!(config.backend.language, "en"); // Not overridden

        clear_voxgate_env();
    }

    #[test]
    fn test_env_override_server_and_decoder() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_voxgate_env();

        set_env("VOXGATE_HOST", "::1");
        set_env("VOXGATE_PORT", "9100");
        set_env("VOXGATE_DECODER", "/opt/ffmpeg/bin/ffmpeg");

        let config = Config::default().with_env_overrides();

        assert_eq!(config.server.host, "::1");
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.decoder.command, "/opt/ffmpeg/bin/ffmpeg");

        clear_voxgate_env();
    }

    #[test]
    fn test_env_override_unparseable_port_ignored() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_voxgate_env();

        set_env("VOXGATE_PORT", "not-a-port");
        let config = Config::default().with_env_overrides();

        assert_eq!(config.server.port, 8000);

        clear_voxgate_env();
    }

    #[test]
    fn test_env_openai_key_is_fallback_only() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_voxgate_env();

        set_env("OPENAI_API_KEY", "sk-openai");
        let config = Config::default().with_env_overrides();
        assert_eq!(config.backend.api_key, Some("sk-openai".to_string()));

        // VOXGATE_API_KEY wins over the fallback
        set_env("VOXGATE_API_KEY", "sk-voxgate");
        let config = Config::default().with_env_overrides();
        assert_eq!(config.backend.api_key, Some("sk-voxgate".to_string()));

        clear_voxgate_env();
    }

    #[test]
    fn test_env_override_empty_string_ignored() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_voxgate_env();

        set_env("VOXGATE_MODEL", "");
        let config = Config::default().with_env_overrides();

        // Empty string should not override default
        assert_eq!(config.backend.model, "whisper-1");

        clear_voxgate_env();
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let invalid_toml = r#"
            [server
            host = "broken
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(invalid_toml.as_bytes()).unwrap();

        let result = Config::load(temp_file.path());

        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_mode_returns_error() {
        let toml_content = r#"
            [segmenter]
            mode = "turbo"
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();

        assert!(Config::load(temp_file.path()).is_err());
    }

    #[test]
    fn test_default_path_is_xdg_compliant() {
        let path = Config::default_path();
        let path_str = path.to_string_lossy();

        // Should contain .config/voxgate/config.toml
        assert!(path_str.contains("voxgate"));
        assert!(path_str.ends_with("config.toml"));
    }

    #[test]
    fn test_load_or_default_returns_default_for_missing_file() {
        let missing_path = Path::new("/tmp/nonexistent_voxgate_config_12345.toml");
        let config = Config::load_or_default(missing_path);

        // Should return defaults
        assert_eq!(config, Config::default());
    }

    #[test]
    #[should_panic(expected = "Failed to load config")]
    fn test_load_or_default_panics_on_invalid_toml() {
        let invalid_toml = r#"
            [server
            host = "broken
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(invalid_toml.as_bytes()).unwrap();

        // Should panic on invalid TOML, not return defaults
        Config::load_or_default(temp_file.path());
    }

    #[test]
    fn test_get_value_by_path() {
        let config = Config::default();

        assert_eq!(config.get_value_by_path("server.port").unwrap(), "8000");
        assert_eq!(config.get_value_by_path("server.host").unwrap(), "0.0.0.0");
        assert_eq!(config.get_value_by_path("segmenter.mode").unwrap(), "batch");
        assert_eq!(
            config.get_value_by_path("backend.model").unwrap(),
            "whisper-1"
        );
    }

    #[test]
    fn test_get_value_unknown_key() {
        let config = Config::default();
        let err = config.get_value_by_path("server.threads").unwrap_err();
        assert!(matches!(err, VoxgateError::ConfigInvalidValue { .. }));
    }

    #[test]
    fn test_set_value_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        Config::set_value_by_path(&path, "server.port", "9100").unwrap();
        Config::set_value_by_path(&path, "segmenter.mode", "streaming").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.segmenter.mode, SegmenterMode::Streaming);
        // Untouched sections keep defaults
        assert_eq!(config.backend.model, "whisper-1");
    }

    #[test]
    fn test_set_value_preserves_existing_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        Config::set_value_by_path(&path, "server.host", "127.0.0.1").unwrap();
        Config::set_value_by_path(&path, "server.port", "9000").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
    }

    #[test]
    fn test_set_value_rejects_wrong_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let err = Config::set_value_by_path(&path, "server.port", "loud").unwrap_err();
        assert!(matches!(err, VoxgateError::ConfigInvalidValue { .. }));
        // Nothing was written
        assert!(!path.exists());
    }

    #[test]
    fn test_dump_template_parses_to_defaults() {
        let template = Config::dump_template();
        let parsed: Config = toml::from_str(&template).unwrap();
        // api_key stays commented out in the template
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn test_parse_scalar_types() {
        assert_eq!(parse_scalar("true"), toml::Value::Boolean(true));
        assert_eq!(parse_scalar("42"), toml::Value::Integer(42));
        assert_eq!(parse_scalar("0.5"), toml::Value::Float(0.5));
        assert_eq!(
            parse_scalar("streaming"),
            toml::Value::String("streaming".to_string())
        );
    }
}
