//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::ConfigError;

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Remote model endpoints
    #[serde(default)]
    pub openai: OpenAiConfig,

    /// Speech synthesis
    #[serde(default)]
    pub tts: TtsConfig,

    /// Guardrails
    #[serde(default)]
    pub safety: SafetyConfig,

    /// Reply generation
    #[serde(default)]
    pub agent: AgentConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Settings {
    /// Create default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether remote calls are possible at all
    ///
    /// Without an API key the bot runs in canned-response-only mode.
    pub fn remote_enabled(&self) -> bool {
        self.openai.api_key().is_some()
    }

    /// Apply the flat environment variables recognised by the deployment
    /// (`OPENAI_API_KEY`, `TTS_VOICE`, `PORT`, `HOST`, `RELOAD`).
    ///
    /// `lookup` abstracts `std::env::var` so tests can inject values.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("OPENAI_API_KEY").filter(|k| !k.trim().is_empty()) {
            self.openai.api_key = Some(key.trim().to_string());
        }

        if let Some(voice) = lookup("TTS_VOICE").filter(|v| !v.trim().is_empty()) {
            self.tts.voice_override = Some(voice.trim().to_string());
        }

        if let Some(host) = lookup("HOST").filter(|h| !h.trim().is_empty()) {
            self.server.host = host.trim().to_string();
        }

        if let Some(port) = lookup("PORT") {
            self.server.port = port.trim().parse().map_err(|_| ConfigError::InvalidValue {
                field: "PORT".to_string(),
                message: format!("not a valid port: {}", port),
            })?;
        }

        if let Some(reload) = lookup("RELOAD") {
            self.server.reload = parse_flag(&reload).ok_or_else(|| ConfigError::InvalidValue {
                field: "RELOAD".to_string(),
                message: format!("expected a boolean, got {}", reload),
            })?;
        }

        Ok(())
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.validate_openai()?;
        self.validate_tts()?;
        self.validate_agent()?;
        Ok(())
    }

    fn validate_server(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.port".to_string(),
                message: "Port cannot be 0".to_string(),
            });
        }

        if self.server.host.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "server.host".to_string(),
                message: "Host cannot be empty".to_string(),
            });
        }

        Ok(())
    }

    fn validate_openai(&self) -> Result<(), ConfigError> {
        if self.openai.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "openai.timeout_secs".to_string(),
                message: "Remote calls need a bounded, non-zero timeout".to_string(),
            });
        }

        if !self.openai.endpoint.starts_with("http://") && !self.openai.endpoint.starts_with("https://") {
            return Err(ConfigError::InvalidValue {
                field: "openai.endpoint".to_string(),
                message: format!("Expected an http(s) URL, got {}", self.openai.endpoint),
            });
        }

        Ok(())
    }

    fn validate_tts(&self) -> Result<(), ConfigError> {
        for (field, speed) in [
            ("tts.english_speed", self.tts.english_speed),
            ("tts.spanish_speed", self.tts.spanish_speed),
        ] {
            if !(0.25..=4.0).contains(&speed) {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    message: format!("Must be between 0.25 and 4.0, got {}", speed),
                });
            }
        }
        Ok(())
    }

    fn validate_agent(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.agent.temperature) {
            return Err(ConfigError::InvalidValue {
                field: "agent.temperature".to_string(),
                message: format!("Must be between 0.0 and 2.0, got {}", self.agent.temperature),
            });
        }

        if self.agent.max_tokens == 0 {
            return Err(ConfigError::InvalidValue {
                field: "agent.max_tokens".to_string(),
                message: "Must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Dev-mode auto-restart toggle (honoured by the process supervisor)
    #[serde(default)]
    pub reload: bool,

    /// Directory holding index.html and other browser assets
    #[serde(default = "default_static_dir")]
    pub static_dir: String,

    /// Enable CORS restrictions
    #[serde(default)]
    pub cors_enabled: bool,

    /// CORS allowed origins
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Text frames buffered while a turn is in flight
    #[serde(default = "default_max_pending")]
    pub max_pending_messages: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_static_dir() -> String {
    "static".to_string()
}
fn default_max_pending() -> usize {
    8
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            reload: false,
            static_dir: default_static_dir(),
            cors_enabled: false,
            cors_origins: Vec::new(),
            max_pending_messages: default_max_pending(),
        }
    }
}

/// Remote model endpoints and credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// API key; absence degrades to canned-response-only mode
    #[serde(default)]
    pub api_key: Option<String>,

    /// API base URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Model used for replies
    #[serde(default = "default_chat_model")]
    pub chat_model: String,

    /// Model used by the guardrails
    #[serde(default = "default_moderation_model")]
    pub moderation_model: String,

    /// Model used for translation
    #[serde(default = "default_translation_model")]
    pub translation_model: String,

    /// Model used for ambiguous language detection
    #[serde(default = "default_detection_model")]
    pub detection_model: String,

    /// Model used by /transcribe
    #[serde(default = "default_transcription_model")]
    pub transcription_model: String,

    /// Per-call timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_chat_model() -> String {
    "gpt-4".to_string()
}
fn default_moderation_model() -> String {
    "gpt-4".to_string()
}
fn default_translation_model() -> String {
    "gpt-4-turbo".to_string()
}
fn default_detection_model() -> String {
    "gpt-3.5-turbo".to_string()
}
fn default_transcription_model() -> String {
    "whisper-1".to_string()
}
fn default_timeout_secs() -> u64 {
    15
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: default_endpoint(),
            chat_model: default_chat_model(),
            moderation_model: default_moderation_model(),
            translation_model: default_translation_model(),
            detection_model: default_detection_model(),
            transcription_model: default_transcription_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl OpenAiConfig {
    /// Non-empty API key, if configured
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }

    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }
}

/// Speech synthesis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_tts_model")]
    pub model: String,

    /// Audio container returned by the endpoint
    #[serde(default = "default_tts_format")]
    pub format: String,

    #[serde(default = "default_english_voice")]
    pub english_voice: String,

    #[serde(default = "default_english_speed")]
    pub english_speed: f32,

    #[serde(default = "default_spanish_voice")]
    pub spanish_voice: String,

    #[serde(default = "default_spanish_speed")]
    pub spanish_speed: f32,

    /// Replaces the per-language voice when set (`TTS_VOICE`)
    #[serde(default)]
    pub voice_override: Option<String>,
}

fn default_true() -> bool {
    true
}
fn default_tts_model() -> String {
    "tts-1-hd".to_string()
}
fn default_tts_format() -> String {
    "mp3".to_string()
}
fn default_english_voice() -> String {
    "sage".to_string()
}
fn default_english_speed() -> f32 {
    0.95
}
fn default_spanish_voice() -> String {
    "nova".to_string()
}
fn default_spanish_speed() -> f32 {
    0.92
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            model: default_tts_model(),
            format: default_tts_format(),
            english_voice: default_english_voice(),
            english_speed: default_english_speed(),
            spanish_voice: default_spanish_voice(),
            spanish_speed: default_spanish_speed(),
            voice_override: None,
        }
    }
}

/// What the guardrails do when the moderation call itself fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SafetyPolicy {
    /// Treat the message as safe and carry on
    #[default]
    FailOpen,
    /// Treat the message as unsafe and substitute the rejection text
    FailClosed,
}

/// Guardrail configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub policy: SafetyPolicy,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            policy: SafetyPolicy::FailOpen,
        }
    }
}

/// Reply generation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Prior user and assistant turns (each) sent with a chat request.
    /// 0 sends the user text as the sole message.
    #[serde(default)]
    pub context_turns: usize,

    /// Messages up to this many characters keep the previous non-pivot language
    #[serde(default = "default_sticky_max_chars")]
    pub sticky_max_chars: usize,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    #[serde(default = "default_presence_penalty")]
    pub presence_penalty: f32,

    #[serde(default = "default_frequency_penalty")]
    pub frequency_penalty: f32,
}

fn default_sticky_max_chars() -> usize {
    15
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> usize {
    150
}
fn default_presence_penalty() -> f32 {
    0.6
}
fn default_frequency_penalty() -> f32 {
    0.2
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            context_turns: 0,
            sticky_max_chars: default_sticky_max_chars(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            presence_penalty: default_presence_penalty(),
            frequency_penalty: default_frequency_penalty(),
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub log_json: bool,

    /// Expose Prometheus metrics at /metrics
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
            metrics_enabled: true,
        }
    }
}

/// Load settings from `config/`, the environment and the flat overrides
///
/// Priority: flat vars > `SNOW_PAWS__*` > config/{env} > config/default > defaults
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    load_settings_from(Path::new("config"), env)
}

/// Same as [`load_settings`] with an explicit configuration directory
pub fn load_settings_from(config_dir: &Path, env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    // Load default config
    let default_path = config_dir.join("default");
    builder = builder.add_source(File::with_name(&default_path.to_string_lossy()).required(false));

    // Load environment-specific config
    if let Some(env_name) = env {
        let env_path = config_dir.join(env_name);
        builder = builder.add_source(File::with_name(&env_path.to_string_lossy()).required(false));
    }

    // Load from environment variables
    builder = builder.add_source(
        Environment::with_prefix("SNOW_PAWS")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let mut settings: Settings = config.try_deserialize()?;

    settings.apply_env_overrides(|key| std::env::var(key).ok())?;

    // Validate
    settings.validate()?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.openai.timeout_secs, 15);
        assert_eq!(settings.tts.model, "tts-1-hd");
        assert_eq!(settings.safety.policy, SafetyPolicy::FailOpen);
        assert_eq!(settings.agent.context_turns, 0);
        assert!(!settings.remote_enabled());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let mut settings = Settings::default();
        settings
            .apply_env_overrides(lookup(&[
                ("OPENAI_API_KEY", "sk-test"),
                ("TTS_VOICE", "shimmer"),
                ("PORT", "9000"),
                ("HOST", "127.0.0.1"),
                ("RELOAD", "true"),
            ]))
            .unwrap();

        assert!(settings.remote_enabled());
        assert_eq!(settings.openai.api_key(), Some("sk-test"));
        assert_eq!(settings.tts.voice_override.as_deref(), Some("shimmer"));
        assert_eq!(settings.server.port, 9000);
        assert_eq!(settings.server.host, "127.0.0.1");
        assert!(settings.server.reload);
    }

    #[test]
    fn test_blank_api_key_keeps_canned_mode() {
        let mut settings = Settings::default();
        settings
            .apply_env_overrides(lookup(&[("OPENAI_API_KEY", "   ")]))
            .unwrap();
        assert!(!settings.remote_enabled());
    }

    #[test]
    fn test_invalid_port_override() {
        let mut settings = Settings::default();
        let result = settings.apply_env_overrides(lookup(&[("PORT", "eighty")]));
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_invalid_reload_override() {
        let mut settings = Settings::default();
        assert!(settings
            .apply_env_overrides(lookup(&[("RELOAD", "maybe")]))
            .is_err());
    }

    #[test]
    fn test_server_validation() {
        let mut settings = Settings::default();
        settings.server.port = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_timeout_validation() {
        let mut settings = Settings::default();
        settings.openai.timeout_secs = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_tts_speed_validation() {
        let mut settings = Settings::default();
        settings.tts.spanish_speed = 5.0;
        assert!(settings.validate().is_err());

        settings.tts.spanish_speed = 0.92;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_agent_validation() {
        let mut settings = Settings::default();
        settings.agent.temperature = 3.0;
        assert!(settings.validate().is_err());

        settings.agent.temperature = 0.7;
        settings.agent.max_tokens = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("default.toml"),
            r#"
[server]
static_dir = "public"

[safety]
policy = "fail_closed"

[agent]
context_turns = 2
"#,
        )
        .unwrap();

        let settings = load_settings_from(dir.path(), None).unwrap();
        assert_eq!(settings.server.static_dir, "public");
        assert_eq!(settings.safety.policy, SafetyPolicy::FailClosed);
        assert_eq!(settings.agent.context_turns, 2);
        // Untouched sections keep their defaults
        assert_eq!(settings.tts.spanish_voice, "nova");
    }

    #[test]
    fn test_env_specific_file_overrides_default() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("default.toml"), "[tts]\nenglish_voice = \"sage\"\n").unwrap();
        std::fs::write(dir.path().join("staging.toml"), "[tts]\nenglish_voice = \"shimmer\"\n").unwrap();

        let settings = load_settings_from(dir.path(), Some("staging")).unwrap();
        assert_eq!(settings.tts.english_voice, "shimmer");
    }
}
