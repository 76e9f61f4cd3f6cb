//! Configuration management for Dr. Snow Paws
//!
//! Supports loading configuration from:
//! - TOML/YAML files under `config/`
//! - Environment variables (`SNOW_PAWS__` prefix)
//! - The flat variables the deployment scripts already use
//!   (`OPENAI_API_KEY`, `TTS_VOICE`, `PORT`, `HOST`, `RELOAD`)
//!
//! The persona prompt and canned response table live in [`persona`].

pub mod persona;
pub mod settings;

pub use persona::{CannedResponse, LocalizedText, Persona};
pub use settings::{
    load_settings, load_settings_from, AgentConfig, ObservabilityConfig, OpenAiConfig,
    SafetyConfig, SafetyPolicy, ServerConfig, Settings, TtsConfig,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Environment error: {0}")]
    Environment(String),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

impl From<ConfigError> for snow_paws_core::Error {
    fn from(err: ConfigError) -> Self {
        snow_paws_core::Error::Config(err.to_string())
    }
}
