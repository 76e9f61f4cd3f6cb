//! Chat-completion integration
//!
//! Features:
//! - `LlmBackend` trait so every remote stage can be stubbed
//! - OpenAI chat-completions backend
//! - Per-call generation options (model, temperature, token budget, timeout)

pub mod backend;
#[cfg(any(test, feature = "testing"))]
pub mod mock;
pub mod prompt;

pub use backend::{GenerationOptions, GenerationResult, LlmBackend, OpenAIBackend, OpenAIConfig};
#[cfg(any(test, feature = "testing"))]
pub use mock::MockBackend;
pub use prompt::{Message, Role};

use thiserror::Error;

/// LLM errors
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Generation error: {0}")]
    Generation(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout")]
    Timeout,

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl LlmError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, LlmError::Timeout)
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Network(err.to_string())
        }
    }
}

impl From<LlmError> for snow_paws_core::Error {
    fn from(err: LlmError) -> Self {
        snow_paws_core::Error::Llm(err.to_string())
    }
}
