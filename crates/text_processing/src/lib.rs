//! Text processing for the chat pipeline
//!
//! - Language detection (lexical heuristics, remote fallback)
//! - Translation to and from the pivot language
//! - Guardrails (input/output moderation, emergency phrases)
//! - Emotion classification by keyword priority
//!
//! Every remote-backed component degrades locally: a failed call yields
//! the pivot language, the untranslated text, or the configured safety
//! policy. Nothing here returns a remote error to the caller.

pub mod emotion;
pub mod language;
pub mod safety;
pub mod translation;
mod words;

pub use emotion::EmotionClassifier;
pub use language::{LanguageDetector, StickyLanguage};
pub use safety::{is_emergency, SafetyFilter};
pub use translation::{LlmTranslator, NoopTranslator, Translator};

use thiserror::Error;

/// Text processing errors
#[derive(Error, Debug)]
pub enum TextProcessingError {
    #[error("Remote call failed: {0}")]
    Remote(String),

    #[error("Unexpected model output: {0}")]
    UnexpectedOutput(String),
}

impl From<snow_paws_llm::LlmError> for TextProcessingError {
    fn from(err: snow_paws_llm::LlmError) -> Self {
        TextProcessingError::Remote(err.to_string())
    }
}

impl From<TextProcessingError> for snow_paws_core::Error {
    fn from(err: TextProcessingError) -> Self {
        snow_paws_core::Error::TextProcessing(err.to_string())
    }
}
