//! Translation to and from the pivot language

use async_trait::async_trait;
use std::sync::Arc;

use snow_paws_config::Settings;
use snow_paws_core::Language;
use snow_paws_llm::{GenerationOptions, LlmBackend, Message};

use crate::TextProcessingError;

const TO_PIVOT_PROMPT: &str = "Translate the following Spanish text to English. Preserve emojis, formatting, and proper nouns. Respond ONLY with the translation.";

const TO_SPANISH_PROMPT: &str = r#"Translate the following English text to natural, fluent Spanish suitable for children.
Important guidelines:
1. Maintain a consistent, child-friendly tone throughout
2. Preserve all emojis exactly as they appear
3. Keep any *actions* or special formatting unchanged
4. Use proper Spanish punctuation (¿, ¡)
5. Use appropriate accents on Spanish words
6. Ensure the translation sounds native and NOT machine-translated
7. Maintain the same level of enthusiasm throughout the message

Respond ONLY with the Spanish translation."#;

/// Moves text between a session language and the pivot language
///
/// Implementations never fail a turn: on any error the input comes back
/// unchanged.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate `text` written in `source` into the pivot language
    async fn to_pivot(&self, text: &str, source: Language) -> String;

    /// Translate pivot-language `text` into `target`
    async fn from_pivot(&self, text: &str, target: Language) -> String;

    fn name(&self) -> &str;
}

/// Translator backed by a chat-completion model
#[derive(Clone)]
pub struct LlmTranslator {
    backend: Arc<dyn LlmBackend>,
    options: GenerationOptions,
}

impl LlmTranslator {
    pub fn new(backend: Arc<dyn LlmBackend>, options: GenerationOptions) -> Self {
        Self { backend, options }
    }

    pub fn options_from_settings(settings: &Settings) -> GenerationOptions {
        GenerationOptions::new()
            .with_model(settings.openai.translation_model.clone())
            .with_temperature(0.3)
            .with_max_tokens(300)
            .with_timeout(settings.openai.timeout())
    }

    async fn translate(&self, prompt: &str, text: &str) -> Result<String, TextProcessingError> {
        let messages = [Message::system(prompt), Message::user(text)];
        let result = self.backend.generate(&messages, &self.options).await?;
        let translated = result.text.trim();
        if translated.is_empty() {
            return Err(TextProcessingError::UnexpectedOutput(
                "empty translation".to_string(),
            ));
        }
        Ok(translated.to_string())
    }

    fn prompt_from_pivot(target: Language) -> &'static str {
        match target {
            Language::Spanish => TO_SPANISH_PROMPT,
            Language::English => TO_PIVOT_PROMPT,
        }
    }
}

#[async_trait]
impl Translator for LlmTranslator {
    async fn to_pivot(&self, text: &str, source: Language) -> String {
        if source.is_pivot() || text.trim().is_empty() {
            return text.to_string();
        }
        match self.translate(TO_PIVOT_PROMPT, text).await {
            Ok(translated) => translated,
            Err(e) => {
                tracing::warn!(error = %e, source = %source, "Translation to pivot failed");
                text.to_string()
            }
        }
    }

    async fn from_pivot(&self, text: &str, target: Language) -> String {
        if target.is_pivot() || text.trim().is_empty() {
            return text.to_string();
        }
        match self.translate(Self::prompt_from_pivot(target), text).await {
            Ok(translated) => translated,
            Err(e) => {
                tracing::warn!(error = %e, target = %target, "Translation from pivot failed");
                text.to_string()
            }
        }
    }

    fn name(&self) -> &str {
        self.backend.model_name()
    }
}

/// Identity translator, used when no remote model is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTranslator;

#[async_trait]
impl Translator for NoopTranslator {
    async fn to_pivot(&self, text: &str, _source: Language) -> String {
        text.to_string()
    }

    async fn from_pivot(&self, text: &str, _target: Language) -> String {
        text.to_string()
    }

    fn name(&self) -> &str {
        "noop"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snow_paws_llm::MockBackend;

    #[tokio::test]
    async fn test_pivot_language_is_noop() {
        let backend = MockBackend::fixed("should not be used");
        let translator = LlmTranslator::new(Arc::new(backend.clone()), GenerationOptions::new());

        assert_eq!(translator.to_pivot("hello", Language::English).await, "hello");
        assert_eq!(translator.from_pivot("hello", Language::English).await, "hello");
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_spanish_round_trip_prompts() {
        let backend = MockBackend::new(|messages, _| {
            if messages[0].content.starts_with("Translate the following Spanish") {
                Ok("I feel sick".to_string())
            } else {
                Ok("  *mueve la pata* ¡Hola!  ".to_string())
            }
        });
        let translator = LlmTranslator::new(Arc::new(backend.clone()), GenerationOptions::new());

        assert_eq!(
            translator.to_pivot("me siento enfermo", Language::Spanish).await,
            "I feel sick"
        );
        assert_eq!(
            translator.from_pivot("*waves paw* Hello!", Language::Spanish).await,
            "*mueve la pata* ¡Hola!"
        );

        let calls = backend.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[1].messages[0].content.contains("Use proper Spanish punctuation"));
        assert_eq!(calls[1].messages[1].content, "*waves paw* Hello!");
    }

    #[tokio::test]
    async fn test_failure_returns_input() {
        let translator = LlmTranslator::new(Arc::new(MockBackend::failing()), GenerationOptions::new());
        assert_eq!(
            translator.from_pivot("Hello friend", Language::Spanish).await,
            "Hello friend"
        );
        assert_eq!(translator.to_pivot("hola", Language::Spanish).await, "hola");
    }

    #[tokio::test]
    async fn test_empty_output_returns_input() {
        let translator = LlmTranslator::new(Arc::new(MockBackend::fixed("   ")), GenerationOptions::new());
        assert_eq!(
            translator.from_pivot("Hello friend", Language::Spanish).await,
            "Hello friend"
        );
    }

    #[tokio::test]
    async fn test_noop_round_trip() {
        let translator = NoopTranslator;
        let text = "*waves paw* ¡Hola! 🐾";
        let pivot = translator.to_pivot(text, Language::Spanish).await;
        assert_eq!(translator.from_pivot(&pivot, Language::Spanish).await, text);
    }
}
