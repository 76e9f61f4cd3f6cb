//! Language detection for English/Spanish chat messages
//!
//! Resolution order:
//! 1. Spanish accent or inverted punctuation present → Spanish
//! 2. Common-word counts, strictly higher count wins
//! 3. One remote classification call, pivot language on any failure

use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::sync::Arc;

use snow_paws_config::Settings;
use snow_paws_core::Language;
use snow_paws_llm::{GenerationOptions, LlmBackend, Message};

use crate::words::words;
use crate::TextProcessingError;

const SPANISH_MARKS: &[char] = &['á', 'é', 'í', 'ó', 'ú', 'ü', 'ñ', '¿', '¡'];

static COMMON_SPANISH: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "hola", "si", "gracias", "adios", "como", "que", "donde", "porque", "cuando", "quien",
        "cual", "esto", "esta", "ese", "esa", "mi", "tu", "su", "nuestro", "y", "o", "pero",
        "para", "con", "sin", "de", "el", "la", "los", "las", "soy", "estoy", "tengo", "quiero",
        "me", "gusta", "bien", "mal", "muy", "cuento", "amigo", "buenos", "buenas", "noches",
    ]
    .into_iter()
    .collect()
});

static COMMON_ENGLISH: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "hi", "hey", "hello", "yes", "ok", "okay", "thanks", "thank", "bye", "goodbye",
        "please", "good", "morning", "night", "what", "when", "where", "why", "who", "which",
        "how", "this", "that", "these", "those", "my", "your", "our", "their", "and", "or",
        "but", "for", "with", "without", "of", "the", "a", "an", "i", "am", "is", "are", "you",
        "story", "feel", "want",
    ]
    .into_iter()
    .collect()
});

const DETECTION_PROMPT: &str =
    "You are a language detector. Respond ONLY with 'en' for English or 'es' for Spanish.";

/// Classifies a message as English or Spanish
#[derive(Clone)]
pub struct LanguageDetector {
    backend: Option<Arc<dyn LlmBackend>>,
    options: GenerationOptions,
}

impl LanguageDetector {
    /// Detector backed by a remote model for ambiguous input
    pub fn new(backend: Arc<dyn LlmBackend>, options: GenerationOptions) -> Self {
        Self {
            backend: Some(backend),
            options,
        }
    }

    /// Heuristics only; ambiguous input resolves to the pivot language
    pub fn lexical_only() -> Self {
        Self {
            backend: None,
            options: GenerationOptions::default(),
        }
    }

    /// Remote options for detection: one token, deterministic
    pub fn options_from_settings(settings: &Settings) -> GenerationOptions {
        GenerationOptions::new()
            .with_model(settings.openai.detection_model.clone())
            .with_temperature(0.0)
            .with_max_tokens(1)
            .with_timeout(settings.openai.timeout())
    }

    /// Lexical heuristics; `None` when the signal is a tie
    pub fn detect_lexical(text: &str) -> Option<Language> {
        let lowered = text.to_lowercase();
        if lowered.chars().any(|c| SPANISH_MARKS.contains(&c)) {
            return Some(Language::Spanish);
        }

        let unique: HashSet<String> = words(&lowered).into_iter().collect();
        let spanish = unique
            .iter()
            .filter(|w| COMMON_SPANISH.contains(w.as_str()))
            .count();
        let english = unique
            .iter()
            .filter(|w| COMMON_ENGLISH.contains(w.as_str()))
            .count();

        match spanish.cmp(&english) {
            std::cmp::Ordering::Greater => Some(Language::Spanish),
            std::cmp::Ordering::Less => Some(Language::English),
            std::cmp::Ordering::Equal => None,
        }
    }

    /// Detect the language of `text`
    pub async fn detect(&self, text: &str) -> Language {
        if text.trim().is_empty() {
            return Language::PIVOT;
        }

        if let Some(language) = Self::detect_lexical(text) {
            return language;
        }

        match self.detect_remote(text).await {
            Ok(language) => language,
            Err(e) => {
                tracing::warn!(error = %e, "Remote language detection failed, using pivot");
                Language::PIVOT
            }
        }
    }

    async fn detect_remote(&self, text: &str) -> Result<Language, TextProcessingError> {
        let Some(backend) = self.backend.as_ref() else {
            return Ok(Language::PIVOT);
        };

        let messages = [
            Message::system(DETECTION_PROMPT),
            Message::user(format!(
                "Determine if this text is in English or Spanish and respond only with 'en' or 'es': {}",
                text
            )),
        ];
        let result = backend.generate(&messages, &self.options).await?;

        let code = result
            .text
            .trim()
            .trim_matches(|c: char| !c.is_alphabetic())
            .to_lowercase();
        Language::from_code(&code)
            .ok_or_else(|| TextProcessingError::UnexpectedOutput(result.text.clone()))
    }
}

/// Per-session language affinity
///
/// A short message after a non-pivot turn ("sí", "ok") keeps the previous
/// language instead of trusting detection on almost no signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StickyLanguage {
    max_chars: usize,
}

impl Default for StickyLanguage {
    fn default() -> Self {
        Self { max_chars: 15 }
    }
}

impl StickyLanguage {
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }

    /// Final language for this turn given the previous one
    pub fn resolve(&self, text: &str, detected: Language, previous: Option<Language>) -> Language {
        match previous {
            Some(prev) if !prev.is_pivot() && text.trim().chars().count() <= self.max_chars => prev,
            _ => detected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snow_paws_llm::{LlmError, MockBackend};

    #[test]
    fn test_accents_mean_spanish() {
        for text in ["¿qué pasa?", "¡ay!", "mañana", "canción"] {
            assert_eq!(LanguageDetector::detect_lexical(text), Some(Language::Spanish));
        }
    }

    #[test]
    fn test_word_counts() {
        assert_eq!(
            LanguageDetector::detect_lexical("hola amigo, me gusta el cuento"),
            Some(Language::Spanish)
        );
        assert_eq!(
            LanguageDetector::detect_lexical("hello, can you tell me a story"),
            Some(Language::English)
        );
    }

    #[test]
    fn test_tie_is_ambiguous() {
        // Neither word is in the common-word lists
        assert_eq!(LanguageDetector::detect_lexical("dinosaurio rex"), None);
    }

    #[tokio::test]
    async fn test_remote_fallback_used_on_tie() {
        let backend = Arc::new(MockBackend::fixed("es"));
        let detector = LanguageDetector::new(backend.clone(), GenerationOptions::new().with_max_tokens(1));

        assert_eq!(detector.detect("dinosaurio grande").await, Language::Spanish);
        assert_eq!(backend.call_count(), 1);
        assert_eq!(backend.calls()[0].options.max_tokens, Some(1));
    }

    #[tokio::test]
    async fn test_remote_not_called_when_lexical_decides() {
        let backend = Arc::new(MockBackend::fixed("es"));
        let detector = LanguageDetector::new(backend.clone(), GenerationOptions::new());

        assert_eq!(detector.detect("hello there").await, Language::English);
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_remote_failure_defaults_to_pivot() {
        let backend = Arc::new(MockBackend::new(|_, _| Err(LlmError::Timeout)));
        let detector = LanguageDetector::new(backend, GenerationOptions::new());
        assert_eq!(detector.detect("dinosaurio grande").await, Language::PIVOT);
    }

    #[tokio::test]
    async fn test_unexpected_code_defaults_to_pivot() {
        let detector = LanguageDetector::new(Arc::new(MockBackend::fixed("fr")), GenerationOptions::new());
        assert_eq!(detector.detect("bonjour mon ami").await, Language::PIVOT);
    }

    #[tokio::test]
    async fn test_lexical_only_and_empty_input() {
        let detector = LanguageDetector::lexical_only();
        assert_eq!(detector.detect("dinosaurio grande").await, Language::PIVOT);
        assert_eq!(detector.detect("   ").await, Language::PIVOT);
    }

    #[test]
    fn test_sticky_language() {
        let sticky = StickyLanguage::new(15);

        // Short acknowledgement after Spanish stays Spanish
        assert_eq!(
            sticky.resolve("ok", Language::English, Some(Language::Spanish)),
            Language::Spanish
        );
        // Long message trusts detection
        assert_eq!(
            sticky.resolve(
                "can you tell me about the moon",
                Language::English,
                Some(Language::Spanish)
            ),
            Language::English
        );
        // English history never forces anything
        assert_eq!(
            sticky.resolve("sí", Language::Spanish, Some(Language::English)),
            Language::Spanish
        );
        assert_eq!(sticky.resolve("ok", Language::English, None), Language::English);
    }
}
