//! Input/output guardrails
//!
//! Both checks go through a remote moderation model. What happens when the
//! moderation call itself fails is decided by [`SafetyPolicy`]: fail-open
//! passes the text through, fail-closed substitutes the rejection reply.

use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

use snow_paws_config::{LocalizedText, SafetyPolicy, Settings};
use snow_paws_core::Language;
use snow_paws_llm::{GenerationOptions, LlmBackend, Message};

const INPUT_PROMPT: &str = r#"You are a content safety filter for a children's medical chatbot.
Analyze the input for:
1. Inappropriate content
2. Adult themes
3. Harmful instructions
4. Personal information

If the content is safe, return "SAFE: " followed by the original text.
If unsafe, return "UNSAFE: " with a child-friendly explanation of why it can't be answered."#;

const OUTPUT_PROMPT: &str = r#"You are a content safety filter for a children's medical chatbot.
Analyze the output for:
1. Age-appropriate language and concepts
2. Comforting and reassuring tone
3. No medical advice beyond basic wellness
4. No personal information

If safe, return "SAFE: " followed by the original text.
If unsafe, return a rewritten child-friendly version."#;

const SAFE_PREFIX: &str = "SAFE:";
const UNSAFE_PREFIX: &str = "UNSAFE:";

/// Phrases that need a grown-up right away, English and Spanish
static EMERGENCY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b911\b|\bemergenc(y|ia)\b|\bcan[’']?t breathe\b|\bcannot breathe\b|\bno puedo respirar\b|\bhurt(ing)? myself\b|\bkill myself\b|\bsuicide\b|\bsuicidio\b|\bbleeding a lot\b|\boverdose\b|\blastimarme\b",
    )
    .expect("valid emergency regex")
});

/// Whether `text` mentions an emergency
pub fn is_emergency(text: &str) -> bool {
    EMERGENCY.is_match(text)
}

/// Moderation for user input and model output
#[derive(Clone)]
pub struct SafetyFilter {
    backend: Option<Arc<dyn LlmBackend>>,
    policy: SafetyPolicy,
    input_options: GenerationOptions,
    output_options: GenerationOptions,
    rejection: LocalizedText,
}

impl SafetyFilter {
    pub fn new(
        backend: Arc<dyn LlmBackend>,
        policy: SafetyPolicy,
        options: GenerationOptions,
        rejection: LocalizedText,
    ) -> Self {
        Self {
            backend: Some(backend),
            policy,
            input_options: options.clone().with_max_tokens(100),
            output_options: options.with_max_tokens(200),
            rejection,
        }
    }

    /// Filter that lets everything through
    pub fn disabled(rejection: LocalizedText) -> Self {
        Self {
            backend: None,
            policy: SafetyPolicy::FailOpen,
            input_options: GenerationOptions::default(),
            output_options: GenerationOptions::default(),
            rejection,
        }
    }

    /// Moderation model options, deterministic
    pub fn options_from_settings(settings: &Settings) -> GenerationOptions {
        GenerationOptions::new()
            .with_model(settings.openai.moderation_model.clone())
            .with_temperature(0.0)
            .with_timeout(settings.openai.timeout())
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    pub fn policy(&self) -> SafetyPolicy {
        self.policy
    }

    /// Rejection reply for `language`, plus whether it is already localized
    pub fn rejection_for(&self, language: Language) -> (&str, bool) {
        self.rejection.for_language(language)
    }

    /// Classify user input
    ///
    /// Returns `(true, text)` when the input may proceed and
    /// `(false, rejection)` when it must not.
    pub async fn check_input(&self, text: &str) -> (bool, String) {
        let Some(backend) = self.backend.as_ref() else {
            return (true, text.to_string());
        };

        let messages = [Message::system(INPUT_PROMPT), Message::user(text)];
        match backend.generate(&messages, &self.input_options).await {
            Ok(result) if result.text.trim_start().starts_with(SAFE_PREFIX) => {
                (true, text.to_string())
            }
            Ok(_) => {
                tracing::info!("Input rejected by moderation");
                (false, self.rejection.en.clone())
            }
            Err(e) => {
                tracing::warn!(error = %e, policy = ?self.policy, "Input moderation failed");
                match self.policy {
                    SafetyPolicy::FailOpen => (true, text.to_string()),
                    SafetyPolicy::FailClosed => (false, self.rejection.en.clone()),
                }
            }
        }
    }

    /// Review a reply, returning it unchanged or a rewritten version
    pub async fn check_output(&self, reply: &str, original_input: &str) -> String {
        let Some(backend) = self.backend.as_ref() else {
            return reply.to_string();
        };

        let messages = [
            Message::system(OUTPUT_PROMPT),
            Message::user(format!("Input: {}\nOutput: {}", original_input, reply)),
        ];
        match backend.generate(&messages, &self.output_options).await {
            Ok(result) => match parse_verdict(&result.text) {
                Ok(()) => reply.to_string(),
                Err(rewritten) if !rewritten.is_empty() => {
                    tracing::info!("Reply rewritten by moderation");
                    rewritten
                }
                Err(_) => self.rejection.en.clone(),
            },
            Err(e) => {
                tracing::warn!(error = %e, policy = ?self.policy, "Output moderation failed");
                match self.policy {
                    SafetyPolicy::FailOpen => reply.to_string(),
                    SafetyPolicy::FailClosed => self.rejection.en.clone(),
                }
            }
        }
    }
}

/// `Ok` for a SAFE verdict, otherwise the rewrite with any UNSAFE prefix removed
fn parse_verdict(output: &str) -> Result<(), String> {
    let output = output.trim();
    if output.starts_with(SAFE_PREFIX) {
        return Ok(());
    }
    let rewritten = output.strip_prefix(UNSAFE_PREFIX).unwrap_or(output).trim();
    Err(rewritten.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use snow_paws_config::Persona;
    use snow_paws_llm::{LlmError, MockBackend};

    fn filter(backend: MockBackend, policy: SafetyPolicy) -> SafetyFilter {
        SafetyFilter::new(
            Arc::new(backend),
            policy,
            GenerationOptions::new().with_temperature(0.0),
            Persona::snow_paws().rejection,
        )
    }

    #[test]
    fn test_emergency_phrases() {
        assert!(is_emergency("I can't breathe"));
        assert!(is_emergency("call 911 please"));
        assert!(is_emergency("Es una EMERGENCIA"));
        assert!(is_emergency("no puedo respirar"));
        assert!(is_emergency("I want to hurt myself"));
        assert!(!is_emergency("my teddy is hurt"));
        assert!(!is_emergency("I breathe slowly when I relax"));
    }

    #[tokio::test]
    async fn test_safe_input_passes() {
        let backend = MockBackend::fixed("SAFE: tell me a story");
        let f = filter(backend.clone(), SafetyPolicy::FailOpen);

        assert_eq!(
            f.check_input("tell me a story").await,
            (true, "tell me a story".to_string())
        );
        let calls = backend.calls();
        let call = &calls[0];
        assert_eq!(call.options.max_tokens, Some(100));
        assert_eq!(call.messages[1].content, "tell me a story");
    }

    #[tokio::test]
    async fn test_unsafe_input_rejected() {
        let f = filter(MockBackend::fixed("UNSAFE: not for kids"), SafetyPolicy::FailOpen);
        let (allowed, text) = f.check_input("something bad").await;
        assert!(!allowed);
        assert!(text.starts_with("*adjusts glasses*"));
    }

    #[tokio::test]
    async fn test_input_failure_follows_policy() {
        let open = filter(MockBackend::failing(), SafetyPolicy::FailOpen);
        assert_eq!(open.check_input("hi").await, (true, "hi".to_string()));

        let closed = filter(MockBackend::failing(), SafetyPolicy::FailClosed);
        let (allowed, text) = closed.check_input("hi").await;
        assert!(!allowed);
        assert_eq!(text, Persona::snow_paws().rejection.en);
    }

    #[tokio::test]
    async fn test_output_rewrite() {
        let backend = MockBackend::fixed("UNSAFE: *smiles* Let's talk about snow!");
        let f = filter(backend.clone(), SafetyPolicy::FailOpen);

        let out = f.check_output("scary thing", "tell me").await;
        assert_eq!(out, "*smiles* Let's talk about snow!");

        let calls = backend.calls();
        let call = &calls[0];
        assert_eq!(call.options.max_tokens, Some(200));
        assert_eq!(call.messages[1].content, "Input: tell me\nOutput: scary thing");
    }

    #[tokio::test]
    async fn test_output_safe_returns_original() {
        let f = filter(MockBackend::fixed("SAFE: whatever"), SafetyPolicy::FailOpen);
        assert_eq!(f.check_output("Nice reply", "hi").await, "Nice reply");
    }

    #[tokio::test]
    async fn test_output_failure_follows_policy() {
        let open = filter(
            MockBackend::new(|_, _| Err(LlmError::Timeout)),
            SafetyPolicy::FailOpen,
        );
        assert_eq!(open.check_output("Nice reply", "hi").await, "Nice reply");

        let closed = filter(MockBackend::failing(), SafetyPolicy::FailClosed);
        assert_eq!(
            closed.check_output("Nice reply", "hi").await,
            Persona::snow_paws().rejection.en
        );
    }

    #[tokio::test]
    async fn test_empty_rewrite_uses_rejection() {
        let f = filter(MockBackend::fixed("UNSAFE:"), SafetyPolicy::FailOpen);
        assert_eq!(
            f.check_output("bad", "hi").await,
            Persona::snow_paws().rejection.en
        );
    }

    #[tokio::test]
    async fn test_disabled_passthrough() {
        let f = SafetyFilter::disabled(Persona::snow_paws().rejection);
        assert!(!f.is_enabled());
        assert_eq!(f.check_input("x").await, (true, "x".to_string()));
        assert_eq!(f.check_output("y", "x").await, "y");
    }
}
