//! Reply generation
//!
//! Resolution order for a pivot-language message:
//! 1. First canned entry whose keyword appears in the text
//! 2. Chat-completion call with the persona prompt
//! 3. Fixed fallback: timeout filler on timeout, apology on any other
//!    failure, default reply when no model is configured

use std::sync::Arc;
use std::time::Instant;

use snow_paws_config::{LocalizedText, Persona, Settings};
use snow_paws_core::{Emotion, Language, Turn, TurnRole};
use snow_paws_llm::{GenerationOptions, LlmBackend, Message};

/// Where a reply came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplySource {
    Canned,
    Model,
    Default,
    TimeoutFallback,
    ErrorFallback,
    Emergency,
    Rejected,
}

impl ReplySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReplySource::Canned => "canned",
            ReplySource::Model => "model",
            ReplySource::Default => "default",
            ReplySource::TimeoutFallback => "timeout",
            ReplySource::ErrorFallback => "error",
            ReplySource::Emergency => "emergency",
            ReplySource::Rejected => "rejected",
        }
    }

    /// Emotion fixed by the source, bypassing classification
    pub fn fixed_emotion(&self) -> Option<Emotion> {
        match self {
            ReplySource::TimeoutFallback => Some(Emotion::Listening),
            ReplySource::ErrorFallback | ReplySource::Emergency => Some(Emotion::Caring),
            _ => None,
        }
    }

    /// Whether the reply is a degraded stand-in for a model answer
    pub fn is_fallback(&self) -> bool {
        matches!(
            self,
            ReplySource::TimeoutFallback | ReplySource::ErrorFallback
        )
    }
}

/// Generated reply text
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub text: String,
    /// Pivot-language form, recorded in the session history
    pub pivot: String,
    pub source: ReplySource,
    /// Already in the turn language; translation back is skipped
    pub localized: bool,
}

impl Reply {
    /// Reply from one of the persona's fixed texts
    pub fn fixed(text: &LocalizedText, language: Language, source: ReplySource) -> Self {
        let pivot = text.en.clone();
        let (text, localized) = text.for_language(language);
        Self {
            text: text.to_string(),
            pivot,
            source,
            localized,
        }
    }
}

/// Produces the bot's reply for one message
#[derive(Clone)]
pub struct ResponseGenerator {
    persona: Arc<Persona>,
    backend: Option<Arc<dyn LlmBackend>>,
    options: GenerationOptions,
    context_turns: usize,
}

impl ResponseGenerator {
    pub fn new(persona: Arc<Persona>, backend: Arc<dyn LlmBackend>, options: GenerationOptions) -> Self {
        Self {
            persona,
            backend: Some(backend),
            options,
            context_turns: 0,
        }
    }

    /// Canned table and default reply only
    pub fn canned_only(persona: Arc<Persona>) -> Self {
        Self {
            persona,
            backend: None,
            options: GenerationOptions::default(),
            context_turns: 0,
        }
    }

    /// Include up to `turns` prior user and `turns` prior assistant turns
    pub fn with_context_turns(mut self, turns: usize) -> Self {
        self.context_turns = turns;
        self
    }

    /// Chat options: short, warm, mildly penalised against repetition
    pub fn options_from_settings(settings: &Settings) -> GenerationOptions {
        GenerationOptions::new()
            .with_model(settings.openai.chat_model.clone())
            .with_temperature(settings.agent.temperature)
            .with_max_tokens(settings.agent.max_tokens)
            .with_penalties(
                settings.agent.presence_penalty,
                settings.agent.frequency_penalty,
            )
            .with_timeout(settings.openai.timeout())
    }

    pub fn persona(&self) -> &Persona {
        &self.persona
    }

    pub fn has_model(&self) -> bool {
        self.backend.is_some()
    }

    /// Reply to `text` (pivot language) for a session speaking `language`
    pub async fn generate(&self, text: &str, language: Language, history: &[Turn]) -> Reply {
        if let Some(entry) = self.persona.find_canned(text) {
            tracing::debug!(keyword = %entry.keyword, "Canned response matched");
            return Reply::fixed(&entry.reply, language, ReplySource::Canned);
        }

        let Some(backend) = self.backend.as_ref() else {
            return Reply::fixed(&self.persona.default_reply, language, ReplySource::Default);
        };

        let messages = self.build_messages(text, history);
        let start = Instant::now();
        match backend.generate(&messages, &self.options).await {
            Ok(result) if !result.text.trim().is_empty() => {
                tracing::debug!(
                    tokens = result.tokens,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Chat completion finished"
                );
                let text = result.text.trim().to_string();
                Reply {
                    pivot: text.clone(),
                    text,
                    source: ReplySource::Model,
                    localized: language.is_pivot(),
                }
            }
            Ok(_) => {
                tracing::warn!("Chat completion returned empty text");
                Reply::fixed(&self.persona.apology, language, ReplySource::ErrorFallback)
            }
            Err(e) if e.is_timeout() => {
                tracing::warn!(
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Chat completion timed out"
                );
                Reply::fixed(
                    &self.persona.timeout_filler,
                    language,
                    ReplySource::TimeoutFallback,
                )
            }
            Err(e) => {
                tracing::error!(error = %e, "Chat completion failed");
                Reply::fixed(&self.persona.apology, language, ReplySource::ErrorFallback)
            }
        }
    }

    fn build_messages(&self, text: &str, history: &[Turn]) -> Vec<Message> {
        let mut messages = vec![Message::system(self.persona.system_prompt.clone())];
        messages.extend(recent_turns(history, self.context_turns).map(Message::from));
        messages.push(Message::user(text));
        messages
    }
}

/// The last `limit` user turns and last `limit` assistant turns, in order
fn recent_turns(history: &[Turn], limit: usize) -> impl Iterator<Item = &Turn> {
    let (mut users, mut assistants) = (0, 0);
    let mut keep = vec![false; history.len()];
    for (i, turn) in history.iter().enumerate().rev() {
        let count = match turn.role {
            TurnRole::User => &mut users,
            TurnRole::Assistant => &mut assistants,
        };
        if *count < limit {
            *count += 1;
            keep[i] = true;
        }
    }
    history
        .iter()
        .zip(keep)
        .filter_map(|(turn, keep)| keep.then_some(turn))
}
