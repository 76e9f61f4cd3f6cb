//! One inbound message in, one envelope out
//!
//! Stages, in order:
//! 1. Emergency phrases (local, short-circuits moderation and the model)
//! 2. Input moderation
//! 3. Language detection with per-session affinity
//! 4. Translation to the pivot language
//! 5. Reply generation
//! 6. Output moderation (model replies only)
//! 7. Translation back, unless the reply is already localized
//! 8. Emotion and speech, concurrently
//!
//! No stage can fail the turn. Every remote failure degrades to a fixed
//! text, the untranslated text, or missing audio.

use std::sync::Arc;
use std::time::{Duration, Instant};

use snow_paws_config::{Persona, Settings};
use snow_paws_core::{Emotion, Language, MessageEnvelope, Turn};
use snow_paws_llm::{LlmBackend, OpenAIBackend, OpenAIConfig};
use snow_paws_pipeline::{OpenAiTts, OpenAiTtsConfig, SpeechSynthesizer, VoiceTable};
use snow_paws_text_processing::{
    is_emergency, EmotionClassifier, LanguageDetector, LlmTranslator, NoopTranslator,
    SafetyFilter, StickyLanguage, Translator,
};

use crate::generator::{Reply, ReplySource, ResponseGenerator};
use crate::session::SessionState;
use crate::AgentError;

/// Wall time spent in each remote-backed stage of a turn
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StageTimings {
    pub moderation: Duration,
    pub detection: Duration,
    pub translation: Duration,
    pub generation: Duration,
    pub speech: Duration,
}

/// Result of one processed turn
#[derive(Debug, Clone)]
pub struct TurnReport {
    pub envelope: MessageEnvelope,
    pub language: Language,
    pub source: ReplySource,
    pub timings: StageTimings,
    pub elapsed: Duration,
}

/// Shared, read-only turn processor
///
/// One instance serves every connection; per-connection state lives in
/// [`SessionState`].
#[derive(Clone)]
pub struct TurnPipeline {
    persona: Arc<Persona>,
    safety: SafetyFilter,
    detector: LanguageDetector,
    sticky: StickyLanguage,
    translator: Arc<dyn Translator>,
    generator: ResponseGenerator,
    classifier: EmotionClassifier,
    synthesizer: SpeechSynthesizer,
}

impl TurnPipeline {
    /// Pipeline without any remote service: canned replies, lexical
    /// detection, no moderation, no audio
    pub fn canned_only(persona: Arc<Persona>) -> Self {
        Self {
            safety: SafetyFilter::disabled(persona.rejection.clone()),
            detector: LanguageDetector::lexical_only(),
            sticky: StickyLanguage::default(),
            translator: Arc::new(NoopTranslator),
            generator: ResponseGenerator::canned_only(persona.clone()),
            classifier: EmotionClassifier::new(),
            synthesizer: SpeechSynthesizer::disabled(),
            persona,
        }
    }

    pub fn with_safety(mut self, safety: SafetyFilter) -> Self {
        self.safety = safety;
        self
    }

    pub fn with_detector(mut self, detector: LanguageDetector) -> Self {
        self.detector = detector;
        self
    }

    pub fn with_sticky(mut self, sticky: StickyLanguage) -> Self {
        self.sticky = sticky;
        self
    }

    pub fn with_translator(mut self, translator: Arc<dyn Translator>) -> Self {
        self.translator = translator;
        self
    }

    pub fn with_generator(mut self, generator: ResponseGenerator) -> Self {
        self.generator = generator;
        self
    }

    pub fn with_synthesizer(mut self, synthesizer: SpeechSynthesizer) -> Self {
        self.synthesizer = synthesizer;
        self
    }

    /// Wire every stage from settings, sharing one HTTP client
    ///
    /// Without an API key the pipeline runs canned-only.
    pub fn from_settings(
        settings: &Settings,
        persona: Arc<Persona>,
        client: reqwest::Client,
    ) -> Result<Self, AgentError> {
        let sticky = StickyLanguage::new(settings.agent.sticky_max_chars);

        let Some(api_key) = settings.openai.api_key() else {
            tracing::warn!("No OpenAI API key configured, running with canned replies only");
            return Ok(Self::canned_only(persona).with_sticky(sticky));
        };

        let llm_config = OpenAIConfig::openai(api_key, settings.openai.chat_model.clone())
            .with_endpoint(settings.openai.endpoint.clone())
            .with_timeout(settings.openai.timeout());
        let backend: Arc<dyn LlmBackend> =
            Arc::new(OpenAIBackend::with_client(llm_config, client.clone())?);

        let safety = if settings.safety.enabled {
            SafetyFilter::new(
                backend.clone(),
                settings.safety.policy,
                SafetyFilter::options_from_settings(settings),
                persona.rejection.clone(),
            )
        } else {
            SafetyFilter::disabled(persona.rejection.clone())
        };

        let synthesizer = if settings.tts.enabled {
            let tts = OpenAiTts::with_client(OpenAiTtsConfig::from_settings(settings, api_key), client);
            SpeechSynthesizer::new(
                Arc::new(tts),
                VoiceTable::from_config(&settings.tts),
                settings.openai.timeout(),
            )
        } else {
            SpeechSynthesizer::disabled()
        };

        let generator = ResponseGenerator::new(
            persona.clone(),
            backend.clone(),
            ResponseGenerator::options_from_settings(settings),
        )
        .with_context_turns(settings.agent.context_turns);

        tracing::info!(
            chat_model = %settings.openai.chat_model,
            moderation = safety.is_enabled(),
            policy = ?settings.safety.policy,
            tts = synthesizer.is_enabled(),
            context_turns = settings.agent.context_turns,
            "Turn pipeline configured"
        );

        Ok(Self {
            safety,
            detector: LanguageDetector::new(
                backend.clone(),
                LanguageDetector::options_from_settings(settings),
            ),
            sticky,
            translator: Arc::new(LlmTranslator::new(
                backend,
                LlmTranslator::options_from_settings(settings),
            )),
            generator,
            classifier: EmotionClassifier::new(),
            synthesizer,
            persona,
        })
    }

    pub fn persona(&self) -> &Persona {
        &self.persona
    }

    pub fn has_model(&self) -> bool {
        self.generator.has_model()
    }

    pub fn speech_enabled(&self) -> bool {
        self.synthesizer.is_enabled()
    }

    /// Greeting envelope sent when a session opens
    pub async fn greeting(&self, session: &mut SessionState) -> Result<MessageEnvelope, AgentError> {
        let language = session.language().unwrap_or(Language::PIVOT);
        let (text, _) = self.persona.greeting.for_language(language);
        let audio = self.synthesizer.synthesize(text, language).await;

        let envelope = MessageEnvelope::new(text, Emotion::Happy)?.with_audio(audio);
        session.record(Turn::assistant(text));
        Ok(envelope)
    }

    /// Run one user message through every stage
    pub async fn process(
        &self,
        text: &str,
        session: &mut SessionState,
    ) -> Result<TurnReport, AgentError> {
        let start = Instant::now();
        let text = text.trim();
        let mut timings = StageTimings::default();

        let emergency = is_emergency(text);
        let stage = Instant::now();
        let allowed = if emergency {
            tracing::warn!(session_id = %session.id(), "Emergency phrase detected");
            true
        } else {
            self.safety.check_input(text).await.0
        };
        timings.moderation = stage.elapsed();

        let stage = Instant::now();
        let detected = if emergency {
            // No remote call on the emergency path
            LanguageDetector::detect_lexical(text)
                .unwrap_or_else(|| session.language().unwrap_or(Language::PIVOT))
        } else {
            self.detector.detect(text).await
        };
        let language = self.sticky.resolve(text, detected, session.language());
        timings.detection = stage.elapsed();

        let (pivot_input, reply) = if emergency {
            (text.to_string(), Reply::fixed(&self.persona.emergency, language, ReplySource::Emergency))
        } else if !allowed {
            (text.to_string(), Reply::fixed(&self.persona.rejection, language, ReplySource::Rejected))
        } else {
            let stage = Instant::now();
            let pivot_input = self.translator.to_pivot(text, language).await;
            timings.translation = stage.elapsed();

            let stage = Instant::now();
            let mut reply = self
                .generator
                .generate(&pivot_input, language, session.turns())
                .await;
            timings.generation = stage.elapsed();

            if reply.source == ReplySource::Model {
                let stage = Instant::now();
                reply.text = self.safety.check_output(&reply.text, &pivot_input).await;
                reply.pivot = reply.text.clone();
                timings.moderation += stage.elapsed();
            }
            (pivot_input, reply)
        };

        let mut display = if reply.localized {
            reply.text.clone()
        } else {
            let stage = Instant::now();
            let translated = self.translator.from_pivot(&reply.text, language).await;
            timings.translation += stage.elapsed();
            translated
        };
        if display.trim().is_empty() {
            display = self.persona.default_reply.for_language(language).0.to_string();
        }

        let classify = async {
            reply
                .source
                .fixed_emotion()
                .unwrap_or_else(|| self.classifier.classify_exchange(text, &display))
        };
        let speak = async {
            let stage = Instant::now();
            let audio = self.synthesizer.synthesize(&display, language).await;
            (audio, stage.elapsed())
        };
        let (emotion, (audio, speech_time)) = tokio::join!(classify, speak);
        timings.speech = speech_time;

        let envelope = MessageEnvelope::new(display.as_str(), emotion)?.with_audio(audio);

        session.set_language(language);
        session.record(Turn::user(pivot_input));
        session.record(Turn::assistant(reply.pivot));

        let elapsed = start.elapsed();
        tracing::info!(
            session_id = %session.id(),
            language = %language,
            source = reply.source.as_str(),
            emotion = %emotion,
            has_audio = envelope.audio().is_some(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Turn processed"
        );

        Ok(TurnReport {
            envelope,
            language,
            source: reply.source,
            timings,
            elapsed,
        })
    }
}
