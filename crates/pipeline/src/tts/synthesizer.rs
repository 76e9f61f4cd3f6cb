//! Per-language voice selection and base64 audio for the envelope

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use std::sync::Arc;
use std::time::{Duration, Instant};

use snow_paws_config::TtsConfig;
use snow_paws_core::{Language, SynthesisRequest, TextToSpeech};

use super::cleanup::{add_speech_pauses, clean_for_speech};

const ENGLISH_INSTRUCTIONS: &str = "Speak this text in a natural, child-friendly way with consistent volume and clear pronunciation. Maintain a warm, engaging tone suitable for children.";
const SPANISH_INSTRUCTIONS: &str = "Speak this text in natural, child-friendly Spanish with proper pronunciation, intonation, and rhythm. Maintain a consistent, clear speaking volume throughout the response. Use a warm, engaging tone suitable for children.";

/// Voice and rate for one language
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceProfile {
    pub voice: String,
    pub speed: f32,
    pub instructions: &'static str,
}

/// Fixed language → voice lookup
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceTable {
    english: VoiceProfile,
    spanish: VoiceProfile,
}

impl Default for VoiceTable {
    fn default() -> Self {
        Self::from_config(&TtsConfig::default())
    }
}

impl VoiceTable {
    /// Build the table, applying the global voice override if set
    pub fn from_config(config: &TtsConfig) -> Self {
        let voice_for = |default: &str| {
            config
                .voice_override
                .clone()
                .unwrap_or_else(|| default.to_string())
        };

        Self {
            english: VoiceProfile {
                voice: voice_for(&config.english_voice),
                speed: config.english_speed,
                instructions: ENGLISH_INSTRUCTIONS,
            },
            spanish: VoiceProfile {
                voice: voice_for(&config.spanish_voice),
                speed: config.spanish_speed,
                instructions: SPANISH_INSTRUCTIONS,
            },
        }
    }

    pub fn profile(&self, language: Language) -> &VoiceProfile {
        match language {
            Language::English => &self.english,
            Language::Spanish => &self.spanish,
        }
    }
}

/// Turns display text into base64 audio, or `None`
///
/// Synthesis never fails a turn. Empty text after cleanup, a disabled or
/// missing backend, a remote error, empty audio and a timeout all yield
/// `None`.
#[derive(Clone)]
pub struct SpeechSynthesizer {
    tts: Option<Arc<dyn TextToSpeech>>,
    voices: VoiceTable,
    timeout: Duration,
}

impl SpeechSynthesizer {
    pub fn new(tts: Arc<dyn TextToSpeech>, voices: VoiceTable, timeout: Duration) -> Self {
        Self {
            tts: Some(tts),
            voices,
            timeout,
        }
    }

    /// Synthesizer that never produces audio
    pub fn disabled() -> Self {
        Self {
            tts: None,
            voices: VoiceTable::default(),
            timeout: Duration::from_secs(15),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.tts.is_some()
    }

    /// Build the remote request for `text`, or `None` if nothing is speakable
    pub fn prepare(&self, text: &str, language: Language) -> Option<SynthesisRequest> {
        let cleaned = clean_for_speech(text);
        if cleaned.is_empty() {
            return None;
        }

        let profile = self.voices.profile(language);
        Some(SynthesisRequest {
            text: add_speech_pauses(&cleaned, language),
            voice: profile.voice.clone(),
            speed: profile.speed,
            language,
            instructions: Some(profile.instructions.to_string()),
        })
    }

    /// Synthesize `text` and return base64-encoded audio
    pub async fn synthesize(&self, text: &str, language: Language) -> Option<String> {
        let tts = self.tts.as_ref()?;
        let request = self.prepare(text, language)?;
        let start = Instant::now();

        match tokio::time::timeout(self.timeout, tts.synthesize(&request)).await {
            Ok(Ok(audio)) if !audio.is_empty() => {
                tracing::debug!(
                    voice = %request.voice,
                    language = %language,
                    bytes = audio.len(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Synthesized speech"
                );
                Some(BASE64.encode(audio))
            }
            Ok(Ok(_)) => {
                tracing::warn!(voice = %request.voice, "TTS returned empty audio");
                None
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, model = tts.model_name(), "TTS failed");
                None
            }
            Err(_) => {
                tracing::warn!(timeout_ms = self.timeout.as_millis() as u64, "TTS timed out");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    /// Records requests and returns canned bytes
    struct RecordingTts {
        audio: Vec<u8>,
        fail: bool,
        delay: Option<Duration>,
        seen: Mutex<Vec<SynthesisRequest>>,
    }

    impl RecordingTts {
        fn returning(audio: &[u8]) -> Arc<Self> {
            Arc::new(Self {
                audio: audio.to_vec(),
                fail: false,
                delay: None,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl TextToSpeech for RecordingTts {
        async fn synthesize(&self, request: &SynthesisRequest) -> snow_paws_core::Result<Vec<u8>> {
            self.seen.lock().push(request.clone());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                return Err(snow_paws_core::Error::Tts("boom".to_string()));
            }
            Ok(self.audio.clone())
        }

        fn model_name(&self) -> &str {
            "recording"
        }
    }

    #[test]
    fn test_voice_table_defaults() {
        let table = VoiceTable::default();
        assert_eq!(table.profile(Language::English).voice, "sage");
        assert_eq!(table.profile(Language::Spanish).voice, "nova");
        assert!((table.profile(Language::Spanish).speed - 0.92).abs() < f32::EPSILON);
    }

    #[test]
    fn test_voice_override_applies_to_all_languages() {
        let config = TtsConfig {
            voice_override: Some("shimmer".to_string()),
            ..Default::default()
        };
        let table = VoiceTable::from_config(&config);
        assert_eq!(table.profile(Language::English).voice, "shimmer");
        assert_eq!(table.profile(Language::Spanish).voice, "shimmer");
    }

    #[tokio::test]
    async fn test_synthesize_cleans_text_and_encodes() {
        let tts = RecordingTts::returning(b"ID3");
        let synth = SpeechSynthesizer::new(tts.clone(), VoiceTable::default(), Duration::from_secs(1));

        let audio = synth
            .synthesize("*waves paw* ¡Hola! ¿Cómo estás? 💝", Language::Spanish)
            .await;

        assert_eq!(audio.as_deref(), Some("SUQz"));
        let seen = tts.seen.lock();
        assert_eq!(seen[0].text, "¡Hola! , ¿Cómo estás?");
        assert_eq!(seen[0].voice, "nova");
    }

    #[tokio::test]
    async fn test_empty_audio_is_none() {
        let synth = SpeechSynthesizer::new(
            RecordingTts::returning(b""),
            VoiceTable::default(),
            Duration::from_secs(1),
        );
        assert!(synth.synthesize("Hello there", Language::English).await.is_none());
    }

    #[tokio::test]
    async fn test_failure_is_none() {
        let tts = Arc::new(RecordingTts {
            audio: vec![1, 2, 3],
            fail: true,
            delay: None,
            seen: Mutex::new(Vec::new()),
        });
        let synth = SpeechSynthesizer::new(tts, VoiceTable::default(), Duration::from_secs(1));
        assert!(synth.synthesize("Hello there", Language::English).await.is_none());
    }

    #[tokio::test]
    async fn test_timeout_is_none() {
        let tts = Arc::new(RecordingTts {
            audio: vec![1, 2, 3],
            fail: false,
            delay: Some(Duration::from_millis(200)),
            seen: Mutex::new(Vec::new()),
        });
        let synth = SpeechSynthesizer::new(tts, VoiceTable::default(), Duration::from_millis(10));
        assert!(synth.synthesize("Hello there", Language::English).await.is_none());
    }

    #[tokio::test]
    async fn test_unspeakable_text_skips_remote_call() {
        let tts = RecordingTts::returning(b"ID3");
        let synth = SpeechSynthesizer::new(tts.clone(), VoiceTable::default(), Duration::from_secs(1));

        assert!(synth.synthesize("*waves paw* 🐾", Language::English).await.is_none());
        assert!(tts.seen.lock().is_empty());
    }

    #[tokio::test]
    async fn test_disabled() {
        let synth = SpeechSynthesizer::disabled();
        assert!(!synth.is_enabled());
        assert!(synth.synthesize("Hello", Language::English).await.is_none());
    }
}
