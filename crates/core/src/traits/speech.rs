//! Speech processing traits

use async_trait::async_trait;

use crate::{Language, Result};

/// Parameters for a single synthesis call
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisRequest {
    /// Cleaned text, ready to be spoken
    pub text: String,
    /// Voice identifier
    pub voice: String,
    /// Speech rate multiplier (1.0 = normal)
    pub speed: f32,
    /// Language the text is written in
    pub language: Language,
    /// Optional delivery instructions for the voice model
    pub instructions: Option<String>,
}

/// Text-to-Speech interface
///
/// Implementations:
/// - `OpenAiTts` - remote speech synthesis endpoint
///
/// # Example
///
/// ```ignore
/// let tts: Arc<dyn TextToSpeech> = Arc::new(OpenAiTts::new(config)?);
/// let audio = tts.synthesize(&request).await?;
/// ```
#[async_trait]
pub trait TextToSpeech: Send + Sync + 'static {
    /// Synthesize text, returning encoded audio bytes
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<Vec<u8>>;

    /// Get model name for logging
    fn model_name(&self) -> &str;
}

/// Speech-to-Text interface
///
/// Implementations:
/// - `OpenAiTranscriber` - remote transcription endpoint
#[async_trait]
pub trait SpeechToText: Send + Sync + 'static {
    /// Transcribe an encoded audio clip (webm, wav, mp3...)
    ///
    /// # Arguments
    /// * `audio` - Raw encoded audio bytes
    /// * `file_name` - File name hint used to infer the container format
    async fn transcribe(&self, audio: Vec<u8>, file_name: &str) -> Result<String>;

    /// Get model name for logging
    fn model_name(&self) -> &str;
}
