//! Speech pipeline
//!
//! - `tts`: text cleanup for speech, remote synthesis, per-language voices
//! - `stt`: remote transcription for the push-to-talk endpoint

pub mod stt;
pub mod tts;

pub use stt::{OpenAiTranscriber, TranscriberConfig};
pub use tts::{
    add_speech_pauses, clean_for_speech, OpenAiTts, OpenAiTtsConfig, SpeechSynthesizer,
    VoiceProfile, VoiceTable,
};

use thiserror::Error;

/// Pipeline errors
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("TTS error: {0}")]
    Tts(String),

    #[error("STT error: {0}")]
    Stt(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Remote service returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Empty audio")]
    EmptyAudio,

    #[error("Timeout")]
    Timeout,
}

impl From<reqwest::Error> for PipelineError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            PipelineError::Timeout
        } else {
            PipelineError::Network(err.to_string())
        }
    }
}

impl From<PipelineError> for snow_paws_core::Error {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Stt(msg) => snow_paws_core::Error::Stt(msg),
            other => snow_paws_core::Error::Tts(other.to_string()),
        }
    }
}
