//! Text-to-speech
//!
//! Display text is cleaned, paired with a per-language voice and sent to a
//! remote synthesis endpoint. Failures never propagate: the caller simply
//! gets no audio.

mod cleanup;
mod openai;
mod synthesizer;

pub use cleanup::{add_speech_pauses, clean_for_speech};
pub use openai::{OpenAiTts, OpenAiTtsConfig};
pub use synthesizer::{SpeechSynthesizer, VoiceProfile, VoiceTable};
