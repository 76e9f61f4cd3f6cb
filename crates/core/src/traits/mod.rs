//! Core traits for pluggable remote backends

mod speech;

pub use speech::{SpeechToText, SynthesisRequest, TextToSpeech};
