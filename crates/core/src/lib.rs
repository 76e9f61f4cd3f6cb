//! Core traits and types for the Dr. Snow Paws chatbot
//!
//! This crate provides foundational types used across all other crates:
//! - Supported languages and the pivot language
//! - Emotion labels attached to every reply
//! - The outbound message envelope
//! - Conversation turns
//! - Speech traits for pluggable TTS/STT backends
//! - Error types

pub mod conversation;
pub mod emotion;
pub mod envelope;
pub mod error;
pub mod language;
pub mod traits;

pub use conversation::{Turn, TurnRole};
pub use emotion::Emotion;
pub use envelope::MessageEnvelope;
pub use error::{Error, Result};
pub use language::Language;
pub use traits::{SpeechToText, SynthesisRequest, TextToSpeech};
