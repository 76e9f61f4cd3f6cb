//! Speech-to-text for the push-to-talk endpoint

mod openai;

pub use openai::{OpenAiTranscriber, TranscriberConfig};
