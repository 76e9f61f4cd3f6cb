//! Conversation turn handling for Dr. Snow Paws
//!
//! - [`ResponseGenerator`]: canned table first, chat model otherwise
//! - [`SessionState`]: per-connection history and language affinity
//! - [`TurnPipeline`]: guardrails, language, translation, reply, emotion
//!   and speech for one inbound message

pub mod generator;
pub mod pipeline;
pub mod session;

pub use generator::{Reply, ReplySource, ResponseGenerator};
pub use pipeline::{StageTimings, TurnPipeline, TurnReport};
pub use session::SessionState;

use thiserror::Error;

/// Agent errors
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Pipeline error: {0}")]
    Pipeline(String),

    #[error("Envelope error: {0}")]
    Envelope(String),
}

impl From<snow_paws_llm::LlmError> for AgentError {
    fn from(err: snow_paws_llm::LlmError) -> Self {
        AgentError::Llm(err.to_string())
    }
}

impl From<snow_paws_pipeline::PipelineError> for AgentError {
    fn from(err: snow_paws_pipeline::PipelineError) -> Self {
        AgentError::Pipeline(err.to_string())
    }
}

impl From<snow_paws_core::Error> for AgentError {
    fn from(err: snow_paws_core::Error) -> Self {
        AgentError::Envelope(err.to_string())
    }
}
