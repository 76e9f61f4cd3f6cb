//! Application state

use std::path::PathBuf;
use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;
use snow_paws_agent::TurnPipeline;
use snow_paws_config::{Persona, Settings};
use snow_paws_core::SpeechToText;
use snow_paws_pipeline::{OpenAiTranscriber, TranscriberConfig};

use crate::ServerError;

/// Shared application state
///
/// Everything here is read-only after startup. Per-connection state lives
/// in the WebSocket task.
#[derive(Clone)]
pub struct AppState {
    /// Configuration
    pub config: Arc<Settings>,
    /// Turn processor shared by every connection
    pub pipeline: Arc<TurnPipeline>,
    /// Speech-to-text for `/transcribe`, absent in canned-only mode
    pub transcriber: Option<Arc<dyn SpeechToText>>,
    /// Prometheus handle, absent when metrics are disabled
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(config: Settings, pipeline: TurnPipeline) -> Self {
        Self {
            config: Arc::new(config),
            pipeline: Arc::new(pipeline),
            transcriber: None,
            metrics: None,
        }
    }

    /// Build the pipeline and transcriber from settings, sharing `client`
    pub fn from_settings(config: Settings, client: reqwest::Client) -> Result<Self, ServerError> {
        let persona = Arc::new(Persona::snow_paws());
        let pipeline = TurnPipeline::from_settings(&config, persona, client.clone())?;

        let transcriber: Option<Arc<dyn SpeechToText>> = config.openai.api_key().map(|key| {
            let stt_config = TranscriberConfig::from_settings(&config, key);
            Arc::new(OpenAiTranscriber::with_client(stt_config, client)) as Arc<dyn SpeechToText>
        });

        let mut state = Self::new(config, pipeline);
        state.transcriber = transcriber;
        Ok(state)
    }

    pub fn with_transcriber(mut self, transcriber: Arc<dyn SpeechToText>) -> Self {
        self.transcriber = Some(transcriber);
        self
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Directory served at `/` and `/static`
    pub fn static_dir(&self) -> PathBuf {
        PathBuf::from(&self.config.server.static_dir)
    }
}
