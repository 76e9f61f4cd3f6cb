//! OpenAI-compatible speech synthesis backend

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use snow_paws_core::{SynthesisRequest, TextToSpeech};

use crate::PipelineError;

/// Speech endpoint configuration
#[derive(Debug, Clone)]
pub struct OpenAiTtsConfig {
    /// API base URL
    pub endpoint: String,
    pub api_key: String,
    /// Synthesis model (tts-1, tts-1-hd, gpt-4o-mini-tts...)
    pub model: String,
    /// Audio container (mp3, opus, wav...)
    pub format: String,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for OpenAiTtsConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            model: "tts-1-hd".to_string(),
            format: "mp3".to_string(),
            timeout: Duration::from_secs(15),
        }
    }
}

impl OpenAiTtsConfig {
    pub fn from_settings(settings: &snow_paws_config::Settings, api_key: &str) -> Self {
        Self {
            endpoint: settings.openai.endpoint.clone(),
            api_key: api_key.to_string(),
            model: settings.tts.model.clone(),
            format: settings.tts.format.clone(),
            timeout: settings.openai.timeout(),
        }
    }

    /// Only the instruction-following voice models accept `instructions`
    fn supports_instructions(&self) -> bool {
        self.model.starts_with("gpt-4o")
    }
}

/// Remote speech synthesis over `POST {endpoint}/audio/speech`
pub struct OpenAiTts {
    config: OpenAiTtsConfig,
    client: Client,
}

impl OpenAiTts {
    pub fn new(config: OpenAiTtsConfig) -> Result<Self, PipelineError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PipelineError::Network(e.to_string()))?;
        Ok(Self { config, client })
    }

    /// Reuse a shared HTTP client
    pub fn with_client(config: OpenAiTtsConfig, client: Client) -> Self {
        Self { config, client }
    }

    fn speech_url(&self) -> String {
        format!("{}/audio/speech", self.config.endpoint.trim_end_matches('/'))
    }

    fn build_request<'a>(&'a self, request: &'a SynthesisRequest) -> SpeechRequest<'a> {
        SpeechRequest {
            model: &self.config.model,
            input: &request.text,
            voice: &request.voice,
            speed: request.speed,
            response_format: &self.config.format,
            instructions: request
                .instructions
                .as_deref()
                .filter(|_| self.config.supports_instructions()),
        }
    }

    async fn request_audio(&self, request: &SynthesisRequest) -> Result<Vec<u8>, PipelineError> {
        let response = self
            .client
            .post(self.speech_url())
            .bearer_auth(&self.config.api_key)
            .timeout(self.config.timeout)
            .json(&self.build_request(request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(PipelineError::EmptyAudio);
        }
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl TextToSpeech for OpenAiTts {
    async fn synthesize(&self, request: &SynthesisRequest) -> snow_paws_core::Result<Vec<u8>> {
        Ok(self.request_audio(request).await?)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    speed: f32,
    response_format: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    instructions: Option<&'a str>,
}
