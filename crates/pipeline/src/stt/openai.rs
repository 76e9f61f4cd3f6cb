//! Remote transcription over `POST {endpoint}/audio/transcriptions`

use async_trait::async_trait;
use reqwest::{multipart, Client};
use serde::Deserialize;
use std::time::Duration;

use snow_paws_core::SpeechToText;

use crate::PipelineError;

/// Transcription endpoint configuration
#[derive(Debug, Clone)]
pub struct TranscriberConfig {
    /// API base URL
    pub endpoint: String,
    pub api_key: String,
    /// Transcription model
    pub model: String,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for TranscriberConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            model: "whisper-1".to_string(),
            timeout: Duration::from_secs(15),
        }
    }
}

impl TranscriberConfig {
    pub fn from_settings(settings: &snow_paws_config::Settings, api_key: &str) -> Self {
        Self {
            endpoint: settings.openai.endpoint.clone(),
            api_key: api_key.to_string(),
            model: settings.openai.transcription_model.clone(),
            timeout: settings.openai.timeout(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// Remote speech-to-text
pub struct OpenAiTranscriber {
    config: TranscriberConfig,
    client: Client,
}

impl OpenAiTranscriber {
    /// Reuse a shared HTTP client
    pub fn with_client(config: TranscriberConfig, client: Client) -> Self {
        Self { config, client }
    }

    fn transcription_url(&self) -> String {
        format!(
            "{}/audio/transcriptions",
            self.config.endpoint.trim_end_matches('/')
        )
    }

    async fn request_transcript(&self, audio: Vec<u8>, file_name: &str) -> Result<String, PipelineError> {
        if audio.is_empty() {
            return Err(PipelineError::EmptyAudio);
        }

        let part = multipart::Part::bytes(audio)
            .file_name(file_name.to_string())
            .mime_str(mime_for(file_name))
            .map_err(|e| PipelineError::Stt(e.to_string()))?;

        let form = multipart::Form::new()
            .part("file", part)
            .text("model", self.config.model.clone());

        let response = self
            .client
            .post(self.transcription_url())
            .bearer_auth(&self.config.api_key)
            .timeout(self.config.timeout)
            .multipart(form)
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

        let result: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::Stt(format!("invalid transcription response: {}", e)))?;

        Ok(result.text.trim().to_string())
    }
}

/// MIME type from the file extension; browsers record webm by default
fn mime_for(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "wav" => "audio/wav",
        "mp3" | "mpeg" | "mpga" => "audio/mpeg",
        "m4a" | "mp4" => "audio/mp4",
        "ogg" | "oga" => "audio/ogg",
        "flac" => "audio/flac",
        _ => "audio/webm",
    }
}

#[async_trait]
impl SpeechToText for OpenAiTranscriber {
    async fn transcribe(&self, audio: Vec<u8>, file_name: &str) -> snow_paws_core::Result<String> {
        let start = std::time::Instant::now();
        let text = self
            .request_transcript(audio, file_name)
            .await
            .map_err(|e| snow_paws_core::Error::Stt(e.to_string()))?;

        tracing::info!(
            model = %self.config.model,
            chars = text.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Transcription finished"
        );
        Ok(text)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
