//! LLM Backend implementations
//!
//! One OpenAI-compatible backend serves every remote text stage: replies,
//! guardrails, translation and ambiguous language detection. Each stage
//! passes its own [`GenerationOptions`] (model, temperature, budget).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::prompt::Message;
use crate::LlmError;

/// Per-call generation options
///
/// Unset fields fall back to the backend configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationOptions {
    /// Model override
    pub model: Option<String>,
    /// Maximum tokens to generate
    pub max_tokens: Option<usize>,
    /// Temperature (0-2)
    pub temperature: Option<f32>,
    pub presence_penalty: Option<f32>,
    pub frequency_penalty: Option<f32>,
    /// Hard deadline for the whole call
    pub timeout: Option<Duration>,
}

impl GenerationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_penalties(mut self, presence: f32, frequency: f32) -> Self {
        self.presence_penalty = Some(presence);
        self.frequency_penalty = Some(frequency);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// LLM generation result
#[derive(Debug, Clone)]
pub struct GenerationResult {
    /// Generated text
    pub text: String,
    /// Completion tokens reported by the endpoint, 0 when absent
    pub tokens: usize,
}

impl GenerationResult {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tokens: 0,
        }
    }
}

/// LLM Backend trait
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Generate a response
    async fn generate(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<GenerationResult, LlmError>;

    /// Get default model name
    fn model_name(&self) -> &str;
}

/// Configuration for the OpenAI chat-completions endpoint
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    /// API base URL
    pub endpoint: String,
    pub api_key: String,
    /// Default model name
    pub model: String,
    /// Default maximum tokens to generate
    pub max_tokens: usize,
    /// Default temperature (0-2)
    pub temperature: f32,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            model: "gpt-4".to_string(),
            max_tokens: 150,
            temperature: 0.7,
            timeout: Duration::from_secs(15),
        }
    }
}

impl OpenAIConfig {
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            ..Default::default()
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Chat-completions backend
pub struct OpenAIBackend {
    config: OpenAIConfig,
    client: Client,
}

impl OpenAIBackend {
    /// Create new OpenAI backend with its own HTTP client
    pub fn new(config: OpenAIConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Network(e.to_string()))?;

        Self::with_client(config, client)
    }

    /// Create a backend reusing a shared HTTP client
    pub fn with_client(config: OpenAIConfig, client: Client) -> Result<Self, LlmError> {
        if config.api_key.trim().is_empty() {
            return Err(LlmError::Configuration("API key required".to_string()));
        }

        Ok(Self { config, client })
    }

    fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.config.endpoint.trim_end_matches('/'))
    }

    fn build_request(&self, messages: &[Message], options: &GenerationOptions) -> OpenAIChatRequest {
        OpenAIChatRequest {
            model: options
                .model
                .clone()
                .unwrap_or_else(|| self.config.model.clone()),
            messages: messages
                .iter()
                .map(|m| OpenAIMessage {
                    role: m.role.as_str().to_string(),
                    content: m.content.clone(),
                })
                .collect(),
            max_tokens: Some(options.max_tokens.unwrap_or(self.config.max_tokens)),
            temperature: Some(options.temperature.unwrap_or(self.config.temperature)),
            presence_penalty: options.presence_penalty,
            frequency_penalty: options.frequency_penalty,
        }
    }

    async fn execute(&self, request: &OpenAIChatRequest) -> Result<OpenAIChatResponse, LlmError> {
        let response = self
            .client
            .post(self.chat_url())
            .bearer_auth(&self.config.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(LlmError::Api(format!("HTTP {}: {}", status, error_text)));
        }

        response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl LlmBackend for OpenAIBackend {
    async fn generate(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<GenerationResult, LlmError> {
        let start = Instant::now();
        let request = self.build_request(messages, options);

        let response = match options.timeout {
            Some(limit) => tokio::time::timeout(limit, self.execute(&request))
                .await
                .map_err(|_| LlmError::Timeout)??,
            None => self.execute(&request).await?,
        };

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse("No choices in response".to_string()))?;

        let text = choice.message.content.unwrap_or_default();
        let tokens = response.usage.map(|u| u.completion_tokens).unwrap_or(0);

        tracing::debug!(
            model = %request.model,
            tokens,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Chat completion finished"
        );

        Ok(GenerationResult { text, tokens })
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

// OpenAI API types
#[derive(Debug, Serialize)]
struct OpenAIChatRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    presence_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frequency_penalty: Option<f32>,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIChatResponse {
    choices: Vec<OpenAIChoice>,
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    completion_tokens: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_config_default() {
        let config = OpenAIConfig::default();
        assert_eq!(config.endpoint, "https://api.openai.com/v1");
        assert_eq!(config.timeout, Duration::from_secs(15));
    }

    #[test]
    fn test_backend_requires_key() {
        assert!(matches!(
            OpenAIBackend::new(OpenAIConfig::default()),
            Err(LlmError::Configuration(_))
        ));
        assert!(OpenAIBackend::new(OpenAIConfig::openai("sk-xxx", "gpt-4")).is_ok());
    }

    #[test]
    fn test_chat_url_trims_slash() {
        let config = OpenAIConfig::openai("sk-xxx", "gpt-4").with_endpoint("http://localhost:8000/v1/");
        let backend = OpenAIBackend::new(config).unwrap();
        assert_eq!(backend.chat_url(), "http://localhost:8000/v1/chat/completions");
    }

    #[test]
    fn test_request_uses_options_over_defaults() {
        let backend = OpenAIBackend::new(OpenAIConfig::openai("sk-xxx", "gpt-4")).unwrap();
        let options = GenerationOptions::new()
            .with_model("gpt-3.5-turbo")
            .with_max_tokens(1)
            .with_temperature(0.0);

        let request = backend.build_request(&[Message::user("hola")], &options);
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["model"], "gpt-3.5-turbo");
        assert_eq!(json["max_tokens"], 1);
        assert_eq!(json["temperature"], 0.0);
        assert_eq!(json["messages"][0]["role"], "user");
        assert!(json.get("presence_penalty").is_none());
    }

    #[test]
    fn test_request_falls_back_to_config() {
        let backend = OpenAIBackend::new(OpenAIConfig::openai("sk-xxx", "gpt-4")).unwrap();
        let options = GenerationOptions::new().with_penalties(0.6, 0.2);

        let request = backend.build_request(&[Message::system("be kind")], &options);
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["model"], "gpt-4");
        assert_eq!(json["max_tokens"], 150);
        assert!((json["presence_penalty"].as_f64().unwrap() - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_response_parsing_tolerates_null_content() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":null},"finish_reason":"content_filter"}]}"#;
        let parsed: OpenAIChatResponse = serde_json::from_str(body).unwrap();
        assert!(parsed.choices[0].message.content.is_none());
        assert!(parsed.usage.is_none());
    }
}
