//! Scripted in-memory backend for tests

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

use crate::backend::{GenerationOptions, GenerationResult, LlmBackend};
use crate::prompt::Message;
use crate::LlmError;

type Responder = dyn Fn(&[Message], &GenerationOptions) -> Result<String, LlmError> + Send + Sync;

/// Recorded call
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub messages: Vec<Message>,
    pub options: GenerationOptions,
}

/// Backend whose replies come from a closure
#[derive(Clone)]
pub struct MockBackend {
    responder: Arc<Responder>,
    delay: Option<Duration>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl MockBackend {
    /// Respond with the closure's output
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&[Message], &GenerationOptions) -> Result<String, LlmError> + Send + Sync + 'static,
    {
        Self {
            responder: Arc::new(responder),
            delay: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Always respond with the same text
    pub fn fixed(response: &str) -> Self {
        let response = response.to_string();
        Self::new(move |_, _| Ok(response.clone()))
    }

    /// Always fail with an API error
    pub fn failing() -> Self {
        Self::new(|_, _| Err(LlmError::Api("HTTP 500: mock failure".to_string())))
    }

    /// Sleep before answering, honouring `GenerationOptions::timeout`
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl LlmBackend for MockBackend {
    async fn generate(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<GenerationResult, LlmError> {
        self.calls.lock().push(RecordedCall {
            messages: messages.to_vec(),
            options: options.clone(),
        });

        if let Some(delay) = self.delay {
            match options.timeout {
                Some(limit) if limit < delay => {
                    tokio::time::sleep(limit).await;
                    return Err(LlmError::Timeout);
                }
                _ => tokio::time::sleep(delay).await,
            }
        }

        (self.responder)(messages, options).map(GenerationResult::from_text)
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_records_calls() {
        let backend = MockBackend::fixed("SAFE: ok");
        let result = backend
            .generate(&[Message::user("hi")], &GenerationOptions::new())
            .await
            .unwrap();

        assert_eq!(result.text, "SAFE: ok");
        assert_eq!(backend.call_count(), 1);
        assert_eq!(backend.calls()[0].messages[0].content, "hi");
    }

    #[tokio::test]
    async fn test_mock_delay_respects_timeout() {
        let backend = MockBackend::fixed("late").with_delay(Duration::from_millis(200));
        let options = GenerationOptions::new().with_timeout(Duration::from_millis(10));

        let result = backend.generate(&[Message::user("hi")], &options).await;
        assert!(matches!(result, Err(LlmError::Timeout)));
    }
}
