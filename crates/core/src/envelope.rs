//! Outbound message envelope
//!
//! Every turn is answered with exactly one envelope:
//! `{ "text": string, "audio": base64 | null, "emotion": label }`.

use serde::{Deserialize, Serialize};

use crate::{Emotion, Error, Result};

/// Reply bundle sent to the browser client
///
/// `text` is never empty. `audio` is `None` when synthesis failed or is
/// disabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawEnvelope")]
pub struct MessageEnvelope {
    text: String,
    audio: Option<String>,
    emotion: Emotion,
}

#[derive(Deserialize)]
struct RawEnvelope {
    text: String,
    #[serde(default)]
    audio: Option<String>,
    #[serde(default)]
    emotion: Emotion,
}

impl TryFrom<RawEnvelope> for MessageEnvelope {
    type Error = Error;

    fn try_from(raw: RawEnvelope) -> Result<Self> {
        Ok(Self::new(raw.text, raw.emotion)?.with_audio(raw.audio))
    }
}

impl MessageEnvelope {
    /// Create an envelope without audio
    pub fn new(text: impl Into<String>, emotion: Emotion) -> Result<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(Error::InvalidInput("envelope text cannot be empty".to_string()));
        }
        Ok(Self {
            text,
            audio: None,
            emotion,
        })
    }

    /// Attach base64 audio (or clear it with `None`)
    pub fn with_audio(mut self, audio: Option<String>) -> Self {
        self.audio = audio.filter(|a| !a.is_empty());
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn audio(&self) -> Option<&str> {
        self.audio.as_deref()
    }

    pub fn emotion(&self) -> Emotion {
        self.emotion
    }

    /// Serialize to the wire JSON representation
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
