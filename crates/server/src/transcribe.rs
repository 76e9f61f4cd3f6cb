//! Push-to-talk transcription
//!
//! The browser records a clip, base64-encodes it and posts it here; the
//! transcript comes back as JSON and is then sent over the chat socket like
//! any typed message.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::Deserialize;
use std::time::Instant;

use crate::metrics::record_transcription;
use crate::state::AppState;
use crate::ServerError;

/// `POST /transcribe` body
#[derive(Debug, Deserialize)]
pub struct TranscribeRequest {
    /// Base64 audio, optionally as a `data:` URL
    pub audio: String,
    /// Container format used as the upload file extension
    #[serde(default = "default_format")]
    pub format: String,
}

fn default_format() -> String {
    "webm".to_string()
}

/// Strip a `data:audio/webm;base64,` style prefix
fn strip_data_url(audio: &str) -> &str {
    match audio.split_once(";base64,") {
        Some((prefix, payload)) if prefix.starts_with("data:") => payload,
        _ => audio,
    }
}

/// Upload file name for `format`, restricted to a plain extension
fn file_name_for(format: &str) -> String {
    let extension: String = format
        .trim()
        .trim_start_matches('.')
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();
    if extension.is_empty() {
        "audio.webm".to_string()
    } else {
        format!("audio.{}", extension.to_ascii_lowercase())
    }
}

/// `POST /transcribe`
pub async fn transcribe_handler(
    State(state): State<AppState>,
    payload: Result<Json<TranscribeRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ServerError> {
    // Malformed bodies get the same `{success:false}` envelope as other errors
    let Json(request) = payload.map_err(|e| ServerError::InvalidRequest(e.body_text()))?;

    let Some(transcriber) = state.transcriber.clone() else {
        return Err(ServerError::Unavailable(
            "transcription requires an API key".to_string(),
        ));
    };

    let audio = BASE64
        .decode(strip_data_url(request.audio.trim()))
        .map_err(|e| ServerError::InvalidRequest(format!("Invalid base64 audio: {}", e)))?;
    if audio.is_empty() {
        return Err(ServerError::InvalidRequest("Empty audio".to_string()));
    }

    let start = Instant::now();
    let file_name = file_name_for(&request.format);
    match transcriber.transcribe(audio, &file_name).await {
        Ok(text) => {
            record_transcription(true, start.elapsed());
            Ok(Json(serde_json::json!({ "success": true, "text": text })))
        }
        Err(e) => {
            record_transcription(false, start.elapsed());
            tracing::error!(error = %e, "Transcription failed");
            Err(ServerError::Upstream(e.to_string()))
        }
    }
}
