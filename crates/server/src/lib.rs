//! Dr. Snow Paws server
//!
//! Serves the chat WebSocket, the landing page and a few JSON endpoints.

pub mod http;
pub mod metrics;
pub mod state;
pub mod transcribe;
pub mod websocket;

pub use http::create_router;
pub use metrics::{
    init_metrics, record_error, record_heartbeat, record_session_closed, record_session_opened,
    record_transcription, record_turn,
};
pub use state::AppState;
pub use websocket::{ChannelState, InboundFrame};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ServerError> for StatusCode {
    fn from(err: ServerError) -> Self {
        match err {
            ServerError::WebSocket(_) => StatusCode::BAD_REQUEST,
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<snow_paws_agent::AgentError> for ServerError {
    fn from(err: snow_paws_agent::AgentError) -> Self {
        ServerError::Internal(err.to_string())
    }
}

/// JSON error body: `{"success": false, "error": "..."}`
impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let status: StatusCode = self.into();
        (
            status,
            Json(serde_json::json!({ "success": false, "error": message })),
        )
            .into_response()
    }
}
