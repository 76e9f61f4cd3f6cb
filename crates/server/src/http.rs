//! HTTP endpoints

use axum::{
    extract::{Path, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::path::{Component, PathBuf};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::metrics::metrics_handler;
use crate::state::AppState;
use crate::transcribe::transcribe_handler;
use crate::websocket::ws_handler;

/// Served at `/` when `static/index.html` is missing
const FALLBACK_INDEX: &str = r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>Dr. Snow Paws</title></head>
<body>
<h1>Dr. Snow Paws</h1>
<p>The chat page is not installed. Connect a WebSocket client to <code>/chat</code>.</p>
</body>
</html>
"#;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let cors_layer = build_cors_layer(
        &state.config.server.cors_origins,
        state.config.server.cors_enabled,
    );

    Router::new()
        .route("/", get(index))
        .route("/static/*path", get(static_file))
        .route("/health", get(health_check))
        .route("/transcribe", post(transcribe_handler))
        .route("/metrics", get(metrics_handler))
        .route("/chat", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors_layer)
        .with_state(state)
}

/// Permissive when disabled; otherwise only the configured origins
fn build_cors_layer(origins: &[String], enabled: bool) -> CorsLayer {
    if !enabled {
        return CorsLayer::permissive();
    }

    let parsed_origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!("Invalid CORS origin: {}", origin);
                None
            })
        })
        .collect();

    if parsed_origins.is_empty() {
        tracing::warn!("No valid CORS origins configured, falling back to localhost");
        return CorsLayer::new()
            .allow_origin(HeaderValue::from_static("http://localhost:8080"))
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any);
    }

    tracing::info!("CORS configured with {} origins", parsed_origins.len());
    CorsLayer::new()
        .allow_origin(parsed_origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

/// `GET /`
async fn index(State(state): State<AppState>) -> Html<String> {
    let path = state.static_dir().join("index.html");
    match tokio::fs::read_to_string(&path).await {
        Ok(page) => Html(page),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "Serving fallback index");
            Html(FALLBACK_INDEX.to_string())
        }
    }
}

/// `GET /static/*path`
async fn static_file(State(state): State<AppState>, Path(path): Path<String>) -> Response {
    let Some(relative) = safe_relative_path(&path) else {
        return (StatusCode::BAD_REQUEST, "invalid path").into_response();
    };

    let full = state.static_dir().join(&relative);
    match tokio::fs::read(&full).await {
        Ok(bytes) => ([(header::CONTENT_TYPE, content_type(&relative))], bytes).into_response(),
        Err(_) => (StatusCode::NOT_FOUND, "not found").into_response(),
    }
}

/// Relative path made only of normal components, or `None`
fn safe_relative_path(raw: &str) -> Option<PathBuf> {
    let path = std::path::Path::new(raw.trim_start_matches('/'));
    let mut clean = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            _ => return None,
        }
    }
    (!clean.as_os_str().is_empty()).then_some(clean)
}

fn content_type(path: &std::path::Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "text/javascript; charset=utf-8",
        "json" => "application/json",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "woff2" => "font/woff2",
        "txt" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

/// `GET /health`
async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let static_dir = state.static_dir();
    let index_exists = tokio::fs::try_exists(static_dir.join("index.html"))
        .await
        .unwrap_or(false);

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION"),
            "static_dir": static_dir.display().to_string(),
            "index_exists": index_exists,
            "remote_enabled": state.config.remote_enabled(),
            "speech_enabled": state.pipeline.speech_enabled(),
            "transcription_enabled": state.transcriber.is_some(),
        })),
    )
}
