//! Prometheus metrics
//!
//! Counters and histograms are recorded through the `metrics` facade, so
//! recording is a no-op until [`init_metrics`] installs the exporter.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use std::time::Duration;

use snow_paws_agent::TurnReport;

use crate::state::AppState;

static HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Install the Prometheus recorder
///
/// Safe to call more than once; later calls return the same handle.
pub fn init_metrics() -> Option<PrometheusHandle> {
    match HANDLE.get_or_try_init(|| PrometheusBuilder::new().install_recorder()) {
        Ok(handle) => Some(handle.clone()),
        Err(e) => {
            tracing::error!(error = %e, "Failed to install Prometheus recorder");
            None
        }
    }
}

/// `GET /metrics`
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.metrics.as_ref() {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (StatusCode::NOT_FOUND, "metrics disabled".to_string()),
    }
}

fn seconds(duration: Duration) -> f64 {
    duration.as_secs_f64()
}

/// Record one processed turn
pub fn record_turn(report: &TurnReport, speech_enabled: bool) {
    let source = report.source.as_str();
    let language = report.language.code();

    counter!("snow_paws_turns_total", "source" => source, "language" => language).increment(1);
    histogram!("snow_paws_turn_seconds").record(seconds(report.elapsed));

    let timings = &report.timings;
    for (stage, duration) in [
        ("moderation", timings.moderation),
        ("detection", timings.detection),
        ("translation", timings.translation),
        ("generation", timings.generation),
        ("speech", timings.speech),
    ] {
        histogram!("snow_paws_stage_seconds", "stage" => stage).record(seconds(duration));
    }

    if report.source.is_fallback() {
        counter!("snow_paws_fallbacks_total", "stage" => "generation", "kind" => source)
            .increment(1);
    }
    if speech_enabled && report.envelope.audio().is_none() {
        counter!("snow_paws_fallbacks_total", "stage" => "speech", "kind" => "no_audio")
            .increment(1);
    }
}

pub fn record_session_opened() {
    counter!("snow_paws_sessions_total").increment(1);
    gauge!("snow_paws_active_sessions").increment(1.0);
}

pub fn record_session_closed(duration: Duration) {
    gauge!("snow_paws_active_sessions").decrement(1.0);
    histogram!("snow_paws_session_seconds").record(seconds(duration));
}

pub fn record_heartbeat() {
    counter!("snow_paws_heartbeats_total").increment(1);
}

pub fn record_transcription(success: bool, duration: Duration) {
    let outcome = if success { "ok" } else { "error" };
    counter!("snow_paws_transcriptions_total", "outcome" => outcome).increment(1);
    histogram!("snow_paws_transcription_seconds").record(seconds(duration));
}

pub fn record_error(kind: &'static str) {
    counter!("snow_paws_errors_total", "kind" => kind).increment(1);
}
