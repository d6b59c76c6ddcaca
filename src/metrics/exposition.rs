use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use std::sync::Arc;

use super::collector::{MetricsCollector, TimingSnapshot};
use crate::AppState;

// ─── GET /metrics ────────────────────────────────────────────────

/// Prometheus text exposition of everything in the collector's registry.
pub async fn get_metrics(State(state): State<Arc<AppState>>) -> Response {
    match render_prometheus(&state.metrics) {
        Ok(body) => {
            let content_type = TextEncoder::new().format_type().to_owned();
            ([(header::CONTENT_TYPE, content_type)], body).into_response()
        }
        Err(e) => {
            state
                .log
                .in_scope(|| tracing::error!(error = %e, "Prometheus text encoder failed"));
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

// ─── GET /debug/vars ─────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct PublishedVars {
    pub cmdline: Vec<String>,
    #[serde(rename = "Port")]
    pub port: String,
    #[serde(rename = "Requests")]
    pub requests: TimingSnapshot,
    pub http_requests_total: u64,
    pub http_error_total: u64,
}

/// expvar-style JSON: the process command line, the published port, the
/// timing object and both counters.
pub async fn get_vars(State(state): State<Arc<AppState>>) -> Json<PublishedVars> {
    let snapshot = state.metrics.snapshot();
    Json(PublishedVars {
        cmdline: std::env::args().collect(),
        port: state.port.to_string(),
        requests: snapshot.timing,
        http_requests_total: snapshot.requests_total,
        http_error_total: snapshot.errors_total,
    })
}

// ─── Rendering ───────────────────────────────────────────────────

/// Encode every registered metric family in Prometheus text format.
///
/// # Errors
///
/// Returns an error if the encoder rejects a metric family.
pub fn render_prometheus(metrics: &MetricsCollector) -> prometheus::Result<String> {
    let families = metrics.gather();
    let mut buffer = Vec::with_capacity(1024);
    TextEncoder::new().encode(&families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}
