use axum::{
    extract::State,
    http::{Method, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use super::{ERROR_BODY, SUCCESS_BODY};
use crate::metrics::MetricsCollector;
use crate::telemetry::LogContext;
use crate::AppState;

// ─── ANY / ───────────────────────────────────────────────────────

/// Runs the unit of work for one request and reports on it.
///
/// The work itself only returns an outcome; this handler turns it into a
/// status and body, counts the request (and the error, if any) and logs it.
/// Failures are terminal for the request and are never retried.
pub async fn instrumented_work(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let path = uri.path_and_query().map_or("/", |pq| pq.as_str());
    let log = state.log.for_request(method.as_str(), path, &request_id);

    let mut record = RequestRecord::start(&state.metrics, &log);

    match state.work.run(&log).await {
        Ok(()) => SUCCESS_BODY.into_response(),
        Err(failure) => {
            record.status = StatusCode::BAD_REQUEST;
            state.metrics.inc_errors();
            log.in_scope(|| tracing::error!(error = %failure, "OMG Error!"));
            (StatusCode::BAD_REQUEST, ERROR_BODY).into_response()
        }
    }
}

// ─── Exit-path bookkeeping ───────────────────────────────────────

/// Counts the request and writes its summary line when dropped, so both
/// happen on every way out of the handler.
struct RequestRecord<'a> {
    metrics: &'a MetricsCollector,
    log: &'a LogContext,
    start: Instant,
    status: StatusCode,
}

impl<'a> RequestRecord<'a> {
    fn start(metrics: &'a MetricsCollector, log: &'a LogContext) -> Self {
        Self {
            metrics,
            log,
            start: Instant::now(),
            status: StatusCode::OK,
        }
    }
}

impl Drop for RequestRecord<'_> {
    fn drop(&mut self) {
        self.metrics.inc_requests();
        let duration = self.start.elapsed().as_secs_f64();
        let status = self.status.as_u16();
        self.log
            .in_scope(|| tracing::info!(status, duration, "request complete"));
    }
}
