use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Duration;

use crate::metrics::MetricsCollector;

/// Middleware that feeds the wall time of the wrapped handler into the
/// collector's timing pair.
///
/// The measurement lives in a `TimerSpan`, so it is recorded on every exit
/// path: a normal return, a panic unwinding through here, or the request
/// future being dropped mid-flight. The response passes through untouched.
pub async fn timing_middleware(
    State(metrics): State<Arc<MetricsCollector>>,
    req: Request,
    next: Next,
) -> Response {
    let span = metrics.start_timer();
    let response = next.run(req).await;

    tracing::debug!(
        elapsed_us = saturating_micros(span.elapsed()),
        status = response.status().as_u16(),
        "handler timed"
    );

    // Record before handing the response back to the caller.
    drop(span);
    response
}

fn saturating_micros(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode, middleware, routing::get, Router};
    use tower::ServiceExt;

    fn timed(router: Router, metrics: &Arc<MetricsCollector>) -> Router {
        router.layer(middleware::from_fn_with_state(
            metrics.clone(),
            timing_middleware,
        ))
    }

    fn get_root() -> Request {
        Request::builder().uri("/").body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn records_one_sample_per_call() {
        let metrics = Arc::new(MetricsCollector::new().unwrap());
        let app = timed(Router::new().route("/", get(|| async { "ok" })), &metrics);

        for _ in 0..3 {
            app.clone().oneshot(get_root()).await.unwrap();
        }

        let snap = metrics.snapshot();
        assert_eq!(snap.timing.count, 3);
        // The counters belong to the request handler, not this layer.
        assert_eq!(snap.requests_total, 0);
    }

    #[tokio::test]
    async fn leaves_the_response_alone() {
        let metrics = Arc::new(MetricsCollector::new().unwrap());
        let app = timed(
            Router::new().route("/", get(|| async { (StatusCode::IM_A_TEAPOT, "tea") })),
            &metrics,
        );

        let response = app.oneshot(get_root()).await.unwrap();
        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
        assert!(response.headers().get("server-timing").is_none());

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"tea");
    }

    #[tokio::test]
    async fn measures_time_spent_in_the_handler() {
        let metrics = Arc::new(MetricsCollector::new().unwrap());
        let app = timed(
            Router::new().route(
                "/",
                get(|| async {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    "slow"
                }),
            ),
            &metrics,
        );

        app.oneshot(get_root()).await.unwrap();

        let timing = metrics.snapshot().timing;
        assert_eq!(timing.count, 1);
        assert!(timing.sum_ns >= 5_000_000);
    }

    #[tokio::test]
    async fn records_even_when_the_request_is_abandoned() {
        let metrics = Arc::new(MetricsCollector::new().unwrap());
        let app = timed(
            Router::new().route(
                "/",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    "never"
                }),
            ),
            &metrics,
        );

        let result =
            tokio::time::timeout(Duration::from_millis(10), app.oneshot(get_root())).await;
        assert!(result.is_err());

        assert_eq!(metrics.snapshot().timing.count, 1);
    }

    #[test]
    fn microsecond_conversion_saturates() {
        assert_eq!(saturating_micros(Duration::from_micros(1_500)), 1_500);
        assert_eq!(saturating_micros(Duration::MAX), u64::MAX);
    }
}
