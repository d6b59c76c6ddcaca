use axum::{
    middleware as axum_mw,
    routing::{any, get, MethodRouter},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use crate::error::StartupError;
use crate::handlers;
use crate::metrics::exposition;
use crate::middleware::timing;
use crate::AppState;

/// Builds the full Axum `Router`.
///
/// Everything that is not an exposition path falls through to the
/// instrumented work handler, wrapped in the timing layer. Scrapes never
/// pass through that layer and never touch the counters.
pub fn create_router(state: Arc<AppState>) -> Router {
    let instrumented: MethodRouter = any(handlers::work::instrumented_work)
        .layer(axum_mw::from_fn_with_state(
            state.metrics.clone(),
            timing::timing_middleware,
        ))
        .with_state(state.clone());

    Router::new()
        // ── Exposition ──────────────────────────────────────────
        .route("/metrics", get(exposition::get_metrics))
        .route("/debug/vars", get(exposition::get_vars))
        .with_state(state)
        // ── `/` and every other path run the instrumented work ──
        .fallback_service(instrumented)
        .layer(CorsLayer::permissive())
}

/// Bind the listening socket. Failure here aborts startup.
pub async fn bind(addr: &str) -> Result<TcpListener, StartupError> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| StartupError::Bind {
            addr: addr.to_owned(),
            source,
        })
}
