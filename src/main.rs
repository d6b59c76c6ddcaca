use clap::Parser;
use std::sync::Arc;

mod config;
mod error;
mod handlers;
mod metrics;
mod middleware;
mod server;
mod telemetry;
#[cfg(test)]
mod test_support;
mod work;

use config::Config;
use error::StartupError;
use telemetry::LogContext;

const APP_NAME: &str = "request-metrics";

/// Shared application state available to every handler via `State<Arc<AppState>>`.
pub struct AppState {
    /// One collector per process, shared by the timing layer, the request
    /// handler and the exposition endpoints.
    pub metrics: Arc<metrics::MetricsCollector>,

    /// The business operation behind `/`.
    pub work: Arc<dyn work::UnitOfWork>,

    /// Root log context; handlers derive per-request children from it.
    pub log: LogContext,

    /// Published on `/debug/vars`.
    pub port: u16,
}

#[tokio::main]
async fn main() {
    let config = Config::parse();

    if let Err(e) = run(config).await {
        eprintln!("❌ {e}");
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<(), StartupError> {
    // ── 1. Log sink ──────────────────────────────────────────────
    telemetry::init_tracing(&config)?;
    let log = LogContext::root(APP_NAME);

    // ── 2. Build shared state ────────────────────────────────────
    let state = Arc::new(AppState {
        metrics: Arc::new(metrics::MetricsCollector::new()?),
        work: Arc::new(work::SimulatedWork::new(
            work::SeededDraws::new(config.work_seed),
            config.work_unit(),
        )),
        log: log.clone(),
        port: config.port,
    });

    // ── 3. Build Axum router ─────────────────────────────────────
    let app = server::create_router(state);

    // ── 4. Bind & serve ──────────────────────────────────────────
    let listener = server::bind(&format!("0.0.0.0:{}", config.port)).await?;

    let banner = format!("Listening at: http://localhost:{}", config.port);
    println!("{banner}");
    println!("Metrics      → http://localhost:{}/metrics", config.port);
    println!("Vars         → http://localhost:{}/debug/vars", config.port);
    log.in_scope(|| tracing::info!("{banner}"));

    axum::serve(listener, app).await.map_err(StartupError::Serve)
}
