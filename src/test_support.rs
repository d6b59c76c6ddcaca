use parking_lot::Mutex;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::fmt::MakeWriter;

use crate::metrics::MetricsCollector;
use crate::telemetry::LogContext;
use crate::work::{ScriptedDraws, SimulatedWork, UnitOfWork};
use crate::AppState;

pub const TEST_PORT: u16 = 8080;

/// State whose work replays `draws` and never sleeps.
pub fn state_with_draws(draws: &[u32]) -> Arc<AppState> {
    state_with_work(SimulatedWork::new(
        ScriptedDraws::new(draws.to_vec()),
        Duration::ZERO,
    ))
}

pub fn state_with_work(work: impl UnitOfWork + 'static) -> Arc<AppState> {
    Arc::new(AppState {
        metrics: Arc::new(MetricsCollector::new().unwrap()),
        work: Arc::new(work),
        log: LogContext::root("request-metrics-test"),
        port: TEST_PORT,
    })
}

/// In-memory log sink for asserting on formatted events.
#[derive(Clone, Default)]
pub struct Captured(Arc<Mutex<Vec<u8>>>);

impl io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for Captured {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// JSON subscriber writing into `captured`.
pub fn json_subscriber(captured: &Captured) -> impl tracing::Subscriber + Send + Sync {
    tracing_subscriber::fmt()
        .json()
        .with_writer(captured.clone())
        .finish()
}

pub fn json_lines(captured: &Captured) -> Vec<serde_json::Value> {
    let bytes = captured.0.lock().clone();
    String::from_utf8(bytes)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}
