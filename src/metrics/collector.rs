use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use prometheus::core::{Collector, Desc};
use prometheus::proto::{Gauge, Metric, MetricFamily, MetricType, Summary};
use prometheus::{IntCounter, Registry};
use serde::Serialize;

// ─── Metric names ────────────────────────────────────────────────

const REQUESTS_NAME: &str = "http_requests_total";
const ERRORS_NAME: &str = "http_error_total";
const DURATION_NAME: &str = "http_request_duration_nanoseconds";
const AVG_NAME: &str = "http_request_duration_avg_nanoseconds";

// ─── Public types ────────────────────────────────────────────────

/// Thread-safe aggregate of request outcomes and handler timings.
///
/// The timing middleware calls `record_timing()` (usually through a
/// [`TimerSpan`]), the request handler bumps the two counters, and the
/// exposition endpoints call `snapshot()` or `gather()`.
pub struct MetricsCollector {
    registry: Registry,
    /// Count and sum move together, so they share one lock. The registry's
    /// timing collector reads the same lock at scrape time.
    timing: Arc<Mutex<Timing>>,
    requests: IntCounter,
    errors: IntCounter,
}

/// Running count/sum of handler durations, serialized the way the
/// expvar endpoint publishes it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TimingSnapshot {
    #[serde(rename = "Count")]
    pub count: u64,
    /// Nanoseconds
    #[serde(rename = "Sum")]
    pub sum_ns: u64,
    /// Nanoseconds, 0 before the first sample
    #[serde(rename = "Avg")]
    pub avg_ns: u64,
}

/// Point-in-time read of every field in the collector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub requests_total: u64,
    pub errors_total: u64,
    pub timing: TimingSnapshot,
}

/// Scoped timer. Records the elapsed time into the collector when dropped,
/// whether the guarded call returned, panicked or was cancelled.
#[must_use = "the span records on drop; binding it to `_` records immediately"]
pub struct TimerSpan<'a> {
    collector: &'a MetricsCollector,
    start: Instant,
}

// ─── Internal state ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default)]
struct Timing {
    count: u64,
    sum_ns: u64,
}

impl Timing {
    fn snapshot(self) -> TimingSnapshot {
        let avg_ns = if self.count == 0 {
            0
        } else {
            self.sum_ns / self.count
        };
        TimingSnapshot {
            count: self.count,
            sum_ns: self.sum_ns,
            avg_ns,
        }
    }
}

/// Exports the timing pair as a quantile-less summary plus an average
/// gauge, both read under one lock acquisition per scrape.
struct TimingCollector {
    timing: Arc<Mutex<Timing>>,
    descs: Vec<Desc>,
}

// ─── MetricsCollector impl ───────────────────────────────────────

impl MetricsCollector {
    /// Build the collector and register everything in its own registry.
    ///
    /// # Errors
    ///
    /// Returns an error if a metric description is rejected by the registry.
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let requests = IntCounter::new(REQUESTS_NAME, "Total http requests")?;
        let errors = IntCounter::new(ERRORS_NAME, "Total http errors")?;
        let timing = Arc::new(Mutex::new(Timing::default()));

        registry.register(Box::new(requests.clone()))?;
        registry.register(Box::new(errors.clone()))?;
        registry.register(Box::new(TimingCollector::new(timing.clone())?))?;

        Ok(Self {
            registry,
            timing,
            requests,
            errors,
        })
    }

    /// Add one handler duration. Count and sum are updated under the same
    /// lock so a snapshot never sees one without the other.
    pub fn record_timing(&self, elapsed: Duration) {
        let ns = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);

        let mut timing = self.timing.lock();
        timing.count += 1;
        timing.sum_ns = timing.sum_ns.saturating_add(ns);
    }

    /// Start a [`TimerSpan`] that feeds `record_timing()` on drop.
    pub fn start_timer(&self) -> TimerSpan<'_> {
        TimerSpan {
            collector: self,
            start: Instant::now(),
        }
    }

    pub fn inc_requests(&self) {
        self.requests.inc();
    }

    pub fn inc_errors(&self) {
        self.errors.inc();
    }

    /// Produce a read-only snapshot for the exposition endpoints.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let timing = *self.timing.lock();

        MetricsSnapshot {
            requests_total: self.requests.get(),
            errors_total: self.errors.get(),
            timing: timing.snapshot(),
        }
    }

    /// Every registered metric family, ready for a Prometheus encoder.
    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }
}

// ─── TimingCollector impl ────────────────────────────────────────

impl TimingCollector {
    fn new(timing: Arc<Mutex<Timing>>) -> prometheus::Result<Self> {
        let descs = vec![
            Desc::new(
                DURATION_NAME.to_owned(),
                "Wall time spent in the instrumented handler".to_owned(),
                Vec::new(),
                HashMap::new(),
            )?,
            Desc::new(
                AVG_NAME.to_owned(),
                "Mean wall time per instrumented request, 0 before the first one".to_owned(),
                Vec::new(),
                HashMap::new(),
            )?,
        ];
        Ok(Self { timing, descs })
    }
}

fn family(desc: &Desc, kind: MetricType, metric: Metric) -> MetricFamily {
    let mut family = MetricFamily::default();
    family.set_name(desc.fq_name.clone());
    family.set_help(desc.help.clone());
    family.set_field_type(kind);
    family.mut_metric().push(metric);
    family
}

impl Collector for TimingCollector {
    fn desc(&self) -> Vec<&Desc> {
        self.descs.iter().collect()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let timing = self.timing.lock().snapshot();

        let mut summary = Summary::default();
        summary.set_sample_count(timing.count);
        summary.set_sample_sum(timing.sum_ns as f64);
        let mut duration = Metric::default();
        duration.set_summary(summary);

        let mut gauge = Gauge::default();
        gauge.set_value(timing.avg_ns as f64);
        let mut avg = Metric::default();
        avg.set_gauge(gauge);

        vec![
            family(&self.descs[0], MetricType::SUMMARY, duration),
            family(&self.descs[1], MetricType::GAUGE, avg),
        ]
    }
}

// ─── TimerSpan impl ──────────────────────────────────────────────

impl TimerSpan<'_> {
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for TimerSpan<'_> {
    fn drop(&mut self) {
        self.collector.record_timing(self.start.elapsed());
    }
}
