pub mod collector;
pub mod exposition;

pub use collector::MetricsCollector;
