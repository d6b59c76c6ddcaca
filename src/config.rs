use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

/// Runtime configuration. Every flag can also come from the environment.
#[derive(Debug, Clone, Parser)]
#[command(name = "request-metrics", version, about = "Instrumented HTTP server with a scrapeable metrics endpoint")]
pub struct Config {
    /// Port to listen on (all interfaces)
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// File that receives one log line per event (appended, created if missing)
    #[arg(long, env = "LOG_FILE", default_value = "testlogfile")]
    pub log_file: PathBuf,

    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Seed for the simulated work; random when absent
    #[arg(long, env = "WORK_SEED")]
    pub work_seed: Option<u64>,

    /// Milliseconds slept per unit drawn by the simulated work
    #[arg(long, env = "WORK_UNIT_MS", default_value_t = 1)]
    pub work_unit_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

impl Config {
    pub fn work_unit(&self) -> Duration {
        Duration::from_millis(self.work_unit_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let config = Config::try_parse_from([
            "request-metrics",
            "--port",
            "9090",
            "--log-file",
            "/tmp/server.log",
            "--log-format",
            "json",
            "--work-seed",
            "7",
            "--work-unit-ms",
            "0",
        ])
        .unwrap();

        assert_eq!(config.port, 9090);
        assert_eq!(config.log_file, PathBuf::from("/tmp/server.log"));
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.work_seed, Some(7));
        assert_eq!(config.work_unit(), Duration::ZERO);
    }

    #[test]
    fn rejects_unknown_log_format() {
        let err = Config::try_parse_from(["request-metrics", "--log-format", "xml"]);
        assert!(err.is_err());
    }

    #[test]
    fn rejects_out_of_range_port() {
        let err = Config::try_parse_from(["request-metrics", "--port", "70000"]);
        assert!(err.is_err());
    }
}
