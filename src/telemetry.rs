//! Log sink setup and the structured context handed down the call chain.

use std::fs::OpenOptions;
use std::sync::Arc;

use tracing::Span;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{Config, LogFormat};
use crate::error::StartupError;

/// Install the global subscriber, appending to `config.log_file`.
///
/// `RUST_LOG` overrides the default `info` filter.
pub fn init_tracing(config: &Config) -> Result<(), StartupError> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_file)
        .map_err(|source| StartupError::LogFile {
            path: config.log_file.clone(),
            source,
        })?;
    let writer = Arc::new(file);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(env_filter);

    match config.log_format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(writer))
            .try_init()?,
        LogFormat::Text => registry
            .with(fmt::layer().with_ansi(false).with_writer(writer))
            .try_init()?,
    }

    Ok(())
}

/// Immutable logging context.
///
/// Each layer derives a child context carrying its own fields instead of
/// mutating the parent, so whatever is logged through a context carries the
/// fields of every ancestor.
#[derive(Debug, Clone)]
pub struct LogContext {
    span: Span,
}

impl LogContext {
    /// Top-level context for the whole process.
    pub fn root(app: &str) -> Self {
        Self {
            span: tracing::info_span!("app", app = %app),
        }
    }

    /// Child context for one inbound request.
    pub fn for_request(&self, method: &str, path: &str, request_id: &str) -> Self {
        Self {
            span: tracing::info_span!(
                parent: &self.span,
                "request",
                method = %method,
                path = %path,
                request_id = %request_id
            ),
        }
    }

    /// Child context for a named function inside a request.
    pub fn for_func(&self, func: &'static str) -> Self {
        Self {
            span: tracing::info_span!(parent: &self.span, "func", func),
        }
    }

    /// Run `f` with this context's span entered; events emitted inside
    /// carry its fields.
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        self.span.in_scope(f)
    }
}
