use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Anything that stops the server from coming up. All of these are fatal.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("error opening log file {}: {source}", path.display())]
    LogFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to install log subscriber: {0}")]
    Subscriber(#[from] tracing_subscriber::util::TryInitError),

    #[error("failed to register metrics: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("server exited with error: {0}")]
    Serve(#[source] io::Error),
}
