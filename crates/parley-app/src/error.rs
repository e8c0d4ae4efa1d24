//! Parley: application error types.

use thiserror::Error;

/// Startup and runtime errors for the terminal front-end.
#[derive(Debug, Error)]
pub enum AppError {
    /// An environment variable is malformed.
    #[error("configuration error: {0}")]
    Config(String),

    /// The tracing or OTLP pipeline could not be installed.
    #[error("telemetry error: {0}")]
    Telemetry(String),

    /// Reading commands or writing output failed.
    #[error("terminal error: {0}")]
    Io(#[from] std::io::Error),

    /// An HTTP client could not be built.
    #[error("http client error: {0}")]
    Http(String),
}
