//! Error types for fob-stats.
//!
//! The observer itself never fails. Errors come from the edges: loading
//! configuration, parsing a stats document, or opening a sink.

/// Error types for fob-stats operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration sources could not be merged or extracted.
    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Stats document is not valid JSON or has the wrong shape.
    #[error("Invalid stats document: {0}")]
    InvalidStats(#[source] serde_json::Error),

    /// Snapshot could not be serialized.
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// I/O error with context message.
    #[error("{message}")]
    IoError {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for fob-stats operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(error: figment::Error) -> Self {
        Error::Config(Box::new(error))
    }
}

impl miette::Diagnostic for Error {
    fn code(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        Some(Box::new(match self {
            Error::Config(_) => "STATS_CONFIG_ERROR",
            Error::InvalidConfig(_) => "STATS_INVALID_CONFIG",
            Error::InvalidStats(_) => "STATS_INVALID_DOCUMENT",
            Error::Serialize(_) => "STATS_SERIALIZE_ERROR",
            Error::Io(_) | Error::IoError { .. } => "STATS_IO_ERROR",
        }))
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(miette::Severity::Error)
    }

    fn help(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        match self {
            Error::Config(_) => Some(Box::new(
                "Check fob-stats.toml and FOB_STATS_* environment variables for typos and wrong value types.",
            )),
            Error::InvalidConfig(msg) => Some(Box::new(format!(
                "Check your build stats configuration.\nError: {}",
                msg
            ))),
            Error::InvalidStats(_) => Some(Box::new(
                "Expected a JSON object with optional hash, version, time and modules fields.",
            )),
            _ => None,
        }
    }
}
