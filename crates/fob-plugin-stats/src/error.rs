//! Error types for fob-plugin-stats.

/// Error types for the Rolldown stats adapter.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Rolldown failed to produce the bundle; completion was not reported.
    #[error("Rolldown bundler error: {0}")]
    Bundler(String),

    /// A blocking stats task failed to complete.
    #[error("Stats task failed: {0}")]
    Task(String),

    /// Error from the build stats core.
    #[error(transparent)]
    Stats(#[from] fob_stats::Error),
}

/// Result type alias for fob-plugin-stats operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a bundler error from a Rolldown diagnostics batch.
    pub fn from_rolldown_batch(error: &dyn std::fmt::Debug) -> Self {
        Error::Bundler(format!("{:?}", error))
    }
}

impl miette::Diagnostic for Error {
    fn code(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        match self {
            Error::Bundler(_) => Some(Box::new("BUNDLER_ERROR")),
            Error::Task(_) => Some(Box::new("STATS_TASK_ERROR")),
            Error::Stats(inner) => inner.code(),
        }
    }

    fn help(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        match self {
            Error::Bundler(_) => Some(Box::new(
                "The build failed before completing, so no stats record was emitted for it.",
            )),
            Error::Task(_) => Some(Box::new(
                "Reading module sources was interrupted; the build output itself is unaffected.",
            )),
            Error::Stats(inner) => inner.help(),
        }
    }
}
