use std::path::PathBuf;

/// Sentinel error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration file not found or invalid
    #[error("config error: {message}")]
    Config {
        message: String,
        path: Option<PathBuf>,
    },

    /// Invalid command-line arguments
    #[error("argument error: {0}")]
    Argument(String),

    /// File I/O error
    #[error("io error: {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Rule registration or loading failure
    #[error("rule error: {0}")]
    Rule(String),

    /// Report could not be written
    #[error("report error: {path}: {message}")]
    Report { path: PathBuf, message: String },

    /// Internal error (bug)
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type using sentinel Error
pub type Result<T> = std::result::Result<T, Error>;

/// Exit codes for the sentinel binary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    /// Analysis ran and found no matches
    Success = 0,
    /// Analysis ran and found matches
    MatchesFound = 1,
    /// Configuration or argument error
    ConfigError = 2,
    /// Internal error
    InternalError = 3,
}

impl From<&Error> for ExitCode {
    fn from(err: &Error) -> Self {
        match err {
            Error::Config { .. } | Error::Argument(_) | Error::Rule(_) => ExitCode::ConfigError,
            Error::Io { .. } | Error::Report { .. } | Error::Internal(_) => {
                ExitCode::InternalError
            }
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
