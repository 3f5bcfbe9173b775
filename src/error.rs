//! Error types and exit codes for presenter-engine

use std::process::ExitCode;
use thiserror::Error;

/// Main error type for presenter-engine operations
#[derive(Error, Debug)]
pub enum PresenterError {
    #[error("Corpus query failed: {message}")]
    Corpus { message: String },

    #[error("Content not found: {what}")]
    ContentNotFound { what: String },

    #[error("Settings error: {message}")]
    Settings { message: String },

    #[error("History write failed: {message}")]
    History { message: String },

    #[error("Action failed: {message}")]
    Action { message: String },

    #[error("Address already in use: {addr}")]
    AddressInUse { addr: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PresenterError {
    /// Convert error to a process exit code:
    /// - 0: Address in use (another instance is already serving)
    /// - 1: IO error or failed action
    /// - 2: Corpus / content lookup failure
    /// - 3: Settings or history persistence failure
    /// - 4: Malformed JSON
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::AddressInUse { .. } => ExitCode::SUCCESS,
            Self::Io(_) | Self::Action { .. } => ExitCode::from(1),
            Self::Corpus { .. } | Self::ContentNotFound { .. } => ExitCode::from(2),
            Self::Settings { .. } | Self::History { .. } => ExitCode::from(3),
            Self::Json(_) => ExitCode::from(4),
        }
    }
}

impl From<rusqlite::Error> for PresenterError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Corpus {
            message: e.to_string(),
        }
    }
}

impl From<csv::Error> for PresenterError {
    fn from(e: csv::Error) -> Self {
        Self::History {
            message: e.to_string(),
        }
    }
}

/// Result type alias for presenter-engine operations
pub type Result<T> = std::result::Result<T, PresenterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_in_use_exits_cleanly() {
        let err = PresenterError::AddressInUse {
            addr: "0.0.0.0:1699".to_string(),
        };
        assert_eq!(format!("{:?}", err.exit_code()), format!("{:?}", ExitCode::SUCCESS));
    }

    #[test]
    fn test_sqlite_errors_map_to_corpus() {
        let err: PresenterError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, PresenterError::Corpus { .. }));
    }
}
