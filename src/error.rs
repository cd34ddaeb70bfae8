//! Unified error hierarchy for cpetrs
//!
//! True faults only: file loading, malformed columns, configuration.
//! Degraded analysis input is handled with defaults and status codes in the
//! pipeline itself and never surfaces here (see the snapshot builder and the
//! classifier status fields).

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for all cpetrs operations
#[derive(Debug, Error)]
pub enum CpetError {
    /// Signal table / input file loading errors
    #[error("Import error: {0}")]
    Import(#[from] ImportError),

    /// Structural validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Input loading specific errors
#[derive(Debug, Error)]
pub enum ImportError {
    /// File not found at specified path
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Required column missing from the signal table
    #[error("Missing required column: {column}")]
    MissingColumn { column: String },

    /// Cell or document could not be parsed
    #[error("Parse error in {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    /// Time column runs backwards
    #[error("Non-monotonic time at row {row}")]
    NonMonotonicTime { row: usize },

    /// Unsupported input format
    #[error("Unsupported format: {format}")]
    UnsupportedFormat { format: String },
}

/// Result type alias for cpetrs operations
pub type Result<T> = std::result::Result<T, CpetError>;

impl CpetError {
    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            CpetError::Import(ImportError::FileNotFound { .. }) => ErrorSeverity::Warning,
            CpetError::Validation(_) => ErrorSeverity::Warning,
            CpetError::Import(_) => ErrorSeverity::Error,
            CpetError::Io(_) => ErrorSeverity::Error,
            CpetError::Configuration(_) => ErrorSeverity::Error,
            CpetError::Internal(_) => ErrorSeverity::Critical,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            CpetError::Import(ImportError::FileNotFound { path }) => {
                format!("Could not find input file: {}", path.display())
            }
            CpetError::Import(ImportError::MissingColumn { column }) => {
                format!(
                    "The signal table is missing the required '{}' column.",
                    column
                )
            }
            CpetError::Import(ImportError::NonMonotonicTime { row }) => {
                format!(
                    "The signal table time column decreases at row {}. Export the test again without re-sorting.",
                    row
                )
            }
            _ => self.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Critical system error requiring immediate attention
    Critical,
    /// Error that prevents operation but system can continue
    Error,
    /// Warning that doesn't prevent operation
    Warning,
    /// Informational message
    Info,
}

impl ErrorSeverity {
    /// Convert to tracing level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            ErrorSeverity::Critical => tracing::Level::ERROR,
            ErrorSeverity::Error => tracing::Level::ERROR,
            ErrorSeverity::Warning => tracing::Level::WARN,
            ErrorSeverity::Info => tracing::Level::INFO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_severity() {
        let err = CpetError::Import(ImportError::FileNotFound {
            path: PathBuf::from("/test/signals.csv"),
        });
        assert_eq!(err.severity(), ErrorSeverity::Warning);

        let err = CpetError::Internal("test".to_string());
        assert_eq!(err.severity(), ErrorSeverity::Critical);
    }

    #[test]
    fn test_user_messages() {
        let err = CpetError::Import(ImportError::MissingColumn {
            column: "Time_s".to_string(),
        });
        assert!(err.user_message().contains("Time_s"));
    }
}
