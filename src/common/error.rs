//! Error handling primitives shared across the core.
//!
//! Only invalid input and the caller's own workload failures are meant to reach
//! request callers. Remote and persisted-data failures are absorbed where they
//! happen and logged.

use thiserror::Error;

/// Stable error codes for callers that need something machine parsable.
#[repr(u32)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ErrorCode {
    /// Success code used as a sentinel.
    Ok = 0,
    /// Input failed validation.
    InvalidInput = 1,
    /// Filesystem failure.
    Io = 2,
    /// Persisted data could not be decoded.
    Corrupt = 3,
    /// Configuration value missing or out of range.
    Config = 4,
    /// The caller-supplied workload failed.
    Workload = 5,
    /// Catch-all for bugs and unexpected states.
    Internal = 6,
}

/// Canonical error type for the core.
#[derive(Debug, Error)]
pub enum MemError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid value for {field}: {message}")]
    Config { field: String, message: String },

    #[error("workload failed: {0}")]
    Workload(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Result alias used throughout the crate.
pub type MemResult<T> = Result<T, MemError>;

impl MemError {
    /// Validation helper.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Configuration helper.
    pub fn config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Internal error helper.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Machine parsable code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            MemError::InvalidInput(_) => ErrorCode::InvalidInput,
            MemError::Io(_) => ErrorCode::Io,
            MemError::Csv(_) | MemError::Json(_) => ErrorCode::Corrupt,
            MemError::Config { .. } => ErrorCode::Config,
            MemError::Workload(_) => ErrorCode::Workload,
            MemError::Internal(_) => ErrorCode::Internal,
        }
    }

    /// True for errors that are the caller's fault rather than the system's.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, MemError::InvalidInput(_))
    }
}
