//! Shared error type across metrix crates.

use thiserror::Error;

/// Caller-facing error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Empty metric name.
    InvalidName,
    /// Metric type missing.
    InvalidType,
    /// Metric type is not gauge/counter.
    UnknownType,
    /// Value missing or not convertible.
    InvalidValue,
    /// Signature missing, malformed or mismatched.
    InvalidSignature,
    /// Payload is not a metric document.
    InvalidJson,
    /// No such metric.
    NotFound,
    /// Configuration rejected at startup.
    InvalidConfig,
    /// Storage or other unexpected failure.
    Internal,
}

impl ErrorCode {
    /// String representation used in responses and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::InvalidName => "INVALID_NAME",
            ErrorCode::InvalidType => "INVALID_TYPE",
            ErrorCode::UnknownType => "UNKNOWN_TYPE",
            ErrorCode::InvalidValue => "INVALID_VALUE",
            ErrorCode::InvalidSignature => "INVALID_SIGNATURE",
            ErrorCode::InvalidJson => "INVALID_JSON",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::InvalidConfig => "INVALID_CONFIG",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, MetricsError>;

/// Unified error type used by core and server.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("invalid metric name")]
    InvalidName,
    #[error("invalid metric type")]
    InvalidType,
    #[error("unknown metric type: {0}")]
    UnknownType(String),
    #[error("invalid metric value: {0}")]
    InvalidValue(String),
    #[error("invalid signature")]
    InvalidSignature,
    #[error("invalid json: {0}")]
    InvalidJson(String),
    #[error("metric not found")]
    NotFound,
    #[error("invalid config: {0}")]
    Config(String),
    #[error("storage io: {0}")]
    Io(#[from] std::io::Error),
    #[error("internal: {0}")]
    Internal(String),
}

impl MetricsError {
    /// Map internal error to a stable caller-facing code.
    pub fn client_code(&self) -> ErrorCode {
        match self {
            MetricsError::InvalidName => ErrorCode::InvalidName,
            MetricsError::InvalidType => ErrorCode::InvalidType,
            MetricsError::UnknownType(_) => ErrorCode::UnknownType,
            MetricsError::InvalidValue(_) => ErrorCode::InvalidValue,
            MetricsError::InvalidSignature => ErrorCode::InvalidSignature,
            MetricsError::InvalidJson(_) => ErrorCode::InvalidJson,
            MetricsError::NotFound => ErrorCode::NotFound,
            MetricsError::Config(_) => ErrorCode::InvalidConfig,
            MetricsError::Io(_) | MetricsError::Internal(_) => ErrorCode::Internal,
        }
    }

    /// True when this is an io error for a missing file.
    pub fn is_missing_file(&self) -> bool {
        matches!(self, MetricsError::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }
}
