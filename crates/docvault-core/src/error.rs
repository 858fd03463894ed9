//! Error types module
//!
//! All failures surfaced by the document vault are unified under `VaultError`.
//! Each variant is tagged with a taxonomy kind (`error_code`) and knows which
//! parts of itself are safe to show to the caller.

use serde::Serialize;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for rejected or expired requests
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
pub trait ErrorMetadata {
    /// HTTP-equivalent status code
    fn http_status_code(&self) -> u16;

    /// Machine-readable taxonomy tag (e.g., "VALIDATION_ERROR")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Caller-safe messages (may differ from the internal error message)
    fn client_messages(&self) -> Vec<String>;

    /// Whether internal details must be kept out of responses
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    /// Rejected before any network I/O
    #[error("Validation failed: {}", reasons.join("; "))]
    Validation { reasons: Vec<String> },

    /// A threat marker matched. Never carries the matched pattern.
    #[error("Content rejected")]
    Security,

    #[error("Upload failed: {0}")]
    Upload(String),

    /// Authentication tag or checksum mismatch
    #[error("Integrity check failed")]
    Integrity,

    #[error("Invalid access token")]
    InvalidToken,

    #[error("Access token has expired")]
    TokenExpired,

    #[error("Upload abandoned before completion")]
    Abandoned,

    #[error("Too many requests")]
    RateLimited,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl VaultError {
    pub fn validation(reason: impl Into<String>) -> Self {
        VaultError::Validation {
            reasons: vec![reason.into()],
        }
    }

    /// Structured, caller-safe representation
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            kind: self.error_code(),
            messages: self.client_messages(),
            retryable: self.is_recoverable(),
        }
    }
}

impl From<serde_json::Error> for VaultError {
    fn from(err: serde_json::Error) -> Self {
        VaultError::Internal(format!("JSON error: {}", err))
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, sensitive, log_level).
fn vault_error_static_metadata(err: &VaultError) -> (u16, &'static str, bool, bool, LogLevel) {
    match err {
        VaultError::Validation { .. } => (422, "VALIDATION_ERROR", false, false, LogLevel::Debug),
        VaultError::Security => (422, "SECURITY_ERROR", false, false, LogLevel::Warn),
        VaultError::Upload(_) => (502, "UPLOAD_ERROR", true, true, LogLevel::Error),
        VaultError::Integrity => (500, "INTEGRITY_ERROR", false, true, LogLevel::Error),
        VaultError::InvalidToken => (401, "INVALID_TOKEN", false, false, LogLevel::Warn),
        VaultError::TokenExpired => (401, "TOKEN_EXPIRED", false, false, LogLevel::Debug),
        VaultError::Abandoned => (499, "UPLOAD_ABANDONED", true, false, LogLevel::Warn),
        VaultError::RateLimited => (429, "RATE_LIMITED", true, false, LogLevel::Debug),
        VaultError::Config(_) => (500, "CONFIG_ERROR", false, true, LogLevel::Error),
        VaultError::Internal(_) => (500, "INTERNAL_ERROR", true, true, LogLevel::Error),
    }
}

impl ErrorMetadata for VaultError {
    fn http_status_code(&self) -> u16 {
        vault_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        vault_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        vault_error_static_metadata(self).2
    }

    fn client_messages(&self) -> Vec<String> {
        match self {
            VaultError::Validation { reasons } => reasons.clone(),
            VaultError::Security => vec!["Content rejected".to_string()],
            VaultError::Upload(_) => {
                vec!["The document could not be stored. Please try again.".to_string()]
            }
            VaultError::Integrity => vec!["The document could not be verified.".to_string()],
            VaultError::InvalidToken => vec!["Invalid access token".to_string()],
            VaultError::TokenExpired => vec!["Access token has expired".to_string()],
            VaultError::Abandoned => vec!["Upload was cancelled".to_string()],
            VaultError::RateLimited => {
                vec!["Too many uploads. Please wait and try again.".to_string()]
            }
            VaultError::Config(_) | VaultError::Internal(_) => {
                vec!["An internal error occurred".to_string()]
            }
        }
    }

    fn is_sensitive(&self) -> bool {
        vault_error_static_metadata(self).3
    }

    fn log_level(&self) -> LogLevel {
        vault_error_static_metadata(self).4
    }
}

/// JSON-serializable error returned to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorResponse {
    pub kind: &'static str,
    pub messages: Vec<String>,
    pub retryable: bool,
}
