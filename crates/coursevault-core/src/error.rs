//! Error types module
//!
//! All errors are unified under the `AppError` enum, which can represent
//! database, storage, authorization, and upload-protocol errors.
//!
//! Authorization denials are not errors from the subsystem's point of view:
//! the service layer returns them as data (`DenyReason`). `AppError::
//! AccessDenied` exists so the HTTP layer can render a denial that escaped
//! as an error path with the same stable reason code.
//!
//! The `Database` variant and `From<sqlx::Error>` are gated behind the
//! `sqlx` feature.

use std::io;

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like expired sessions
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Stable machine-readable reason codes for authorization denials.
///
/// Calling layers branch on these to decide whether to prompt
/// re-authentication, show "not entitled", or surface a generic error.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, utoipa::ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    FileUnavailable,
    InsufficientTier,
    DownloadDisabled,
    StreamDisabled,
    GrantExpired,
    QuotaExceeded,
    ContentRestricted,
    NotFound,
    SuspiciousActivity,
}

impl DenyReason {
    /// The snake_case wire code for this reason.
    pub fn code(&self) -> &'static str {
        match self {
            DenyReason::FileUnavailable => "file_unavailable",
            DenyReason::InsufficientTier => "insufficient_tier",
            DenyReason::DownloadDisabled => "download_disabled",
            DenyReason::StreamDisabled => "stream_disabled",
            DenyReason::GrantExpired => "grant_expired",
            DenyReason::QuotaExceeded => "quota_exceeded",
            DenyReason::ContentRestricted => "content_restricted",
            DenyReason::NotFound => "not_found",
            DenyReason::SuspiciousActivity => "suspicious_activity",
        }
    }
}

impl std::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Metadata for error responses - defines how an error should be presented
/// This trait allows errors to self-describe their HTTP response characteristics
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "STORAGE_ERROR")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden in production
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[cfg(not(feature = "sqlx"))]
    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("File too large: {0}")]
    PayloadTooLarge(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Access denied: {0}")]
    AccessDenied(DenyReason),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Upload token has expired")]
    TokenExpired,

    #[error("Upload token is invalid")]
    TokenInvalid,

    #[error("Upload session has expired")]
    SessionExpired,

    #[error("Upload session not found or not usable")]
    SessionInvalid,

    #[error("Upload session was already consumed")]
    SessionAlreadyConsumed,

    #[error("Uploaded size {actual} does not match declared size {expected}")]
    SizeMismatch { expected: i64, actual: i64 },

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

// Error conversion implementations following Rust best practices
#[cfg(feature = "sqlx")]
impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        AppError::Database(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::InvalidInput(format!("UUID parsing error: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::InvalidInput(format!("Validation error: {}", err))
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, suggested_action, sensitive, log_level).
/// Reduces duplication in the ErrorMetadata impl; client_message stays per-variant for dynamic content.
fn app_error_static_metadata(
    err: &AppError,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match err {
        AppError::Database(_) => (
            500,
            "DATABASE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::Storage(_) => (
            500,
            "STORAGE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::InvalidInput(_) => (
            400,
            "INVALID_INPUT",
            false,
            Some("Check request parameters and try again"),
            false,
            LogLevel::Debug,
        ),
        AppError::PayloadTooLarge(_) => (
            413,
            "PAYLOAD_TOO_LARGE",
            false,
            Some("Reduce file size"),
            false,
            LogLevel::Debug,
        ),
        AppError::NotFound(_) => (
            404,
            "NOT_FOUND",
            false,
            Some("Verify the resource ID exists"),
            false,
            LogLevel::Debug,
        ),
        AppError::AccessDenied(_) => (
            403,
            "ACCESS_DENIED",
            false,
            Some("Request a grant or check entitlements"),
            false,
            LogLevel::Debug,
        ),
        AppError::Unauthorized(_) => (
            401,
            "UNAUTHORIZED",
            false,
            Some("Authenticate and retry"),
            false,
            LogLevel::Debug,
        ),
        AppError::TokenExpired => (
            410,
            "TOKEN_EXPIRED",
            false,
            Some("Create a new upload session"),
            false,
            LogLevel::Debug,
        ),
        AppError::TokenInvalid => (
            401,
            "TOKEN_INVALID",
            false,
            Some("Create a new upload session"),
            false,
            LogLevel::Warn,
        ),
        AppError::SessionExpired => (
            410,
            "SESSION_EXPIRED",
            false,
            Some("Create a new upload session"),
            false,
            LogLevel::Debug,
        ),
        AppError::SessionInvalid => (
            404,
            "SESSION_INVALID",
            false,
            Some("Create a new upload session"),
            false,
            LogLevel::Debug,
        ),
        AppError::SessionAlreadyConsumed => (
            409,
            "SESSION_CONSUMED",
            false,
            Some("Do not retry with the same token"),
            false,
            LogLevel::Warn,
        ),
        AppError::SizeMismatch { .. } => (
            400,
            "SIZE_MISMATCH",
            false,
            Some("Restart the upload flow with the correct size"),
            false,
            LogLevel::Debug,
        ),
        AppError::Internal(_) => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::InternalWithSource { .. } => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
    }
}

impl AppError {
    /// Get the error type name for detailed error responses
    pub fn error_type(&self) -> &str {
        match self {
            AppError::Database(_) => "Database",
            AppError::Storage(_) => "Storage",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::PayloadTooLarge(_) => "PayloadTooLarge",
            AppError::NotFound(_) => "NotFound",
            AppError::AccessDenied(_) => "AccessDenied",
            AppError::Unauthorized(_) => "Unauthorized",
            AppError::TokenExpired => "TokenExpired",
            AppError::TokenInvalid => "TokenInvalid",
            AppError::SessionExpired => "SessionExpired",
            AppError::SessionInvalid => "SessionInvalid",
            AppError::SessionAlreadyConsumed => "SessionAlreadyConsumed",
            AppError::SizeMismatch { .. } => "SizeMismatch",
            AppError::Internal(_) => "Internal",
            AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Database(_) => "Failed to access database".to_string(),
            AppError::Storage(_) => "Failed to access storage".to_string(),
            AppError::InvalidInput(ref msg) => msg.clone(),
            AppError::PayloadTooLarge(ref msg) => msg.clone(),
            AppError::NotFound(ref msg) => msg.clone(),
            AppError::AccessDenied(reason) => {
                format!("You don't have permission to access this file ({})", reason)
            }
            AppError::Unauthorized(ref msg) => msg.clone(),
            AppError::TokenExpired => "Upload token has expired".to_string(),
            AppError::TokenInvalid => "Invalid upload token".to_string(),
            AppError::SessionExpired => "Upload session has expired".to_string(),
            AppError::SessionInvalid => "Invalid or expired upload session".to_string(),
            AppError::SessionAlreadyConsumed => {
                "Upload session was already consumed".to_string()
            }
            AppError::SizeMismatch { expected, actual } => {
                format!(
                    "Uploaded size {} does not match declared size {}",
                    actual, expected
                )
            }
            AppError::Internal(_) => "Internal server error".to_string(),
            AppError::InternalWithSource { .. } => "Internal server error".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_metadata_database() {
        #[cfg(feature = "sqlx")]
        let err = AppError::from(sqlx::Error::PoolClosed);
        #[cfg(not(feature = "sqlx"))]
        let err = AppError::Database("pool closed".to_string());
        assert_eq!(err.http_status_code(), 500);
        assert_eq!(err.error_code(), "DATABASE_ERROR");
        assert!(err.is_recoverable());
        assert_eq!(err.client_message(), "Failed to access database");
        assert!(err.is_sensitive());
        assert_eq!(err.log_level(), LogLevel::Error);
    }

    #[test]
    fn test_error_metadata_access_denied() {
        let err = AppError::AccessDenied(DenyReason::QuotaExceeded);
        assert_eq!(err.http_status_code(), 403);
        assert_eq!(err.error_code(), "ACCESS_DENIED");
        assert!(!err.is_recoverable());
        assert!(err.client_message().contains("quota_exceeded"));
        assert!(!err.is_sensitive());
        assert_eq!(err.log_level(), LogLevel::Debug);
    }

    #[test]
    fn test_error_metadata_size_mismatch() {
        let err = AppError::SizeMismatch {
            expected: 1000,
            actual: 900,
        };
        assert_eq!(err.http_status_code(), 400);
        assert_eq!(err.error_code(), "SIZE_MISMATCH");
        assert!(!err.is_recoverable());
        assert!(err.client_message().contains("1000"));
        assert!(err.client_message().contains("900"));
    }

    #[test]
    fn test_session_protocol_status_codes() {
        assert_eq!(AppError::TokenExpired.http_status_code(), 410);
        assert_eq!(AppError::TokenInvalid.http_status_code(), 401);
        assert_eq!(AppError::SessionExpired.http_status_code(), 410);
        assert_eq!(AppError::SessionInvalid.http_status_code(), 404);
        assert_eq!(AppError::SessionAlreadyConsumed.http_status_code(), 409);
    }

    #[test]
    fn test_deny_reason_codes_are_stable() {
        assert_eq!(DenyReason::FileUnavailable.code(), "file_unavailable");
        assert_eq!(DenyReason::InsufficientTier.code(), "insufficient_tier");
        assert_eq!(DenyReason::DownloadDisabled.code(), "download_disabled");
        assert_eq!(DenyReason::StreamDisabled.code(), "stream_disabled");
        assert_eq!(DenyReason::GrantExpired.code(), "grant_expired");
        assert_eq!(DenyReason::QuotaExceeded.code(), "quota_exceeded");
        assert_eq!(DenyReason::ContentRestricted.code(), "content_restricted");
        assert_eq!(DenyReason::SuspiciousActivity.code(), "suspicious_activity");
    }

    #[test]
    fn test_deny_reason_serde_matches_code() {
        let json = serde_json::to_string(&DenyReason::QuotaExceeded).expect("serialize");
        assert_eq!(json, "\"quota_exceeded\"");
    }
}
