//! Stable, machine-readable error codes.
//!
//! Execution records persist these strings, so never rename an existing code.

pub const RESOLUTION_AMBIGUOUS: &str = "RESOLUTION_AMBIGUOUS";
pub const UNKNOWN_TARGET: &str = "UNKNOWN_TARGET";
pub const TRANSLATION_ERROR: &str = "TRANSLATION_ERROR";
pub const UNSAFE_QUERY_REJECTED: &str = "UNSAFE_QUERY_REJECTED";
pub const EXECUTION_TIMEOUT: &str = "EXECUTION_TIMEOUT";
pub const CONNECTION_UNAVAILABLE: &str = "CONNECTION_UNAVAILABLE";
/// Informational only: attached to log events when a result set was cut.
pub const RESULT_TRUNCATED: &str = "RESULT_TRUNCATED";
pub const TRANSLATION_NOT_FOUND: &str = "TRANSLATION_NOT_FOUND";
pub const EXECUTION_NOT_FOUND: &str = "EXECUTION_NOT_FOUND";
pub const INVALID_TRANSITION: &str = "INVALID_TRANSITION";
pub const BACKEND_ERROR: &str = "BACKEND_ERROR";
pub const INVALID_INPUT: &str = "INVALID_INPUT";
pub const CONFIG_ERROR: &str = "CONFIG_ERROR";
pub const CONCURRENCY_ERROR: &str = "CONCURRENCY_ERROR";
pub const SERIALIZATION_ERROR: &str = "SERIALIZATION_ERROR";
pub const STORAGE_ERROR: &str = "STORAGE_ERROR";
pub const DB_BUSY: &str = "DB_BUSY";
pub const MIGRATION_FAILED: &str = "MIGRATION_FAILED";

/// Implemented by every error enum in the workspace.
pub trait QuarryErrorCode {
    fn error_code(&self) -> &'static str;
}
