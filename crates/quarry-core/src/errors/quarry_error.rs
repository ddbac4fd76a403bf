use super::error_code::{self, QuarryErrorCode};
use super::StorageError;
use crate::types::Alternative;

/// Top-level error type for the translation-and-execution engine.
#[derive(Debug, thiserror::Error)]
pub enum QuarryError {
    #[error("no confident target for query: {message}")]
    ResolutionAmbiguous {
        message: String,
        /// Best candidates for the caller to choose from, highest score first.
        candidates: Vec<Alternative>,
    },

    #[error("unknown target: {target}")]
    UnknownTarget { target: String },

    #[error("translation failed: {reason}")]
    TranslationError { reason: String },

    #[error("unsafe query rejected ({verb}): {reason}")]
    UnsafeQueryRejected { verb: String, reason: String },

    #[error("execution timed out after {timeout_ms}ms")]
    ExecutionTimeout { timeout_ms: u64 },

    #[error("connection {connection_id} unavailable: {reason}")]
    ConnectionUnavailable {
        connection_id: String,
        reason: String,
    },

    #[error("translation not found: {id}")]
    TranslationNotFound { id: String },

    #[error("execution not found: {id}")]
    ExecutionNotFound { id: String },

    #[error("execution {execution_id} cannot move from {from} to {to}")]
    InvalidTransition {
        execution_id: String,
        from: String,
        to: String,
    },

    #[error("query failed on backend: {message}")]
    Backend { message: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("concurrency error: {0}")]
    Concurrency(String),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl QuarryErrorCode for QuarryError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::ResolutionAmbiguous { .. } => error_code::RESOLUTION_AMBIGUOUS,
            Self::UnknownTarget { .. } => error_code::UNKNOWN_TARGET,
            Self::TranslationError { .. } => error_code::TRANSLATION_ERROR,
            Self::UnsafeQueryRejected { .. } => error_code::UNSAFE_QUERY_REJECTED,
            Self::ExecutionTimeout { .. } => error_code::EXECUTION_TIMEOUT,
            Self::ConnectionUnavailable { .. } => error_code::CONNECTION_UNAVAILABLE,
            Self::TranslationNotFound { .. } => error_code::TRANSLATION_NOT_FOUND,
            Self::ExecutionNotFound { .. } => error_code::EXECUTION_NOT_FOUND,
            Self::InvalidTransition { .. } => error_code::INVALID_TRANSITION,
            Self::Backend { .. } => error_code::BACKEND_ERROR,
            Self::InvalidInput(_) => error_code::INVALID_INPUT,
            Self::Config(_) => error_code::CONFIG_ERROR,
            Self::Concurrency(_) => error_code::CONCURRENCY_ERROR,
            Self::Storage(e) => e.error_code(),
            Self::Serialization(_) => error_code::SERIALIZATION_ERROR,
        }
    }
}

impl QuarryError {
    pub fn connection_unavailable(connection_id: impl ToString, reason: impl Into<String>) -> Self {
        Self::ConnectionUnavailable {
            connection_id: connection_id.to_string(),
            reason: reason.into(),
        }
    }

    pub fn translation(reason: impl Into<String>) -> Self {
        Self::TranslationError {
            reason: reason.into(),
        }
    }
}

/// Convenience type alias.
pub type QuarryResult<T> = Result<T, QuarryError>;
