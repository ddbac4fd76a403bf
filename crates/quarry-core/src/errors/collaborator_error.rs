//! Errors reported by external collaborators (language model, query backend).

use super::error_code::{self, QuarryErrorCode};
use super::QuarryError;
use crate::types::ConnectionId;

/// Failure of the language-model call.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ModelError {
    /// Rate limits, 5xx, dropped connections. Worth one retry.
    #[error("transient model failure: {0}")]
    Transient(String),

    #[error("model failure: {0}")]
    Permanent(String),
}

impl ModelError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

impl QuarryErrorCode for ModelError {
    fn error_code(&self) -> &'static str {
        error_code::TRANSLATION_ERROR
    }
}

/// Failure of a query against a backing database.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BackendError {
    #[error("backend unreachable: {0}")]
    Unavailable(String),

    #[error("query rejected by backend: {0}")]
    Query(String),
}

impl BackendError {
    pub fn into_quarry(self, connection_id: &ConnectionId) -> QuarryError {
        match self {
            Self::Unavailable(reason) => QuarryError::connection_unavailable(connection_id, reason),
            Self::Query(message) => QuarryError::Backend { message },
        }
    }
}

impl QuarryErrorCode for BackendError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Unavailable(_) => error_code::CONNECTION_UNAVAILABLE,
            Self::Query(_) => error_code::BACKEND_ERROR,
        }
    }
}
