pub mod error_code;

mod collaborator_error;
mod quarry_error;
mod storage_error;

pub use collaborator_error::{BackendError, ModelError};
pub use error_code::QuarryErrorCode;
pub use quarry_error::{QuarryError, QuarryResult};
pub use storage_error::StorageError;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_errors_surface_their_own_codes() {
        let err: QuarryError = StorageError::DbBusy.into();
        assert_eq!(err.error_code(), error_code::DB_BUSY);
    }

    #[test]
    fn backend_unavailable_maps_to_connection_unavailable() {
        let err = BackendError::Unavailable("refused".into()).into_quarry(&"c9".into());
        assert_eq!(err.error_code(), error_code::CONNECTION_UNAVAILABLE);
        assert!(err.to_string().contains("c9"));
    }

    #[test]
    fn backend_query_failure_keeps_message() {
        let err = BackendError::Query("syntax error at or near".into()).into_quarry(&"c1".into());
        assert!(matches!(err, QuarryError::Backend { ref message } if message.contains("syntax")));
    }
}
