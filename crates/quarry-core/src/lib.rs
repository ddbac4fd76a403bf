//! # quarry-core
//!
//! Foundation crate for the Quarry translation-and-safe-execution engine.
//! Defines all types, traits, errors, config, and tracing setup.
//! Every other crate in the workspace depends on this.

pub mod config;
pub mod errors;
pub mod tracing;
pub mod traits;
pub mod types;

// Re-export the most commonly used types at the crate root.
pub use config::QuarryConfig;
pub use errors::error_code::QuarryErrorCode;
pub use errors::{QuarryError, QuarryResult, StorageError};
pub use types::identifiers::{ConnectionId, ExecutionId, OrganizationId, TranslationId};
