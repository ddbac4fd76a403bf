//! Shared data structures.

pub mod api;
pub mod connection;
pub mod execution;
pub mod identifiers;
pub mod query;
pub mod schema;
pub mod translation;

pub use connection::{BackendFamily, BackendKind, Caller, Connection, ConnectionStatus, Permission};
pub use execution::{
    ConfirmationReason, ConfirmationRequest, ExecuteOutcome, ExecutionFailure, ExecutionMode,
    ExecutionRecord, ExecutionResult, ExecutionStatus, FailedExecution, PreviewResult, Row,
};
pub use identifiers::{ConnectionId, EntityRef, ExecutionId, OrganizationId, TranslationId};
pub use query::{FindQuery, PipelineQuery, QueryBody, QueryKind, SqlQuery};
pub use schema::{FieldDef, IndexDef, SchemaEntity, SchemaSnapshot};
pub use translation::{
    Alternative, ConversationRole, ConversationTurn, ModelSafetyHint, ResolvedTarget, SafetyTier,
    Translation,
};
