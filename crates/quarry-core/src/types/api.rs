//! Request/response shapes of the external interface.
//!
//! Field names are camelCase to match what calling UIs already consume.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::connection::{BackendFamily, Caller};
use super::execution::{ConfirmationRequest, ExecutionResult, Row};
use super::identifiers::{ConnectionId, ExecutionId, TranslationId};
use super::translation::{Alternative, ConversationTurn, SafetyTier, Translation};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateRequest {
    pub query: String,
    #[serde(default)]
    pub connection_id: Option<ConnectionId>,
    /// Explicit table/collection name.
    #[serde(default)]
    pub entity: Option<String>,
    #[serde(default)]
    pub context: Vec<ConversationTurn>,
    pub caller: Caller,
}

impl TranslateRequest {
    pub fn new(query: impl Into<String>, caller: Caller) -> Self {
        Self {
            query: query.into(),
            connection_id: None,
            entity: None,
            context: Vec::new(),
            caller,
        }
    }

    pub fn on_connection(mut self, connection_id: impl Into<ConnectionId>) -> Self {
        self.connection_id = Some(connection_id.into());
        self
    }

    pub fn on_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    pub fn with_context(mut self, context: Vec<ConversationTurn>) -> Self {
        self.context = context;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedFrom {
    pub connection_name: String,
    pub database: String,
    pub table: String,
    pub score: f64,
    pub match_reasons: Vec<String>,
    pub alternatives: Vec<Alternative>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateResponse {
    pub translation_id: TranslationId,
    pub query: Value,
    pub db_type: String,
    pub explain: String,
    pub auto_detected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detected_from: Option<DetectedFrom>,
    pub estimated_cost: f64,
    pub safety: SafetyTier,
    pub requires_indexes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    pub requires_confirmation: bool,
    /// Set by `explain`: the caller asked for a description, not a run.
    pub explain_only: bool,
}

impl TranslateResponse {
    pub fn from_translation(translation: &Translation, explain_only: bool) -> Self {
        let target = &translation.target;
        let detected_from = target.confidence.map(|score| DetectedFrom {
            connection_name: target.connection_name.clone(),
            database: target.database.clone(),
            table: target.entity.clone(),
            score,
            match_reasons: target.match_reasons.clone(),
            alternatives: target.alternatives.clone(),
        });
        let (collection, table) = match target.backend.family() {
            BackendFamily::Document => (Some(target.entity.clone()), None),
            BackendFamily::Relational => (None, Some(target.entity.clone())),
        };
        Self {
            translation_id: translation.id.clone(),
            query: translation.body.display_value(),
            db_type: target.backend.db_type().to_string(),
            explain: translation.explanation.clone(),
            auto_detected: target.auto_detected,
            detected_from,
            estimated_cost: translation.cost_score,
            safety: translation.safety,
            requires_indexes: translation.required_indexes.clone(),
            collection,
            table,
            requires_confirmation: translation.requires_confirmation,
            explain_only,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewRequest {
    pub translation_id: TranslationId,
    pub connection_id: ConnectionId,
    pub caller: Caller,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResponse {
    pub preview_row_count: u64,
    pub results: Vec<Row>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteRequest {
    pub translation_id: TranslationId,
    pub connection_id: ConnectionId,
    #[serde(default)]
    pub confirmed: bool,
    pub caller: Caller,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationRequired {
    pub requires_confirmation: bool,
    pub message: String,
    pub estimated_cost: f64,
}

impl From<ConfirmationRequest> for ConfirmationRequired {
    fn from(request: ConfirmationRequest) -> Self {
        Self {
            requires_confirmation: true,
            message: request.message,
            estimated_cost: request.estimated_cost,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionSummary {
    pub results: Vec<Row>,
    pub row_count: u64,
    /// Milliseconds.
    pub execution_time: u64,
    pub truncated: bool,
    pub cached: bool,
    pub execution_id: ExecutionId,
}

impl From<ExecutionResult> for ExecutionSummary {
    fn from(result: ExecutionResult) -> Self {
        Self {
            results: result.results,
            row_count: result.row_count,
            execution_time: result.execution_time_ms,
            truncated: result.truncated,
            cached: result.cached,
            execution_id: result.execution_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExecuteResponse {
    ConfirmationRequired(ConfirmationRequired),
    Completed(ExecutionSummary),
}

impl ExecuteResponse {
    pub fn requires_confirmation(&self) -> bool {
        matches!(self, Self::ConfirmationRequired(_))
    }
}
