//! Execution records and coordinator outcomes.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::identifiers::{ConnectionId, ExecutionId, TranslationId};
use super::translation::SafetyTier;
use crate::errors::{QuarryError, QuarryErrorCode, QuarryResult};

/// One result row, as a JSON object.
pub type Row = serde_json::Value;

/// Lifecycle of one execution attempt. Completed and Failed are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExecutionStatus {
    PendingConfirmation,
    Running,
    Completed,
    Failed,
}

impl ExecutionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PendingConfirmation => "PendingConfirmation",
            Self::Running => "Running",
            Self::Completed => "Completed",
            Self::Failed => "Failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "PendingConfirmation" => Some(Self::PendingConfirmation),
            "Running" => Some(Self::Running),
            "Completed" => Some(Self::Completed),
            "Failed" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn can_transition_to(self, next: Self) -> bool {
        match self {
            Self::PendingConfirmation => matches!(next, Self::Running | Self::Failed),
            Self::Running => matches!(next, Self::Completed | Self::Failed),
            Self::Completed | Self::Failed => false,
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why the gate demands an explicit `confirmed=true`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationReason {
    UnsafeTier,
    HighCost,
    Mutation,
}

impl ConfirmationReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UnsafeTier => "unsafe_tier",
            Self::HighCost => "high_cost",
            Self::Mutation => "mutation",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "unsafe_tier" => Some(Self::UnsafeTier),
            "high_cost" => Some(Self::HighCost),
            "mutation" => Some(Self::Mutation),
            _ => None,
        }
    }

    pub fn message(self, cost_score: f64) -> String {
        match self {
            Self::UnsafeTier => {
                "This query was classified as unsafe. Re-submit with confirmed=true to run it."
                    .to_string()
            }
            Self::HighCost => format!(
                "This query is estimated to be expensive (cost {:.2}). Re-submit with confirmed=true to run it.",
                cost_score
            ),
            Self::Mutation => {
                "This query modifies data. Re-submit with confirmed=true to acknowledge it."
                    .to_string()
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    Full,
    Replay,
}

impl ExecutionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Replay => "replay",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "full" => Some(Self::Full),
            "replay" => Some(Self::Replay),
            _ => None,
        }
    }
}

/// Failure details persisted on a Failed record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionFailure {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRecord {
    pub id: ExecutionId,
    pub translation_id: TranslationId,
    pub connection_id: ConnectionId,
    pub mode: ExecutionMode,
    pub status: ExecutionStatus,
    pub row_count: u64,
    pub execution_time_ms: u64,
    pub truncated: bool,
    pub cached: bool,
    pub confirmed: bool,
    pub confirmation_reason: Option<ConfirmationReason>,
    /// Bounded prefix of the result set.
    pub preview: Vec<Row>,
    /// blake3 fingerprint of the body that ran.
    pub body_fingerprint: String,
    pub replay_of: Option<ExecutionId>,
    pub failure: Option<ExecutionFailure>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl ExecutionRecord {
    /// New record entering `Running`.
    pub fn running(
        translation_id: TranslationId,
        connection_id: ConnectionId,
        mode: ExecutionMode,
        body_fingerprint: String,
    ) -> Self {
        Self {
            id: ExecutionId::generate(),
            translation_id,
            connection_id,
            mode,
            status: ExecutionStatus::Running,
            row_count: 0,
            execution_time_ms: 0,
            truncated: false,
            cached: false,
            confirmed: false,
            confirmation_reason: None,
            preview: Vec::new(),
            body_fingerprint,
            replay_of: None,
            failure: None,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn transition(&mut self, next: ExecutionStatus) -> QuarryResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(QuarryError::InvalidTransition {
                execution_id: self.id.to_string(),
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;
        if next.is_terminal() {
            self.finished_at = Some(Utc::now());
        }
        Ok(())
    }

    pub fn complete(
        &mut self,
        row_count: u64,
        execution_time_ms: u64,
        truncated: bool,
        preview: Vec<Row>,
    ) -> QuarryResult<()> {
        self.transition(ExecutionStatus::Completed)?;
        self.row_count = row_count;
        self.execution_time_ms = execution_time_ms;
        self.truncated = truncated;
        self.preview = preview;
        Ok(())
    }

    pub fn fail(&mut self, error: &QuarryError, execution_time_ms: u64) -> QuarryResult<()> {
        self.transition(ExecutionStatus::Failed)?;
        self.execution_time_ms = execution_time_ms;
        self.failure = Some(ExecutionFailure {
            code: error.error_code().to_string(),
            message: error.to_string(),
        });
        Ok(())
    }
}

/// Rows returned by a successful run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub execution_id: ExecutionId,
    pub translation_id: TranslationId,
    pub results: Vec<Row>,
    pub row_count: u64,
    pub execution_time_ms: u64,
    pub truncated: bool,
    pub cached: bool,
    pub replay_of: Option<ExecutionId>,
}

/// Returned instead of running when the gate is closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationRequest {
    pub translation_id: TranslationId,
    pub reason: ConfirmationReason,
    pub message: String,
    pub estimated_cost: f64,
    pub safety: SafetyTier,
}

/// A run that reached `Running` and then failed. The record is already persisted.
#[derive(Debug)]
pub struct FailedExecution {
    pub record: ExecutionRecord,
    pub error: QuarryError,
}

#[derive(Debug)]
pub enum ExecuteOutcome {
    Success(ExecutionResult),
    PendingConfirmation(ConfirmationRequest),
    Failed(FailedExecution),
}

impl ExecuteOutcome {
    pub fn requires_confirmation(&self) -> bool {
        matches!(self, Self::PendingConfirmation(_))
    }
}

/// Capped, unrecorded look at the first rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResult {
    pub translation_id: TranslationId,
    pub preview_row_count: u64,
    pub results: Vec<Row>,
    pub truncated: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> ExecutionRecord {
        ExecutionRecord::running(
            TranslationId::new("t1"),
            ConnectionId::new("c1"),
            ExecutionMode::Full,
            "abc".to_string(),
        )
    }

    #[test]
    fn running_record_completes_once() {
        let mut r = record();
        r.complete(3, 12, false, vec![]).unwrap();
        assert_eq!(r.status, ExecutionStatus::Completed);
        assert!(r.finished_at.is_some());
        assert!(r.transition(ExecutionStatus::Running).is_err());
        assert!(r.transition(ExecutionStatus::Failed).is_err());
    }

    #[test]
    fn failed_record_keeps_error_code() {
        let mut r = record();
        let err = QuarryError::ExecutionTimeout { timeout_ms: 50 };
        r.fail(&err, 50).unwrap();
        let failure = r.failure.unwrap();
        assert_eq!(failure.code, "EXECUTION_TIMEOUT");
        assert!(failure.message.contains("50"));
    }

    #[test]
    fn pending_confirmation_may_start_or_fail_only() {
        let s = ExecutionStatus::PendingConfirmation;
        assert!(s.can_transition_to(ExecutionStatus::Running));
        assert!(s.can_transition_to(ExecutionStatus::Failed));
        assert!(!s.can_transition_to(ExecutionStatus::Completed));
    }

    #[test]
    fn status_string_roundtrip() {
        for s in [
            ExecutionStatus::PendingConfirmation,
            ExecutionStatus::Running,
            ExecutionStatus::Completed,
            ExecutionStatus::Failed,
        ] {
            assert_eq!(ExecutionStatus::parse(s.as_str()), Some(s));
        }
    }
}
