//! Translations: the immutable product of resolve → compile → classify.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::connection::BackendKind;
use super::execution::ConfirmationReason;
use super::identifiers::{ConnectionId, EntityRef, OrganizationId, TranslationId};
use super::query::QueryBody;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SafetyTier {
    Safe,
    Warning,
    Unsafe,
}

impl SafetyTier {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Safe => "safe",
            Self::Warning => "warning",
            Self::Unsafe => "unsafe",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "safe" => Some(Self::Safe),
            "warning" | "warn" | "caution" => Some(Self::Warning),
            "unsafe" | "danger" | "dangerous" => Some(Self::Unsafe),
            _ => None,
        }
    }
}

impl fmt::Display for SafetyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An entity close to the winner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alternative {
    pub connection_id: ConnectionId,
    pub entity: String,
    /// 0–100.
    pub score: f64,
    pub match_reasons: Vec<String>,
}

/// Outcome of target resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedTarget {
    pub connection_id: ConnectionId,
    pub connection_name: String,
    pub database: String,
    pub backend: BackendKind,
    pub entity: String,
    pub auto_detected: bool,
    /// 0–100. Absent for direct lookups.
    pub confidence: Option<f64>,
    #[serde(default)]
    pub match_reasons: Vec<String>,
    /// Sorted descending by score, at most three.
    #[serde(default)]
    pub alternatives: Vec<Alternative>,
}

impl ResolvedTarget {
    pub fn entity_ref(&self) -> EntityRef {
        EntityRef::new(self.connection_id.clone(), self.entity.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationRole {
    User,
    Assistant,
}

/// One prior chat turn supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: ConversationRole,
    pub content: String,
}

/// The model's own view of its output. Recorded, never trusted for gating.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelSafetyHint {
    pub safety: Option<SafetyTier>,
    pub estimated_cost: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Translation {
    pub id: TranslationId,
    pub organization_id: OrganizationId,
    pub text: String,
    pub target: ResolvedTarget,
    pub body: QueryBody,
    pub explanation: String,
    pub required_indexes: Vec<String>,
    pub safety: SafetyTier,
    /// 0.0–1.0.
    pub cost_score: f64,
    pub requires_confirmation: bool,
    pub confirmation_reason: Option<ConfirmationReason>,
    #[serde(default)]
    pub model_hint: ModelSafetyHint,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safety_tier_parses_loose_model_labels() {
        assert_eq!(SafetyTier::parse(" Safe "), Some(SafetyTier::Safe));
        assert_eq!(SafetyTier::parse("caution"), Some(SafetyTier::Warning));
        assert_eq!(SafetyTier::parse("dangerous"), Some(SafetyTier::Unsafe));
        assert_eq!(SafetyTier::parse("maybe"), None);
    }

    #[test]
    fn safety_tiers_order_by_severity() {
        assert!(SafetyTier::Safe < SafetyTier::Warning);
        assert!(SafetyTier::Warning < SafetyTier::Unsafe);
    }
}
