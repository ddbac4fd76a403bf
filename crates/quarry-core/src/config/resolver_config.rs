//! Target resolver configuration.

use serde::{Deserialize, Serialize};

/// Weights of the named match components. Each component yields 0.0–1.0;
/// the weighted sum is scaled to 0–100 and clamped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchWeights {
    /// Entity name (or its singular) appears verbatim in the text.
    pub exact_name: f64,
    /// Field names appear verbatim in the text.
    pub exact_field: f64,
    /// Share of query tokens covered by entity + field tokens.
    pub token_overlap: f64,
    /// A query token reaches an entity-name token through the synonym table.
    pub synonym: f64,
    /// Entity was queried recently by the same organization.
    pub recency: f64,
}

impl Default for MatchWeights {
    fn default() -> Self {
        Self {
            exact_name: 0.55,
            exact_field: 0.10,
            token_overlap: 0.20,
            synonym: 0.45,
            recency: 0.05,
        }
    }
}

impl MatchWeights {
    pub fn all(&self) -> [f64; 5] {
        [
            self.exact_name,
            self.exact_field,
            self.token_overlap,
            self.synonym,
            self.recency,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Top score (0–100) required for auto-detection.
    pub min_confidence: f64,
    /// Entities within this many points of the top are reported as alternatives.
    pub alternative_delta: f64,
    /// Hard-capped at 3.
    pub max_alternatives: usize,
    /// How many recent targets earn a recency bonus.
    pub recency_window: usize,
    pub weights: MatchWeights,
    /// Extra synonym groups merged into the built-in table.
    pub synonyms: Vec<Vec<String>>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            min_confidence: 35.0,
            alternative_delta: 15.0,
            max_alternatives: 3,
            recency_window: 10,
            weights: MatchWeights::default(),
            synonyms: Vec::new(),
        }
    }
}

impl ResolverConfig {
    pub const MAX_ALTERNATIVES: usize = 3;

    pub fn effective_max_alternatives(&self) -> usize {
        self.max_alternatives.min(Self::MAX_ALTERNATIVES)
    }
}
