//! Safety & cost classifier configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyConfig {
    /// Unbounded scans above this cardinality are a warning.
    pub large_table_rows: u64,
    /// Cardinality at which the cardinality factor saturates at 1.0.
    pub reference_rows: u64,
    /// Cost above this requires confirmation.
    pub confirm_cost_threshold: f64,
    /// Weight of the missing-limit penalty.
    pub missing_limit_weight: f64,
    /// Weight of the unindexed-filter penalty.
    pub unindexed_filter_weight: f64,
    /// Penalty per join / aggregation stage.
    pub stage_weight: f64,
    /// Cap on the summed stage penalty.
    pub max_stage_penalty: f64,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            large_table_rows: 100_000,
            reference_rows: 10_000_000,
            confirm_cost_threshold: 0.7,
            missing_limit_weight: 0.8,
            unindexed_filter_weight: 0.25,
            stage_weight: 0.1,
            max_stage_penalty: 0.4,
        }
    }
}
