pub mod catalog_config;
pub mod compiler_config;
pub mod execution_config;
pub mod observability_config;
pub mod resolver_config;
pub mod safety_config;
pub mod storage_config;

use std::path::Path;

use serde::{Deserialize, Serialize};

pub use catalog_config::CatalogConfig;
pub use compiler_config::CompilerConfig;
pub use execution_config::ExecutionConfig;
pub use observability_config::ObservabilityConfig;
pub use resolver_config::{MatchWeights, ResolverConfig};
pub use safety_config::SafetyConfig;
pub use storage_config::StorageConfig;

use crate::errors::{QuarryError, QuarryResult};

/// Top-level configuration aggregating all subsystem configs.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct QuarryConfig {
    pub catalog: CatalogConfig,
    pub resolver: ResolverConfig,
    pub compiler: CompilerConfig,
    pub safety: SafetyConfig,
    pub execution: ExecutionConfig,
    pub storage: StorageConfig,
    pub observability: ObservabilityConfig,
}

impl QuarryConfig {
    /// Load config from a TOML string, falling back to defaults for missing fields.
    pub fn from_toml(toml_str: &str) -> QuarryResult<Self> {
        let config: Self =
            toml::from_str(toml_str).map_err(|e| QuarryError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate `quarry.toml` (or any path).
    pub fn load(path: &Path) -> QuarryResult<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| QuarryError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&raw)
    }

    pub fn validate(&self) -> QuarryResult<()> {
        let r = &self.resolver;
        if !(0.0..=100.0).contains(&r.min_confidence) {
            return Err(QuarryError::Config(format!(
                "resolver.min_confidence must be within 0..=100, got {}",
                r.min_confidence
            )));
        }
        if !r.alternative_delta.is_finite() || r.alternative_delta < 0.0 {
            return Err(QuarryError::Config(
                "resolver.alternative_delta must be a non-negative number".to_string(),
            ));
        }
        if r.weights.all().iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(QuarryError::Config(
                "resolver.weights must be non-negative numbers".to_string(),
            ));
        }

        let s = &self.safety;
        if !(0.0..=1.0).contains(&s.confirm_cost_threshold) {
            return Err(QuarryError::Config(format!(
                "safety.confirm_cost_threshold must be within 0..=1, got {}",
                s.confirm_cost_threshold
            )));
        }
        if s.reference_rows < 10 {
            return Err(QuarryError::Config(
                "safety.reference_rows must be at least 10".to_string(),
            ));
        }
        let penalties = [
            s.missing_limit_weight,
            s.unindexed_filter_weight,
            s.stage_weight,
            s.max_stage_penalty,
        ];
        if penalties.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(QuarryError::Config(
                "safety penalty weights must be non-negative numbers".to_string(),
            ));
        }

        let e = &self.execution;
        if e.preview_row_cap == 0 || e.max_rows == 0 {
            return Err(QuarryError::Config(
                "execution.preview_row_cap and execution.max_rows must be positive".to_string(),
            ));
        }
        if e.max_concurrent_per_connection == 0 {
            return Err(QuarryError::Config(
                "execution.max_concurrent_per_connection must be positive".to_string(),
            ));
        }
        if e.timeout_ms == 0 || self.compiler.model_timeout_ms == 0 {
            return Err(QuarryError::Config("timeouts must be positive".to_string()));
        }
        Ok(())
    }
}
