//! Query compiler configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Most recent conversation turns embedded in the prompt.
    pub context_turns: usize,
    /// Per-attempt bound on the model call.
    pub model_timeout_ms: u64,
    /// Retries after a transient failure or timeout. At most 1.
    pub max_retries: u32,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            context_turns: 6,
            model_timeout_ms: 30_000,
            max_retries: 1,
        }
    }
}

impl CompilerConfig {
    pub fn effective_max_retries(&self) -> u32 {
        self.max_retries.min(1)
    }
}
