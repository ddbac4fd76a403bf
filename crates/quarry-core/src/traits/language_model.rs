use async_trait::async_trait;

use crate::errors::ModelError;

/// The external language-model collaborator: prompt in, text out.
///
/// Timeouts and retries are applied by the caller; implementations should not
/// retry internally.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, ModelError>;

    /// Name used in logs.
    fn model_name(&self) -> &str {
        "unknown"
    }
}
