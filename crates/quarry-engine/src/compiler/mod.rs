//! Query compilation: question + resolved target → dialect-tagged body.
//!
//! Pipeline:
//! 1. Intent pre-gate (read-only callers asking for destructive work).
//! 2. Prompt construction with dialect hints, schema, and recent turns.
//! 3. Model call under a timeout, with at most one retry.
//! 4. Reply parsing into a `QueryBody`.
//! 5. Mutation gate on the parsed body.

pub mod intent;
pub mod prompt;
pub mod response;

use std::sync::Arc;
use std::time::Duration;

use quarry_core::config::CompilerConfig;
use quarry_core::errors::{QuarryError, QuarryResult};
use quarry_core::traits::LanguageModel;
use quarry_core::types::{ConversationTurn, Permission, ResolvedTarget, SchemaEntity};

use crate::safety;
pub use response::ParsedReply;

pub struct CompileRequest<'a> {
    pub question: &'a str,
    pub target: &'a ResolvedTarget,
    pub entity: &'a SchemaEntity,
    /// Full caller-supplied history; the compiler keeps the last N turns.
    pub context: &'a [ConversationTurn],
    pub permission: Permission,
}

pub struct QueryCompiler {
    config: CompilerConfig,
    model: Arc<dyn LanguageModel>,
}

impl QueryCompiler {
    pub fn new(config: CompilerConfig, model: Arc<dyn LanguageModel>) -> Self {
        Self { config, model }
    }

    /// Reject a read-only caller's destructive request without a model call.
    pub fn pre_gate(question: &str, permission: Permission) -> QuarryResult<()> {
        if permission.allows_mutation() {
            return Ok(());
        }
        if let Some(verb) = intent::leading_destructive_verb(question) {
            tracing::warn!(verb, "destructive request from read-only caller rejected");
            return Err(QuarryError::UnsafeQueryRejected {
                verb: verb.to_string(),
                reason: "read-only callers cannot modify data".to_string(),
            });
        }
        Ok(())
    }

    pub async fn compile(&self, request: CompileRequest<'_>) -> QuarryResult<ParsedReply> {
        Self::pre_gate(request.question, request.permission)?;

        let skip = request.context.len().saturating_sub(self.config.context_turns);
        let prompt = prompt::build_prompt(&prompt::PromptInput {
            question: request.question,
            backend: request.target.backend,
            database: &request.target.database,
            entity: request.entity,
            context: &request.context[skip..],
            permission: request.permission,
        });

        let raw = self.call_model(&prompt).await?;
        let parsed = response::parse_reply(&raw, request.target.backend, request.permission)?;

        if let Some(verb) = safety::mutation_verb(&parsed.body)? {
            if !request.permission.allows_mutation() {
                tracing::warn!(verb = %verb, "model produced a write for a read-only caller");
                return Err(QuarryError::UnsafeQueryRejected {
                    verb,
                    reason: "compiled query modifies data and the caller is read-only".to_string(),
                });
            }
        }

        tracing::debug!(
            kind = parsed.body.kind().as_str(),
            entity = %request.target.entity,
            "compiled query"
        );
        Ok(parsed)
    }

    async fn call_model(&self, prompt: &str) -> QuarryResult<String> {
        let attempts = 1 + self.config.effective_max_retries();
        let timeout = Duration::from_millis(self.config.model_timeout_ms);

        for attempt in 1..=attempts {
            let last = attempt == attempts;
            match tokio::time::timeout(timeout, self.model.complete(prompt)).await {
                Ok(Ok(text)) => return Ok(text),
                Ok(Err(e)) if e.is_transient() && !last => {
                    tracing::warn!(
                        model = self.model.model_name(),
                        attempt,
                        error = %e,
                        "transient model failure, retrying"
                    );
                }
                Ok(Err(e)) => {
                    return Err(QuarryError::translation(format!("language model failed: {}", e)))
                }
                Err(_) if !last => {
                    tracing::warn!(
                        model = self.model.model_name(),
                        attempt,
                        timeout_ms = self.config.model_timeout_ms,
                        "model call timed out, retrying"
                    );
                }
                Err(_) => {
                    return Err(QuarryError::translation(format!(
                        "language model timed out after {}ms",
                        self.config.model_timeout_ms
                    )))
                }
            }
        }
        Err(QuarryError::translation("language model produced no reply"))
    }
}
