//! Safety & cost classification of compiled bodies.
//!
//! Rule-based and deterministic. The model's own safety label is recorded on
//! the translation but never consulted here.

pub mod cost;
pub mod document;
pub mod sql;

use quarry_core::config::SafetyConfig;
use quarry_core::errors::{QuarryError, QuarryResult};
use quarry_core::types::{
    ConfirmationReason, ModelSafetyHint, Permission, QueryBody, SafetyTier, SchemaEntity,
};

pub use cost::CostBreakdown;

/// What static analysis learned about a body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryShape {
    /// Mutating verb or write stage, as written.
    pub mutation: Option<String>,
    pub has_filter: bool,
    /// Schema fields referenced by the filter, schema casing, first-seen order.
    pub filter_fields: Vec<String>,
    pub sort_fields: Vec<String>,
    pub limit: Option<u64>,
    /// Joins, groupings, set operations, subqueries, heavy pipeline stages.
    pub stages: u32,
}

/// Analyze `body` against the entity it targets.
pub fn analyze(body: &QueryBody, entity: &SchemaEntity) -> QuarryResult<QueryShape> {
    match body {
        QueryBody::Sql(q) => {
            let tokens = sql::significant_tokens(&q.statement).map_err(QuarryError::translation)?;
            Ok(sql::analyze(&tokens, entity))
        }
        QueryBody::Find(q) => Ok(document::analyze_find(q, entity)),
        QueryBody::Pipeline(q) => Ok(document::analyze_pipeline(q, entity)),
    }
}

/// The mutating verb or write stage of `body`, if any. Needs no schema, so the
/// coordinator can re-check stored bodies cheaply.
pub fn mutation_verb(body: &QueryBody) -> QuarryResult<Option<String>> {
    match body {
        QueryBody::Sql(q) => {
            let tokens = sql::significant_tokens(&q.statement).map_err(QuarryError::translation)?;
            Ok(sql::mutation_verb(&tokens))
        }
        QueryBody::Find(_) => Ok(None),
        QueryBody::Pipeline(q) => Ok(document::pipeline_mutation(q)),
    }
}

/// Verdict attached to a translation.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub tier: SafetyTier,
    pub cost: CostBreakdown,
    pub requires_confirmation: bool,
    pub confirmation_reason: Option<ConfirmationReason>,
    pub required_indexes: Vec<String>,
    pub shape: QueryShape,
}

impl Classification {
    pub fn cost_score(&self) -> f64 {
        self.cost.total
    }
}

pub struct SafetyClassifier {
    config: SafetyConfig,
}

impl SafetyClassifier {
    pub fn new(config: SafetyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SafetyConfig {
        &self.config
    }

    /// Classify `body`. `suggested_indexes` are the model's suggestions; only
    /// those naming real fields survive.
    pub fn classify(
        &self,
        body: &QueryBody,
        entity: &SchemaEntity,
        permission: Permission,
        suggested_indexes: &[String],
        model_hint: &ModelSafetyHint,
    ) -> QuarryResult<Classification> {
        let shape = analyze(body, entity)?;
        let cost = cost::estimate(&shape, entity, &self.config);
        let over_threshold = cost.total > self.config.confirm_cost_threshold;

        let authorized_mutation = shape.mutation.is_some() && permission.allows_mutation();
        let tier = if shape.mutation.is_some() {
            if authorized_mutation {
                SafetyTier::Warning
            } else {
                SafetyTier::Unsafe
            }
        } else if !shape.has_filter
            && shape.limit.is_none()
            && entity.estimated_rows > self.config.large_table_rows
        {
            SafetyTier::Warning
        } else if over_threshold {
            SafetyTier::Warning
        } else {
            SafetyTier::Safe
        };

        let confirmation_reason = if tier == SafetyTier::Unsafe {
            Some(ConfirmationReason::UnsafeTier)
        } else if authorized_mutation {
            Some(ConfirmationReason::Mutation)
        } else if over_threshold {
            Some(ConfirmationReason::HighCost)
        } else {
            None
        };

        let required_indexes = recommended_indexes(&shape, entity, suggested_indexes);

        if let Some(hinted) = model_hint.safety {
            if hinted != tier {
                tracing::debug!(
                    model = %hinted,
                    classifier = %tier,
                    "model safety label disagrees with classifier"
                );
            }
        }
        tracing::debug!(
            tier = %tier,
            cost = cost.total,
            mutation = shape.mutation.as_deref().unwrap_or(""),
            requires_confirmation = confirmation_reason.is_some(),
            "classified query"
        );

        Ok(Classification {
            tier,
            cost,
            requires_confirmation: confirmation_reason.is_some(),
            confirmation_reason,
            required_indexes,
            shape,
        })
    }
}

impl Default for SafetyClassifier {
    fn default() -> Self {
        Self::new(SafetyConfig::default())
    }
}

/// Unindexed filter and sort fields, then model suggestions naming real
/// unindexed fields. Deduplicated, schema casing.
fn recommended_indexes(
    shape: &QueryShape,
    entity: &SchemaEntity,
    suggested: &[String],
) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let from_shape = shape.filter_fields.iter().chain(shape.sort_fields.iter());
    for name in from_shape {
        if let Some(field) = entity.field(name) {
            if !entity.is_indexed(&field.name) && !out.contains(&field.name) {
                out.push(field.name.clone());
            }
        }
    }
    for raw in suggested {
        let name = raw.rsplit('.').next().unwrap_or(raw).trim();
        if let Some(field) = entity.field(name) {
            if !entity.is_indexed(&field.name) && !out.contains(&field.name) {
                out.push(field.name.clone());
            }
        }
    }
    out
}
