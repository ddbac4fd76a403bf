//! Cost estimation.
//!
//! cost = clamp(missing_limit + unindexed_filter + stages, 0, 1), where the
//! first two scale with a logarithmic cardinality factor. Every term is
//! non-decreasing in cardinality, so the total is too.

use quarry_core::config::SafetyConfig;
use quarry_core::types::SchemaEntity;

use super::QueryShape;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CostBreakdown {
    pub cardinality_factor: f64,
    pub missing_limit: f64,
    pub unindexed_filter: f64,
    pub stages: f64,
    /// 0.0–1.0.
    pub total: f64,
}

/// log10(rows + 1) / log10(reference_rows), clamped to [0, 1].
pub fn cardinality_factor(rows: u64, reference_rows: u64) -> f64 {
    let reference = (reference_rows.max(10) as f64).log10();
    let factor = ((rows as f64) + 1.0).log10() / reference;
    if factor.is_finite() {
        factor.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Share of filter fields with no usable index. A filter whose fields could
/// not be identified counts as fully unindexed.
pub fn unindexed_share(shape: &QueryShape, entity: &SchemaEntity) -> f64 {
    if !shape.has_filter {
        return 0.0;
    }
    if shape.filter_fields.is_empty() {
        return 1.0;
    }
    let unindexed = shape
        .filter_fields
        .iter()
        .filter(|f| !entity.is_indexed(f))
        .count();
    unindexed as f64 / shape.filter_fields.len() as f64
}

pub fn estimate(shape: &QueryShape, entity: &SchemaEntity, config: &SafetyConfig) -> CostBreakdown {
    let cf = cardinality_factor(entity.estimated_rows, config.reference_rows);

    let missing_limit = if shape.limit.is_none() {
        let halved = if shape.has_filter { 0.5 } else { 1.0 };
        config.missing_limit_weight * cf * halved
    } else {
        0.0
    };
    let unindexed_filter = config.unindexed_filter_weight * unindexed_share(shape, entity) * cf;
    let stages = (config.stage_weight * shape.stages as f64).min(config.max_stage_penalty);

    let sum = missing_limit + unindexed_filter + stages;
    let total = if sum.is_finite() { sum.clamp(0.0, 1.0) } else { 1.0 };

    CostBreakdown {
        cardinality_factor: cf,
        missing_limit,
        unindexed_filter,
        stages,
        total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quarry_core::types::FieldDef;

    fn entity(rows: u64) -> SchemaEntity {
        SchemaEntity::new("c1", "events")
            .with_field(FieldDef::new("id", "integer").primary())
            .with_field(FieldDef::new("kind", "text"))
            .with_rows(rows)
    }

    #[test]
    fn cardinality_factor_saturates_at_reference() {
        assert_eq!(cardinality_factor(0, 10_000_000), 0.0);
        assert!((cardinality_factor(9_999_999, 10_000_000) - 1.0).abs() < 1e-9);
        assert_eq!(cardinality_factor(u64::MAX, 10_000_000), 1.0);
    }

    #[test]
    fn filterless_scan_of_ten_million_rows() {
        let cost = estimate(&QueryShape::default(), &entity(10_000_000), &SafetyConfig::default());
        assert!((cost.total - 0.8).abs() < 1e-6, "got {}", cost.total);
    }

    #[test]
    fn limit_removes_the_scan_penalty() {
        let shape = QueryShape {
            limit: Some(10),
            ..QueryShape::default()
        };
        let cost = estimate(&shape, &entity(10_000_000), &SafetyConfig::default());
        assert_eq!(cost.total, 0.0);
    }

    #[test]
    fn unindexed_filter_costs_more_than_indexed() {
        let config = SafetyConfig::default();
        let indexed = QueryShape {
            has_filter: true,
            filter_fields: vec!["id".into()],
            ..QueryShape::default()
        };
        let unindexed = QueryShape {
            has_filter: true,
            filter_fields: vec!["kind".into()],
            ..QueryShape::default()
        };
        let e = entity(1_000_000);
        assert!(estimate(&unindexed, &e, &config).total > estimate(&indexed, &e, &config).total);
    }

    #[test]
    fn stage_penalty_is_capped() {
        let shape = QueryShape {
            limit: Some(1),
            stages: 12,
            ..QueryShape::default()
        };
        let cost = estimate(&shape, &entity(10), &SafetyConfig::default());
        assert!((cost.stages - 0.4).abs() < 1e-9);
        assert!((cost.total - 0.4).abs() < 1e-9);
    }
}
