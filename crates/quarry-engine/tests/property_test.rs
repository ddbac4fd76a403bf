//! Property-based tests for resolver determinism and cost monotonicity.

mod common;

use std::sync::Arc;

use chrono::Utc;
use common::*;
use proptest::prelude::*;
use quarry_core::config::SafetyConfig;
use quarry_core::errors::QuarryErrorCode;
use quarry_core::types::{
    BackendKind, EntityRef, Permission, SchemaEntity, SchemaSnapshot,
};
use quarry_engine::compiler::response::parse_reply;
use quarry_engine::resolver::{Candidate, MatchScorer, QueryText, TargetHint};
use quarry_engine::safety::{cost, QueryShape};
use quarry_engine::TargetResolver;

// =============================================================================
// Strategy helpers
// =============================================================================

const VOCABULARY: &[&str] = &[
    "show", "me", "all", "customers", "client", "orders", "purchase", "products", "sku",
    "city", "total", "status", "open", "from", "lisbon", "last", "week", "price", "email",
    "name", "buyers", "items", "xyzzy",
];

fn question_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(VOCABULARY), 0..8).prop_map(|words| words.join(" "))
}

fn candidates() -> Vec<Candidate> {
    let snapshot = |id: &str, entities: Vec<SchemaEntity>| {
        Arc::new(SchemaSnapshot {
            connection_id: id.into(),
            entities,
            refreshed_at: Utc::now(),
            generation: 1,
        })
    };
    vec![
        Candidate {
            connection: connection("pg", BackendKind::Postgres),
            snapshot: snapshot("pg", vec![customers("pg"), orders("pg"), products("pg")]),
        },
        Candidate {
            connection: connection("mongo", BackendKind::MongoDb),
            snapshot: snapshot("mongo", vec![customers("mongo"), products("mongo")]),
        },
    ]
}

/// A comparable digest of a resolution outcome.
fn outcome(resolver: &TargetResolver, text: &str, candidates: &[Candidate], recent: &[EntityRef]) -> String {
    match resolver.resolve(text, TargetHint::default(), candidates, recent) {
        Ok(r) => format!(
            "ok {} {} {:?} {:?} {:?}",
            r.target.connection_id,
            r.target.entity,
            r.target.confidence,
            r.target.match_reasons,
            r.target
                .alternatives
                .iter()
                .map(|a| (a.connection_id.to_string(), a.entity.clone(), a.score))
                .collect::<Vec<_>>()
        ),
        Err(e) => format!("err {} {}", e.error_code(), e),
    }
}

fn shape_strategy() -> impl Strategy<Value = QueryShape> {
    (
        any::<bool>(),
        prop::option::of(1u64..10_000),
        0u32..6,
        prop::collection::vec(prop::sample::select(&["id", "customer_id", "status", "total"][..]), 0..3),
    )
        .prop_map(|(has_filter, limit, stages, fields)| QueryShape {
            mutation: None,
            has_filter,
            filter_fields: if has_filter {
                fields.into_iter().map(str::to_string).collect()
            } else {
                Vec::new()
            },
            sort_fields: Vec::new(),
            limit,
            stages,
        })
}

// =============================================================================
// Resolution is deterministic and independent of candidate order
// =============================================================================
proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn resolution_is_deterministic(text in question_strategy(), recent_len in 0usize..3) {
        let resolver = TargetResolver::default();
        let forward = candidates();
        let mut reversed = candidates();
        reversed.reverse();
        let recent: Vec<EntityRef> = [("pg", "orders"), ("mongo", "customers"), ("pg", "products")]
            .iter()
            .take(recent_len)
            .map(|(c, e)| EntityRef::new(*c, *e))
            .collect();

        let first = outcome(&resolver, &text, &forward, &recent);
        let second = outcome(&resolver, &text, &forward, &recent);
        let shuffled = outcome(&resolver, &text, &reversed, &recent);

        prop_assert_eq!(&first, &second);
        prop_assert_eq!(&first, &shuffled);
    }
}

// =============================================================================
// Scores stay within 0..=100
// =============================================================================
proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn scores_are_bounded(text in ".{0,80}", position in 0usize..12) {
        let scorer = MatchScorer::default();
        let query = QueryText::new(&text);
        for entity in [customers("pg"), orders("pg"), products("pg")] {
            let score = scorer.score(&query, &entity, Some((position, 10))).score;
            prop_assert!((0.0..=100.0).contains(&score), "score {} for {:?}", score, text);
        }
    }
}

// =============================================================================
// Cost never decreases as cardinality grows
// =============================================================================
proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    #[test]
    fn cost_is_monotonic_in_cardinality(
        shape in shape_strategy(),
        a in 0u64..50_000_000,
        b in 0u64..50_000_000,
    ) {
        let config = SafetyConfig::default();
        let (small, large) = if a <= b { (a, b) } else { (b, a) };
        let low = cost::estimate(&shape, &orders("pg").with_rows(small), &config);
        let high = cost::estimate(&shape, &orders("pg").with_rows(large), &config);

        prop_assert!(low.total <= high.total + 1e-12, "{} rows: {}, {} rows: {}", small, low.total, large, high.total);
        prop_assert!((0.0..=1.0).contains(&high.total));
    }
}

// =============================================================================
// Reply parsing never panics
// =============================================================================
proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn reply_parsing_is_total(raw in ".{0,200}") {
        let _ = parse_reply(&raw, BackendKind::Postgres, Permission::ReadOnly);
        let _ = parse_reply(&raw, BackendKind::MongoDb, Permission::ReadWrite);
    }
}
