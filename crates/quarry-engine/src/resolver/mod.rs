//! Target resolution: free text + optional explicit target → connection + entity.
//!
//! Pure over its inputs. The caller supplies catalog snapshots for the
//! organization's active connections and its recent targets; nothing here
//! performs I/O. For a fixed input the outcome, ordering, and reasons are
//! identical across runs.

pub mod scorer;
pub mod synonyms;
pub mod tokenizer;

use std::cmp::Ordering;
use std::sync::Arc;

use quarry_core::config::ResolverConfig;
use quarry_core::errors::{QuarryError, QuarryResult};
use quarry_core::types::{
    Alternative, Connection, ConnectionId, EntityRef, ResolvedTarget, SchemaEntity, SchemaSnapshot,
};
use rustc_hash::FxHashMap;

pub use scorer::{EntityScore, MatchComponents, MatchScorer, QueryText};
pub use synonyms::SynonymTable;

/// One connection the caller may query, with its current schema.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub connection: Connection,
    pub snapshot: Arc<SchemaSnapshot>,
}

/// Explicit targeting supplied by the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct TargetHint<'a> {
    pub connection_id: Option<&'a ConnectionId>,
    pub entity: Option<&'a str>,
}

/// The resolved target plus the schema entity the compiler needs.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub target: ResolvedTarget,
    pub entity: SchemaEntity,
}

struct Scored<'a> {
    candidate: &'a Candidate,
    entity: &'a SchemaEntity,
    result: EntityScore,
}

pub struct TargetResolver {
    config: ResolverConfig,
    scorer: MatchScorer,
}

impl TargetResolver {
    pub fn new(config: ResolverConfig) -> Self {
        let synonyms = SynonymTable::with_extra(&config.synonyms);
        let scorer = MatchScorer::new(config.weights.clone(), synonyms);
        Self { config, scorer }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolve `text` against `candidates`. `recent` is newest first.
    pub fn resolve(
        &self,
        text: &str,
        hint: TargetHint<'_>,
        candidates: &[Candidate],
        recent: &[EntityRef],
    ) -> QuarryResult<Resolution> {
        let active: Vec<&Candidate> = candidates
            .iter()
            .filter(|c| c.connection.is_active())
            .collect();

        match (hint.connection_id, hint.entity) {
            (Some(connection_id), Some(entity)) => {
                let candidate = find_connection(&active, connection_id)?;
                let schema = candidate.snapshot.entity(entity).ok_or_else(|| {
                    QuarryError::UnknownTarget {
                        target: format!("{}/{}", connection_id, entity),
                    }
                })?;
                Ok(direct(candidate, schema))
            }
            (None, Some(entity)) => self.resolve_entity_only(entity, &active),
            (Some(connection_id), None) => {
                let candidate = find_connection(&active, connection_id)?;
                let mut resolution = self.resolve_scored(text, &[candidate], recent)?;
                resolution.target.auto_detected = false;
                Ok(resolution)
            }
            (None, None) => self.resolve_scored(text, &active, recent),
        }
    }

    fn resolve_entity_only(&self, entity: &str, active: &[&Candidate]) -> QuarryResult<Resolution> {
        let mut hits: Vec<(&Candidate, &SchemaEntity)> = active
            .iter()
            .filter_map(|c| c.snapshot.entity(entity).map(|e| (*c, e)))
            .collect();
        hits.sort_by(|a, b| a.0.connection.id.cmp(&b.0.connection.id));

        match hits.as_slice() {
            [] => Err(QuarryError::UnknownTarget {
                target: entity.to_string(),
            }),
            [(candidate, schema)] => Ok(direct(candidate, schema)),
            many => {
                let candidates = many
                    .iter()
                    .take(self.config.effective_max_alternatives())
                    .map(|(c, e)| Alternative {
                        connection_id: c.connection.id.clone(),
                        entity: e.name.clone(),
                        score: 100.0,
                        match_reasons: vec![format!(
                            "{} \"{}\" exists on connection \"{}\"",
                            c.connection.kind.entity_noun(),
                            e.name,
                            c.connection.name
                        )],
                    })
                    .collect();
                tracing::debug!(entity, matches = many.len(), "explicit entity is ambiguous");
                Err(QuarryError::ResolutionAmbiguous {
                    message: format!(
                        "\"{}\" exists on {} connections; specify one",
                        entity,
                        many.len()
                    ),
                    candidates,
                })
            }
        }
    }

    fn resolve_scored(
        &self,
        text: &str,
        candidates: &[&Candidate],
        recent: &[EntityRef],
    ) -> QuarryResult<Resolution> {
        let ranked = self.rank(text, candidates, recent);
        let Some(top) = ranked.first() else {
            return Err(QuarryError::UnknownTarget {
                target: "no tables or collections available".to_string(),
            });
        };

        if top.result.score < self.config.min_confidence {
            let candidates: Vec<Alternative> = ranked
                .iter()
                .filter(|s| s.result.score > 0.0)
                .take(ResolverConfig::MAX_ALTERNATIVES)
                .map(to_alternative)
                .collect();
            tracing::info!(
                top_score = top.result.score,
                min_confidence = self.config.min_confidence,
                candidates = candidates.len(),
                "resolution below confidence threshold"
            );
            return Err(QuarryError::ResolutionAmbiguous {
                message: format!(
                    "best match scored {:.1}, below the {:.1} threshold",
                    top.result.score, self.config.min_confidence
                ),
                candidates,
            });
        }

        let alternatives: Vec<Alternative> = ranked
            .iter()
            .skip(1)
            .filter(|s| s.result.score > 0.0)
            .filter(|s| top.result.score - s.result.score <= self.config.alternative_delta)
            .take(self.config.effective_max_alternatives())
            .map(to_alternative)
            .collect();

        tracing::debug!(
            connection = %top.candidate.connection.id,
            entity = %top.entity.name,
            score = top.result.score,
            alternatives = alternatives.len(),
            "target auto-detected"
        );

        let connection = &top.candidate.connection;
        Ok(Resolution {
            target: ResolvedTarget {
                connection_id: connection.id.clone(),
                connection_name: connection.name.clone(),
                database: connection.database.clone(),
                backend: connection.kind,
                entity: top.entity.name.clone(),
                auto_detected: true,
                confidence: Some(top.result.score),
                match_reasons: top.result.reasons.clone(),
                alternatives,
            },
            entity: top.entity.clone(),
        })
    }

    /// Every entity of every candidate, best first. Ties break on connection
    /// id, then entity name.
    fn rank<'a>(
        &self,
        text: &str,
        candidates: &[&'a Candidate],
        recent: &[EntityRef],
    ) -> Vec<Scored<'a>> {
        let query = QueryText::new(text);
        let window = self.config.recency_window;
        let mut positions: FxHashMap<(String, String), usize> = FxHashMap::default();
        for (i, r) in recent.iter().take(window).enumerate() {
            positions
                .entry((r.connection_id.to_string(), r.entity.to_lowercase()))
                .or_insert(i);
        }

        let mut scored: Vec<Scored<'a>> = candidates
            .iter()
            .flat_map(|candidate| {
                candidate.snapshot.entities.iter().map(|entity| (*candidate, entity))
            })
            .map(|(candidate, entity)| {
                let key = (candidate.connection.id.to_string(), entity.name.to_lowercase());
                let recency = positions.get(&key).map(|&p| (p, window));
                Scored {
                    candidate,
                    entity,
                    result: self.scorer.score(&query, entity, recency),
                }
            })
            .collect();

        scored.sort_by(|a, b| {
            b.result
                .score
                .partial_cmp(&a.result.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.candidate.connection.id.cmp(&b.candidate.connection.id))
                .then_with(|| a.entity.name.cmp(&b.entity.name))
        });
        scored
    }
}

impl Default for TargetResolver {
    fn default() -> Self {
        Self::new(ResolverConfig::default())
    }
}

fn find_connection<'a>(
    active: &[&'a Candidate],
    connection_id: &ConnectionId,
) -> QuarryResult<&'a Candidate> {
    active
        .iter()
        .find(|c| &c.connection.id == connection_id)
        .copied()
        .ok_or_else(|| QuarryError::UnknownTarget {
            target: connection_id.to_string(),
        })
}

fn direct(candidate: &Candidate, entity: &SchemaEntity) -> Resolution {
    let connection = &candidate.connection;
    Resolution {
        target: ResolvedTarget {
            connection_id: connection.id.clone(),
            connection_name: connection.name.clone(),
            database: connection.database.clone(),
            backend: connection.kind,
            entity: entity.name.clone(),
            auto_detected: false,
            confidence: None,
            match_reasons: Vec::new(),
            alternatives: Vec::new(),
        },
        entity: entity.clone(),
    }
}

fn to_alternative(scored: &Scored<'_>) -> Alternative {
    Alternative {
        connection_id: scored.candidate.connection.id.clone(),
        entity: scored.entity.name.clone(),
        score: scored.result.score,
        match_reasons: scored.result.reasons.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use quarry_core::types::{BackendKind, ConnectionStatus, FieldDef};

    fn candidate(id: &str, kind: BackendKind, entities: Vec<SchemaEntity>) -> Candidate {
        Candidate {
            connection: Connection {
                id: ConnectionId::new(id),
                organization_id: "org".into(),
                name: format!("{} db", id),
                database: "main".to_string(),
                kind,
                credential_handle: "cred".to_string(),
                status: ConnectionStatus::Active,
            },
            snapshot: Arc::new(SchemaSnapshot {
                connection_id: ConnectionId::new(id),
                entities,
                refreshed_at: Utc::now(),
                generation: 1,
            }),
        }
    }

    fn shop(id: &str) -> Candidate {
        candidate(
            id,
            BackendKind::Postgres,
            vec![
                SchemaEntity::new(id, "customers")
                    .with_field(FieldDef::new("name", "text"))
                    .with_field(FieldDef::new("city", "text")),
                SchemaEntity::new(id, "orders")
                    .with_field(FieldDef::new("id", "integer").primary())
                    .with_field(FieldDef::new("customer_id", "integer"))
                    .with_field(FieldDef::new("total", "numeric")),
            ],
        )
    }

    #[test]
    fn auto_detects_named_entity() {
        let resolver = TargetResolver::default();
        let r = resolver
            .resolve("Show me all customers", TargetHint::default(), &[shop("c1")], &[])
            .unwrap();
        assert!(r.target.auto_detected);
        assert_eq!(r.target.entity, "customers");
        assert!(r.target.confidence.unwrap() >= 35.0);
        assert!(r.target.alternatives.is_empty());
    }

    #[test]
    fn explicit_connection_and_entity_is_direct() {
        let resolver = TargetResolver::default();
        let c1 = ConnectionId::new("c1");
        let hint = TargetHint {
            connection_id: Some(&c1),
            entity: Some("ORDERS"),
        };
        let r = resolver.resolve("whatever", hint, &[shop("c1")], &[]).unwrap();
        assert!(!r.target.auto_detected);
        assert_eq!(r.target.entity, "orders");
        assert!(r.target.confidence.is_none());
    }

    #[test]
    fn explicit_entity_missing_is_unknown() {
        let resolver = TargetResolver::default();
        let c1 = ConnectionId::new("c1");
        let hint = TargetHint {
            connection_id: Some(&c1),
            entity: Some("invoices"),
        };
        let err = resolver.resolve("x", hint, &[shop("c1")], &[]).unwrap_err();
        assert!(matches!(err, QuarryError::UnknownTarget { .. }));
    }

    #[test]
    fn entity_only_on_two_connections_is_ambiguous() {
        let resolver = TargetResolver::default();
        let hint = TargetHint {
            connection_id: None,
            entity: Some("customers"),
        };
        let err = resolver
            .resolve("x", hint, &[shop("c2"), shop("c1")], &[])
            .unwrap_err();
        match err {
            QuarryError::ResolutionAmbiguous { candidates, .. } => {
                assert_eq!(candidates.len(), 2);
                assert_eq!(candidates[0].connection_id.as_str(), "c1");
            }
            other => panic!("expected ambiguity, got {other:?}"),
        }
    }

    #[test]
    fn connection_only_scores_within_connection() {
        let resolver = TargetResolver::default();
        let c2 = ConnectionId::new("c2");
        let hint = TargetHint {
            connection_id: Some(&c2),
            entity: None,
        };
        let r = resolver
            .resolve("Show me all customers", hint, &[shop("c1"), shop("c2")], &[])
            .unwrap();
        assert_eq!(r.target.connection_id, c2);
        assert!(!r.target.auto_detected);
        assert!(r.target.confidence.is_some());
    }

    #[test]
    fn unknown_connection_is_unknown_target() {
        let resolver = TargetResolver::default();
        let c9 = ConnectionId::new("c9");
        let hint = TargetHint {
            connection_id: Some(&c9),
            entity: None,
        };
        let err = resolver.resolve("customers", hint, &[shop("c1")], &[]).unwrap_err();
        assert!(matches!(err, QuarryError::UnknownTarget { .. }));
    }

    #[test]
    fn low_confidence_reports_candidates() {
        let resolver = TargetResolver::default();
        let err = resolver
            .resolve("what happened yesterday", TargetHint::default(), &[shop("c1")], &[])
            .unwrap_err();
        assert!(matches!(err, QuarryError::ResolutionAmbiguous { .. }));
    }

    #[test]
    fn identical_connections_tie_break_on_id() {
        let resolver = TargetResolver::default();
        let r = resolver
            .resolve("Show me all customers", TargetHint::default(), &[shop("b"), shop("a")], &[])
            .unwrap();
        assert_eq!(r.target.connection_id.as_str(), "a");
        assert_eq!(r.target.alternatives.len(), 1);
        assert_eq!(r.target.alternatives[0].connection_id.as_str(), "b");
    }

    #[test]
    fn revoked_connections_are_skipped() {
        let resolver = TargetResolver::default();
        let mut revoked = shop("a");
        revoked.connection.status = ConnectionStatus::Revoked;
        let r = resolver
            .resolve("Show me all customers", TargetHint::default(), &[revoked, shop("b")], &[])
            .unwrap();
        assert_eq!(r.target.connection_id.as_str(), "b");
        assert!(r.target.alternatives.is_empty());
    }

    #[test]
    fn recency_breaks_near_ties() {
        let resolver = TargetResolver::default();
        let recent = vec![EntityRef::new(ConnectionId::new("b"), "customers")];
        let r = resolver
            .resolve("Show me all customers", TargetHint::default(), &[shop("a"), shop("b")], &recent)
            .unwrap();
        assert_eq!(r.target.connection_id.as_str(), "b");
        assert!(r.target.match_reasons.iter().any(|m| m == "recently queried"));
    }
}
