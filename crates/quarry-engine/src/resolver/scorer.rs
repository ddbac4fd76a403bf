//! Entity match scoring.
//!
//! Five named components, each 0.0–1.0, combined as a weighted sum and
//! scaled to 0–100:
//! - `exact_name`: the entity name appears in the text
//! - `exact_field`: field names appear verbatim
//! - `token_overlap`: share of query tokens covered by entity + field tokens
//! - `synonym`: query tokens reach entity-name tokens through the synonym table
//! - `recency`: the entity was queried recently, decaying by position

use quarry_core::config::resolver_config::MatchWeights;
use quarry_core::types::SchemaEntity;
use rustc_hash::FxHashSet;

use super::synonyms::SynonymTable;
use super::tokenizer::{contains_word, identifier_tokens, singularize, tokenize};

/// A question prepared once and scored against every entity.
#[derive(Debug, Clone)]
pub struct QueryText {
    lowered: String,
    tokens: Vec<String>,
    token_set: FxHashSet<String>,
}

impl QueryText {
    pub fn new(text: &str) -> Self {
        let tokens = tokenize(text);
        let token_set = tokens.iter().cloned().collect();
        Self {
            lowered: text.to_lowercase(),
            tokens,
            token_set,
        }
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    fn has_token(&self, token: &str) -> bool {
        self.token_set.contains(token)
    }
}

/// Raw component values before weighting.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MatchComponents {
    pub exact_name: f64,
    pub exact_field: f64,
    pub token_overlap: f64,
    pub synonym: f64,
    pub recency: f64,
}

impl MatchComponents {
    fn values(&self) -> [f64; 5] {
        [
            self.exact_name,
            self.exact_field,
            self.token_overlap,
            self.synonym,
            self.recency,
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntityScore {
    /// 0–100.
    pub score: f64,
    pub components: MatchComponents,
    pub reasons: Vec<String>,
}

pub struct MatchScorer {
    weights: MatchWeights,
    synonyms: SynonymTable,
}

impl MatchScorer {
    pub fn new(weights: MatchWeights, synonyms: SynonymTable) -> Self {
        Self { weights, synonyms }
    }

    /// Score one entity. `recency` is `(position, window)` when the entity is
    /// among the organization's recent targets, position 0 being the newest.
    pub fn score(
        &self,
        query: &QueryText,
        entity: &SchemaEntity,
        recency: Option<(usize, usize)>,
    ) -> EntityScore {
        let mut reasons = Vec::new();
        let name_lower = entity.name.to_lowercase();
        let name_tokens = identifier_tokens(&entity.name);

        // exact_name
        let singular_name = singularize(&name_lower);
        let name_hit = contains_word(&query.lowered, &name_lower)
            || contains_word(&query.lowered, &singular_name)
            || (!name_tokens.is_empty() && name_tokens.iter().all(|t| query.has_token(t)));
        let exact_name = if name_hit {
            reasons.push(format!("name \"{}\" mentioned", entity.name));
            1.0
        } else if name_tokens.is_empty() {
            0.0
        } else {
            let hits = name_tokens.iter().filter(|t| query.has_token(t)).count();
            if hits > 0 {
                reasons.push(format!(
                    "name \"{}\" partially mentioned ({}/{})",
                    entity.name,
                    hits,
                    name_tokens.len()
                ));
            }
            0.5 * hits as f64 / name_tokens.len() as f64
        };

        // exact_field
        let mut mentioned_fields: Vec<&str> = entity
            .fields
            .iter()
            .map(|f| f.name.as_str())
            .filter(|name| name.len() >= 3 && contains_word(&query.lowered, &name.to_lowercase()))
            .collect();
        mentioned_fields.sort_unstable();
        mentioned_fields.dedup();
        let exact_field = (mentioned_fields.len() as f64 / 2.0).min(1.0);
        if !mentioned_fields.is_empty() {
            reasons.push(format!("fields mentioned: {}", mentioned_fields.join(", ")));
        }

        // token_overlap
        let mut entity_tokens: FxHashSet<String> = name_tokens.iter().cloned().collect();
        for field in &entity.fields {
            entity_tokens.extend(identifier_tokens(&field.name));
        }
        let token_overlap = if query.tokens.is_empty() {
            0.0
        } else {
            let covered = query
                .tokens
                .iter()
                .filter(|t| entity_tokens.contains(*t))
                .count();
            covered as f64 / query.tokens.len() as f64
        };
        if token_overlap > 0.0 {
            reasons.push(format!("{:.0}% of query terms match", token_overlap * 100.0));
        }

        // synonym: only for name tokens the text did not name directly
        let synonym = if name_hit || name_tokens.is_empty() {
            0.0
        } else {
            let mut hits = 0usize;
            for name_token in name_tokens.iter().filter(|t| !query.has_token(t)) {
                if let Some(via) = query
                    .tokens
                    .iter()
                    .find(|q| self.synonyms.related(q, name_token))
                {
                    hits += 1;
                    reasons.push(format!("\"{}\" is a synonym of \"{}\"", via, name_token));
                }
            }
            hits as f64 / name_tokens.len() as f64
        };

        // recency
        let recency = match recency {
            Some((position, window)) if window > 0 && position < window => {
                reasons.push("recently queried".to_string());
                1.0 - position as f64 / window as f64
            }
            _ => 0.0,
        };

        let components = MatchComponents {
            exact_name,
            exact_field,
            token_overlap,
            synonym,
            recency,
        };
        EntityScore {
            score: self.combine(&components),
            components,
            reasons,
        }
    }

    /// Weighted sum scaled to 0–100. Non-finite inputs count as zero.
    pub fn combine(&self, components: &MatchComponents) -> f64 {
        let sum: f64 = components
            .values()
            .iter()
            .zip(self.weights.all().iter())
            .filter(|(c, w)| c.is_finite() && w.is_finite())
            .map(|(c, w)| c * w)
            .sum();
        (sum * 100.0).clamp(0.0, 100.0)
    }
}

impl Default for MatchScorer {
    fn default() -> Self {
        Self::new(MatchWeights::default(), SynonymTable::builtin())
    }
}
