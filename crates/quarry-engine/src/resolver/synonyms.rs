//! Fixed synonym table for entity-name matching.
//!
//! Words are stored singularized; lookups singularize their input so
//! "clients" reaches "customers" through the shared group.

use rustc_hash::{FxHashMap, FxHashSet};

use super::tokenizer::singularize;

/// Built-in groups. Each inner slice is one equivalence class.
const BUILTIN_GROUPS: &[&[&str]] = &[
    &["customer", "client", "buyer", "patron", "shopper"],
    &["order", "purchase"],
    &["product", "item", "sku", "good", "merchandise", "article"],
    &["user", "member", "person", "people", "account"],
    &["employee", "staff", "worker", "personnel"],
    &["invoice", "bill"],
    &["payment", "charge", "transaction"],
    &["supplier", "vendor", "provider"],
    &["category", "genre"],
    &["address", "location"],
    &["ticket", "issue", "case", "incident"],
    &["message", "notification"],
    &["event", "log", "activity"],
    &["review", "rating", "feedback"],
    &["shipment", "delivery"],
];

#[derive(Debug, Clone, Default)]
pub struct SynonymTable {
    /// word → ids of the groups containing it
    groups_by_word: FxHashMap<String, Vec<usize>>,
}

impl SynonymTable {
    /// Built-in groups only.
    pub fn builtin() -> Self {
        Self::with_extra(&[])
    }

    /// Built-in groups merged with caller-supplied ones.
    pub fn with_extra(extra: &[Vec<String>]) -> Self {
        let mut table = Self::default();
        let mut next_id = 0;
        for group in BUILTIN_GROUPS {
            table.add_group(next_id, group.iter().copied());
            next_id += 1;
        }
        for group in extra {
            table.add_group(next_id, group.iter().map(String::as_str));
            next_id += 1;
        }
        table
    }

    fn add_group<'a>(&mut self, id: usize, words: impl Iterator<Item = &'a str>) {
        for word in words {
            let key = singularize(&word.trim().to_lowercase());
            if key.is_empty() {
                continue;
            }
            let ids = self.groups_by_word.entry(key).or_default();
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
    }

    /// Whether two distinct words share a group.
    pub fn related(&self, a: &str, b: &str) -> bool {
        let a = singularize(&a.to_lowercase());
        let b = singularize(&b.to_lowercase());
        if a == b {
            return false;
        }
        match (self.groups_by_word.get(&a), self.groups_by_word.get(&b)) {
            (Some(ga), Some(gb)) => ga.iter().any(|id| gb.contains(id)),
            _ => false,
        }
    }

    /// Every other word sharing a group with `word`, sorted.
    pub fn expand(&self, word: &str) -> Vec<String> {
        let key = singularize(&word.to_lowercase());
        let Some(ids) = self.groups_by_word.get(&key) else {
            return Vec::new();
        };
        let ids: FxHashSet<usize> = ids.iter().copied().collect();
        let mut out: Vec<String> = self
            .groups_by_word
            .iter()
            .filter(|(w, gs)| **w != key && gs.iter().any(|g| ids.contains(g)))
            .map(|(w, _)| w.clone())
            .collect();
        out.sort_unstable();
        out
    }

    pub fn len(&self) -> usize {
        self.groups_by_word.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups_by_word.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clients_reach_customers() {
        let table = SynonymTable::builtin();
        assert!(table.related("clients", "customers"));
        assert!(table.related("customer", "client"));
        assert!(!table.related("customer", "customer"));
        assert!(!table.related("customer", "invoice"));
    }

    #[test]
    fn extra_groups_merge_with_builtin() {
        let extra = vec![vec!["patients".to_string(), "members".to_string()]];
        let table = SynonymTable::with_extra(&extra);
        assert!(table.related("patient", "member"));
        // "member" keeps its built-in group too.
        assert!(table.related("member", "user"));
        assert!(!table.related("patient", "user"));
    }

    #[test]
    fn expand_is_sorted_and_excludes_self() {
        let table = SynonymTable::builtin();
        assert_eq!(table.expand("invoices"), vec!["bill".to_string()]);
        assert!(table.expand("nonsense").is_empty());
    }
}
