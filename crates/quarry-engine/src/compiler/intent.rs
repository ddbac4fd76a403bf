//! Intent pre-gate: refuse obviously destructive requests before any model call.

use crate::resolver::tokenizer::split_identifier;

/// Verbs that announce a destructive request.
pub const DESTRUCTIVE_VERBS: &[&str] = &[
    "alter", "clear", "delete", "destroy", "drop", "erase", "insert", "modify", "purge", "remove",
    "truncate", "update", "upsert", "wipe",
];

/// Politeness and filler that may precede the verb.
const LEADING_FILLER: &[&str] = &[
    "can", "could", "go", "just", "kindly", "now", "pls", "please", "you", "would",
];

/// The destructive verb that leads `text`, if any.
///
/// "delete all rows from orders" and "please drop the users table" match;
/// "show deleted orders" does not.
pub fn leading_destructive_verb(text: &str) -> Option<&'static str> {
    let words = split_identifier(text);
    let first = words
        .iter()
        .find(|w| !LEADING_FILLER.contains(&w.as_str()))?;
    DESTRUCTIVE_VERBS.iter().copied().find(|v| *v == first.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leading_verbs_are_caught() {
        assert_eq!(leading_destructive_verb("delete all rows from orders"), Some("delete"));
        assert_eq!(leading_destructive_verb("Please DROP the users table"), Some("drop"));
        assert_eq!(leading_destructive_verb("  could you truncate logs?"), Some("truncate"));
    }

    #[test]
    fn verbs_elsewhere_are_not() {
        assert_eq!(leading_destructive_verb("show deleted orders"), None);
        assert_eq!(leading_destructive_verb("how many updates happened today"), None);
        assert_eq!(leading_destructive_verb(""), None);
    }
}
