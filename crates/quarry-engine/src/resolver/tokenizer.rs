//! Text normalization shared by the resolver and the compiler's intent gate.
//!
//! Tokens are lowercase, alphanumeric, singularized, and free of stopwords.

use rustc_hash::FxHashSet;

/// Words that never identify a table. Includes generic data nouns ("rows",
/// "records") and question scaffolding ("show me all").
pub const STOPWORDS: &[&str] = &[
    "a", "about", "all", "an", "and", "any", "are", "as", "at", "be", "been", "by", "can",
    "collection", "count", "data", "database", "did", "display", "do", "does", "each", "entries",
    "entry", "every", "fetch", "find", "first", "for", "from", "get", "give", "had", "has",
    "have", "how", "i", "in", "is", "it", "its", "last", "list", "many", "me", "much", "my",
    "number", "of", "on", "or", "our", "per", "please", "record", "records", "return", "row",
    "rows", "show", "some", "table", "than", "that", "the", "their", "them", "then", "there",
    "these", "this", "those", "to", "top", "total", "us", "was", "we", "were", "what", "when",
    "where", "which", "who", "whose", "with", "you", "your",
];

pub fn is_stopword(word: &str) -> bool {
    STOPWORDS.binary_search(&word).is_ok()
}

/// Reduce a lowercase English plural to its singular form.
///
/// Deliberately conservative: words of four letters or fewer, and endings like
/// "ss"/"us"/"is", are left alone.
pub fn singularize(word: &str) -> String {
    let len = word.len();
    if len <= 3 || !word.is_ascii() {
        return word.to_string();
    }
    if let Some(stem) = word.strip_suffix("ies") {
        if len > 4 {
            return format!("{}y", stem);
        }
    }
    for suffix in ["sses", "xes", "ches", "shes", "zes"] {
        if word.ends_with(suffix) {
            return word[..len - 2].to_string();
        }
    }
    if word.ends_with("ss") || word.ends_with("us") || word.ends_with("is") {
        return word.to_string();
    }
    match word.strip_suffix('s') {
        Some(stem) => stem.to_string(),
        None => word.to_string(),
    }
}

/// Split an identifier on `_`, `-`, spaces, and camelCase boundaries.
pub fn split_identifier(name: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut prev_lower_or_digit = false;

    for ch in name.chars() {
        if !ch.is_alphanumeric() {
            if !current.is_empty() {
                parts.push(std::mem::take(&mut current));
            }
            prev_lower_or_digit = false;
            continue;
        }
        if ch.is_uppercase() && prev_lower_or_digit && !current.is_empty() {
            parts.push(std::mem::take(&mut current));
        }
        prev_lower_or_digit = ch.is_lowercase() || ch.is_ascii_digit();
        current.extend(ch.to_lowercase());
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

/// Tokens of a schema identifier, singularized. Stopwords are kept because
/// identifiers like `order_count` legitimately contain them.
pub fn identifier_tokens(name: &str) -> Vec<String> {
    split_identifier(name)
        .into_iter()
        .filter(|t| !t.chars().all(|c| c.is_ascii_digit()))
        .map(|t| singularize(&t))
        .collect()
}

/// Tokens of a free-text question, in order of appearance, deduplicated.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut seen = FxHashSet::default();
    let mut tokens = Vec::new();
    for raw in split_identifier(text) {
        if raw.len() < 2 || raw.chars().all(|c| c.is_ascii_digit()) || is_stopword(&raw) {
            continue;
        }
        let token = singularize(&raw);
        if is_stopword(&token) {
            continue;
        }
        if seen.insert(token.clone()) {
            tokens.push(token);
        }
    }
    tokens
}

/// Whether `needle` occurs in `haystack` delimited by non-identifier characters.
/// Both sides are expected lowercase.
pub fn contains_word(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    let is_ident = |c: char| c.is_alphanumeric() || c == '_';
    let mut start = 0;
    while let Some(pos) = haystack[start..].find(needle) {
        let begin = start + pos;
        let end = begin + needle.len();
        let before_ok = haystack[..begin].chars().next_back().map_or(true, |c| !is_ident(c));
        let after_ok = haystack[end..].chars().next().map_or(true, |c| !is_ident(c));
        if before_ok && after_ok {
            return true;
        }
        start = begin + needle.len().max(1);
        if start >= haystack.len() {
            break;
        }
        while !haystack.is_char_boundary(start) {
            start += 1;
        }
    }
    false
}
