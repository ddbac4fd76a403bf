//! Token-level SQL analysis.
//!
//! Statements are tokenized with sqlparser's generic dialect, so string
//! literals, quoted identifiers, and comments never match a keyword rule.
//! No parse tree is built: model output spans several dialects and a
//! tokenizer tolerates all of them.

use quarry_core::types::SchemaEntity;
use sqlparser::dialect::GenericDialect;
use sqlparser::tokenizer::{Token, Tokenizer};

use super::QueryShape;

/// Verbs that change data, schema, or privileges.
const MUTATION_VERBS: &[&str] = &[
    "ALTER", "ATTACH", "CALL", "CREATE", "DELETE", "DETACH", "DROP", "EXEC", "EXECUTE", "GRANT",
    "INSERT", "MERGE", "RENAME", "REPLACE", "REVOKE", "TRUNCATE", "UPDATE", "UPSERT",
];

/// Keywords that end a WHERE or ORDER BY section.
const CLAUSE_BOUNDARIES: &[&str] = &[
    "EXCEPT", "FETCH", "FOR", "GROUP", "HAVING", "INTERSECT", "LIMIT", "OFFSET", "ORDER", "UNION",
    "WINDOW",
];

/// Tokens with whitespace and comments removed.
pub fn significant_tokens(statement: &str) -> Result<Vec<Token>, String> {
    let dialect = GenericDialect {};
    let tokens = Tokenizer::new(&dialect, statement)
        .tokenize()
        .map_err(|e| format!("statement could not be tokenized: {}", e))?;
    Ok(tokens
        .into_iter()
        .filter(|t| !matches!(t, Token::Whitespace(_) | Token::EOF))
        .collect())
}

/// Uppercase value of an unquoted word.
fn keyword(token: &Token) -> Option<String> {
    match token {
        Token::Word(w) if w.quote_style.is_none() => Some(w.value.to_uppercase()),
        _ => None,
    }
}

/// Identifier text of any word, quoted or not.
fn identifier(token: &Token) -> Option<&str> {
    match token {
        Token::Word(w) => Some(w.value.as_str()),
        _ => None,
    }
}

fn number(token: Option<&Token>) -> Option<u64> {
    match token {
        Some(Token::Number(n, _)) => n.parse().ok(),
        _ => None,
    }
}

/// First mutating verb in the statement, if any. `REPLACE(` is the string
/// function, not the MySQL statement.
pub fn mutation_verb(tokens: &[Token]) -> Option<String> {
    tokens.iter().enumerate().find_map(|(i, token)| {
        let word = keyword(token)?;
        if !MUTATION_VERBS.contains(&word.as_str()) {
            return None;
        }
        if word == "REPLACE" && matches!(tokens.get(i + 1), Some(Token::LParen)) {
            return None;
        }
        Some(word)
    })
}

/// Structural facts about a relational statement.
pub fn analyze(tokens: &[Token], entity: &SchemaEntity) -> QueryShape {
    let mut shape = QueryShape {
        mutation: mutation_verb(tokens),
        ..QueryShape::default()
    };

    let mut selects = 0u32;
    let mut depth = 0i32;
    let mut section: Option<(Section, i32)> = None;

    for (i, token) in tokens.iter().enumerate() {
        match token {
            Token::LParen => depth += 1,
            Token::RParen => {
                depth -= 1;
                if section.is_some_and(|(_, d)| depth < d) {
                    section = None;
                }
            }
            Token::SemiColon => section = None,
            _ => {}
        }

        if let Some(word) = keyword(token) {
            let word = word.as_str();
            let next = keyword_at(tokens, i + 1);

            if section.is_some_and(|(_, d)| d == depth) && CLAUSE_BOUNDARIES.contains(&word) {
                section = None;
            }

            match word {
                "SELECT" => {
                    selects += 1;
                    if depth == 0 && next.as_deref() == Some("TOP") {
                        shape.limit = min_limit(shape.limit, number(tokens.get(i + 2)));
                    }
                }
                "WHERE" => {
                    if depth == 0 {
                        shape.has_filter = true;
                    }
                    section = Some((Section::Filter, depth));
                    continue;
                }
                "ORDER" if next.as_deref() == Some("BY") => {
                    section = Some((Section::Sort, depth));
                    continue;
                }
                // Only the outermost statement's row cap bounds the scan.
                "LIMIT" if depth == 0 => {
                    shape.limit = min_limit(shape.limit, number(tokens.get(i + 1)));
                }
                "FETCH" if depth == 0 && matches!(next.as_deref(), Some("FIRST") | Some("NEXT")) => {
                    shape.limit = min_limit(shape.limit, number(tokens.get(i + 2)));
                }
                "JOIN" | "HAVING" | "UNION" | "INTERSECT" | "EXCEPT" | "OVER" => shape.stages += 1,
                "GROUP" if next.as_deref() == Some("BY") => shape.stages += 1,
                _ => {}
            }
        }

        if let (Some((kind, _)), Some(name)) = (section, identifier(token)) {
            if let Some(field) = entity.field(name) {
                let list = match kind {
                    Section::Filter => &mut shape.filter_fields,
                    Section::Sort => &mut shape.sort_fields,
                };
                if !list.iter().any(|f| f == &field.name) {
                    list.push(field.name.clone());
                }
            }
        }
    }

    // Subqueries each add a stage.
    shape.stages += selects.saturating_sub(1);
    shape
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Section {
    Filter,
    Sort,
}

fn keyword_at(tokens: &[Token], i: usize) -> Option<String> {
    tokens.get(i).and_then(keyword)
}

fn min_limit(current: Option<u64>, found: Option<u64>) -> Option<u64> {
    match (current, found) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}
