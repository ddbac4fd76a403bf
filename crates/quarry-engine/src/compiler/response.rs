//! Parsing the model's reply into a dialect-tagged body.

use quarry_core::errors::{QuarryError, QuarryResult};
use quarry_core::types::{
    BackendFamily, BackendKind, FindQuery, ModelSafetyHint, Permission, PipelineQuery, QueryBody,
    SafetyTier,
};
use serde_json::{Map, Value};

/// Document-store operations that write. Compared case-insensitively.
const WRITE_KINDS: &[&str] = &[
    "bulkwrite",
    "delete",
    "deletemany",
    "deleteone",
    "drop",
    "findoneanddelete",
    "findoneandreplace",
    "findoneandupdate",
    "insert",
    "insertmany",
    "insertone",
    "replaceone",
    "update",
    "updatemany",
    "updateone",
];

const FIND_KEYS: &[&str] = &["filter", "limit", "projection", "sort"];

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedReply {
    pub body: QueryBody,
    pub explanation: String,
    pub hint: ModelSafetyHint,
    pub suggested_indexes: Vec<String>,
}

/// Remove a surrounding markdown code fence, with or without a language tag.
pub fn strip_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(start) = trimmed.find("```") else {
        return trimmed;
    };
    let after_open = &trimmed[start + 3..];
    // Skip the info string ("json", "sql", ...) up to the end of the line.
    let body_start = after_open.find('\n').map_or(0, |i| i + 1);
    let body = &after_open[body_start..];
    match body.rfind("```") {
        Some(end) => body[..end].trim(),
        None => body.trim(),
    }
}

/// The first balanced `{...}` in `text`, honoring string literals.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parse a raw model reply for `backend`. Write-shaped document kinds are
/// rejected here since they have no body representation.
pub fn parse_reply(
    raw: &str,
    backend: BackendKind,
    permission: Permission,
) -> QuarryResult<ParsedReply> {
    let unfenced = strip_fences(raw);
    let json_text = extract_json_object(unfenced)
        .ok_or_else(|| QuarryError::translation("model reply contains no JSON object"))?;
    let value: Value = serde_json::from_str(json_text)
        .map_err(|e| QuarryError::translation(format!("model reply is not valid JSON: {}", e)))?;
    let Value::Object(mut reply) = value else {
        return Err(QuarryError::translation("model reply is not a JSON object"));
    };

    let query = match reply.remove("query") {
        Some(Value::Null) | None => {
            return Err(QuarryError::translation("model reply is missing \"query\""))
        }
        Some(q) => q,
    };

    let explanation = reply
        .get("explain")
        .or_else(|| reply.get("explanation"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| QuarryError::translation("model reply is missing \"explain\""))?
        .to_string();

    let hint = ModelSafetyHint {
        safety: reply
            .get("safety")
            .and_then(Value::as_str)
            .and_then(SafetyTier::parse),
        estimated_cost: reply
            .get("estimatedCost")
            .and_then(Value::as_f64)
            .filter(|c| c.is_finite()),
    };
    if hint.safety.is_none() && hint.estimated_cost.is_none() {
        return Err(QuarryError::translation(
            "model reply carries neither \"safety\" nor \"estimatedCost\"",
        ));
    }

    let suggested_indexes = reply
        .get("requiresIndexes")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let kind = reply
        .get("kind")
        .and_then(Value::as_str)
        .map(|k| k.trim().to_ascii_lowercase());

    let body = match backend.family() {
        BackendFamily::Relational => relational_body(query)?,
        BackendFamily::Document => document_body(query, kind.as_deref(), permission)?,
    };

    Ok(ParsedReply {
        body,
        explanation,
        hint,
        suggested_indexes,
    })
}

fn relational_body(query: Value) -> QuarryResult<QueryBody> {
    match query {
        Value::String(s) if !s.trim().is_empty() => Ok(QueryBody::sql(s.trim())),
        Value::String(_) => Err(QuarryError::translation("model returned an empty statement")),
        _ => Err(QuarryError::translation(
            "relational backends need \"query\" to be a SQL string",
        )),
    }
}

fn document_body(query: Value, kind: Option<&str>, permission: Permission) -> QuarryResult<QueryBody> {
    if let Some(kind) = kind {
        if WRITE_KINDS.contains(&kind) {
            if !permission.allows_mutation() {
                return Err(QuarryError::UnsafeQueryRejected {
                    verb: kind.to_string(),
                    reason: "read-only callers cannot run write operations".to_string(),
                });
            }
            return Err(QuarryError::translation(format!(
                "\"{}\" cannot be expressed as a find or pipeline",
                kind
            )));
        }
    }

    let query = match query {
        Value::String(s) => serde_json::from_str(&s).map_err(|e| {
            QuarryError::translation(format!("document query is not valid JSON: {}", e))
        })?,
        other => other,
    };

    match query {
        Value::Array(stages) => pipeline(stages),
        Value::Object(mut obj) => {
            if kind == Some("pipeline") {
                return match obj.remove("pipeline") {
                    Some(Value::Array(stages)) => pipeline(stages),
                    _ => Err(QuarryError::translation(
                        "pipeline reply needs an array of stages",
                    )),
                };
            }
            if FIND_KEYS.iter().any(|k| obj.contains_key(*k)) {
                find(obj)
            } else {
                Ok(QueryBody::Find(FindQuery {
                    filter: Value::Object(obj),
                    ..FindQuery::default()
                }))
            }
        }
        _ => Err(QuarryError::translation(
            "document query must be a find object or a pipeline array",
        )),
    }
}

fn pipeline(stages: Vec<Value>) -> QuarryResult<QueryBody> {
    for stage in &stages {
        let single_key = stage.as_object().is_some_and(|o| o.len() == 1);
        if !single_key {
            return Err(QuarryError::translation(
                "every pipeline stage must be an object with exactly one operator",
            ));
        }
    }
    Ok(QueryBody::Pipeline(PipelineQuery { stages }))
}

fn find(mut obj: Map<String, Value>) -> QuarryResult<QueryBody> {
    let filter = match obj.remove("filter") {
        None | Some(Value::Null) => Value::Object(Map::new()),
        Some(f @ Value::Object(_)) => f,
        Some(_) => return Err(QuarryError::translation("find filter must be an object")),
    };
    let limit = match obj.remove("limit") {
        None | Some(Value::Null) => None,
        Some(v) => Some(
            v.as_u64()
                .or_else(|| v.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
                .ok_or_else(|| QuarryError::translation("find limit must be a non-negative number"))?,
        ),
    };
    let projection = obj.remove("projection").filter(|v| !v.is_null());
    let sort = obj.remove("sort").filter(|v| !v.is_null());
    Ok(QueryBody::Find(FindQuery {
        filter,
        projection,
        sort,
        limit,
    }))
}
