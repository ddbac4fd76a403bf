//! translations table queries.

use quarry_core::errors::StorageError;
use quarry_core::types::{
    ConfirmationReason, ConnectionId, EntityRef, OrganizationId, SafetyTier, Translation,
    TranslationId,
};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{corrupt, from_millis, sqe, to_millis};

const TABLE: &str = "translations";

const SELECT_COLUMNS: &str = "SELECT id, organization_id, text, target_json, body_json,
        explanation, required_indexes, safety, cost_score, requires_confirmation,
        confirmation_reason, model_hint_json, created_at
     FROM translations";

/// Raw column values, decoded into a `Translation` outside the row callback.
struct TranslationRow {
    id: String,
    organization_id: String,
    text: String,
    target_json: String,
    body_json: String,
    explanation: String,
    required_indexes: String,
    safety: String,
    cost_score: f64,
    requires_confirmation: bool,
    confirmation_reason: Option<String>,
    model_hint_json: String,
    created_at: i64,
}

impl TranslationRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            organization_id: row.get(1)?,
            text: row.get(2)?,
            target_json: row.get(3)?,
            body_json: row.get(4)?,
            explanation: row.get(5)?,
            required_indexes: row.get(6)?,
            safety: row.get(7)?,
            cost_score: row.get(8)?,
            requires_confirmation: row.get(9)?,
            confirmation_reason: row.get(10)?,
            model_hint_json: row.get(11)?,
            created_at: row.get(12)?,
        })
    }

    fn decode(self) -> Result<Translation, StorageError> {
        let json_err = |column: &str, e: serde_json::Error| {
            corrupt(TABLE, format!("{} of {}: {}", column, self.id, e))
        };
        let target = serde_json::from_str(&self.target_json).map_err(|e| json_err("target_json", e))?;
        let body = serde_json::from_str(&self.body_json).map_err(|e| json_err("body_json", e))?;
        let required_indexes = serde_json::from_str(&self.required_indexes)
            .map_err(|e| json_err("required_indexes", e))?;
        let model_hint = serde_json::from_str(&self.model_hint_json)
            .map_err(|e| json_err("model_hint_json", e))?;
        let safety = SafetyTier::parse(&self.safety)
            .ok_or_else(|| corrupt(TABLE, format!("unknown safety tier {:?}", self.safety)))?;
        let confirmation_reason = match self.confirmation_reason.as_deref() {
            None => None,
            Some(raw) => Some(ConfirmationReason::parse(raw).ok_or_else(|| {
                corrupt(TABLE, format!("unknown confirmation reason {:?}", raw))
            })?),
        };

        Ok(Translation {
            id: TranslationId::new(self.id),
            organization_id: OrganizationId::new(self.organization_id),
            text: self.text,
            target,
            body,
            explanation: self.explanation,
            required_indexes,
            safety,
            cost_score: self.cost_score,
            requires_confirmation: self.requires_confirmation,
            confirmation_reason,
            model_hint,
            created_at: from_millis(TABLE, self.created_at)?,
        })
    }
}

/// Insert or replace a translation. Translations are immutable, so a
/// replace only ever rewrites identical content.
pub fn insert_translation(conn: &Connection, t: &Translation) -> Result<(), StorageError> {
    let target_json = serde_json::to_string(&t.target).map_err(|e| corrupt(TABLE, e))?;
    let body_json = serde_json::to_string(&t.body).map_err(|e| corrupt(TABLE, e))?;
    let fingerprint = t.body.fingerprint().map_err(|e| corrupt(TABLE, e))?;
    let indexes_json = serde_json::to_string(&t.required_indexes).map_err(|e| corrupt(TABLE, e))?;
    let hint_json = serde_json::to_string(&t.model_hint).map_err(|e| corrupt(TABLE, e))?;

    conn.prepare_cached(
        "INSERT OR REPLACE INTO translations
         (id, organization_id, connection_id, entity, text, target_json, body_json,
          body_fingerprint, explanation, required_indexes, safety, cost_score,
          requires_confirmation, confirmation_reason, model_hint_json, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
    )
    .map_err(sqe)?
    .execute(params![
        t.id.as_str(),
        t.organization_id.as_str(),
        t.target.connection_id.as_str(),
        t.target.entity,
        t.text,
        target_json,
        body_json,
        fingerprint,
        t.explanation,
        indexes_json,
        t.safety.as_str(),
        t.cost_score,
        t.requires_confirmation,
        t.confirmation_reason.map(|r| r.as_str()),
        hint_json,
        to_millis(t.created_at),
    ])
    .map_err(sqe)?;
    Ok(())
}

pub fn get_translation(
    conn: &Connection,
    id: &TranslationId,
) -> Result<Option<Translation>, StorageError> {
    let sql = format!("{} WHERE id = ?1", SELECT_COLUMNS);
    let row = conn
        .prepare_cached(&sql)
        .map_err(sqe)?
        .query_row(params![id.as_str()], TranslationRow::from_row)
        .optional()
        .map_err(sqe)?;
    row.map(TranslationRow::decode).transpose()
}

/// Distinct targets of the organization's translations, newest first.
pub fn recent_targets(
    conn: &Connection,
    organization_id: &OrganizationId,
    limit: usize,
) -> Result<Vec<EntityRef>, StorageError> {
    if limit == 0 {
        return Ok(Vec::new());
    }
    let mut stmt = conn
        .prepare_cached(
            "SELECT connection_id, entity FROM translations
             WHERE organization_id = ?1
             ORDER BY created_at DESC, rowid DESC",
        )
        .map_err(sqe)?;
    let mut rows = stmt.query(params![organization_id.as_str()]).map_err(sqe)?;

    let mut out: Vec<EntityRef> = Vec::new();
    while let Some(row) = rows.next().map_err(sqe)? {
        let connection_id: String = row.get(0).map_err(sqe)?;
        let entity: String = row.get(1).map_err(sqe)?;
        let target = EntityRef::new(ConnectionId::new(connection_id), entity);
        if !out.contains(&target) {
            out.push(target);
            if out.len() >= limit {
                break;
            }
        }
    }
    Ok(out)
}

pub fn count_translations(conn: &Connection) -> Result<i64, StorageError> {
    conn.query_row("SELECT COUNT(*) FROM translations", [], |row| row.get(0))
        .map_err(sqe)
}
