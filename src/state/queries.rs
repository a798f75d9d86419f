// Prediction history CRUD
// Implements the narrow store/list contract the pipeline's callers consume
use chrono::Utc;
use rusqlite::params;
use uuid::Uuid;

use super::db::{DbConnection, DbResult};
use super::models::PredictionRecord;
use crate::classifier::types::{Label, PredictionResult};

/// Append a prediction to a user's history and return the stored record
pub fn store_prediction(
    db: &DbConnection,
    user_key: &str,
    source_name: &str,
    input_sha256: &str,
    result: &PredictionResult,
) -> DbResult<PredictionRecord> {
    let record = PredictionRecord {
        id: Uuid::new_v4(),
        user_key: user_key.to_string(),
        source_name: source_name.to_string(),
        input_sha256: input_sha256.to_string(),
        label: result.label,
        confidence: result.confidence,
        precision: result.precision,
        recall: result.recall,
        f1: result.f1,
        created_at: Utc::now(),
    };

    let conn = db.lock();
    conn.execute(
        "INSERT INTO predictions (id, user_key, source_name, input_sha256, label,
                                  confidence, precision_score, recall_score, f1_score, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            record.id.to_string(),
            record.user_key,
            record.source_name,
            record.input_sha256,
            record.label.as_str(),
            record.confidence as f64,
            record.precision as f64,
            record.recall as f64,
            record.f1 as f64,
            record.created_at.to_rfc3339(),
        ],
    )?;

    Ok(record)
}

/// List a user's predictions, most recent first
pub fn list_predictions(db: &DbConnection, user_key: &str) -> DbResult<Vec<PredictionRecord>> {
    let conn = db.lock();
    let mut stmt = conn.prepare(
        "SELECT id, user_key, source_name, input_sha256, label,
                confidence, precision_score, recall_score, f1_score, created_at
         FROM predictions
         WHERE user_key = ?1
         ORDER BY created_at DESC, id",
    )?;

    let records = stmt
        .query_map([user_key], |row| {
            Ok(PredictionRecord {
                id: Uuid::parse_str(&row.get::<_, String>(0)?).unwrap(),
                user_key: row.get(1)?,
                source_name: row.get(2)?,
                input_sha256: row.get(3)?,
                label: Label::from_str_name(&row.get::<_, String>(4)?).unwrap_or(Label::Real),
                confidence: row.get::<_, f64>(5)? as f32,
                precision: row.get::<_, f64>(6)? as f32,
                recall: row.get::<_, f64>(7)? as f32,
                f1: row.get::<_, f64>(8)? as f32,
                created_at: row.get::<_, String>(9)?.parse().unwrap(),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(records)
}
