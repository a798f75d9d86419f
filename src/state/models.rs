// Data models for prediction history
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::classifier::types::Label;

/// One stored prediction, keyed to the requesting user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub id: Uuid,
    pub user_key: String,

    /// Original filename or path of the classified input
    pub source_name: String,

    /// SHA-256 of the input bytes, for correlating re-uploads
    pub input_sha256: String,

    pub label: Label,
    pub confidence: f32,
    pub precision: f32,
    pub recall: f32,
    pub f1: f32,

    pub created_at: DateTime<Utc>,
}
