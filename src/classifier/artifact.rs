// Trained model artifact
// Single versioned JSON document carrying everything inference needs:
// the ensemble, the coefficient count K, the label map and the held-out
// evaluation recorded at training time

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::classifier::forest::{ForestConfig, RandomForest};
use crate::classifier::types::{EvaluationReport, Label};

/// Current artifact format version
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported artifact format version {found} (expected {FORMAT_VERSION})")]
    UnsupportedVersion { found: u32 },

    #[error("Unrecognized label map: {0:?}")]
    UnrecognizedLabelMap(Vec<String>),
}

/// Serialized classifier state plus the training context it depends on
/// The artifact is the only channel by which inference learns K and the
/// label order, so a stale or mismatched model can never be silently used
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,

    pub trained_at: DateTime<Utc>,

    /// Feature vector length K the ensemble was fitted on
    pub coefficient_count: usize,

    /// Explicit class-index-to-name map, e.g. ["REAL", "FAKE"]
    /// Stored rather than re-derived from directory order at load time
    pub label_map: Vec<String>,

    /// Hyperparameters the ensemble was fitted with
    pub forest_config: ForestConfig,

    pub forest: RandomForest,

    /// Held-out metrics recorded once at training time
    pub evaluation: EvaluationReport,
}

impl ModelArtifact {
    /// The canonical label map for this pipeline
    pub fn canonical_label_map() -> Vec<String> {
        Label::ALL.iter().map(|l| l.as_str().to_string()).collect()
    }

    /// Persist as pretty-printed JSON
    pub fn save(&self, path: &Path) -> Result<(), ArtifactError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec_pretty(self)?;
        std::fs::write(path, json)?;
        log::info!(
            "model artifact saved to {} ({} trees, K={})",
            path.display(),
            self.forest.n_trees(),
            self.coefficient_count
        );
        Ok(())
    }

    /// Load and validate an artifact from disk
    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        let bytes = std::fs::read(path)?;
        Self::from_json_bytes(&bytes)
    }

    /// Deserialize and validate an artifact from JSON bytes
    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self, ArtifactError> {
        // Peek at the version before deserializing the full document
        let header: ArtifactHeader = serde_json::from_slice(bytes)?;
        if header.format_version != FORMAT_VERSION {
            return Err(ArtifactError::UnsupportedVersion {
                found: header.format_version,
            });
        }

        let artifact: ModelArtifact = serde_json::from_slice(bytes)?;

        let valid_labels = artifact.label_map.len() == Label::ALL.len()
            && artifact
                .label_map
                .iter()
                .all(|name| Label::from_str_name(name).is_some());
        if !valid_labels {
            return Err(ArtifactError::UnrecognizedLabelMap(artifact.label_map));
        }

        Ok(artifact)
    }

    pub fn to_json_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec_pretty(self)
    }
}

/// Minimal view for version negotiation
#[derive(Debug, Deserialize)]
struct ArtifactHeader {
    format_version: u32,
}
