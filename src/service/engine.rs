// Inference engine
// Wraps a loaded model artifact and scores feature vectors; shared across
// requests behind an atomically swappable handle

use std::path::Path;
use std::sync::{Arc, RwLock};
use thiserror::Error;

use crate::classifier::artifact::{ArtifactError, ModelArtifact};
use crate::classifier::types::{Label, PredictionResult};

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("No trained model is loaded; inference is unavailable")]
    ModelUnavailable,

    #[error("Feature vector length {actual} disagrees with model K={expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// A loaded, read-only model
/// Constructed once and never mutated; retraining installs a new engine
/// through `SharedEngine` rather than touching this one
pub struct InferenceEngine {
    artifact: ModelArtifact,
}

impl InferenceEngine {
    pub fn from_artifact(artifact: ModelArtifact) -> Self {
        InferenceEngine { artifact }
    }

    /// Load and validate an artifact from disk
    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        let artifact = ModelArtifact::load(path)?;
        log::info!(
            "inference engine loaded: {} trees, K={}, trained {}",
            artifact.forest.n_trees(),
            artifact.coefficient_count,
            artifact.trained_at.to_rfc3339()
        );
        Ok(Self::from_artifact(artifact))
    }

    /// The feature vector length this model requires
    pub fn coefficient_count(&self) -> usize {
        self.artifact.coefficient_count
    }

    pub fn artifact(&self) -> &ModelArtifact {
        &self.artifact
    }

    /// Score a feature vector
    ///
    /// Label is the ensemble majority vote; confidence is the winning vote
    /// fraction. The precision/recall/f1 fields echo the held-out metrics
    /// of the predicted class from training time (corpus-level values, the
    /// same for every prediction of that class).
    pub fn predict(&self, features: &[f32]) -> Result<PredictionResult, InferenceError> {
        let expected = self.artifact.coefficient_count;
        if features.len() != expected {
            return Err(InferenceError::DimensionMismatch {
                expected,
                actual: features.len(),
            });
        }

        let (class, confidence) = self.artifact.forest.predict(features);
        // Artifact validation guarantees the label map covers every index
        let label = Label::from_index(class).unwrap_or(Label::Real);

        let metrics = self.artifact.evaluation.metrics_for(label);
        let (precision, recall, f1) = metrics
            .map(|m| (m.precision, m.recall, m.f1))
            .unwrap_or((0.0, 0.0, 0.0));

        Ok(PredictionResult {
            label,
            confidence,
            precision,
            recall,
            f1,
        })
    }
}

/// Clonable handle over the process-wide model slot
///
/// Installation is an atomic swap of the inner `Arc`: in-flight predictions
/// keep the snapshot they took, and no caller ever observes a half-updated
/// model. A handle with nothing installed reports `ModelUnavailable`.
#[derive(Clone)]
pub struct SharedEngine {
    inner: Arc<RwLock<Option<Arc<InferenceEngine>>>>,
}

impl SharedEngine {
    /// A handle with no model installed
    pub fn empty() -> Self {
        SharedEngine {
            inner: Arc::new(RwLock::new(None)),
        }
    }

    pub fn with_engine(engine: InferenceEngine) -> Self {
        let handle = Self::empty();
        handle.install(engine);
        handle
    }

    /// Load a model from disk into a fresh handle
    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        Ok(Self::with_engine(InferenceEngine::load(path)?))
    }

    /// Atomically replace the installed model
    pub fn install(&self, engine: InferenceEngine) {
        let mut slot = self.inner.write().unwrap();
        *slot = Some(Arc::new(engine));
    }

    /// Snapshot the currently installed model, if any
    pub fn current(&self) -> Option<Arc<InferenceEngine>> {
        self.inner.read().unwrap().clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.inner.read().unwrap().is_some()
    }

    /// Score a feature vector against the installed model
    pub fn predict(&self, features: &[f32]) -> Result<PredictionResult, InferenceError> {
        let engine = self.current().ok_or(InferenceError::ModelUnavailable)?;
        engine.predict(features)
    }
}
