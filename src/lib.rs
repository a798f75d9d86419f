// voxcheck - Deepfake voice screening
// Module declarations

pub mod audio;
pub mod classifier;
pub mod dataset;
pub mod service;
pub mod state;

pub use audio::{AudioSource, DecoderConfig, MfccConfig};
pub use classifier::{Label, ModelArtifact, PredictionResult};
pub use service::{
    train_model, ClassifyError, InferenceEngine, PipelineConfig, PredictionService, SharedEngine,
};
