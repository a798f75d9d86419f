// Serving module
// Inference engine, shared model handle and the prediction service

pub mod classify;
pub mod engine;

pub use classify::{train_model, ClassifyError, PipelineConfig, PredictionService, TrainError};
pub use engine::{InferenceEngine, InferenceError, SharedEngine};
