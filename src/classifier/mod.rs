// Classification module
// Ensemble classifier, training, evaluation and the model artifact

pub mod artifact;
pub mod forest;
pub mod trainer;
pub mod types;

pub use artifact::{ArtifactError, ModelArtifact, FORMAT_VERSION};
pub use forest::{ForestConfig, RandomForest};
pub use trainer::{train, TrainerConfig, TrainingError};
pub use types::{ClassMetrics, EvaluationReport, Label, LabeledExample, PredictionResult};
