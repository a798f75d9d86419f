// Model training
// Seeded train/held-out split, ensemble fitting, held-out evaluation and
// artifact assembly

use chrono::Utc;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use thiserror::Error;

use crate::classifier::artifact::{ModelArtifact, FORMAT_VERSION};
use crate::classifier::forest::{ForestConfig, RandomForest, N_CLASSES};
use crate::classifier::types::{ClassMetrics, EvaluationReport, Label, LabeledExample};

#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("Training requires at least {required} examples, got {found}")]
    TooFewExamples { required: usize, found: usize },

    #[error("Corpus is degenerate: only the {0:?} class is present")]
    SingleClass(Label),

    #[error("Training partition lost a class after the split; corpus is too small or too skewed")]
    DegenerateSplit,

    #[error("Feature vector length {actual} disagrees with configured K={expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Configuration for the training run
/// Both seeds are fixed by default so repeated runs of the same experiment
/// are reproducible
#[derive(Debug, Clone)]
pub struct TrainerConfig {
    /// Fraction of examples withheld for evaluation
    pub held_out_ratio: f32,

    /// Seed for the shuffle that precedes the split
    pub split_seed: u64,

    /// Ensemble hyperparameters
    pub forest: ForestConfig,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        TrainerConfig {
            held_out_ratio: 0.2,
            split_seed: 42,
            forest: ForestConfig::default(),
        }
    }
}

/// Fit an ensemble over labeled examples and produce a versioned artifact
/// plus the held-out evaluation report embedded in it
pub fn train(
    examples: &[LabeledExample],
    k: usize,
    config: &TrainerConfig,
) -> Result<(ModelArtifact, EvaluationReport), TrainingError> {
    if examples.len() < 2 {
        return Err(TrainingError::TooFewExamples {
            required: 2,
            found: examples.len(),
        });
    }

    for example in examples {
        if example.features.len() != k {
            return Err(TrainingError::DimensionMismatch {
                expected: k,
                actual: example.features.len(),
            });
        }
    }

    let mut present = [false; N_CLASSES];
    for example in examples {
        present[example.label.index()] = true;
    }
    if let Some(only) = single_present_class(&present) {
        return Err(TrainingError::SingleClass(only));
    }

    // Seeded shuffle then split; held-out gets at least one example
    let mut indices: Vec<usize> = (0..examples.len()).collect();
    let mut rng = StdRng::seed_from_u64(config.split_seed);
    indices.shuffle(&mut rng);

    let held_out_count = ((examples.len() as f32 * config.held_out_ratio).round() as usize)
        .clamp(1, examples.len() - 1);
    let (held_out_idx, train_idx) = indices.split_at(held_out_count);

    let train_features: Vec<Vec<f32>> = train_idx
        .iter()
        .map(|&i| examples[i].features.clone())
        .collect();
    let train_labels: Vec<usize> = train_idx.iter().map(|&i| examples[i].label.index()).collect();

    let mut train_present = [false; N_CLASSES];
    for &label in &train_labels {
        train_present[label] = true;
    }
    if train_present.iter().any(|p| !p) {
        return Err(TrainingError::DegenerateSplit);
    }

    log::info!(
        "training ensemble: {} train / {} held-out examples, {} trees, K={}",
        train_idx.len(),
        held_out_idx.len(),
        config.forest.n_trees,
        k
    );

    let forest = RandomForest::fit(&train_features, &train_labels, &config.forest);
    let evaluation = evaluate(&forest, examples, held_out_idx);

    log::info!(
        "held-out accuracy {:.3} over {} examples",
        evaluation.accuracy,
        evaluation.held_out_count
    );

    let artifact = ModelArtifact {
        format_version: FORMAT_VERSION,
        trained_at: Utc::now(),
        coefficient_count: k,
        label_map: ModelArtifact::canonical_label_map(),
        forest_config: config.forest.clone(),
        forest,
        evaluation: evaluation.clone(),
    };

    Ok((artifact, evaluation))
}

fn single_present_class(present: &[bool; N_CLASSES]) -> Option<Label> {
    let count = present.iter().filter(|p| **p).count();
    if count == 1 {
        let index = present.iter().position(|p| *p)?;
        Label::from_index(index)
    } else {
        None
    }
}

/// Accuracy and per-class precision/recall/f1 over the held-out partition
fn evaluate(
    forest: &RandomForest,
    examples: &[LabeledExample],
    held_out_idx: &[usize],
) -> EvaluationReport {
    let mut correct = 0usize;
    // Per class: true positives, false positives, false negatives
    let mut tp = [0usize; N_CLASSES];
    let mut fp = [0usize; N_CLASSES];
    let mut fn_ = [0usize; N_CLASSES];
    let mut support = [0usize; N_CLASSES];

    for &i in held_out_idx {
        let example = &examples[i];
        let truth = example.label.index();
        let (predicted, _) = forest.predict(&example.features);

        support[truth] += 1;
        if predicted == truth {
            correct += 1;
            tp[truth] += 1;
        } else {
            fp[predicted] += 1;
            fn_[truth] += 1;
        }
    }

    let per_class = (0..N_CLASSES)
        .map(|class| {
            let precision = ratio(tp[class], tp[class] + fp[class]);
            let recall = ratio(tp[class], tp[class] + fn_[class]);
            let f1 = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };
            ClassMetrics {
                precision,
                recall,
                f1,
                support: support[class],
            }
        })
        .collect();

    EvaluationReport {
        accuracy: ratio(correct, held_out_idx.len()),
        per_class,
        held_out_count: held_out_idx.len(),
    }
}

fn ratio(numerator: usize, denominator: usize) -> f32 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f32 / denominator as f32
    }
}
