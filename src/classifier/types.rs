// Classification types
// Labels, labeled examples, prediction results and evaluation reports

use serde::{Deserialize, Serialize};

/// Binary class label for a voice clip
/// Index order is part of the model artifact contract: REAL = 0, FAKE = 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    /// Genuine human recording
    Real,

    /// Synthetically generated voice
    Fake,
}

impl Label {
    /// All labels in artifact index order
    pub const ALL: [Label; 2] = [Label::Real, Label::Fake];

    /// Class index used by the ensemble and the artifact label map
    pub fn index(&self) -> usize {
        match self {
            Label::Real => 0,
            Label::Fake => 1,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Label::Real),
            1 => Some(Label::Fake),
            _ => None,
        }
    }

    /// Canonical uppercase name used in artifacts and user-facing output
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Real => "REAL",
            Label::Fake => "FAKE",
        }
    }

    pub fn from_str_name(s: &str) -> Option<Self> {
        match s {
            "REAL" => Some(Label::Real),
            "FAKE" => Some(Label::Fake),
            _ => None,
        }
    }

    /// Dataset subdirectory holding examples of this class
    pub fn directory_name(&self) -> &'static str {
        match self {
            Label::Real => "real",
            Label::Fake => "fake",
        }
    }
}

/// A feature vector paired with its class label (training-time only)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabeledExample {
    pub features: Vec<f32>,
    pub label: Label,
}

impl LabeledExample {
    pub fn new(features: Vec<f32>, label: Label) -> Self {
        LabeledExample { features, label }
    }
}

/// Outcome of one inference call
///
/// `precision`, `recall` and `f1` are the held-out corpus-level metrics of
/// the predicted class, recorded once at training time. They are identical
/// for every prediction of the same class and are not per-instance
/// uncertainty estimates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResult {
    pub label: Label,

    /// Fraction of ensemble votes for the winning class [0.0, 1.0]
    pub confidence: f32,

    pub precision: f32,
    pub recall: f32,
    pub f1: f32,
}

/// Precision/recall/f1 for a single class over the held-out partition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub precision: f32,
    pub recall: f32,
    pub f1: f32,

    /// Number of held-out examples of this class
    pub support: usize,
}

/// Held-out evaluation computed once at training time
/// Indexed by class: `per_class[label.index()]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub accuracy: f32,
    pub per_class: Vec<ClassMetrics>,
    pub held_out_count: usize,
}

impl EvaluationReport {
    pub fn metrics_for(&self, label: Label) -> Option<&ClassMetrics> {
        self.per_class.get(label.index())
    }
}
