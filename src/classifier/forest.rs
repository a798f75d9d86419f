// Bagged decision-tree ensemble
// CART trees with Gini splits, bootstrap resampling and majority voting

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Number of classes the ensemble discriminates (REAL/FAKE)
pub const N_CLASSES: usize = 2;

/// Hyperparameters for fitting the ensemble
/// All randomness is derived from `seed`; identical data and config always
/// produce an identical forest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestConfig {
    /// Number of bagged trees
    pub n_trees: usize,

    /// Base seed; tree i uses seed + i
    pub seed: u64,

    /// Maximum tree depth
    pub max_depth: usize,

    /// Minimum number of samples required to attempt a split
    pub min_samples_split: usize,
}

impl Default for ForestConfig {
    fn default() -> Self {
        ForestConfig {
            n_trees: 50,
            seed: 1,
            max_depth: 12,
            min_samples_split: 2,
        }
    }
}

/// Flat node storage; children reference indices into the same vector
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum TreeNode {
    Split {
        feature: usize,
        threshold: f32,
        left: usize,
        right: usize,
    },
    Leaf {
        class: usize,
    },
}

/// A single CART decision tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<TreeNode>,
}

impl DecisionTree {
    /// Vote for a class by walking from the root
    fn vote(&self, features: &[f32]) -> usize {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Leaf { class } => return *class,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if features[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}

/// Majority-vote ensemble of bagged decision trees
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    /// Fit the ensemble over feature rows and class indices
    /// Caller guarantees non-empty input with consistent row lengths and
    /// labels in 0..N_CLASSES
    pub fn fit(features: &[Vec<f32>], labels: &[usize], config: &ForestConfig) -> Self {
        let n_samples = features.len();
        let n_features = features[0].len();

        // Feature subsampling per split, sqrt(K) rounded up
        let features_per_split = ((n_features as f32).sqrt().ceil() as usize).max(1);

        let trees = (0..config.n_trees)
            .map(|tree_idx| {
                let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(tree_idx as u64));

                // Bootstrap sample with replacement
                let indices: Vec<usize> =
                    (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect();

                let mut builder = TreeBuilder {
                    features,
                    labels,
                    config,
                    features_per_split,
                    rng,
                    nodes: Vec::new(),
                };
                builder.build(&indices, 0);
                DecisionTree {
                    nodes: builder.nodes,
                }
            })
            .collect();

        RandomForest { trees }
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Vote counts per class across all trees
    pub fn votes(&self, features: &[f32]) -> [usize; N_CLASSES] {
        let mut counts = [0usize; N_CLASSES];
        for tree in &self.trees {
            counts[tree.vote(features)] += 1;
        }
        counts
    }

    /// Class-membership probabilities as vote fractions
    pub fn predict_proba(&self, features: &[f32]) -> [f32; N_CLASSES] {
        let counts = self.votes(features);
        let total = self.trees.len().max(1) as f32;
        let mut proba = [0.0f32; N_CLASSES];
        for (p, c) in proba.iter_mut().zip(counts.iter()) {
            *p = *c as f32 / total;
        }
        proba
    }

    /// Winning class index and its vote fraction
    /// Ties break toward the lower class index
    pub fn predict(&self, features: &[f32]) -> (usize, f32) {
        let proba = self.predict_proba(features);
        let mut best = 0;
        for class in 1..N_CLASSES {
            if proba[class] > proba[best] {
                best = class;
            }
        }
        (best, proba[best])
    }
}

/// Recursive CART construction over bootstrap indices
struct TreeBuilder<'a> {
    features: &'a [Vec<f32>],
    labels: &'a [usize],
    config: &'a ForestConfig,
    features_per_split: usize,
    rng: StdRng,
    nodes: Vec<TreeNode>,
}

impl TreeBuilder<'_> {
    /// Build a subtree for the given sample indices, returning its node index
    fn build(&mut self, indices: &[usize], depth: usize) -> usize {
        let counts = self.class_counts(indices);
        let majority = majority_class(&counts);

        let is_pure = counts.iter().filter(|c| **c > 0).count() <= 1;
        if is_pure
            || depth >= self.config.max_depth
            || indices.len() < self.config.min_samples_split
        {
            return self.push(TreeNode::Leaf { class: majority });
        }

        let Some((feature, threshold)) = self.best_split(indices) else {
            return self.push(TreeNode::Leaf { class: majority });
        };

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .copied()
            .partition(|&i| self.features[i][feature] <= threshold);

        if left_idx.is_empty() || right_idx.is_empty() {
            return self.push(TreeNode::Leaf { class: majority });
        }

        let node = self.push(TreeNode::Split {
            feature,
            threshold,
            left: 0,
            right: 0,
        });
        let left = self.build(&left_idx, depth + 1);
        let right = self.build(&right_idx, depth + 1);

        if let TreeNode::Split {
            left: l, right: r, ..
        } = &mut self.nodes[node]
        {
            *l = left;
            *r = right;
        }

        node
    }

    fn push(&mut self, node: TreeNode) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    fn class_counts(&self, indices: &[usize]) -> [usize; N_CLASSES] {
        let mut counts = [0usize; N_CLASSES];
        for &i in indices {
            counts[self.labels[i]] += 1;
        }
        counts
    }

    /// Best (feature, threshold) by Gini impurity over a random feature subset
    fn best_split(&mut self, indices: &[usize]) -> Option<(usize, f32)> {
        let n_features = self.features[0].len();

        // Sample a distinct feature subset for this split
        let mut candidates: Vec<usize> = (0..n_features).collect();
        for i in 0..self.features_per_split.min(n_features) {
            let j = self.rng.gen_range(i..n_features);
            candidates.swap(i, j);
        }
        candidates.truncate(self.features_per_split.min(n_features));

        let mut best: Option<(usize, f32, f32)> = None;

        for &feature in &candidates {
            let mut values: Vec<f32> = indices.iter().map(|&i| self.features[i][feature]).collect();
            values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            values.dedup();

            for pair in values.windows(2) {
                let threshold = (pair[0] + pair[1]) / 2.0;
                let gini = self.weighted_gini(indices, feature, threshold);

                let improves = match best {
                    None => true,
                    Some((_, _, best_gini)) => gini < best_gini,
                };
                if improves {
                    best = Some((feature, threshold, gini));
                }
            }
        }

        best.map(|(feature, threshold, _)| (feature, threshold))
    }

    /// Size-weighted Gini impurity of the two partitions
    fn weighted_gini(&self, indices: &[usize], feature: usize, threshold: f32) -> f32 {
        let mut left = [0usize; N_CLASSES];
        let mut right = [0usize; N_CLASSES];

        for &i in indices {
            if self.features[i][feature] <= threshold {
                left[self.labels[i]] += 1;
            } else {
                right[self.labels[i]] += 1;
            }
        }

        let total = indices.len() as f32;
        let left_n: usize = left.iter().sum();
        let right_n: usize = right.iter().sum();

        gini(&left) * left_n as f32 / total + gini(&right) * right_n as f32 / total
    }
}

fn gini(counts: &[usize; N_CLASSES]) -> f32 {
    let total: usize = counts.iter().sum();
    if total == 0 {
        return 0.0;
    }
    let total = total as f32;
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f32 / total;
            p * p
        })
        .sum::<f32>()
}

fn majority_class(counts: &[usize; N_CLASSES]) -> usize {
    let mut best = 0;
    for class in 1..N_CLASSES {
        if counts[class] > counts[best] {
            best = class;
        }
    }
    best
}
