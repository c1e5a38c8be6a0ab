//! Random-forest regressor.
//!
//! Bagged CART regression trees: each tree is grown on a bootstrap sample of
//! the training set, choosing at every node the split (over all features) that
//! minimises the summed squared error of the two children. Trees grow until a
//! node is pure, holds fewer than `min_samples_split` samples, or admits no
//! split. The forest prediction is the mean of the tree predictions.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::features::{FeatureVector, N_FEATURES};
use super::ModelError;

/// Numerical tolerance below which a node counts as pure.
const PURITY_EPSILON: f64 = 1e-12;

/// Hyperparameters for `RandomForestRegressor::fit`.
#[derive(Debug, Clone, Copy)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub seed: u64,
    pub min_samples_split: usize,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            seed: 42,
            min_samples_split: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A single regression tree stored as a flat node arena (root at index 0).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

impl RegressionTree {
    fn fit(x: &[FeatureVector], y: &[f64], sample: Vec<usize>, min_samples_split: usize) -> Self {
        let mut nodes = Vec::new();
        grow(&mut nodes, x, y, sample, min_samples_split);
        Self { nodes }
    }

    pub fn predict(&self, sample: &FeatureVector) -> Result<f64, ModelError> {
        let mut idx = 0;
        loop {
            match self.nodes.get(idx).ok_or(ModelError::InvalidTree(idx))? {
                Node::Leaf { value } => return Ok(*value),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let value = sample.get(*feature).ok_or(ModelError::InvalidTree(idx))?;
                    let next = if value <= threshold { *left } else { *right };
                    // Children always follow their parent in the arena.
                    if next <= idx {
                        return Err(ModelError::InvalidTree(idx));
                    }
                    idx = next;
                }
            }
        }
    }

    /// Check the arena layout: non-empty, features in range, every child
    /// index in bounds and after its parent.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.nodes.is_empty() {
            return Err(ModelError::InvalidTree(0));
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            let ok = match node {
                Node::Leaf { value } => value.is_finite(),
                Node::Split {
                    feature,
                    left,
                    right,
                    ..
                } => {
                    *feature < N_FEATURES
                        && [*left, *right]
                            .iter()
                            .all(|&child| child > idx && child < self.nodes.len())
                }
            };
            if !ok {
                return Err(ModelError::InvalidTree(idx));
            }
        }
        Ok(())
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

/// Grow the subtree for `sample` and return the index of its root node.
fn grow(
    nodes: &mut Vec<Node>,
    x: &[FeatureVector],
    y: &[f64],
    sample: Vec<usize>,
    min_samples_split: usize,
) -> usize {
    let n = sample.len() as f64;
    let sum: f64 = sample.iter().map(|&i| y[i]).sum();
    let sum_sq: f64 = sample.iter().map(|&i| y[i] * y[i]).sum();
    let value = sum / n;

    let id = nodes.len();
    nodes.push(Node::Leaf { value });

    let parent_sse = sum_sq - sum * sum / n;
    if sample.len() < min_samples_split || parent_sse <= PURITY_EPSILON {
        return id;
    }

    let Some((feature, threshold)) = best_split(x, y, &sample, sum, sum_sq, parent_sse) else {
        return id;
    };

    let (left, right): (Vec<usize>, Vec<usize>) =
        sample.into_iter().partition(|&i| x[i][feature] <= threshold);
    if left.is_empty() || right.is_empty() {
        return id;
    }

    let left = grow(nodes, x, y, left, min_samples_split);
    let right = grow(nodes, x, y, right, min_samples_split);
    nodes[id] = Node::Split {
        feature,
        threshold,
        left,
        right,
    };
    id
}

/// Find the (feature, threshold) pair with the lowest child SSE, if any
/// split improves on the parent.
fn best_split(
    x: &[FeatureVector],
    y: &[f64],
    sample: &[usize],
    sum: f64,
    sum_sq: f64,
    parent_sse: f64,
) -> Option<(usize, f64)> {
    let n = sample.len();
    let mut best: Option<(usize, f64)> = None;
    let mut best_sse = parent_sse - PURITY_EPSILON;

    let mut order = sample.to_vec();
    for feature in 0..N_FEATURES {
        order.sort_by(|&a, &b| x[a][feature].total_cmp(&x[b][feature]));

        let mut left_sum = 0.0;
        let mut left_sq = 0.0;
        for k in 0..n - 1 {
            let yi = y[order[k]];
            left_sum += yi;
            left_sq += yi * yi;

            let here = x[order[k]][feature];
            let next = x[order[k + 1]][feature];
            if here == next {
                continue;
            }

            let n_left = (k + 1) as f64;
            let n_right = (n - k - 1) as f64;
            let right_sum = sum - left_sum;
            let right_sq = sum_sq - left_sq;
            let sse = (left_sq - left_sum * left_sum / n_left)
                + (right_sq - right_sum * right_sum / n_right);

            if sse < best_sse {
                best_sse = sse;
                best = Some((feature, here + (next - here) / 2.0));
            }
        }
    }

    best
}

/// Fitted random-forest regressor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestRegressor {
    trees: Vec<RegressionTree>,
}

impl RandomForestRegressor {
    /// Fit `params.n_estimators` trees on bootstrap samples of `(x, y)`.
    ///
    /// Deterministic for a given seed.
    pub fn fit(x: &[FeatureVector], y: &[f64], params: ForestParams) -> Result<Self, ModelError> {
        if x.is_empty() {
            return Err(ModelError::EmptyTrainingSet);
        }
        if x.len() != y.len() {
            return Err(ModelError::LengthMismatch {
                samples: x.len(),
                targets: y.len(),
            });
        }
        if params.n_estimators == 0 {
            return Err(ModelError::EmptyForest);
        }

        let mut rng = StdRng::seed_from_u64(params.seed);
        let n = x.len();
        let trees = (0..params.n_estimators)
            .map(|_| {
                let bootstrap: Vec<usize> = (0..n).map(|_| rng.random_range(0..n)).collect();
                RegressionTree::fit(x, y, bootstrap, params.min_samples_split.max(2))
            })
            .collect();

        Ok(Self { trees })
    }

    pub fn predict(&self, sample: &FeatureVector) -> Result<f64, ModelError> {
        if self.trees.is_empty() {
            return Err(ModelError::EmptyForest);
        }
        let mut total = 0.0;
        for tree in &self.trees {
            total += tree.predict(sample)?;
        }
        Ok(total / self.trees.len() as f64)
    }

    pub fn predict_all(&self, samples: &[FeatureVector]) -> Result<Vec<f64>, ModelError> {
        samples.iter().map(|s| self.predict(s)).collect()
    }

    /// Reject forests that would fail or loop at inference time.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.trees.is_empty() {
            return Err(ModelError::EmptyForest);
        }
        self.trees.iter().try_for_each(RegressionTree::validate)
    }

    pub fn n_estimators(&self) -> usize {
        self.trees.len()
    }
}
