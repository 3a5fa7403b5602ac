//! Bagged regression trees
//!
//! A small random-forest regressor: each tree greedily splits on the
//! feature and threshold that most reduce the sum of squared errors, and
//! the ensemble averages per-tree predictions. Bootstrap sampling is driven
//! by a seeded generator so a fit is reproducible.

use rand::prelude::*;
use rand::rngs::StdRng;

/// Tuning for a fitted forest
#[derive(Debug, Clone, Copy)]
pub struct ForestParams {
    pub tree_count: usize,
    pub max_depth: usize,
    pub min_samples_leaf: usize,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            tree_count: 100,
            max_depth: 8,
            min_samples_leaf: 2,
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

/// One variance-reduction regression tree
#[derive(Debug, Clone)]
pub struct RegressionTree {
    root: Node,
}

impl RegressionTree {
    fn fit(rows: &[Vec<f64>], targets: &[f64], indices: Vec<usize>, params: &ForestParams) -> Self {
        Self {
            root: grow(rows, targets, indices, 0, params),
        }
    }

    pub fn predict(&self, features: &[f64]) -> f64 {
        let mut node = &self.root;
        loop {
            match node {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if features[*feature] <= *threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }
}

fn grow(
    rows: &[Vec<f64>],
    targets: &[f64],
    indices: Vec<usize>,
    depth: usize,
    params: &ForestParams,
) -> Node {
    let value = mean_at(targets, &indices);

    if depth >= params.max_depth || indices.len() < params.min_samples_leaf * 2 {
        return Node::Leaf { value };
    }
    if sse_at(targets, &indices) <= 1e-12 {
        return Node::Leaf { value };
    }

    let Some((feature, threshold)) = best_split(rows, targets, &indices, params.min_samples_leaf)
    else {
        return Node::Leaf { value };
    };

    let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
        .into_iter()
        .partition(|&i| rows[i][feature] <= threshold);

    Node::Split {
        feature,
        threshold,
        left: Box::new(grow(rows, targets, left_idx, depth + 1, params)),
        right: Box::new(grow(rows, targets, right_idx, depth + 1, params)),
    }
}

/// Best (feature, threshold) by summed squared error of the two sides.
/// None when no boundary between distinct feature values improves on the
/// parent while leaving `min_leaf` samples on each side.
fn best_split(
    rows: &[Vec<f64>],
    targets: &[f64],
    indices: &[usize],
    min_leaf: usize,
) -> Option<(usize, f64)> {
    let n = indices.len();
    let width = rows[indices[0]].len();

    let total_sum: f64 = indices.iter().map(|&i| targets[i]).sum();
    let total_sq: f64 = indices.iter().map(|&i| targets[i] * targets[i]).sum();
    let parent_sse = total_sq - total_sum * total_sum / n as f64;

    let mut best_sse = parent_sse - 1e-12;
    let mut best: Option<(usize, f64)> = None;

    for feature in 0..width {
        let mut order: Vec<usize> = indices.to_vec();
        order.sort_by(|&a, &b| {
            rows[a][feature]
                .partial_cmp(&rows[b][feature])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut left_sum = 0.0;
        let mut left_sq = 0.0;

        for split in 1..n {
            let moved = targets[order[split - 1]];
            left_sum += moved;
            left_sq += moved * moved;

            if split < min_leaf || n - split < min_leaf {
                continue;
            }
            let lo = rows[order[split - 1]][feature];
            let hi = rows[order[split]][feature];
            if hi <= lo {
                continue;
            }

            let left_n = split as f64;
            let right_n = (n - split) as f64;
            let right_sum = total_sum - left_sum;
            let right_sq = total_sq - left_sq;
            let sse = (left_sq - left_sum * left_sum / left_n)
                + (right_sq - right_sum * right_sum / right_n);

            if sse < best_sse {
                // Midpoint can round up to `hi` for adjacent floats; fall
                // back to the left value so the partition stays exact.
                let midpoint = (lo + hi) / 2.0;
                let threshold = if midpoint >= hi { lo } else { midpoint };
                best_sse = sse;
                best = Some((feature, threshold));
            }
        }
    }

    best
}

fn mean_at(targets: &[f64], indices: &[usize]) -> f64 {
    if indices.is_empty() {
        return 0.0;
    }
    indices.iter().map(|&i| targets[i]).sum::<f64>() / indices.len() as f64
}

fn sse_at(targets: &[f64], indices: &[usize]) -> f64 {
    let mean = mean_at(targets, indices);
    indices.iter().map(|&i| (targets[i] - mean).powi(2)).sum()
}

/// Bootstrap ensemble of regression trees
#[derive(Debug, Clone)]
pub struct RegressionForest {
    trees: Vec<RegressionTree>,
}

impl RegressionForest {
    /// Fit `tree_count` trees, each on a bootstrap resample of the rows.
    /// The seed fixes the resampling, so identical inputs produce an
    /// identical forest.
    pub fn fit(rows: &[Vec<f64>], targets: &[f64], params: &ForestParams, seed: u64) -> Self {
        let n = targets.len();
        if n == 0 || params.tree_count == 0 {
            return Self { trees: Vec::new() };
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let trees = (0..params.tree_count)
            .map(|_| {
                let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                RegressionTree::fit(rows, targets, sample, params)
            })
            .collect();

        Self { trees }
    }

    /// Per-tree predictions, the raw material for interval calibration
    pub fn predict_all(&self, features: &[f64]) -> Vec<f64> {
        self.trees.iter().map(|t| t.predict(features)).collect()
    }

    /// Ensemble point prediction: mean across trees
    pub fn predict(&self, features: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        self.predict_all(features).iter().sum::<f64>() / self.trees.len() as f64
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ForestParams {
        ForestParams {
            tree_count: 25,
            max_depth: 6,
            min_samples_leaf: 2,
        }
    }

    fn step_data() -> (Vec<Vec<f64>>, Vec<f64>) {
        // One informative feature: low values map to ~2.0, high to ~5.0
        let rows: Vec<Vec<f64>> = (0..20).map(|i| vec![i as f64, 1.0]).collect();
        let targets: Vec<f64> = (0..20)
            .map(|i| if i < 10 { 2.0 } else { 5.0 })
            .collect();
        (rows, targets)
    }

    #[test]
    fn test_constant_targets_predict_constant() {
        let rows: Vec<Vec<f64>> = (0..12).map(|i| vec![i as f64]).collect();
        let targets = vec![3.5; 12];
        let forest = RegressionForest::fit(&rows, &targets, &params(), 42);

        assert!((forest.predict(&[0.0]) - 3.5).abs() < 1e-9);
        assert!((forest.predict(&[100.0]) - 3.5).abs() < 1e-9);
    }

    #[test]
    fn test_learns_step_function() {
        let (rows, targets) = step_data();
        let forest = RegressionForest::fit(&rows, &targets, &params(), 42);

        assert!((forest.predict(&[2.0, 1.0]) - 2.0).abs() < 0.5);
        assert!((forest.predict(&[17.0, 1.0]) - 5.0).abs() < 0.5);
    }

    #[test]
    fn test_predictions_stay_within_target_range() {
        let (rows, targets) = step_data();
        let forest = RegressionForest::fit(&rows, &targets, &params(), 7);

        for x in [-50.0, 0.0, 9.5, 19.0, 500.0] {
            let p = forest.predict(&[x, 1.0]);
            assert!((2.0..=5.0).contains(&p), "prediction {} out of range", p);
        }
    }

    #[test]
    fn test_fit_is_deterministic_for_a_seed() {
        let (rows, targets) = step_data();
        let a = RegressionForest::fit(&rows, &targets, &params(), 42);
        let b = RegressionForest::fit(&rows, &targets, &params(), 42);

        for x in [0.0, 5.0, 12.0, 19.0] {
            assert_eq!(a.predict(&[x, 1.0]), b.predict(&[x, 1.0]));
        }
    }

    #[test]
    fn test_extrapolates_recent_level_on_trend() {
        // Rising trend: the rightmost leaves carry the latest level
        let rows: Vec<Vec<f64>> = (0..24).map(|i| vec![i as f64]).collect();
        let targets: Vec<f64> = (0..24).map(|i| 3.1 + 0.04 * i as f64).collect();
        let forest = RegressionForest::fit(&rows, &targets, &params(), 42);

        let ahead = forest.predict(&[30.0]);
        let overall_mean = targets.iter().sum::<f64>() / targets.len() as f64;
        assert!(ahead > overall_mean);
        assert!(ahead <= 3.1 + 0.04 * 23.0 + 1e-9);
    }

    #[test]
    fn test_empty_training_set_yields_empty_forest() {
        let forest = RegressionForest::fit(&[], &[], &params(), 42);
        assert_eq!(forest.tree_count(), 0);
        assert_eq!(forest.predict(&[1.0]), 0.0);
    }

    #[test]
    fn test_per_tree_predictions_match_tree_count() {
        let (rows, targets) = step_data();
        let forest = RegressionForest::fit(&rows, &targets, &params(), 42);
        assert_eq!(forest.predict_all(&[3.0, 1.0]).len(), 25);
    }
}
