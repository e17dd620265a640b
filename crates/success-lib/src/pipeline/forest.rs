//! Class-weighted random forest classifier
//!
//! Bagged CART trees with Gini impurity. Each tree sees a bootstrap sample
//! and draws a random feature subset at every node; leaves keep the
//! weighted class distribution so the forest can average probabilities.

use crate::error::{Result, SuccessError};
use ndarray::{Array2, ArrayView1};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Strategy for the number of candidate features per split
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxFeatures {
    Sqrt,
    Log2,
    Fixed(usize),
    All,
}

impl MaxFeatures {
    fn resolve(self, n_features: usize) -> usize {
        match self {
            MaxFeatures::Sqrt => (n_features as f64).sqrt() as usize,
            MaxFeatures::Log2 => (n_features as f64).log2() as usize,
            MaxFeatures::Fixed(n) => n.min(n_features),
            MaxFeatures::All => n_features,
        }
        .max(1)
    }
}

/// Per-class sample weighting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassWeight {
    /// n_samples / (n_classes * count(class)) so every class carries equal mass
    Balanced,
    Uniform,
}

/// Forest hyper-parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestConfig {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    pub bootstrap: bool,
    pub class_weight: ClassWeight,
    pub random_state: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 200,
            max_depth: Some(15),
            min_samples_split: 3,
            min_samples_leaf: 2,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
            class_weight: ClassWeight::Balanced,
            random_state: 42,
        }
    }
}

impl ForestConfig {
    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }
}

/// Decision tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    Leaf {
        /// Normalized weighted class distribution
        distribution: Vec<f64>,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

/// Training inputs shared by every node of one tree
struct GrowContext<'a> {
    x: &'a Array2<f64>,
    y: &'a [usize],
    weights: &'a [f64],
    n_classes: usize,
    max_features: usize,
    config: &'a ForestConfig,
}

/// Classification tree over a fixed class schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    root: TreeNode,
}

impl DecisionTree {
    fn grow(ctx: &GrowContext<'_>, indices: Vec<usize>, rng: &mut ChaCha8Rng) -> Self {
        Self {
            root: build_node(ctx, indices, 0, rng),
        }
    }

    pub fn predict_distribution(&self, row: ArrayView1<'_, f64>) -> &[f64] {
        let mut node = &self.root;
        loop {
            match node {
                TreeNode::Leaf { distribution } => return distribution,
                TreeNode::Split { feature, threshold, left, right } => {
                    node = if row[*feature] <= *threshold { left } else { right };
                }
            }
        }
    }

    pub fn depth(&self) -> usize {
        fn walk(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => 1 + walk(left).max(walk(right)),
            }
        }
        walk(&self.root)
    }
}

fn class_totals(ctx: &GrowContext<'_>, indices: &[usize]) -> Vec<f64> {
    let mut totals = vec![0.0; ctx.n_classes];
    for &i in indices {
        totals[ctx.y[i]] += ctx.weights[i];
    }
    totals
}

fn leaf(totals: &[f64]) -> TreeNode {
    let sum: f64 = totals.iter().sum();
    let distribution = if sum > 0.0 {
        totals.iter().map(|t| t / sum).collect()
    } else {
        vec![1.0 / totals.len() as f64; totals.len()]
    };
    TreeNode::Leaf { distribution }
}

fn gini(totals: &[f64], sum: f64) -> f64 {
    if sum <= 0.0 {
        return 0.0;
    }
    1.0 - totals.iter().map(|t| (t / sum).powi(2)).sum::<f64>()
}

fn build_node(
    ctx: &GrowContext<'_>,
    indices: Vec<usize>,
    depth: usize,
    rng: &mut ChaCha8Rng,
) -> TreeNode {
    let totals = class_totals(ctx, &indices);
    let n = indices.len();
    let pure = totals.iter().filter(|&&t| t > 0.0).count() <= 1;

    if pure
        || n < ctx.config.min_samples_split
        || n < 2 * ctx.config.min_samples_leaf
        || ctx.config.max_depth.is_some_and(|d| depth >= d)
    {
        return leaf(&totals);
    }

    let Some((feature, threshold)) = find_best_split(ctx, &indices, &totals, rng) else {
        return leaf(&totals);
    };

    let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
        .into_iter()
        .partition(|&i| ctx.x[[i, feature]] <= threshold);

    TreeNode::Split {
        feature,
        threshold,
        left: Box::new(build_node(ctx, left_idx, depth + 1, rng)),
        right: Box::new(build_node(ctx, right_idx, depth + 1, rng)),
    }
}

/// Lowest weighted child impurity over `max_features` non-constant candidate features.
/// Constant features are skipped without consuming the candidate budget.
fn find_best_split(
    ctx: &GrowContext<'_>,
    indices: &[usize],
    totals: &[f64],
    rng: &mut ChaCha8Rng,
) -> Option<(usize, f64)> {
    let n_features = ctx.x.ncols();
    let total_weight: f64 = totals.iter().sum();
    let min_leaf = ctx.config.min_samples_leaf.max(1);

    let mut order: Vec<usize> = (0..n_features).collect();
    order.shuffle(rng);

    let mut best: Option<(usize, f64, f64)> = None;
    let mut visited = 0;
    let mut column: Vec<(f64, usize)> = Vec::with_capacity(indices.len());

    for feature in order {
        if visited >= ctx.max_features {
            break;
        }
        column.clear();
        column.extend(indices.iter().map(|&i| (ctx.x[[i, feature]], i)));
        column.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        let (first, last) = (column[0].0, column[column.len() - 1].0);
        if first >= last {
            continue;
        }
        visited += 1;

        let mut left = vec![0.0; ctx.n_classes];
        let mut left_weight = 0.0;
        for pos in 0..column.len() - 1 {
            let (value, i) = column[pos];
            let w = ctx.weights[i];
            left[ctx.y[i]] += w;
            left_weight += w;

            let next = column[pos + 1].0;
            if value >= next {
                continue;
            }
            let n_left = pos + 1;
            if n_left < min_leaf || column.len() - n_left < min_leaf {
                continue;
            }

            let right: Vec<f64> = totals.iter().zip(&left).map(|(t, l)| t - l).collect();
            let right_weight = total_weight - left_weight;
            let impurity = (left_weight * gini(&left, left_weight)
                + right_weight * gini(&right, right_weight))
                / total_weight;

            if best.map_or(true, |(_, _, b)| impurity < b) {
                let mut threshold = (value + next) / 2.0;
                if threshold >= next {
                    threshold = value;
                }
                best = Some((feature, threshold, impurity));
            }
        }
    }

    best.map(|(feature, threshold, _)| (feature, threshold))
}

/// Bagged ensemble of decision trees
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    config: ForestConfig,
    trees: Vec<DecisionTree>,
    n_features: usize,
    n_classes: usize,
    class_weights: Vec<f64>,
}

impl RandomForest {
    /// Fit on class indices in `0..n_classes`
    pub fn fit(
        x: &Array2<f64>,
        y: &[usize],
        n_classes: usize,
        config: &ForestConfig,
    ) -> Result<Self> {
        let n_samples = x.nrows();
        if n_samples == 0 {
            return Err(SuccessError::Input("cannot fit forest on zero samples".to_string()));
        }
        if n_samples != y.len() {
            return Err(SuccessError::Input(format!(
                "feature rows ({}) and labels ({}) differ",
                n_samples,
                y.len()
            )));
        }
        if let Some(&bad) = y.iter().find(|&&c| c >= n_classes) {
            return Err(SuccessError::Input(format!("class index {} out of range", bad)));
        }
        if config.n_estimators == 0 {
            return Err(SuccessError::Input("n_estimators must be positive".to_string()));
        }

        let class_weights = compute_class_weights(y, n_classes, config.class_weight);
        let weights: Vec<f64> = y.iter().map(|&c| class_weights[c]).collect();

        let ctx = GrowContext {
            x,
            y,
            weights: &weights,
            n_classes,
            max_features: config.max_features.resolve(x.ncols()),
            config,
        };

        let trees: Vec<DecisionTree> = (0..config.n_estimators)
            .into_par_iter()
            .map(|tree_idx| {
                let seed = config.random_state.wrapping_add(tree_idx as u64);
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                let indices: Vec<usize> = if config.bootstrap {
                    (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
                } else {
                    (0..n_samples).collect()
                };
                DecisionTree::grow(&ctx, indices, &mut rng)
            })
            .collect();

        debug!(
            n_trees = trees.len(),
            n_features = x.ncols(),
            max_depth = trees.iter().map(DecisionTree::depth).max().unwrap_or(0),
            "Random forest fitted"
        );

        Ok(Self {
            config: config.clone(),
            trees,
            n_features: x.ncols(),
            n_classes,
            class_weights,
        })
    }

    /// Mean leaf distribution over all trees, one row per sample.
    ///
    /// Trees are summed in a fixed order so results are reproducible.
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if x.ncols() != self.n_features {
            return Err(SuccessError::Inference(format!(
                "input has {} features, forest expects {}",
                x.ncols(),
                self.n_features
            )));
        }
        if self.trees.is_empty() {
            return Err(SuccessError::Inference("forest has no trees".to_string()));
        }

        let mut proba = Array2::zeros((x.nrows(), self.n_classes));
        let n_trees = self.trees.len() as f64;
        for (r, row) in x.rows().into_iter().enumerate() {
            for tree in &self.trees {
                for (c, p) in tree.predict_distribution(row).iter().enumerate() {
                    proba[[r, c]] += p;
                }
            }
            proba.row_mut(r).mapv_inplace(|v| v / n_trees);
        }
        Ok(proba)
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }
}

fn compute_class_weights(y: &[usize], n_classes: usize, mode: ClassWeight) -> Vec<f64> {
    match mode {
        ClassWeight::Uniform => vec![1.0; n_classes],
        ClassWeight::Balanced => {
            let mut counts = vec![0usize; n_classes];
            for &c in y {
                counts[c] += 1;
            }
            let present = counts.iter().filter(|&&c| c > 0).count().max(1) as f64;
            counts
                .iter()
                .map(|&c| if c > 0 { y.len() as f64 / (present * c as f64) } else { 0.0 })
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn small_config() -> ForestConfig {
        ForestConfig::default().with_n_estimators(25)
    }

    fn separable() -> (Array2<f64>, Vec<usize>) {
        let x = array![
            [0.0, 0.0],
            [0.1, 0.2],
            [0.2, 0.1],
            [0.3, 0.0],
            [1.0, 1.0],
            [1.1, 1.2],
            [1.2, 1.1],
            [1.3, 1.0],
            [2.0, 2.0],
            [2.1, 2.2],
            [2.2, 2.1],
            [2.3, 2.0],
        ];
        let y = vec![0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2];
        (x, y)
    }

    #[test]
    fn test_classifier_separates_classes() {
        let (x, y) = separable();
        let forest = RandomForest::fit(&x, &y, 3, &small_config()).unwrap();
        let proba = forest.predict_proba(&x).unwrap();

        let correct = proba
            .rows()
            .into_iter()
            .zip(&y)
            .filter(|(row, &label)| {
                let best = (0..3).fold(0, |b, c| if row[c] > row[b] { c } else { b });
                best == label
            })
            .count();
        assert!(correct as f64 / y.len() as f64 >= 0.9, "accuracy {}/{}", correct, y.len());
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let (x, y) = separable();
        let forest = RandomForest::fit(&x, &y, 3, &small_config()).unwrap();
        let proba = forest.predict_proba(&array![[0.5, 0.5], [5.0, -1.0]]).unwrap();
        for row in proba.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_missing_class_gets_zero_probability() {
        let x = array![[0.0], [0.1], [0.2], [1.0], [1.1], [1.2]];
        let y = vec![0, 0, 0, 2, 2, 2];
        let forest = RandomForest::fit(&x, &y, 3, &small_config()).unwrap();
        let proba = forest.predict_proba(&x).unwrap();
        assert_eq!(proba.ncols(), 3);
        assert!(proba.column(1).iter().all(|&p| p == 0.0));
    }

    #[test]
    fn test_fit_is_deterministic() {
        let (x, y) = separable();
        let a = RandomForest::fit(&x, &y, 3, &small_config()).unwrap();
        let b = RandomForest::fit(&x, &y, 3, &small_config()).unwrap();
        let probe = array![[0.7, 0.4], [1.6, 1.9]];
        assert_eq!(a.predict_proba(&probe).unwrap(), b.predict_proba(&probe).unwrap());
    }

    #[test]
    fn test_balanced_class_weights() {
        let w = compute_class_weights(&[0, 0, 0, 1], 3, ClassWeight::Balanced);
        assert!((w[0] - 4.0 / 6.0).abs() < 1e-12);
        assert!((w[1] - 2.0).abs() < 1e-12);
        assert_eq!(w[2], 0.0);
    }

    #[test]
    fn test_max_depth_is_respected() {
        let (x, y) = separable();
        let config = small_config().with_max_depth(1);
        let forest = RandomForest::fit(&x, &y, 3, &config).unwrap();
        assert!(forest.trees.iter().all(|t| t.depth() <= 1));
    }

    #[test]
    fn test_rejects_bad_inputs() {
        let x = array![[0.0], [1.0]];
        assert!(RandomForest::fit(&x, &[0], 3, &small_config()).is_err());
        assert!(RandomForest::fit(&x, &[0, 5], 3, &small_config()).is_err());
        let forest = RandomForest::fit(&x, &[0, 1], 3, &small_config()).unwrap();
        assert!(matches!(
            forest.predict_proba(&array![[0.0, 1.0]]),
            Err(SuccessError::Inference(_))
        ));
    }

    #[test]
    fn test_max_features_resolution() {
        assert_eq!(MaxFeatures::Sqrt.resolve(1019), 31);
        assert_eq!(MaxFeatures::Log2.resolve(1), 1);
        assert_eq!(MaxFeatures::Fixed(50).resolve(10), 10);
        assert_eq!(MaxFeatures::All.resolve(19), 19);
    }
}
