//! Bootstrap-aggregated forest of classification trees.

use super::TrainingSet;
use super::decision_tree::{DecisionTree, TreeConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

#[derive(Debug, Clone, PartialEq)]
pub struct ForestConfig {
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    /// Features per split; `sqrt(n_features)` when `None`.
    pub max_features: Option<usize>,
    pub bootstrap: bool,
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 40,
            max_depth: 12,
            min_samples_leaf: 5,
            max_features: None,
            bootstrap: true,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RandomForest {
    config: ForestConfig,
    trees: Vec<DecisionTree>,
    feature_names: Vec<String>,
}

impl RandomForest {
    pub fn new(config: ForestConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            feature_names: Vec::new(),
        }
    }

    /// Fits every tree on its own bootstrap sample. Trees are built in parallel;
    /// each tree derives its seed from the forest seed, so the result does not
    /// depend on scheduling.
    pub fn fit(&mut self, data: &TrainingSet, feature_names: &[String]) {
        self.feature_names = feature_names.to_vec();
        let n_features = data.n_features();
        let max_features = self
            .config
            .max_features
            .unwrap_or_else(|| ((n_features as f64).sqrt() as usize).max(1));
        let n = data.len();

        self.trees = (0..self.config.n_trees)
            .into_par_iter()
            .map(|i| {
                let seed = self.config.seed.wrapping_add(i as u64);
                let indices: Vec<usize> = if self.config.bootstrap && n > 0 {
                    let mut rng = StdRng::seed_from_u64(seed);
                    (0..n).map(|_| rng.gen_range(0..n)).collect()
                } else {
                    (0..n).collect()
                };

                let mut tree = DecisionTree::new(TreeConfig {
                    max_depth: self.config.max_depth,
                    min_samples_split: 2,
                    min_samples_leaf: self.config.min_samples_leaf,
                    max_features: Some(max_features),
                    seed: seed.wrapping_mul(31).wrapping_add(7),
                });
                tree.fit(data, &indices);
                tree
            })
            .collect();
    }

    pub fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Mean positive-class probability across trees.
    pub fn predict_proba(&self, features: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.5;
        }
        self.trees
            .iter()
            .map(|t| t.predict_proba(features))
            .sum::<f64>()
            / self.trees.len() as f64
    }
}
