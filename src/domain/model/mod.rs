//! Tree-ensemble classifier used by the walk-forward engine.

pub mod decision_tree;
pub mod random_forest;

pub use decision_tree::{DecisionTree, TreeConfig};
pub use random_forest::{ForestConfig, RandomForest};

/// Row-major training data with binary outcome labels.
#[derive(Debug, Clone, Default)]
pub struct TrainingSet {
    pub rows: Vec<Vec<f64>>,
    pub labels: Vec<bool>,
}

impl TrainingSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, row: Vec<f64>, label: bool) {
        self.rows.push(row);
        self.labels.push(label);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn n_features(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    /// True when both outcome classes are present.
    pub fn has_both_classes(&self) -> bool {
        let positives = self.labels.iter().filter(|&&l| l).count();
        positives > 0 && positives < self.labels.len()
    }
}
