//! CART classification tree with Gini impurity.

use super::TrainingSet;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

#[derive(Debug, Clone)]
pub struct TreeConfig {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features considered per split; all when `None`.
    pub max_features: Option<usize>,
    pub seed: u64,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: 12,
            min_samples_split: 2,
            min_samples_leaf: 5,
            max_features: None,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        p_positive: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    gain: f64,
}

#[derive(Debug, Clone)]
pub struct DecisionTree {
    config: TreeConfig,
    root: Option<Node>,
}

impl DecisionTree {
    pub fn new(config: TreeConfig) -> Self {
        Self { config, root: None }
    }

    pub fn fit(&mut self, data: &TrainingSet, indices: &[usize]) {
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        self.root = Some(self.build(data, indices, 0, &mut rng));
    }

    /// Positive-class frequency of the leaf reached by `features`.
    pub fn predict_proba(&self, features: &[f64]) -> f64 {
        let mut node = match &self.root {
            Some(root) => root,
            None => return 0.5,
        };
        loop {
            match node {
                Node::Leaf { p_positive } => return *p_positive,
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

    pub fn depth(&self) -> usize {
        fn walk(node: &Node) -> usize {
            match node {
                Node::Leaf { .. } => 1,
                Node::Split { left, right, .. } => 1 + walk(left).max(walk(right)),
            }
        }
        self.root.as_ref().map_or(0, walk)
    }

    fn build(&self, data: &TrainingSet, indices: &[usize], depth: usize, rng: &mut StdRng) -> Node {
        let n = indices.len();
        let positives = indices.iter().filter(|&&i| data.labels[i]).count();
        let p_positive = if n == 0 {
            0.5
        } else {
            positives as f64 / n as f64
        };

        if depth >= self.config.max_depth
            || n < self.config.min_samples_split
            || n < 2 * self.config.min_samples_leaf
            || positives == 0
            || positives == n
        {
            return Node::Leaf { p_positive };
        }

        let Some(best) = self.find_best_split(data, indices, rng) else {
            return Node::Leaf { p_positive };
        };

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| data.rows[i][best.feature] <= best.threshold);

        Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left: Box::new(self.build(data, &left_idx, depth + 1, rng)),
            right: Box::new(self.build(data, &right_idx, depth + 1, rng)),
        }
    }

    fn find_best_split(
        &self,
        data: &TrainingSet,
        indices: &[usize],
        rng: &mut StdRng,
    ) -> Option<BestSplit> {
        let n_features = data.n_features();
        let max_features = self
            .config
            .max_features
            .unwrap_or(n_features)
            .clamp(1, n_features.max(1));

        let mut candidates: Vec<usize> = (0..n_features).collect();
        candidates.shuffle(rng);

        let n = indices.len();
        let total_pos = indices.iter().filter(|&&i| data.labels[i]).count();
        let parent = gini(total_pos, n);
        let min_leaf = self.config.min_samples_leaf.max(1);

        let mut best: Option<BestSplit> = None;
        let mut sorted = indices.to_vec();

        // Past `max_features`, keep looking only until some valid split exists.
        for (examined, feature) in candidates.into_iter().enumerate() {
            if examined >= max_features && best.is_some() {
                break;
            }
            sorted.sort_by(|&a, &b| data.rows[a][feature].total_cmp(&data.rows[b][feature]));

            let mut left_pos = 0usize;
            for k in 0..n - 1 {
                if data.labels[sorted[k]] {
                    left_pos += 1;
                }
                let left_n = k + 1;
                let right_n = n - left_n;
                if left_n < min_leaf || right_n < min_leaf {
                    continue;
                }
                let here = data.rows[sorted[k]][feature];
                let next = data.rows[sorted[k + 1]][feature];
                if here >= next {
                    continue;
                }

                let weighted = (left_n as f64 * gini(left_pos, left_n)
                    + right_n as f64 * gini(total_pos - left_pos, right_n))
                    / n as f64;
                let gain = parent - weighted;
                if gain > best.as_ref().map_or(0.0, |b| b.gain) {
                    best = Some(BestSplit {
                        feature,
                        threshold: (here + next) / 2.0,
                        gain,
                    });
                }
            }
        }

        best
    }
}

fn gini(positives: usize, n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let p = positives as f64 / n as f64;
    2.0 * p * (1.0 - p)
}
