//! Walk-forward prediction engine.
//!
//! Each asset is walked independently over the dataset's date axis. At date
//! `i` the classifier only ever sees rows that were fully labeled before `i`
//! (minus a configurable label lag), so no prediction depends on the row it
//! predicts or on anything after it. Dates the model cannot cover are filled
//! from a momentum heuristic.

use crate::domain::error::SeerError;
use crate::domain::frame::{Frame, PredictionMatrix};
use crate::domain::model::{ForestConfig, RandomForest, TrainingSet};
use crate::domain::stats::pct_change;
use chrono::NaiveDate;
use rayon::prelude::*;
use std::collections::HashMap;
use tracing::{debug, info, warn};

pub const TARGET_SUFFIX: &str = "_target";

/// Probability that carries no directional view.
pub const NEUTRAL_PROBABILITY: f64 = 0.5;

#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    /// Most recent labeled rows used per fit.
    pub train_window: usize,
    /// Labeled rows required before the first fit.
    pub min_train_window: usize,
    /// Dates between scheduled refits.
    pub retrain_every: usize,
    /// Extra dates a label needs before it may be trained on.
    pub label_lag: usize,
    pub forest: ForestConfig,
    pub macro_features: Vec<String>,
    pub momentum_lookback: usize,
    pub fallback_prob_high: f64,
    pub fallback_prob_low: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            train_window: 252,
            min_train_window: 126,
            retrain_every: 63,
            label_lag: 0,
            forest: ForestConfig::default(),
            macro_features: default_macro_features(),
            momentum_lookback: 63,
            fallback_prob_high: 0.58,
            fallback_prob_low: 0.42,
        }
    }
}

pub fn default_macro_features() -> Vec<String> {
    let mut names: Vec<String> = ["fed_rate", "fed_rate_diff", "vix", "dxy", "biotech_flow_proxy"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    names.extend([21, 63, 252].iter().map(|w| format!("biotech_relative_strength_{w}d")));
    names
}

/// Why an asset never reached the model and was filled entirely by fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    MissingTarget,
    NoFeatures,
    InsufficientRows { rows: usize, required: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrainOutcome {
    Trained,
    /// Only one outcome class in the window; the previous model is kept.
    DegenerateLabels,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct WalkSummary {
    pub asset: String,
    pub features: Vec<String>,
    pub fallback: Option<FallbackReason>,
    pub retrains: usize,
    pub degenerate_retrains: usize,
    pub model_days: usize,
    pub fallback_days: usize,
}

/// The latest classifier fitted for one asset.
#[derive(Debug, Clone)]
pub struct TrainedModel {
    pub asset: String,
    pub trained_on: NaiveDate,
    pub training_rows: usize,
    pub forest: RandomForest,
}

#[derive(Debug, Clone)]
pub struct WalkForwardOutput {
    pub predictions: PredictionMatrix,
    pub models: HashMap<String, TrainedModel>,
    pub summaries: Vec<WalkSummary>,
}

struct AssetWalk {
    probabilities: Vec<f64>,
    model: Option<TrainedModel>,
    summary: WalkSummary,
}

pub struct WalkForwardModel {
    config: ModelConfig,
}

impl WalkForwardModel {
    pub fn new(config: ModelConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Runs the walk for every asset and assembles the prediction matrix.
    ///
    /// Assets are processed in parallel; one asset's missing data never
    /// affects another.
    pub fn generate_predictions(
        &self,
        dataset: &Frame,
        assets: &[String],
    ) -> Result<WalkForwardOutput, SeerError> {
        info!(
            assets = assets.len(),
            dates = dataset.len(),
            "starting walk-forward predictions"
        );

        let walks: Vec<AssetWalk> = assets
            .par_iter()
            .map(|asset| self.walk_asset(dataset, asset))
            .collect();

        let mut columns = Vec::with_capacity(walks.len());
        let mut models = HashMap::new();
        let mut summaries = Vec::with_capacity(walks.len());
        for walk in walks {
            columns.push(walk.probabilities);
            if let Some(model) = walk.model {
                models.insert(model.asset.clone(), model);
            }
            summaries.push(walk.summary);
        }

        let predictions = Frame::new(
            "predictions",
            dataset.index().to_vec(),
            assets.to_vec(),
            columns,
        )?;

        Ok(WalkForwardOutput {
            predictions,
            models,
            summaries,
        })
    }

    /// Macro whitelist columns plus the asset's own columns, without targets
    /// and without columns that hold no data at all.
    pub fn select_features(&self, dataset: &Frame, asset: &str) -> Vec<String> {
        let own_prefix = format!("{asset}_");
        let macro_cols = self
            .config
            .macro_features
            .iter()
            .filter(|name| dataset.has_column(name))
            .cloned();
        let asset_cols = dataset
            .columns()
            .iter()
            .filter(|c| c.as_str() == asset || c.starts_with(&own_prefix))
            .filter(|c| !c.ends_with(TARGET_SUFFIX))
            .cloned();

        let mut selected: Vec<String> = Vec::new();
        for name in macro_cols.chain(asset_cols) {
            if selected.contains(&name) {
                continue;
            }
            let has_data = dataset
                .column(&name)
                .is_some_and(|values| values.iter().any(|v| !v.is_nan()));
            if has_data {
                selected.push(name);
            }
        }
        selected
    }

    /// Momentum heuristic: high probability after a positive trailing move,
    /// low otherwise, neutral when the asset has no price history.
    pub fn fallback_probabilities(&self, dataset: &Frame, asset: &str) -> Vec<f64> {
        let n = dataset.len();
        let prices = match dataset.column(asset) {
            Some(p) if p.iter().any(|v| !v.is_nan()) => p,
            _ => return vec![NEUTRAL_PROBABILITY; n],
        };
        pct_change(prices, self.config.momentum_lookback)
            .into_iter()
            .map(|m| {
                if m > 0.0 {
                    self.config.fallback_prob_high
                } else {
                    self.config.fallback_prob_low
                }
            })
            .collect()
    }

    fn walk_asset(&self, dataset: &Frame, asset: &str) -> AssetWalk {
        let mut summary = WalkSummary {
            asset: asset.to_string(),
            ..WalkSummary::default()
        };

        let target_name = format!("{asset}{TARGET_SUFFIX}");
        let Some(target) = dataset.column(&target_name) else {
            return self.fallback_walk(dataset, summary, FallbackReason::MissingTarget);
        };

        let features = self.select_features(dataset, asset);
        if features.is_empty() {
            return self.fallback_walk(dataset, summary, FallbackReason::NoFeatures);
        }
        let feature_cols: Vec<&[f64]> = features
            .iter()
            .filter_map(|name| dataset.column(name))
            .collect();
        summary.features = features.clone();

        let labeled: Vec<usize> = (0..dataset.len())
            .filter(|&j| !target[j].is_nan() && feature_cols.iter().all(|c| !c[j].is_nan()))
            .collect();
        if labeled.len() < self.config.min_train_window {
            let reason = FallbackReason::InsufficientRows {
                rows: labeled.len(),
                required: self.config.min_train_window,
            };
            return self.fallback_walk(dataset, summary, reason);
        }

        let mut probabilities = vec![f64::NAN; dataset.len()];
        let mut model: Option<TrainedModel> = None;
        let mut last_retrain: Option<usize> = None;
        let mut pool_end = 0usize;

        for i in 0..dataset.len() {
            while pool_end < labeled.len() && labeled[pool_end] + self.config.label_lag < i {
                pool_end += 1;
            }
            if pool_end < self.config.min_train_window {
                continue;
            }

            let due = match last_retrain {
                None => true,
                Some(last) => i >= last + self.config.retrain_every,
            } || model.is_none();

            if due {
                let start = pool_end.saturating_sub(self.config.train_window);
                let window = &labeled[start..pool_end];
                let set = training_set(&feature_cols, target, window);
                match self.retrain(&set, &features) {
                    (RetrainOutcome::Trained, Some(forest)) => {
                        debug!(asset, date = %dataset.index()[i], rows = set.len(), "retrained");
                        model = Some(TrainedModel {
                            asset: asset.to_string(),
                            trained_on: dataset.index()[i],
                            training_rows: set.len(),
                            forest,
                        });
                        last_retrain = Some(i);
                        summary.retrains += 1;
                    }
                    _ => {
                        debug!(asset, date = %dataset.index()[i], "single-class window, keeping previous model");
                        summary.degenerate_retrains += 1;
                    }
                }
            }

            let Some(current) = model.as_ref() else {
                continue;
            };
            let row: Vec<f64> = feature_cols.iter().map(|c| c[i]).collect();
            if row.iter().any(|v| v.is_nan()) {
                continue;
            }
            probabilities[i] = current.forest.predict_proba(&row);
            summary.model_days += 1;
        }

        let fallback = self.fallback_probabilities(dataset, asset);
        for (p, f) in probabilities.iter_mut().zip(&fallback) {
            if p.is_nan() {
                *p = *f;
                summary.fallback_days += 1;
            }
        }

        if model.is_none() {
            warn!(asset, "no usable model was trained; predictions come from fallback");
        }

        AssetWalk {
            probabilities,
            model,
            summary,
        }
    }

    fn retrain(&self, set: &TrainingSet, features: &[String]) -> (RetrainOutcome, Option<RandomForest>) {
        if !set.has_both_classes() {
            return (RetrainOutcome::DegenerateLabels, None);
        }
        let mut forest = RandomForest::new(self.config.forest.clone());
        forest.fit(set, features);
        (RetrainOutcome::Trained, Some(forest))
    }

    fn fallback_walk(&self, dataset: &Frame, mut summary: WalkSummary, reason: FallbackReason) -> AssetWalk {
        warn!(asset = %summary.asset, ?reason, "using momentum fallback for the whole history");
        let probabilities = self.fallback_probabilities(dataset, &summary.asset);
        summary.fallback = Some(reason);
        summary.fallback_days = probabilities.len();
        AssetWalk {
            probabilities,
            model: None,
            summary,
        }
    }
}

fn training_set(feature_cols: &[&[f64]], target: &[f64], rows: &[usize]) -> TrainingSet {
    let mut set = TrainingSet::new();
    for &j in rows {
        let row = feature_cols.iter().map(|c| c[j]).collect();
        set.push(row, target[j] > 0.0);
    }
    set
}
