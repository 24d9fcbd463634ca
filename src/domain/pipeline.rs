//! End-to-end strategy run: predictions, weights, simulation, metrics.

use crate::domain::backtest::{BacktestResult, run_backtest};
use crate::domain::config::StrategyConfig;
use crate::domain::error::SeerError;
use crate::domain::frame::{Frame, PredictionMatrix, PriceTable};
use crate::domain::metrics::MetricsRecord;
use crate::domain::portfolio::{WeightMatrix, build_target_weights};
use crate::domain::robustness::{BootstrapSummary, bootstrap_equity};
use crate::domain::universe::{SkippedAsset, Universe, validate_universe};
use crate::domain::walk_forward::{TrainedModel, WalkForwardModel, WalkSummary};
use std::collections::HashMap;
use tracing::info;

#[derive(Debug, Clone)]
pub struct StrategyRun {
    pub universe: Universe,
    pub skipped: Vec<SkippedAsset>,
    pub predictions: PredictionMatrix,
    pub weights: WeightMatrix,
    pub backtest: BacktestResult,
    pub metrics: MetricsRecord,
    pub models: HashMap<String, TrainedModel>,
    pub summaries: Vec<WalkSummary>,
    pub robustness: Option<BootstrapSummary>,
}

/// Runs every stage over `dataset` (features and targets) and `prices`.
///
/// Dataset dates must lie on the price index.
pub fn run_strategy(
    dataset: &Frame,
    prices: &PriceTable,
    config: &StrategyConfig,
) -> Result<StrategyRun, SeerError> {
    let validation = validate_universe(prices, &config.universe)?;
    let assets = validation.universe.assets.clone();
    let traded = prices.select(&assets)?;

    let model = WalkForwardModel::new(config.model_config());
    info!(
        assets = assets.len(),
        dates = prices.len(),
        label_lag = model.config().label_lag,
        "stage 1: walk-forward predictions"
    );
    let walk = model.generate_predictions(dataset, &assets)?;

    info!("stage 2: target weights");
    let weights = build_target_weights(&walk.predictions, &traded, &config.portfolio)?;

    info!("stage 3: simulation");
    let backtest = run_backtest(&traded, weights.assets(), &config.backtest)?;

    info!("stage 4: metrics");
    let benchmark = config
        .universe
        .benchmark
        .as_deref()
        .and_then(|ticker| prices.column(ticker));
    let metrics = MetricsRecord::compute(&backtest.returns, &backtest.turnover, benchmark, &config.backtest)?;

    let robustness = bootstrap_equity(&traded, &backtest, &config.robustness)?;

    Ok(StrategyRun {
        universe: validation.universe,
        skipped: validation.skipped,
        predictions: walk.predictions,
        weights,
        backtest,
        metrics,
        models: walk.models,
        summaries: walk.summaries,
        robustness,
    })
}
