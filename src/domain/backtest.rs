//! Daily simulation engine.
//!
//! Walks the price index one date at a time. Each date's gross return is the
//! weights held coming into the date applied to that date's asset returns;
//! trading costs are charged on the turnover needed to reach the new target.

use crate::domain::error::SeerError;
use crate::domain::frame::{Frame, PriceTable, ReturnSeries, Series, TurnoverSeries};
use crate::domain::stats::{forward_fill, pct_change};
use tracing::info;

/// Simulation cost model. Rates are decimals per unit of turnover.
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub transaction_cost_rate: f64,
    pub slippage_rate: f64,
}

impl BacktestConfig {
    pub fn from_bps(transaction_cost_bps: f64, slippage_bps: f64) -> Self {
        Self {
            transaction_cost_rate: transaction_cost_bps / 10_000.0,
            slippage_rate: slippage_bps / 10_000.0,
        }
    }
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self::from_bps(5.0, 2.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub returns: ReturnSeries,
    pub gross: Series,
    pub turnover: TurnoverSeries,
    pub costs: Series,
    pub slippage: Series,
    /// Target weights after alignment and filling, one column per traded asset.
    pub weights: Frame,
}

impl BacktestResult {
    /// Cumulative product of `1 + net return`, starting from 1 before the first date.
    pub fn equity_curve(&self) -> Vec<f64> {
        let mut equity = 1.0;
        self.returns
            .values
            .iter()
            .map(|r| {
                equity *= 1.0 + r;
                equity
            })
            .collect()
    }

    pub fn assets(&self) -> &[String] {
        self.weights.columns()
    }
}

/// Runs the simulation over `prices` using the asset columns of `targets`.
///
/// Only assets present in both tables are traded. Every date of `targets`
/// must lie on the price index.
pub fn run_backtest(
    prices: &PriceTable,
    targets: &Frame,
    config: &BacktestConfig,
) -> Result<BacktestResult, SeerError> {
    let assets: Vec<String> = targets
        .columns()
        .iter()
        .filter(|c| prices.has_column(c))
        .cloned()
        .collect();
    if assets.is_empty() {
        return Err(SeerError::NoTradableAssets);
    }

    let aligned = targets.select(&assets)?.reindex(prices.index())?;
    let weights = fill_weights(&aligned)?;

    let asset_returns: Vec<Vec<f64>> = assets
        .iter()
        .filter_map(|a| prices.column(a))
        .map(|p| {
            pct_change(p, 1)
                .into_iter()
                .map(|r| if r.is_finite() { r } else { 0.0 })
                .collect()
        })
        .collect();

    let n = prices.len();
    let mut held = vec![0.0; assets.len()];
    let mut net = Vec::with_capacity(n);
    let mut gross = Vec::with_capacity(n);
    let mut turnover = Vec::with_capacity(n);
    let mut costs = Vec::with_capacity(n);
    let mut slippage = Vec::with_capacity(n);

    for t in 0..n {
        let target: Vec<f64> = (0..assets.len()).map(|j| weights.value(t, j)).collect();

        let day_turnover = 0.5
            * target
                .iter()
                .zip(&held)
                .map(|(w, h)| (w - h).abs())
                .sum::<f64>();
        let cost = day_turnover * config.transaction_cost_rate;
        let slip = day_turnover * config.slippage_rate;
        let day_gross: f64 = held
            .iter()
            .zip(&asset_returns)
            .map(|(h, r)| h * r[t])
            .sum();
        let day_net = day_gross - cost - slip;

        net.push(finite_or_zero(day_net));
        gross.push(finite_or_zero(day_gross));
        turnover.push(finite_or_zero(day_turnover));
        costs.push(finite_or_zero(cost));
        slippage.push(finite_or_zero(slip));
        held = target;
    }

    info!(
        dates = n,
        assets = assets.len(),
        total_turnover = turnover.iter().sum::<f64>(),
        "backtest complete"
    );

    let index = prices.index().to_vec();
    Ok(BacktestResult {
        returns: Series::new(index.clone(), net),
        gross: Series::new(index.clone(), gross),
        turnover: Series::new(index.clone(), turnover),
        costs: Series::new(index.clone(), costs),
        slippage: Series::new(index, slippage),
        weights,
    })
}

/// Leading dates with no target at all are equal-weighted; later gaps carry
/// the previous target forward; anything still missing is zero.
fn fill_weights(aligned: &Frame) -> Result<Frame, SeerError> {
    let width = aligned.width();
    let first_observed = (0..aligned.len())
        .find(|&i| (0..width).any(|j| !aligned.value(i, j).is_nan()))
        .unwrap_or(aligned.len());
    let equal = 1.0 / width as f64;

    let data = (0..width)
        .map(|j| {
            let mut column = forward_fill(aligned.column_at(j));
            for (i, w) in column.iter_mut().enumerate() {
                if i < first_observed {
                    *w = equal;
                } else if w.is_nan() {
                    *w = 0.0;
                }
            }
            column
        })
        .collect();

    Frame::new(
        "weights",
        aligned.index().to_vec(),
        aligned.columns().to_vec(),
        data,
    )
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}
