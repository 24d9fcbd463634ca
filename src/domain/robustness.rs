//! Bootstrap stress test of a completed simulation.
//!
//! Daily asset-return rows are resampled with replacement and replayed
//! against the executed weight path and the costs the run actually paid.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::SeerError;
use crate::domain::frame::PriceTable;
use crate::domain::stats::{mean, pct_change, percentile};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::info;

#[derive(Debug, Clone, PartialEq)]
pub struct RobustnessConfig {
    /// Number of resampled paths; zero disables the analysis.
    pub simulations: usize,
    pub seed: u64,
}

impl Default for RobustnessConfig {
    fn default() -> Self {
        Self {
            simulations: 0,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BootstrapSummary {
    pub simulations: usize,
    pub mean_final_equity: f64,
    pub p5_final_equity: f64,
    pub p50_final_equity: f64,
    pub p95_final_equity: f64,
    /// Share of paths ending below their starting equity.
    pub probability_of_loss: f64,
}

impl BootstrapSummary {
    pub fn entries(&self) -> Vec<(String, f64)> {
        [
            ("Simulations", self.simulations as f64),
            ("Mean Final Equity", self.mean_final_equity),
            ("P5 Final Equity", self.p5_final_equity),
            ("P50 Final Equity", self.p50_final_equity),
            ("P95 Final Equity", self.p95_final_equity),
            ("Probability of Loss", self.probability_of_loss),
        ]
        .iter()
        .map(|(name, value)| (name.to_string(), *value))
        .collect()
    }
}

/// Returns `None` when the analysis is disabled or there is nothing to resample.
pub fn bootstrap_equity(
    prices: &PriceTable,
    backtest: &BacktestResult,
    config: &RobustnessConfig,
) -> Result<Option<BootstrapSummary>, SeerError> {
    let n = backtest.returns.len();
    if config.simulations == 0 || n == 0 {
        return Ok(None);
    }
    if prices.len() != n {
        return Err(SeerError::Shape {
            table: prices.name().to_string(),
            reason: format!("{} price dates for {} simulated dates", prices.len(), n),
        });
    }

    let assets = backtest.assets();
    let mut asset_returns = Vec::with_capacity(assets.len());
    for asset in assets {
        let column = prices.column(asset).ok_or_else(|| SeerError::MissingColumn {
            table: prices.name().to_string(),
            column: asset.clone(),
        })?;
        let returns: Vec<f64> = pct_change(column, 1)
            .into_iter()
            .map(|r| if r.is_finite() { r } else { 0.0 })
            .collect();
        asset_returns.push(returns);
    }

    let held: Vec<Vec<f64>> = (0..n)
        .map(|t| {
            if t == 0 {
                vec![0.0; assets.len()]
            } else {
                backtest.weights.row(t - 1)
            }
        })
        .collect();
    let charges: Vec<f64> = backtest
        .costs
        .values
        .iter()
        .zip(&backtest.slippage.values)
        .map(|(c, s)| c + s)
        .collect();

    let finals: Vec<f64> = (0..config.simulations)
        .into_par_iter()
        .map(|sim| {
            let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(sim as u64));
            let mut equity = 1.0;
            for t in 0..n {
                let row = rng.gen_range(0..n);
                let gross: f64 = held[t]
                    .iter()
                    .zip(&asset_returns)
                    .map(|(w, r)| w * r[row])
                    .sum();
                equity *= 1.0 + gross - charges[t];
            }
            equity
        })
        .collect();

    let losses = finals.iter().filter(|&&e| e < 1.0).count();
    let summary = BootstrapSummary {
        simulations: finals.len(),
        mean_final_equity: mean(&finals),
        p5_final_equity: percentile(&finals, 5.0),
        p50_final_equity: percentile(&finals, 50.0),
        p95_final_equity: percentile(&finals, 95.0),
        probability_of_loss: losses as f64 / finals.len() as f64,
    };
    info!(
        simulations = summary.simulations,
        median = summary.p50_final_equity,
        probability_of_loss = summary.probability_of_loss,
        "bootstrap complete"
    );
    Ok(Some(summary))
}
