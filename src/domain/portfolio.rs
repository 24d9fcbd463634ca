//! Translation of per-asset probabilities into long-only target weights.

use crate::domain::error::SeerError;
use crate::domain::frame::{Frame, PredictionMatrix, PriceTable, positions_on};
use crate::domain::stats::{pct_change, rolling_std};
use chrono::NaiveDate;
use tracing::info;

pub const CASH_COLUMN: &str = "Cash";

#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioConfig {
    /// Trailing window of the return volatility used to scale weights.
    pub vol_window: usize,
    pub momentum_lookback: usize,
    /// Scale of the `tanh` momentum overlay added to confidence.
    pub momentum_weight: f64,
    /// Most assets held on a fallback day.
    pub fallback_max_positions: usize,
}

impl Default for PortfolioConfig {
    fn default() -> Self {
        Self {
            vol_window: 60,
            momentum_lookback: 63,
            momentum_weight: 0.15,
            fallback_max_positions: 3,
        }
    }
}

/// Asset weights per date plus the cash remainder. Each row sums to one.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightMatrix {
    assets: Frame,
    cash: Vec<f64>,
    fallback_rows: Vec<bool>,
}

impl WeightMatrix {
    pub fn assets(&self) -> &Frame {
        &self.assets
    }

    pub fn cash(&self) -> &[f64] {
        &self.cash
    }

    pub fn index(&self) -> &[NaiveDate] {
        self.assets.index()
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Whether row `i` came from the rank-based fallback allocation.
    pub fn is_fallback(&self, i: usize) -> bool {
        self.fallback_rows[i]
    }

    pub fn fallback_count(&self) -> usize {
        self.fallback_rows.iter().filter(|&&f| f).count()
    }

    pub fn row_sum(&self, i: usize) -> f64 {
        self.assets.row(i).iter().sum::<f64>() + self.cash[i]
    }

    /// Asset columns followed by a trailing cash column.
    pub fn to_frame(&self) -> Result<Frame, SeerError> {
        let cash = Frame::new(
            self.assets.name(),
            self.index().to_vec(),
            vec![CASH_COLUMN.to_string()],
            vec![self.cash.clone()],
        )?;
        self.assets.join(&cash)
    }
}

/// Centers probabilities on zero.
pub fn confidence_scores(predictions: &PredictionMatrix) -> Result<Frame, SeerError> {
    let data = (0..predictions.width())
        .map(|j| predictions.column_at(j).iter().map(|p| p - 0.5).collect())
        .collect();
    Frame::new(
        "confidence",
        predictions.index().to_vec(),
        predictions.columns().to_vec(),
        data,
    )
}

/// Trailing return over `lookback` divided by the volatility that return
/// would carry as a random walk. Missing where either input is undefined;
/// zero where the ratio blows up.
pub fn momentum_signal(prices: &[f64], lookback: usize) -> Vec<f64> {
    let returns = pct_change(prices, 1);
    let momentum = pct_change(prices, lookback);
    let vol = rolling_std(&returns, lookback);
    let scale = (lookback as f64).sqrt();
    momentum
        .iter()
        .zip(&vol)
        .map(|(&m, &v)| {
            if m.is_nan() || v.is_nan() {
                return f64::NAN;
            }
            let z = m / (v * scale);
            if z.is_finite() { z } else { 0.0 }
        })
        .collect()
}

/// Builds the target weight matrix on the prediction dates.
///
/// Prediction dates must all exist on the price index. Assets are the price
/// columns that also have predictions, in price-table order.
pub fn build_target_weights(
    predictions: &PredictionMatrix,
    prices: &PriceTable,
    config: &PortfolioConfig,
) -> Result<WeightMatrix, SeerError> {
    let assets: Vec<String> = prices
        .columns()
        .iter()
        .filter(|c| predictions.has_column(c))
        .cloned()
        .collect();
    if assets.is_empty() {
        return Err(SeerError::NoTradableAssets);
    }
    let price_rows = positions_on("predictions", predictions.index(), prices.index())?;
    let confidence = confidence_scores(&predictions.select(&assets)?)?;

    let n = predictions.len();
    let width = assets.len();
    let mut adjusted = vec![vec![f64::NAN; n]; width];
    let mut raw = vec![vec![0.0; n]; width];

    for (j, asset) in assets.iter().enumerate() {
        let Some(price) = prices.column(asset) else {
            continue;
        };
        let returns = pct_change(price, 1);
        let vol = rolling_std(&returns, config.vol_window);
        let signal = momentum_signal(price, config.momentum_lookback);
        let conf = confidence.column_at(j);

        for (i, &row) in price_rows.iter().enumerate() {
            let overlay = config.momentum_weight * signal[row].tanh();
            let score = match (conf[i].is_nan(), overlay.is_nan()) {
                (true, true) => f64::NAN,
                (true, false) => overlay,
                (false, true) => conf[i],
                (false, false) => conf[i] + overlay,
            };
            adjusted[j][i] = score;

            let scaled = if vol[row] == 0.0 {
                f64::NAN
            } else {
                score / vol[row]
            };
            if scaled > 0.0 {
                raw[j][i] = scaled;
            }
        }
    }

    let cap = config.fallback_max_positions.min(width).max(1);
    let mut weights = vec![vec![0.0; n]; width];
    let mut cash = vec![1.0; n];
    let mut fallback_rows = vec![false; n];

    for i in 0..n {
        let total: f64 = (0..width).map(|j| raw[j][i]).sum();
        if total > 0.0 {
            for j in 0..width {
                weights[j][i] = raw[j][i] / total;
            }
        } else {
            fallback_rows[i] = true;
            let scores: Vec<f64> = (0..width).map(|j| adjusted[j][i]).collect();
            let picked = top_ranked(&scores, cap);
            for &j in &picked {
                weights[j][i] = 1.0 / picked.len() as f64;
            }
        }
        let invested: f64 = (0..width).map(|j| weights[j][i]).sum();
        cash[i] = 1.0 - invested;
    }

    let matrix = WeightMatrix {
        assets: Frame::new("weights", predictions.index().to_vec(), assets, weights)?,
        cash,
        fallback_rows,
    };
    info!(
        dates = matrix.len(),
        assets = width,
        fallback_days = matrix.fallback_count(),
        "target weights built"
    );
    Ok(matrix)
}

/// Indices of the `cap` highest scores, earlier columns first on ties.
/// Missing scores are never picked.
fn top_ranked(scores: &[f64], cap: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).filter(|&j| !scores[j].is_nan()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));
    order.truncate(cap);
    order
}
