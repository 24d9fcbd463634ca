//! Baseline per-asset features and forward-return targets built from prices.

use crate::domain::error::SeerError;
use crate::domain::frame::{Frame, PriceTable};
use crate::domain::stats::{forward_fill, pct_change, rolling_mean, rolling_std};
use crate::domain::walk_forward::TARGET_SUFFIX;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureConfig {
    /// Dates ahead the target return is measured over.
    pub target_horizon: usize,
    /// Columns removed from the dataset before modeling.
    pub excluded_features: Vec<String>,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            target_horizon: 20,
            excluded_features: Vec::new(),
        }
    }
}

/// Builds the model dataset on the price index.
///
/// Each asset contributes its raw price, short and medium returns, momentum,
/// volatility, distance from its 50-date average and a binary target. Price
/// columns that are not assets (macro series, benchmark) pass through as-is.
pub fn build_features(
    prices: &PriceTable,
    assets: &[String],
    config: &FeatureConfig,
) -> Result<Frame, SeerError> {
    let mut columns: Vec<String> = Vec::new();
    let mut data: Vec<Vec<f64>> = Vec::new();

    for name in prices.columns() {
        if assets.contains(name) {
            continue;
        }
        if let Some(values) = prices.column(name) {
            columns.push(name.clone());
            data.push(values.to_vec());
        }
    }

    for asset in assets {
        let Some(price) = prices.column(asset) else {
            warn!(asset = %asset, "no price column, skipping features");
            continue;
        };
        let ret_1 = pct_change(price, 1);
        let sma_50 = rolling_mean(&forward_fill(price), 50);
        let sma_ratio: Vec<f64> = price.iter().zip(&sma_50).map(|(p, m)| p / m - 1.0).collect();

        let derived = [
            (String::new(), price.to_vec()),
            ("_ret_1".to_string(), ret_1.clone()),
            ("_ret_5".to_string(), pct_change(price, 5)),
            ("_mom_21".to_string(), pct_change(price, 21)),
            ("_vol_21".to_string(), rolling_std(&ret_1, 21)),
            ("_sma_50_ratio".to_string(), sma_ratio),
            (TARGET_SUFFIX.to_string(), forward_target(price, config.target_horizon)),
        ];
        for (suffix, values) in derived {
            columns.push(format!("{asset}{suffix}"));
            data.push(values);
        }
    }

    let dataset = Frame::new("dataset", prices.index().to_vec(), columns, data)?;
    let dropped: Vec<String> = config
        .excluded_features
        .iter()
        .filter(|name| dataset.has_column(name))
        .cloned()
        .collect();
    if !dropped.is_empty() {
        debug!(?dropped, "excluding features");
    }
    let dataset = dataset.without(&dropped);

    info!(columns = dataset.width(), dates = dataset.len(), "feature dataset built");
    Ok(dataset)
}

/// 1 when the price `horizon` dates ahead is higher, 0 when it is not, and
/// missing where the horizon runs past the data or a price is missing.
pub fn forward_target(price: &[f64], horizon: usize) -> Vec<f64> {
    (0..price.len())
        .map(|i| {
            let Some(&future) = price.get(i + horizon) else {
                return f64::NAN;
            };
            let forward = future / price[i] - 1.0;
            if forward.is_nan() {
                f64::NAN
            } else if forward > 0.0 {
                1.0
            } else {
                0.0
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn dates(n: usize) -> Vec<NaiveDate> {
        let start = NaiveDate::from_ymd_opt(2022, 1, 3).unwrap();
        (0..n).map(|i| start + chrono::Duration::days(i as i64)).collect()
    }

    fn prices(n: usize) -> Frame {
        let up: Vec<f64> = (0..n).map(|i| 100.0 + i as f64).collect();
        let vix: Vec<f64> = (0..n).map(|i| 20.0 + (i % 3) as f64).collect();
        Frame::new("prices", dates(n), vec!["AAA".into(), "vix".into()], vec![up, vix]).unwrap()
    }

    #[test]
    fn forward_target_marks_rises() {
        let target = forward_target(&[10.0, 11.0, 10.5, 10.5], 1);
        assert_eq!(&target[..3], &[1.0, 0.0, 0.0]);
        assert!(target[3].is_nan());
    }

    #[test]
    fn forward_target_missing_price_is_missing() {
        let target = forward_target(&[10.0, f64::NAN, 12.0], 1);
        assert!(target[0].is_nan());
        assert!(target[1].is_nan());
    }

    #[test]
    fn builds_asset_columns_and_passes_through_macro() {
        let n = 60;
        let dataset = build_features(&prices(n), &["AAA".into()], &FeatureConfig::default()).unwrap();

        for name in ["vix", "AAA", "AAA_ret_1", "AAA_ret_5", "AAA_mom_21", "AAA_vol_21", "AAA_sma_50_ratio", "AAA_target"] {
            assert!(dataset.has_column(name), "missing {name}");
        }
        let target = dataset.column("AAA_target").unwrap();
        assert_eq!(target[0], 1.0);
        assert!(target[n - 20].is_nan());
        assert_eq!(target[n - 21], 1.0);
        assert!(dataset.column("AAA_sma_50_ratio").unwrap()[48].is_nan());
        assert!(dataset.column("AAA_sma_50_ratio").unwrap()[49] > 0.0);
    }

    #[test]
    fn excluded_features_are_dropped() {
        let config = FeatureConfig {
            excluded_features: vec!["vix".into(), "AAA_ret_5".into(), "unknown".into()],
            ..FeatureConfig::default()
        };
        let dataset = build_features(&prices(30), &["AAA".into()], &config).unwrap();
        assert!(!dataset.has_column("vix"));
        assert!(!dataset.has_column("AAA_ret_5"));
        assert!(dataset.has_column("AAA_ret_1"));
    }

    #[test]
    fn absent_asset_is_skipped() {
        let dataset =
            build_features(&prices(30), &["ZZZ".into(), "AAA".into()], &FeatureConfig::default())
                .unwrap();
        assert!(dataset.has_column("AAA_target"));
        assert!(!dataset.columns().iter().any(|c| c.starts_with("ZZZ")));
    }
}
