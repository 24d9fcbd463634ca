//! Run configuration, built once and passed by reference to every stage.

use crate::domain::backtest::BacktestConfig;
use crate::domain::features::FeatureConfig;
use crate::domain::portfolio::PortfolioConfig;
use crate::domain::robustness::RobustnessConfig;
use crate::domain::universe::UniverseConfig;
use crate::domain::walk_forward::ModelConfig;
use chrono::NaiveDate;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub struct DataConfig {
    /// Wide CSV of prices, one column per ticker.
    pub prices: PathBuf,
    /// Precomputed feature table; built from prices when absent.
    pub features: Option<PathBuf>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            prices: PathBuf::from("prices.csv"),
            features: None,
            start_date: None,
            end_date: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct StrategyConfig {
    pub data: DataConfig,
    pub backtest: BacktestConfig,
    pub universe: UniverseConfig,
    pub model: ModelConfig,
    pub portfolio: PortfolioConfig,
    pub features: FeatureConfig,
    pub robustness: RobustnessConfig,
}

impl StrategyConfig {
    /// Model settings as used for training.
    ///
    /// Targets built from prices label row `j` with the price at
    /// `j + target_horizon`, so the label lag never drops below the horizon
    /// unless a precomputed feature table supplies the targets.
    pub fn model_config(&self) -> ModelConfig {
        let mut model = self.model.clone();
        if self.data.features.is_none() {
            model.label_lag = model.label_lag.max(self.features.target_horizon);
        }
        model
    }
}
