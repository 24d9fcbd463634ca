//! Tradable universe selection.
//!
//! Parses asset lists from configuration and keeps the assets whose price
//! history is dense enough to trade.

use crate::domain::error::SeerError;
use crate::domain::frame::PriceTable;
use std::collections::HashSet;
use tracing::{info, warn};

pub const DEFAULT_MIN_COVERAGE: f64 = 0.5;

#[derive(Debug, Clone, PartialEq)]
pub struct UniverseConfig {
    pub assets: Vec<String>,
    pub benchmark: Option<String>,
    /// Fraction of valid prices an asset needs to be traded.
    pub min_coverage: f64,
}

impl Default for UniverseConfig {
    fn default() -> Self {
        Self {
            assets: Vec::new(),
            benchmark: Some("^GSPC".to_string()),
            min_coverage: DEFAULT_MIN_COVERAGE,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Universe {
    pub assets: Vec<String>,
    pub benchmark: Option<String>,
}

impl Universe {
    pub fn count(&self) -> usize {
        self.assets.len()
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in asset list")]
    EmptyToken,

    #[error("duplicate asset: {0}")]
    DuplicateAsset(String),
}

pub fn parse_codes(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut codes = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let code = trimmed.to_uppercase();
        if !seen.insert(code.clone()) {
            return Err(UniverseError::DuplicateAsset(code));
        }
        codes.push(code);
    }

    Ok(codes)
}

#[derive(Debug, Clone)]
pub struct UniverseValidationResult {
    pub universe: Universe,
    pub skipped: Vec<SkippedAsset>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedAsset {
    pub asset: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    NoData,
    LowCoverage { coverage: f64 },
}

/// Keeps assets with a price column whose valid fraction exceeds `min_coverage`.
///
/// Fails when nothing survives or when a configured benchmark has no price column.
pub fn validate_universe(
    prices: &PriceTable,
    config: &UniverseConfig,
) -> Result<UniverseValidationResult, SeerError> {
    if let Some(ticker) = config.benchmark.as_ref().filter(|t| !prices.has_column(t)) {
        return Err(SeerError::BenchmarkMissing {
            ticker: ticker.clone(),
        });
    }

    let mut valid = Vec::new();
    let mut skipped = Vec::new();

    for asset in &config.assets {
        let reason = match prices.coverage(asset) {
            None => SkipReason::NoData,
            Some(c) if c <= config.min_coverage => SkipReason::LowCoverage { coverage: c },
            Some(c) => {
                info!(asset = %asset, coverage = c, "asset accepted");
                valid.push(asset.clone());
                continue;
            }
        };
        warn!(asset = %asset, ?reason, "skipping asset");
        skipped.push(SkippedAsset {
            asset: asset.clone(),
            reason,
        });
    }

    if valid.is_empty() {
        return Err(SeerError::NoTradableAssets);
    }
    if !skipped.is_empty() {
        info!(
            trading = valid.len(),
            requested = config.assets.len(),
            "universe reduced"
        );
    }

    Ok(UniverseValidationResult {
        universe: Universe {
            assets: valid,
            benchmark: config.benchmark.clone(),
        },
        skipped,
    })
}
