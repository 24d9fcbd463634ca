//! Configuration validation.
//!
//! Validates every section before a run starts. Absent keys take their
//! defaults later; present keys must parse and be in range.

use crate::domain::error::SeerError;
use crate::domain::universe::parse_codes;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;
use std::str::FromStr;

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), SeerError> {
    validate_data(config)?;
    validate_backtest(config)?;
    validate_universe_section(config)?;
    validate_model(config)?;
    validate_portfolio(config)?;
    validate_features(config)?;
    validate_robustness(config)?;
    Ok(())
}

/// Parses `section.key` when present. Blank values count as absent.
pub fn read_number<T: FromStr>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<T>, SeerError> {
    match config.get_string(section, key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| invalid(section, key, format!("'{}' is not a valid number", raw.trim()))),
        _ => Ok(None),
    }
}

pub fn read_date(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<NaiveDate>, SeerError> {
    match config.get_string(section, key) {
        Some(raw) if !raw.trim().is_empty() => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
            .map(Some)
            .map_err(|_| invalid(section, key, format!("invalid {key} format, expected YYYY-MM-DD"))),
        _ => Ok(None),
    }
}

/// Comma-separated list; empty entries are dropped.
pub fn read_list(config: &dyn ConfigPort, section: &str, key: &str) -> Option<Vec<String>> {
    config.get_string(section, key).map(|raw| {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    })
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> SeerError {
    SeerError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn check_min_int(config: &dyn ConfigPort, section: &str, key: &str, min: i64) -> Result<Option<i64>, SeerError> {
    let value = read_number::<i64>(config, section, key)?;
    if value.is_some_and(|v| v < min) {
        return Err(invalid(section, key, format!("{key} must be at least {min}")));
    }
    Ok(value)
}

fn check_non_negative(config: &dyn ConfigPort, section: &str, key: &str) -> Result<Option<f64>, SeerError> {
    let value = read_number::<f64>(config, section, key)?;
    if value.is_some_and(|v| !(v >= 0.0 && v.is_finite())) {
        return Err(invalid(section, key, format!("{key} must be non-negative")));
    }
    Ok(value)
}

fn check_unit_interval(config: &dyn ConfigPort, section: &str, key: &str) -> Result<Option<f64>, SeerError> {
    let value = read_number::<f64>(config, section, key)?;
    if value.is_some_and(|v| !(0.0..=1.0).contains(&v)) {
        return Err(invalid(section, key, format!("{key} must be between 0 and 1")));
    }
    Ok(value)
}

fn validate_data(config: &dyn ConfigPort) -> Result<(), SeerError> {
    match config.get_string("data", "prices") {
        Some(s) if !s.trim().is_empty() => {}
        _ => {
            return Err(SeerError::ConfigMissing {
                section: "data".to_string(),
                key: "prices".to_string(),
            });
        }
    }

    let start = read_date(config, "data", "start_date")?;
    let end = read_date(config, "data", "end_date")?;
    if matches!((start, end), (Some(start), Some(end)) if start >= end) {
        return Err(invalid("data", "start_date", "start_date must be before end_date"));
    }
    Ok(())
}

fn validate_backtest(config: &dyn ConfigPort) -> Result<(), SeerError> {
    check_non_negative(config, "backtest", "transaction_cost_bps")?;
    check_non_negative(config, "backtest", "slippage_bps")?;
    Ok(())
}

fn validate_universe_section(config: &dyn ConfigPort) -> Result<(), SeerError> {
    match config.get_string("universe", "assets") {
        Some(s) if !s.trim().is_empty() => {
            parse_codes(&s).map_err(|e| invalid("universe", "assets", e.to_string()))?;
        }
        _ => {
            return Err(SeerError::ConfigMissing {
                section: "universe".to_string(),
                key: "assets".to_string(),
            });
        }
    }

    if check_unit_interval(config, "universe", "min_coverage")?.is_some_and(|c| c >= 1.0) {
        return Err(invalid("universe", "min_coverage", "min_coverage must be below 1"));
    }
    Ok(())
}

fn validate_model(config: &dyn ConfigPort) -> Result<(), SeerError> {
    let train = check_min_int(config, "model", "train_window", 1)?;
    let min_train = check_min_int(config, "model", "min_train_window", 1)?;
    let train = train.unwrap_or(252);
    if min_train.unwrap_or(126) > train {
        return Err(invalid(
            "model",
            "min_train_window",
            "min_train_window must not exceed train_window",
        ));
    }

    check_min_int(config, "model", "retrain_every", 1)?;
    check_min_int(config, "model", "label_lag", 0)?;
    check_min_int(config, "model", "momentum_lookback", 1)?;
    check_min_int(config, "model", "n_trees", 1)?;
    check_min_int(config, "model", "max_depth", 1)?;
    check_min_int(config, "model", "min_samples_leaf", 1)?;
    check_min_int(config, "model", "max_features", 0)?;
    check_min_int(config, "model", "seed", 0)?;

    let high = check_unit_interval(config, "model", "fallback_prob_high")?.unwrap_or(0.58);
    let low = check_unit_interval(config, "model", "fallback_prob_low")?.unwrap_or(0.42);
    if low >= high {
        return Err(invalid(
            "model",
            "fallback_prob_low",
            "fallback_prob_low must be below fallback_prob_high",
        ));
    }
    Ok(())
}

fn validate_portfolio(config: &dyn ConfigPort) -> Result<(), SeerError> {
    check_min_int(config, "portfolio", "vol_window", 2)?;
    check_min_int(config, "portfolio", "momentum_lookback", 1)?;
    check_non_negative(config, "portfolio", "momentum_weight")?;
    check_min_int(config, "portfolio", "fallback_max_positions", 1)?;
    Ok(())
}

fn validate_features(config: &dyn ConfigPort) -> Result<(), SeerError> {
    check_min_int(config, "features", "target_horizon", 1)?;
    Ok(())
}

fn validate_robustness(config: &dyn ConfigPort) -> Result<(), SeerError> {
    check_min_int(config, "robustness", "simulations", 0)?;
    check_min_int(config, "robustness", "seed", 0)?;
    Ok(())
}
