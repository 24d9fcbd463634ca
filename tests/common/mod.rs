#![allow(dead_code)]

use chrono::NaiveDate;
use seer::domain::config::StrategyConfig;
use seer::domain::frame::Frame;
use seer::domain::model::ForestConfig;
use seer::domain::universe::UniverseConfig;
use std::fs;
use std::path::{Path, PathBuf};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Consecutive calendar days from 2023-01-02.
pub fn dates(n: usize) -> Vec<NaiveDate> {
    let start = date(2023, 1, 2);
    (0..n).map(|i| start + chrono::Duration::days(i as i64)).collect()
}

pub fn names(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn frame(name: &str, columns: &[(&str, Vec<f64>)]) -> Frame {
    let n = columns.first().map(|(_, v)| v.len()).unwrap_or(0);
    Frame::new(
        name,
        dates(n),
        columns.iter().map(|(c, _)| c.to_string()).collect(),
        columns.iter().map(|(_, v)| v.clone()).collect(),
    )
    .unwrap()
}

/// Deterministic wavy price path with a drift.
pub fn wavy_prices(n: usize, start: f64, drift: f64, period: f64, phase: f64) -> Vec<f64> {
    (0..n)
        .map(|i| {
            let t = i as f64;
            start * (1.0 + drift * t) + 3.0 * ((t + phase) / period).sin()
        })
        .collect()
}

/// Three biotech-like assets plus a benchmark.
pub fn synthetic_market(n: usize) -> Frame {
    frame(
        "prices",
        &[
            ("XBI", wavy_prices(n, 80.0, 0.002, 7.0, 0.0)),
            ("IBB", wavy_prices(n, 120.0, -0.001, 5.0, 1.3)),
            ("LABU", wavy_prices(n, 40.0, 0.004, 11.0, 2.1)),
            ("^GSPC", wavy_prices(n, 4000.0, 0.0005, 13.0, 0.7)),
        ],
    )
}

/// Small windows and a small forest so full runs stay quick.
pub fn fast_config(assets: &[&str]) -> StrategyConfig {
    let mut config = StrategyConfig {
        universe: UniverseConfig {
            assets: names(assets),
            ..UniverseConfig::default()
        },
        ..StrategyConfig::default()
    };
    config.model.train_window = 60;
    config.model.min_train_window = 30;
    config.model.retrain_every = 15;
    config.model.momentum_lookback = 10;
    config.model.forest = ForestConfig {
        n_trees: 8,
        max_depth: 4,
        min_samples_leaf: 2,
        max_features: None,
        bootstrap: true,
        seed: 7,
    };
    config.portfolio.vol_window = 10;
    config.portfolio.momentum_lookback = 10;
    config.features.target_horizon = 5;
    config
}

pub fn write_prices_csv(dir: &Path, file: &str, table: &Frame) -> PathBuf {
    let mut out = String::from("Date");
    for column in table.columns() {
        out.push(',');
        out.push_str(column);
    }
    out.push('\n');
    for (i, d) in table.index().iter().enumerate() {
        out.push_str(&d.to_string());
        for v in table.row(i) {
            out.push(',');
            if !v.is_nan() {
                out.push_str(&v.to_string());
            }
        }
        out.push('\n');
    }
    let path = dir.join(file);
    fs::write(&path, out).unwrap();
    path
}

pub fn write_ini(dir: &Path, content: &str) -> PathBuf {
    let path = dir.join("seer.ini");
    fs::write(&path, content).unwrap();
    path
}
