//! CSV report adapter implementing ReportPort.
//!
//! Writes one table per output: metrics, daily returns, weights,
//! predictions, per-asset model summaries and, when run, the bootstrap summary.

use crate::domain::error::SeerError;
use crate::domain::frame::Frame;
use crate::domain::pipeline::StrategyRun;
use crate::domain::walk_forward::{FallbackReason, WalkSummary};
use crate::ports::report_port::ReportPort;
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::info;

pub const METRICS_FILE: &str = "metrics.csv";
pub const RETURNS_FILE: &str = "returns.csv";
pub const WEIGHTS_FILE: &str = "weights.csv";
pub const PREDICTIONS_FILE: &str = "predictions.csv";
pub const MODELS_FILE: &str = "models.csv";
pub const ROBUSTNESS_FILE: &str = "robustness.csv";

#[derive(Serialize)]
struct MetricRow<'a> {
    metric: &'a str,
    value: f64,
}

#[derive(Serialize)]
struct ReturnRow {
    date: String,
    net_return: f64,
    gross_return: f64,
    turnover: f64,
    transaction_cost: f64,
    slippage: f64,
    equity: f64,
}

#[derive(Serialize)]
struct ModelRow<'a> {
    asset: &'a str,
    status: String,
    features: usize,
    /// `;`-joined inputs of the latest fitted model.
    feature_names: String,
    retrains: usize,
    degenerate_retrains: usize,
    model_days: usize,
    fallback_days: usize,
    trained_on: String,
}

pub struct CsvReportAdapter;

impl CsvReportAdapter {
    fn write_entries(path: &Path, entries: &[(String, f64)]) -> Result<(), SeerError> {
        let mut wtr = csv::Writer::from_path(path)?;
        for (metric, value) in entries {
            wtr.serialize(MetricRow {
                metric,
                value: *value,
            })?;
        }
        wtr.flush()?;
        Ok(())
    }

    fn write_frame(path: &Path, frame: &Frame) -> Result<(), SeerError> {
        let mut wtr = csv::Writer::from_path(path)?;
        let mut header = vec!["date".to_string()];
        header.extend(frame.columns().iter().cloned());
        wtr.write_record(&header)?;
        for (i, date) in frame.index().iter().enumerate() {
            let mut record = vec![date.to_string()];
            record.extend(frame.row(i).iter().map(|v| v.to_string()));
            wtr.write_record(&record)?;
        }
        wtr.flush()?;
        Ok(())
    }

    fn write_returns(path: &Path, run: &StrategyRun) -> Result<(), SeerError> {
        let bt = &run.backtest;
        let equity = bt.equity_curve();
        let mut wtr = csv::Writer::from_path(path)?;
        for (i, date) in bt.returns.index.iter().enumerate() {
            wtr.serialize(ReturnRow {
                date: date.to_string(),
                net_return: bt.returns.values[i],
                gross_return: bt.gross.values[i],
                turnover: bt.turnover.values[i],
                transaction_cost: bt.costs.values[i],
                slippage: bt.slippage.values[i],
                equity: equity[i],
            })?;
        }
        wtr.flush()?;
        Ok(())
    }

    fn write_models(path: &Path, run: &StrategyRun) -> Result<(), SeerError> {
        let mut wtr = csv::Writer::from_path(path)?;
        for summary in &run.summaries {
            let model = run.models.get(&summary.asset);
            let trained_on = model.map(|m| m.trained_on.to_string()).unwrap_or_default();
            let feature_names = model
                .map(|m| m.forest.feature_names().join(";"))
                .unwrap_or_default();
            wtr.serialize(ModelRow {
                asset: &summary.asset,
                status: status(summary),
                features: summary.features.len(),
                feature_names,
                retrains: summary.retrains,
                degenerate_retrains: summary.degenerate_retrains,
                model_days: summary.model_days,
                fallback_days: summary.fallback_days,
                trained_on,
            })?;
        }
        wtr.flush()?;
        Ok(())
    }
}

fn status(summary: &WalkSummary) -> String {
    match summary.fallback {
        None => "model".to_string(),
        Some(FallbackReason::MissingTarget) => "fallback: missing target".to_string(),
        Some(FallbackReason::NoFeatures) => "fallback: no features".to_string(),
        Some(FallbackReason::InsufficientRows { rows, required }) => {
            format!("fallback: {rows} of {required} rows")
        }
    }
}

impl ReportPort for CsvReportAdapter {
    fn write(&self, run: &StrategyRun, output_dir: &Path) -> Result<(), SeerError> {
        fs::create_dir_all(output_dir)?;

        Self::write_entries(&output_dir.join(METRICS_FILE), &run.metrics.entries())?;
        Self::write_returns(&output_dir.join(RETURNS_FILE), run)?;
        Self::write_frame(&output_dir.join(WEIGHTS_FILE), &run.weights.to_frame()?)?;
        Self::write_frame(&output_dir.join(PREDICTIONS_FILE), &run.predictions)?;
        Self::write_models(&output_dir.join(MODELS_FILE), run)?;
        if let Some(summary) = &run.robustness {
            Self::write_entries(&output_dir.join(ROBUSTNESS_FILE), &summary.entries())?;
        }

        info!(dir = %output_dir.display(), "report written");
        Ok(())
    }
}
