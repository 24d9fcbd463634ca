//! End-to-end behaviour of the strategy core.
//!
//! Tests cover:
//! - Weight matrix rows and long-only constraint on a full run
//! - Turnover, cost and slippage accounting
//! - Determinism of the simulation and of whole runs
//! - Walk-forward predictions never reading future rows
//! - Closed-form metric scenarios

mod common;

use approx::assert_relative_eq;
use common::*;
use seer::domain::backtest::{BacktestConfig, run_backtest};
use seer::domain::error::SeerError;
use seer::domain::features::build_features;
use seer::domain::frame::Frame;
use seer::domain::metrics::MetricsRecord;
use seer::domain::pipeline::run_strategy;
use seer::domain::portfolio::{PortfolioConfig, build_target_weights};
use seer::domain::walk_forward::{ModelConfig, WalkForwardModel};

fn full_run(n: usize) -> seer::domain::pipeline::StrategyRun {
    let prices = synthetic_market(n);
    let config = fast_config(&["XBI", "IBB", "LABU"]);
    let dataset = build_features(&prices, &config.universe.assets, &config.features).unwrap();
    run_strategy(&dataset, &prices, &config).unwrap()
}

mod weights {
    use super::*;

    #[test]
    fn rows_sum_to_one_and_are_long_only() {
        let run = full_run(160);
        assert_eq!(run.weights.len(), 160);
        for i in 0..run.weights.len() {
            assert_relative_eq!(run.weights.row_sum(i), 1.0, epsilon = 1e-9);
            assert!(run.weights.assets().row(i).iter().all(|&w| w >= 0.0));
            assert!(run.weights.cash()[i] >= -1e-9);
        }
    }

    #[test]
    fn model_covers_dates_after_warmup() {
        let run = full_run(160);
        assert_eq!(run.summaries.len(), 3);
        for summary in &run.summaries {
            assert!(summary.fallback.is_none(), "{} fell back", summary.asset);
            assert!(summary.retrains >= 1);
            assert!(summary.model_days > 0);
            assert_eq!(summary.model_days + summary.fallback_days, 160);
        }
        assert!(run.predictions.index().len() == 160);
    }

    #[test]
    fn neutral_predictions_fall_back_to_tied_ranking() {
        let prices = frame(
            "prices",
            &[
                ("A", vec![100.0; 30]),
                ("B", vec![50.0; 30]),
                ("C", vec![20.0; 30]),
                ("D", vec![10.0; 30]),
            ],
        );
        let predictions = Frame::filled(
            "predictions",
            prices.index().to_vec(),
            names(&["A", "B", "C", "D"]),
            0.5,
        )
        .unwrap();
        let config = PortfolioConfig {
            fallback_max_positions: 3,
            ..PortfolioConfig::default()
        };
        let weights = build_target_weights(&predictions, &prices, &config).unwrap();

        assert_eq!(weights.fallback_count(), 30);
        for i in 0..weights.len() {
            let row = weights.assets().row(i);
            for w in &row[..3] {
                assert_relative_eq!(*w, 1.0 / 3.0, epsilon = 1e-12);
            }
            assert_eq!(row[3], 0.0);
            assert_relative_eq!(weights.cash()[i], 0.0, epsilon = 1e-12);
        }
    }
}

mod simulation {
    use super::*;

    fn two_assets(n: usize) -> Frame {
        frame(
            "prices",
            &[
                ("A", wavy_prices(n, 100.0, 0.001, 3.0, 0.0)),
                ("B", wavy_prices(n, 50.0, -0.001, 4.0, 1.0)),
            ],
        )
    }

    #[test]
    fn hand_traced_three_days() {
        let prices = frame(
            "prices",
            &[("A", vec![100.0, 110.0, 99.0]), ("B", vec![50.0, 50.0, 55.0])],
        );
        let targets = frame("targets", &[("A", vec![1.0, 0.5, 0.0]), ("B", vec![0.0, 0.5, 1.0])]);
        let config = BacktestConfig {
            transaction_cost_rate: 0.001,
            slippage_rate: 0.0005,
        };
        let result = run_backtest(&prices, &targets, &config).unwrap();

        // Day 0 holds nothing; day 1 earns A's +10% on yesterday's full A weight;
        // day 2 earns half of A's -10% and half of B's +10%.
        assert_relative_eq!(result.gross.values[0], 0.0, epsilon = 1e-12);
        assert_relative_eq!(result.gross.values[1], 0.1, epsilon = 1e-12);
        assert_relative_eq!(result.gross.values[2], 0.0, epsilon = 1e-12);
        assert_relative_eq!(result.turnover.values[0], 0.5, epsilon = 1e-12);
        assert_relative_eq!(result.turnover.values[1], 0.5, epsilon = 1e-12);
        assert_relative_eq!(result.turnover.values[2], 0.5, epsilon = 1e-12);
        assert_relative_eq!(result.returns.values[0], -0.00075, epsilon = 1e-12);
        assert_relative_eq!(result.returns.values[1], 0.09925, epsilon = 1e-12);
        assert_relative_eq!(result.returns.values[2], -0.00075, epsilon = 1e-12);
    }

    #[test]
    fn net_is_gross_minus_charges() {
        let prices = two_assets(50);
        let targets = frame(
            "targets",
            &[
                ("A", (0..50).map(|i| (i % 5) as f64 / 4.0).collect()),
                ("B", (0..50).map(|i| 1.0 - (i % 5) as f64 / 4.0).collect()),
            ],
        );
        let result = run_backtest(&prices, &targets, &BacktestConfig::from_bps(12.0, 3.0)).unwrap();
        for t in 0..50 {
            assert!(result.turnover.values[t] >= 0.0);
            assert_relative_eq!(
                result.returns.values[t],
                result.gross.values[t] - result.costs.values[t] - result.slippage.values[t],
                epsilon = 1e-15
            );
        }
    }

    #[test]
    fn free_trading_nets_gross_exactly() {
        let prices = two_assets(40);
        let targets = frame(
            "targets",
            &[("A", vec![0.3; 40]), ("B", (0..40).map(|i| (i % 2) as f64 * 0.7).collect())],
        );
        let result = run_backtest(&prices, &targets, &BacktestConfig::from_bps(0.0, 0.0)).unwrap();
        assert_eq!(result.returns.values, result.gross.values);
    }

    #[test]
    fn unchanged_targets_have_zero_turnover() {
        let prices = two_assets(20);
        let targets = frame("targets", &[("A", vec![0.6; 20]), ("B", vec![0.4; 20])]);
        let result = run_backtest(&prices, &targets, &BacktestConfig::default()).unwrap();
        assert_relative_eq!(result.turnover.values[0], 0.5, epsilon = 1e-12);
        assert!(result.turnover.values[1..].iter().all(|&t| t == 0.0));
        assert!(result.costs.values[1..].iter().all(|&c| c == 0.0));
    }

    #[test]
    fn simulation_is_bit_identical_across_runs() {
        let prices = two_assets(60);
        let targets = frame(
            "targets",
            &[
                ("A", (0..60).map(|i| ((i * 7) % 10) as f64 / 10.0).collect()),
                ("B", (0..60).map(|i| ((i * 3) % 10) as f64 / 10.0).collect()),
            ],
        );
        let config = BacktestConfig::default();
        let first = run_backtest(&prices, &targets, &config).unwrap();
        let second = run_backtest(&prices, &targets, &config).unwrap();
        let bits = |v: &[f64]| v.iter().map(|x| x.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&first.returns.values), bits(&second.returns.values));
        assert_eq!(bits(&first.turnover.values), bits(&second.turnover.values));
    }

    #[test]
    fn whole_runs_are_deterministic() {
        let first = full_run(120);
        let second = full_run(120);
        assert_eq!(first.backtest.returns, second.backtest.returns);
        assert_eq!(first.predictions, second.predictions);
    }

    #[test]
    fn equity_compounds_net_returns() {
        let run = full_run(120);
        let equity = run.backtest.equity_curve();
        let mut previous = 1.0;
        for (t, r) in run.backtest.returns.values.iter().enumerate() {
            assert_relative_eq!(equity[t], previous * (1.0 + r), epsilon = 1e-12);
            previous = equity[t];
        }
    }

    #[test]
    fn daily_flips_turn_over_the_whole_book() {
        let n = 12;
        let prices = two_assets(n);
        let a: Vec<f64> = (0..n).map(|i| if i % 2 == 0 { 1.0 } else { 0.0 }).collect();
        let b: Vec<f64> = a.iter().map(|w| 1.0 - w).collect();
        let targets = frame("targets", &[("A", a), ("B", b)]);
        let config = BacktestConfig {
            transaction_cost_rate: 0.002,
            slippage_rate: 0.0,
        };
        let result = run_backtest(&prices, &targets, &config).unwrap();
        for t in 1..n {
            assert_relative_eq!(result.turnover.values[t], 1.0, epsilon = 1e-12);
            assert_relative_eq!(result.costs.values[t], 0.002, epsilon = 1e-12);
        }
    }

    #[test]
    fn targets_off_the_price_axis_are_rejected() {
        let prices = two_assets(5);
        let targets = Frame::filled("targets", vec![date(2030, 1, 1)], names(&["A"]), 1.0).unwrap();
        let result = run_backtest(&prices, &targets, &BacktestConfig::default());
        assert!(matches!(result, Err(SeerError::IndexMismatch { .. })));
    }
}

mod lookahead {
    use super::*;
    use seer::domain::model::ForestConfig;

    fn model_config() -> ModelConfig {
        ModelConfig {
            train_window: 40,
            min_train_window: 20,
            retrain_every: 10,
            forest: ForestConfig {
                n_trees: 6,
                max_depth: 3,
                min_samples_leaf: 2,
                max_features: None,
                bootstrap: true,
                seed: 11,
            },
            ..ModelConfig::default()
        }
    }

    fn dataset(n: usize) -> Frame {
        let signal: Vec<f64> = (0..n).map(|i| ((i * 37) % 11) as f64 - 5.0).collect();
        let noise: Vec<f64> = (0..n).map(|i| ((i * 13) % 7) as f64).collect();
        let target: Vec<f64> = signal
            .iter()
            .zip(&noise)
            .map(|(s, z)| if s + 0.3 * z > 0.0 { 1.0 } else { 0.0 })
            .collect();
        frame(
            "dataset",
            &[
                ("A", wavy_prices(n, 50.0, 0.001, 6.0, 0.0)),
                ("A_signal", signal),
                ("A_noise", noise),
                ("A_target", target),
            ],
        )
    }

    fn predict(data: &Frame) -> Vec<f64> {
        let out = WalkForwardModel::new(model_config())
            .generate_predictions(data, &names(&["A"]))
            .unwrap();
        out.predictions.column("A").unwrap().to_vec()
    }

    /// Rewrites labels from row `i` on and every feature after row `i`.
    fn perturb_from(data: &Frame, i: usize) -> Frame {
        let columns: Vec<Vec<f64>> = data
            .columns()
            .iter()
            .map(|name| {
                let mut values = data.column(name).unwrap().to_vec();
                let first = if name.ends_with("_target") { i } else { i + 1 };
                for (k, v) in values.iter_mut().enumerate().skip(first) {
                    *v = if name.ends_with("_target") {
                        ((k + 1) % 2) as f64
                    } else {
                        *v * -3.0 + 17.0
                    };
                }
                values
            })
            .collect();
        Frame::new("perturbed", data.index().to_vec(), data.columns().to_vec(), columns).unwrap()
    }

    #[test]
    fn future_rows_never_change_todays_prediction() {
        let data = dataset(90);
        let baseline = predict(&data);
        for i in [25, 40, 55, 70] {
            let perturbed = predict(&perturb_from(&data, i));
            assert_eq!(
                baseline[i].to_bits(),
                perturbed[i].to_bits(),
                "prediction at {i} changed"
            );
        }
    }

    #[test]
    fn prediction_matches_truncated_history() {
        let data = dataset(90);
        let baseline = predict(&data);
        let i = 60;
        let truncated = data.between(data.index()[0], data.index()[i]);
        let short = predict(&truncated);
        assert_eq!(baseline[i].to_bits(), short[i].to_bits());
    }

    #[test]
    fn prices_after_today_never_reach_todays_prediction() {
        let n = 200;
        let today = 150;
        let mut config = fast_config(&["XBI"]);
        config.universe.benchmark = None;

        let path = wavy_prices(n, 80.0, 0.002, 7.0, 0.0);
        let crashed: Vec<f64> = path
            .iter()
            .enumerate()
            .map(|(k, p)| if k > today { p * 0.3 } else { *p })
            .collect();

        let predict_from = |values: Vec<f64>| {
            let prices = frame("prices", &[("XBI", values)]);
            let dataset = build_features(&prices, &config.universe.assets, &config.features).unwrap();
            run_strategy(&dataset, &prices, &config).unwrap()
        };
        let baseline = predict_from(path);
        let perturbed = predict_from(crashed);

        assert!(baseline.summaries[0].fallback.is_none());
        assert!(baseline.summaries[0].model_days > 0);
        let before = baseline.predictions.column("XBI").unwrap()[today];
        let after = perturbed.predictions.column("XBI").unwrap()[today];
        assert_eq!(before.to_bits(), after.to_bits(), "prediction at {today} moved");
    }
}

mod metrics {
    use super::*;

    #[test]
    fn constant_zero_returns_are_undefined() {
        let prices = frame("prices", &[("A", vec![10.0; 30])]);
        let targets = frame("targets", &[("A", vec![0.0; 30])]);
        let result = run_backtest(&prices, &targets, &BacktestConfig::from_bps(0.0, 0.0)).unwrap();
        let m = MetricsRecord::compute(&result.returns, &result.turnover, None, &BacktestConfig::from_bps(0.0, 0.0))
            .unwrap();
        assert!(m.sharpe_ratio.is_nan());
        assert!(m.cagr.is_nan());
        assert_eq!(m.max_drawdown, 0.0);
    }

    #[test]
    fn steady_growth_matches_closed_form() {
        let prices = frame("prices", &[("A", (0..10).map(|t| 100.0 * 1.01f64.powi(t)).collect())]);
        let targets = frame("targets", &[("A", vec![1.0; 10])]);
        let free = BacktestConfig::from_bps(0.0, 0.0);
        let result = run_backtest(&prices, &targets, &free).unwrap();
        let m = MetricsRecord::compute(&result.returns, &result.turnover, None, &free).unwrap();

        // Nine compounding days after the entry date.
        let daily = [0.0, 0.01, 0.01, 0.01, 0.01, 0.01, 0.01, 0.01, 0.01, 0.01];
        let mean = daily.iter().sum::<f64>() / 10.0;
        let var = daily.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / 9.0;
        let vol = var.sqrt() * 252f64.sqrt();
        let final_equity = 1.01f64.powi(9);

        assert_relative_eq!(m.cumulative_return, final_equity - 1.0, max_relative = 1e-9);
        assert_relative_eq!(m.cagr, final_equity.powf(365.25 / 9.0) - 1.0, max_relative = 1e-9);
        assert_relative_eq!(m.annualized_volatility, vol, max_relative = 1e-6);
        assert_relative_eq!(m.sharpe_ratio, mean * 252.0 / vol, max_relative = 1e-6);
        assert_eq!(m.max_drawdown, 0.0);
    }

    #[test]
    fn benchmark_feeds_relative_statistics() {
        let run = full_run(160);
        assert!(run.metrics.beta.is_finite());
        assert!(run.metrics.information_ratio.is_finite());
    }
}
