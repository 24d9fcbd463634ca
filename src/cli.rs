//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::BacktestConfig;
use crate::domain::config::{DataConfig, StrategyConfig};
use crate::domain::config_validation::{read_date, read_list, read_number, validate_config};
use crate::domain::error::SeerError;
use crate::domain::features::{FeatureConfig, build_features};
use crate::domain::frame::{Frame, PriceTable};
use crate::domain::model::random_forest::ForestConfig;
use crate::domain::pipeline::{StrategyRun, run_strategy};
use crate::domain::portfolio::PortfolioConfig;
use crate::domain::robustness::RobustnessConfig;
use crate::domain::universe::{SkipReason, UniverseConfig, parse_codes, validate_universe};
use crate::domain::walk_forward::{ModelConfig, default_macro_features};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "seer", about = "Walk-forward allocation backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the full strategy and write the report tables
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Comma-separated asset list overriding [universe] assets
        #[arg(long)]
        assets: Option<String>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show the data range of every price column
    Info {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            output,
            assets,
            dry_run,
        } => {
            if dry_run {
                run_dry_run(&config, assets.as_deref())
            } else {
                run_backtest(&config, output.as_ref(), assets.as_deref())
            }
        }
        Command::Validate { config } => run_validate(&config),
        Command::Info { config } => run_info(&config),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = SeerError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn report<T>(result: Result<T, SeerError>) -> Result<T, ExitCode> {
    result.map_err(|e| {
        eprintln!("error: {e}");
        ExitCode::from(&e)
    })
}

/// Builds the run configuration, taking defaults for absent keys.
///
/// Relative data paths resolve against `base_dir`.
pub fn build_strategy_config(
    adapter: &dyn ConfigPort,
    base_dir: &Path,
) -> Result<StrategyConfig, SeerError> {
    let defaults = StrategyConfig::default();

    let prices = adapter
        .get_string("data", "prices")
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| SeerError::ConfigMissing {
            section: "data".into(),
            key: "prices".into(),
        })?;
    let data = DataConfig {
        prices: base_dir.join(prices.trim()),
        features: adapter
            .get_string("data", "features")
            .filter(|s| !s.trim().is_empty())
            .map(|s| base_dir.join(s.trim())),
        start_date: read_date(adapter, "data", "start_date")?,
        end_date: read_date(adapter, "data", "end_date")?,
    };

    let cost_bps = read_number::<f64>(adapter, "backtest", "transaction_cost_bps")?;
    let slippage_bps = read_number::<f64>(adapter, "backtest", "slippage_bps")?;
    let backtest = BacktestConfig::from_bps(cost_bps.unwrap_or(5.0), slippage_bps.unwrap_or(2.0));

    let assets_raw = adapter
        .get_string("universe", "assets")
        .ok_or_else(|| SeerError::ConfigMissing {
            section: "universe".into(),
            key: "assets".into(),
        })?;
    let assets = parse_codes(&assets_raw).map_err(|e| SeerError::ConfigInvalid {
        section: "universe".into(),
        key: "assets".into(),
        reason: e.to_string(),
    })?;
    let benchmark = match adapter.get_string("universe", "benchmark") {
        None => defaults.universe.benchmark.clone(),
        Some(s) if s.trim().is_empty() || s.trim().eq_ignore_ascii_case("none") => None,
        Some(s) => Some(s.trim().to_string()),
    };
    let universe = UniverseConfig {
        assets,
        benchmark,
        min_coverage: read_number(adapter, "universe", "min_coverage")?
            .unwrap_or(defaults.universe.min_coverage),
    };

    let m = &defaults.model;
    let f = &m.forest;
    let forest = ForestConfig {
        n_trees: read_number(adapter, "model", "n_trees")?.unwrap_or(f.n_trees),
        max_depth: read_number(adapter, "model", "max_depth")?.unwrap_or(f.max_depth),
        min_samples_leaf: read_number(adapter, "model", "min_samples_leaf")?
            .unwrap_or(f.min_samples_leaf),
        max_features: match read_number::<usize>(adapter, "model", "max_features")? {
            Some(0) | None => f.max_features,
            Some(n) => Some(n),
        },
        bootstrap: adapter.get_bool("model", "bootstrap", f.bootstrap),
        seed: read_number(adapter, "model", "seed")?.unwrap_or(f.seed),
    };
    let model = ModelConfig {
        train_window: read_number(adapter, "model", "train_window")?.unwrap_or(m.train_window),
        min_train_window: read_number(adapter, "model", "min_train_window")?
            .unwrap_or(m.min_train_window),
        retrain_every: read_number(adapter, "model", "retrain_every")?.unwrap_or(m.retrain_every),
        label_lag: read_number(adapter, "model", "label_lag")?.unwrap_or(m.label_lag),
        forest,
        macro_features: read_list(adapter, "model", "macro_features")
            .unwrap_or_else(default_macro_features),
        momentum_lookback: read_number(adapter, "model", "momentum_lookback")?
            .unwrap_or(m.momentum_lookback),
        fallback_prob_high: read_number(adapter, "model", "fallback_prob_high")?
            .unwrap_or(m.fallback_prob_high),
        fallback_prob_low: read_number(adapter, "model", "fallback_prob_low")?
            .unwrap_or(m.fallback_prob_low),
    };

    let p = &defaults.portfolio;
    let portfolio = PortfolioConfig {
        vol_window: read_number(adapter, "portfolio", "vol_window")?.unwrap_or(p.vol_window),
        momentum_lookback: read_number(adapter, "portfolio", "momentum_lookback")?
            .unwrap_or(p.momentum_lookback),
        momentum_weight: read_number(adapter, "portfolio", "momentum_weight")?
            .unwrap_or(p.momentum_weight),
        fallback_max_positions: read_number(adapter, "portfolio", "fallback_max_positions")?
            .unwrap_or(p.fallback_max_positions),
    };

    let features = FeatureConfig {
        target_horizon: read_number(adapter, "features", "target_horizon")?
            .unwrap_or(defaults.features.target_horizon),
        excluded_features: read_list(adapter, "features", "excluded").unwrap_or_default(),
    };

    let robustness = RobustnessConfig {
        simulations: read_number(adapter, "robustness", "simulations")?
            .unwrap_or(defaults.robustness.simulations),
        seed: read_number(adapter, "robustness", "seed")?.unwrap_or(defaults.robustness.seed),
    };

    Ok(StrategyConfig {
        data,
        backtest,
        universe,
        model,
        portfolio,
        features,
        robustness,
    })
}

fn base_dir(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default()
}

/// Loads, validates and builds the configuration, applying an asset override.
fn prepare(config_path: &PathBuf, assets_override: Option<&str>) -> Result<StrategyConfig, ExitCode> {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = load_config(config_path)?;
    report(validate_config(&adapter))?;
    let mut config = report(build_strategy_config(&adapter, &base_dir(config_path)))?;

    if let Some(raw) = assets_override {
        config.universe.assets = report(parse_codes(raw).map_err(|e| SeerError::ConfigInvalid {
            section: "universe".into(),
            key: "assets".into(),
            reason: e.to_string(),
        }))?;
    }
    Ok(config)
}

fn clip_dates(table: Frame, data: &DataConfig) -> Frame {
    match (data.start_date, data.end_date) {
        (None, None) => table,
        (start, end) => table.between(
            start.unwrap_or(chrono::NaiveDate::MIN),
            end.unwrap_or(chrono::NaiveDate::MAX),
        ),
    }
}

/// Loads prices and the model dataset. Without a feature file the dataset is
/// built from prices.
pub fn load_inputs(config: &StrategyConfig) -> Result<(PriceTable, Frame), SeerError> {
    let prices = clip_dates(CsvAdapter::new(config.data.prices.clone()).load_table()?, &config.data);
    if prices.is_empty() {
        return Err(SeerError::Data {
            reason: "no price rows in the configured date range".into(),
        });
    }

    let dataset = match &config.data.features {
        Some(path) => {
            let table = clip_dates(CsvAdapter::new(path.clone()).load_table()?, &config.data);
            table.without(&config.features.excluded_features)
        }
        None => {
            let validation = validate_universe(&prices, &config.universe)?;
            build_features(&prices, &validation.universe.assets, &config.features)?
        }
    };
    Ok((prices, dataset))
}

fn run_backtest(
    config_path: &PathBuf,
    output_path: Option<&PathBuf>,
    assets_override: Option<&str>,
) -> ExitCode {
    // Stage 1: Load and validate config
    let config = match prepare(config_path, assets_override) {
        Ok(c) => c,
        Err(code) => return code,
    };

    // Stage 2: Load prices and features
    eprintln!("Loading prices from {}", config.data.prices.display());
    let (prices, dataset) = match report(load_inputs(&config)) {
        Ok(inputs) => inputs,
        Err(code) => return code,
    };

    eprintln!(
        "Running strategy: {} assets, {} dates, {} to {}",
        config.universe.assets.len(),
        prices.len(),
        prices.index()[0],
        prices.index()[prices.len() - 1],
    );

    // Stage 3: Predictions, weights, simulation, metrics
    let run = match report(run_strategy(&dataset, &prices, &config)) {
        Ok(r) => r,
        Err(code) => return code,
    };

    // Stage 4: Console summary
    print_summary(&run);

    // Stage 5: Report tables
    let output = output_path
        .cloned()
        .unwrap_or_else(|| PathBuf::from("seer-report"));
    match CsvReportAdapter.write(&run, &output) {
        Ok(()) => {
            eprintln!("\nReport written to: {}", output.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: failed to write report: {e}");
            (&e).into()
        }
    }
}

fn pct(value: f64) -> String {
    if value.is_finite() {
        format!("{:.2}%", value * 100.0)
    } else {
        "n/a".to_string()
    }
}

fn num(value: f64) -> String {
    if value.is_finite() {
        format!("{value:.2}")
    } else {
        "n/a".to_string()
    }
}

pub fn print_summary(run: &StrategyRun) {
    let m = &run.metrics;
    eprintln!("\n=== Aggregate Results ===");
    eprintln!("CAGR:             {}", pct(m.cagr));
    eprintln!("Cumulative:       {}", pct(m.cumulative_return));
    eprintln!("Volatility:       {}", pct(m.annualized_volatility));
    eprintln!("Sharpe Ratio:     {}", num(m.sharpe_ratio));
    eprintln!("Sortino Ratio:    {}", num(m.sortino_ratio));
    eprintln!("Max Drawdown:     {}", pct(m.max_drawdown));
    eprintln!("Calmar Ratio:     {}", num(m.calmar_ratio));
    eprintln!("Beta:             {}", num(m.beta));
    eprintln!("Info Ratio:       {}", num(m.information_ratio));
    eprintln!("Hit Rate:         {}", pct(m.hit_rate));
    eprintln!("Daily Turnover:   {}", pct(m.average_daily_turnover));
    eprintln!("Total Costs:      {}", pct(m.total_transaction_costs));
    eprintln!(
        "Fallback Days:    {} of {}",
        run.weights.fallback_count(),
        run.weights.len()
    );

    if !run.summaries.is_empty() {
        eprintln!("\n=== Per-Asset Summary ===");
        for s in &run.summaries {
            let mode = if s.fallback.is_some() { "fallback" } else { "model" };
            eprintln!(
                "  {}:  {}, {} features, {} retrains, {} model days, {} fallback days",
                s.asset,
                mode,
                s.features.len(),
                s.retrains,
                s.model_days,
                s.fallback_days,
            );
        }
    }

    if !run.skipped.is_empty() {
        eprintln!("\n=== Skipped Assets ===");
        for skipped in &run.skipped {
            match skipped.reason {
                SkipReason::NoData => eprintln!("  {}:  no price data", skipped.asset),
                SkipReason::LowCoverage { coverage } => {
                    eprintln!("  {}:  coverage {}", skipped.asset, pct(coverage))
                }
            }
        }
    }

    if let Some(b) = &run.robustness {
        eprintln!("\n=== Bootstrap ({} simulations) ===", b.simulations);
        eprintln!("Mean Final Equity: {}", num(b.mean_final_equity));
        eprintln!(
            "P5 / P50 / P95:    {} / {} / {}",
            num(b.p5_final_equity),
            num(b.p50_final_equity),
            num(b.p95_final_equity)
        );
        eprintln!("P(Loss):           {}", pct(b.probability_of_loss));
    }
}

pub fn run_dry_run(config_path: &PathBuf, assets_override: Option<&str>) -> ExitCode {
    let config = match prepare(config_path, assets_override) {
        Ok(c) => c,
        Err(code) => return code,
    };
    eprintln!("Config validated successfully");

    eprintln!("\nData:");
    eprintln!("  prices:   {}", config.data.prices.display());
    match &config.data.features {
        Some(path) => eprintln!("  features: {}", path.display()),
        None => eprintln!("  features: built from prices"),
    }

    eprintln!("\nUniverse:");
    eprintln!("  assets:    {}", config.universe.assets.join(", "));
    eprintln!(
        "  benchmark: {}",
        config.universe.benchmark.as_deref().unwrap_or("none")
    );

    let m = config.model_config();
    eprintln!("\nModel:");
    eprintln!(
        "  train window {} (min {}), retrain every {}, label lag {}",
        m.train_window, m.min_train_window, m.retrain_every, m.label_lag
    );
    eprintln!(
        "  forest: {} trees, depth {}, min leaf {}, seed {}",
        m.forest.n_trees, m.forest.max_depth, m.forest.min_samples_leaf, m.forest.seed
    );

    eprintln!("\nCosts:");
    eprintln!(
        "  transaction {:.1} bps, slippage {:.1} bps",
        config.backtest.transaction_cost_rate * 10_000.0,
        config.backtest.slippage_rate * 10_000.0
    );

    eprintln!("\nDry run complete: configuration is valid");
    ExitCode::SUCCESS
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    if let Err(e) = validate_config(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }

    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}

fn run_info(config_path: &PathBuf) -> ExitCode {
    let config = match prepare(config_path, None) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let adapter = CsvAdapter::new(config.data.prices.clone());
    let columns = match adapter.list_columns() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    for column in &columns {
        match adapter.get_data_range(column) {
            Ok(Some((first, last, count))) => {
                println!("{column}: {count} rows, {first} to {last}");
            }
            Ok(None) => eprintln!("{column}: no data found"),
            Err(e) => eprintln!("error querying {column}: {e}"),
        }
    }
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    #[test]
    fn minimal_config_takes_defaults() {
        let config = build_strategy_config(
            &adapter("[data]\nprices = p.csv\n[universe]\nassets = xbi, ibb\n"),
            Path::new("/data"),
        )
        .unwrap();
        let defaults = StrategyConfig::default();

        assert_eq!(config.data.prices, PathBuf::from("/data/p.csv"));
        assert_eq!(config.universe.assets, vec!["XBI", "IBB"]);
        assert_eq!(config.universe.benchmark.as_deref(), Some("^GSPC"));
        assert_eq!(config.model, defaults.model);
        assert_eq!(config.portfolio, defaults.portfolio);
        assert_eq!(config.backtest, defaults.backtest);
    }

    #[test]
    fn keys_override_defaults() {
        let config = build_strategy_config(
            &adapter(
                r#"
[data]
prices = /abs/prices.csv
start_date = 2020-01-01
[backtest]
transaction_cost_bps = 10
slippage_bps = 0
[universe]
assets = XBI
benchmark = none
[model]
train_window = 100
max_features = 3
macro_features = vix, dxy
[features]
excluded = XBI_vol_21
[robustness]
simulations = 50
"#,
            ),
            Path::new("/ignored"),
        )
        .unwrap();

        assert_eq!(config.data.prices, PathBuf::from("/abs/prices.csv"));
        assert!(config.data.start_date.is_some());
        assert!((config.backtest.transaction_cost_rate - 0.001).abs() < 1e-12);
        assert_eq!(config.backtest.slippage_rate, 0.0);
        assert_eq!(config.universe.benchmark, None);
        assert_eq!(config.model.train_window, 100);
        assert_eq!(config.model.forest.max_features, Some(3));
        assert_eq!(config.model.macro_features, vec!["vix", "dxy"]);
        assert_eq!(config.features.excluded_features, vec!["XBI_vol_21"]);
        assert_eq!(config.robustness.simulations, 50);
    }

    #[test]
    fn missing_prices_is_reported() {
        let err = build_strategy_config(&adapter("[universe]\nassets = XBI\n"), Path::new(""))
            .unwrap_err();
        assert!(matches!(err, SeerError::ConfigMissing { key, .. } if key == "prices"));
    }

    #[test]
    fn cli_parses_backtest_flags() {
        let cli = Cli::parse_from([
            "seer", "backtest", "--config", "c.ini", "--assets", "XBI,IBB", "--dry-run",
        ]);
        match cli.command {
            Command::Backtest {
                assets, dry_run, ..
            } => {
                assert_eq!(assets.as_deref(), Some("XBI,IBB"));
                assert!(dry_run);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn undefined_values_print_as_na() {
        assert_eq!(pct(f64::NAN), "n/a");
        assert_eq!(pct(0.1234), "12.34%");
        assert_eq!(num(1.0), "1.00");
    }
}
