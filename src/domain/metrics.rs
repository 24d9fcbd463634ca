//! Performance and risk statistics of a completed simulation.
//!
//! Undefined statistics are `NaN`, never zero.

use crate::domain::backtest::BacktestConfig;
use crate::domain::error::SeerError;
use crate::domain::frame::{ReturnSeries, TurnoverSeries};
use crate::domain::stats::{
    mean, pct_change, percentile, population_variance, sample_covariance, sample_std,
};
use chrono::{Datelike, NaiveDate};

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;
const DAYS_PER_YEAR: f64 = 365.25;
pub const ROLLING_IR_WINDOWS: [usize; 4] = [21, 63, 126, 252];

#[derive(Debug, Clone, PartialEq)]
pub struct RollingInformationRatio {
    pub window: usize,
    /// Ratio over the most recent `window` observations.
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricsRecord {
    pub cagr: f64,
    pub cumulative_return: f64,
    pub annual_return: f64,
    pub annualized_volatility: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub max_drawdown: f64,
    pub calmar_ratio: f64,
    pub var_95: f64,
    pub cvar_95: f64,
    pub rachev_ratio: f64,
    pub beta: f64,
    pub information_ratio: f64,
    pub rolling_information_ratio: Vec<RollingInformationRatio>,
    pub hit_rate: f64,
    pub average_daily_turnover: f64,
    pub average_annual_turnover: f64,
    pub total_turnover: f64,
    pub total_transaction_costs: f64,
    pub average_monthly_turnover: f64,
    pub average_quarterly_turnover: f64,
    pub estimated_total_slippage: f64,
    pub estimated_annual_slippage: f64,
    pub rebalance_days: usize,
    pub best_month: f64,
    pub worst_month: f64,
}

impl MetricsRecord {
    /// Computes every statistic from the net return and turnover series.
    ///
    /// `benchmark` holds benchmark prices on the same dates as `returns`.
    pub fn compute(
        returns: &ReturnSeries,
        turnover: &TurnoverSeries,
        benchmark: Option<&[f64]>,
        costs: &BacktestConfig,
    ) -> Result<Self, SeerError> {
        if turnover.len() != returns.len() {
            return Err(SeerError::Shape {
                table: "turnover".into(),
                reason: format!("{} values for {} returns", turnover.len(), returns.len()),
            });
        }
        if let Some(prices) = benchmark.filter(|p| p.len() != returns.len()) {
            return Err(SeerError::Shape {
                table: "benchmark".into(),
                reason: format!("{} prices for {} returns", prices.len(), returns.len()),
            });
        }

        let r = &returns.values;
        let equity = equity_curve(r);
        let final_equity = equity.last().copied().unwrap_or(f64::NAN);

        // A flat equity curve carries no growth rate.
        let flat = r.iter().all(|&x| x == 0.0);
        let cagr = match (returns.first_date(), returns.last_date()) {
            _ if flat => f64::NAN,
            (Some(first), Some(last)) => {
                let years = (last - first).num_days() as f64 / DAYS_PER_YEAR;
                if years > 0.0 {
                    final_equity.powf(1.0 / years) - 1.0
                } else {
                    f64::NAN
                }
            }
            _ => f64::NAN,
        };

        let daily_mean = mean(r);
        let annual_return = daily_mean * TRADING_DAYS_PER_YEAR;
        let annualized_volatility = sample_std(r) * TRADING_DAYS_PER_YEAR.sqrt();
        let sharpe_ratio = ratio(annual_return, annualized_volatility);

        let max_drawdown = max_drawdown(&equity);
        let calmar_ratio = ratio(cagr, max_drawdown.abs());

        let p5 = percentile(r, 5.0);
        let p95 = percentile(r, 95.0);
        let lower_tail: Vec<f64> = r.iter().copied().filter(|&x| x <= p5).collect();
        let upper_tail: Vec<f64> = r.iter().copied().filter(|&x| x >= p95).collect();
        let var_95 = -p5;
        let cvar_95 = -mean(&lower_tail);
        let rachev_ratio = ratio(mean(&upper_tail), -mean(&lower_tail));

        let losses: Vec<f64> = r.iter().copied().filter(|&x| x < 0.0).collect();
        let downside_deviation = if losses.is_empty() {
            f64::NAN
        } else {
            (mean(&losses.iter().map(|x| x * x).collect::<Vec<_>>()) * TRADING_DAYS_PER_YEAR).sqrt()
        };
        let sortino_ratio = ratio(annual_return, downside_deviation);

        let hit_rate = if r.is_empty() {
            f64::NAN
        } else {
            r.iter().filter(|&&x| x > 0.0).count() as f64 / r.len() as f64
        };

        let t = &turnover.values;
        let average_daily_turnover = mean(t);
        let total_turnover: f64 = t.iter().sum();
        let monthly_turnover = period_sums(&turnover.index, t, month_ordinal);
        let quarterly_turnover = period_sums(&turnover.index, t, quarter_ordinal);

        let monthly_returns = period_sums(&returns.index, r, month_ordinal);
        let best_month = monthly_returns.iter().copied().reduce(f64::max).unwrap_or(f64::NAN);
        let worst_month = monthly_returns.iter().copied().reduce(f64::min).unwrap_or(f64::NAN);

        let (beta, information_ratio, rolling_information_ratio) = match benchmark {
            Some(prices) => benchmark_statistics(r, prices),
            None => (
                f64::NAN,
                f64::NAN,
                ROLLING_IR_WINDOWS
                    .iter()
                    .map(|&window| RollingInformationRatio {
                        window,
                        value: f64::NAN,
                    })
                    .collect(),
            ),
        };

        Ok(Self {
            cagr,
            cumulative_return: final_equity - 1.0,
            annual_return,
            annualized_volatility,
            sharpe_ratio,
            sortino_ratio,
            max_drawdown,
            calmar_ratio,
            var_95,
            cvar_95,
            rachev_ratio,
            beta,
            information_ratio,
            rolling_information_ratio,
            hit_rate,
            average_daily_turnover,
            average_annual_turnover: average_daily_turnover * TRADING_DAYS_PER_YEAR,
            total_turnover,
            total_transaction_costs: total_turnover * costs.transaction_cost_rate,
            average_monthly_turnover: mean(&monthly_turnover),
            average_quarterly_turnover: mean(&quarterly_turnover),
            estimated_total_slippage: total_turnover * costs.slippage_rate,
            estimated_annual_slippage: average_daily_turnover * TRADING_DAYS_PER_YEAR * costs.slippage_rate,
            rebalance_days: t.iter().filter(|&&x| x > 0.0).count(),
            best_month,
            worst_month,
        })
    }

    /// Report rows in display order.
    pub fn entries(&self) -> Vec<(String, f64)> {
        let mut rows: Vec<(String, f64)> = [
            ("CAGR", self.cagr),
            ("Cumulative Return", self.cumulative_return),
            ("Annual Return", self.annual_return),
            ("Annualized Volatility", self.annualized_volatility),
            ("Sharpe Ratio", self.sharpe_ratio),
            ("Sortino Ratio", self.sortino_ratio),
            ("Maximum Drawdown", self.max_drawdown),
            ("Calmar Ratio", self.calmar_ratio),
            ("VaR 95%", self.var_95),
            ("CVaR 95%", self.cvar_95),
            ("Rachev Ratio (95/5)", self.rachev_ratio),
            ("Beta", self.beta),
            ("Information Ratio", self.information_ratio),
        ]
        .iter()
        .map(|(name, value)| (name.to_string(), *value))
        .collect();

        rows.extend(
            self.rolling_information_ratio
                .iter()
                .map(|r| (format!("Information Ratio {}d", r.window), r.value)),
        );

        rows.extend(
            [
                ("Hit Rate", self.hit_rate),
                ("Average Daily Turnover", self.average_daily_turnover),
                ("Average Annual Turnover", self.average_annual_turnover),
                ("Total Turnover", self.total_turnover),
                ("Total Transaction Costs", self.total_transaction_costs),
                ("Average Monthly Turnover", self.average_monthly_turnover),
                ("Average Quarterly Turnover", self.average_quarterly_turnover),
                ("Estimated Total Slippage", self.estimated_total_slippage),
                ("Estimated Annual Slippage", self.estimated_annual_slippage),
                ("Rebalance Days", self.rebalance_days as f64),
                ("Best Month", self.best_month),
                ("Worst Month", self.worst_month),
            ]
            .iter()
            .map(|(name, value)| (name.to_string(), *value)),
        );
        rows
    }
}

pub fn equity_curve(returns: &[f64]) -> Vec<f64> {
    let mut equity = 1.0;
    returns
        .iter()
        .map(|r| {
            equity *= 1.0 + r;
            equity
        })
        .collect()
}

/// Deepest fall from a running peak, as a non-positive fraction.
pub fn max_drawdown(equity: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut worst = f64::NAN;
    for &e in equity {
        peak = peak.max(e);
        let dd = e / peak - 1.0;
        if worst.is_nan() || dd < worst {
            worst = dd;
        }
    }
    worst
}

/// `numerator / denominator`, undefined when the denominator is zero or undefined.
fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 || denominator.is_nan() {
        f64::NAN
    } else {
        numerator / denominator
    }
}

fn benchmark_statistics(returns: &[f64], prices: &[f64]) -> (f64, f64, Vec<RollingInformationRatio>) {
    let bench: Vec<f64> = pct_change(prices, 1)
        .into_iter()
        .map(|b| if b.is_finite() { b } else { 0.0 })
        .collect();

    // Sample covariance over population variance.
    let beta = ratio(sample_covariance(returns, &bench), population_variance(&bench));

    let excess: Vec<f64> = returns.iter().zip(&bench).map(|(r, b)| r - b).collect();
    let information_ratio = annualized_ratio(&excess);
    let rolling = ROLLING_IR_WINDOWS
        .iter()
        .map(|&window| RollingInformationRatio {
            window,
            value: if excess.len() < window {
                f64::NAN
            } else {
                annualized_ratio(&excess[excess.len() - window..])
            },
        })
        .collect();

    (beta, information_ratio, rolling)
}

fn annualized_ratio(values: &[f64]) -> f64 {
    ratio(
        mean(values) * TRADING_DAYS_PER_YEAR,
        sample_std(values) * TRADING_DAYS_PER_YEAR.sqrt(),
    )
}

fn month_ordinal(date: NaiveDate) -> i64 {
    date.year() as i64 * 12 + date.month0() as i64
}

fn quarter_ordinal(date: NaiveDate) -> i64 {
    date.year() as i64 * 4 + (date.month0() / 3) as i64
}

/// Sums per calendar period between the first and last date; periods
/// without observations are zero.
fn period_sums(index: &[NaiveDate], values: &[f64], period: fn(NaiveDate) -> i64) -> Vec<f64> {
    let (Some(&first), Some(&last)) = (index.first(), index.last()) else {
        return Vec::new();
    };
    let start = period(first);
    let mut sums = vec![0.0; (period(last) - start + 1) as usize];
    for (date, value) in index.iter().zip(values) {
        if !value.is_nan() {
            sums[(period(*date) - start) as usize] += value;
        }
    }
    sums
}
