//! Performance metrics and statistics.

use chrono::{Datelike, NaiveDate};

use super::backtest::BacktestResult;
use super::portfolio::LedgerRow;
use super::position::ClosedTrade;
use super::signal::Signal;
use super::stats::{mean, pct_change, pct_changes, sample_std};

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyReturn {
    pub year: i32,
    pub month: u32,
    pub ret: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MonthlyStats {
    pub returns: Vec<MonthlyReturn>,
    pub best: Option<f64>,
    pub worst: Option<f64>,
    pub mean: Option<f64>,
    pub std: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub initial_value: f64,
    pub final_value: f64,
    pub total_return: f64,
    pub annualized_return: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    /// Largest decline from a running peak, as a positive fraction.
    pub max_drawdown: f64,
    /// Longest run of bars spent below a previous peak.
    pub max_drawdown_duration: usize,
    /// Share of daily returns that were positive.
    pub win_rate: f64,
    pub buy_signals: usize,
    pub sell_signals: usize,
    pub fill_count: usize,
    pub trades_won: usize,
    pub trades_lost: usize,
    pub profit_factor: f64,
    pub avg_trade_duration: f64,
    pub monthly: MonthlyStats,
}

impl Metrics {
    pub fn compute(result: &BacktestResult, risk_free_rate: f64) -> Self {
        let ledger = &result.ledger;
        let values: Vec<f64> = ledger.iter().map(|row| row.portfolio_value).collect();

        let initial_value = values.first().copied().unwrap_or(result.initial_cash);
        let final_value = values.last().copied().unwrap_or(initial_value);
        let total_return = pct_change(initial_value, final_value).unwrap_or(0.0);

        let rows = values.len() as f64;
        let annualized_return = if rows > 0.0 && total_return > -1.0 {
            (1.0 + total_return).powf(TRADING_DAYS_PER_YEAR / rows) - 1.0
        } else {
            0.0
        };

        let daily_returns = pct_changes(&values);
        let daily_rf = risk_free_rate / TRADING_DAYS_PER_YEAR;
        let (sharpe_ratio, sortino_ratio) = compute_risk_adjusted(&daily_returns, daily_rf);
        let (max_drawdown, max_drawdown_duration) = compute_drawdown(&values);

        // the first bar has no return and counts as a non-winning bar
        let win_rate = if values.is_empty() {
            0.0
        } else {
            daily_returns.iter().filter(|&&r| r > 0.0).count() as f64 / rows
        };

        let trade_stats = TradeStats::from_trades(&result.trades);

        Metrics {
            start_date: ledger.first().map(|row| row.date),
            end_date: ledger.last().map(|row| row.date),
            initial_value,
            final_value,
            total_return,
            annualized_return,
            sharpe_ratio,
            sortino_ratio,
            max_drawdown,
            max_drawdown_duration,
            win_rate,
            buy_signals: result.signal_count(Signal::Buy),
            sell_signals: result.signal_count(Signal::Sell),
            fill_count: result.fills.len(),
            trades_won: trade_stats.won,
            trades_lost: trade_stats.lost,
            profit_factor: trade_stats.profit_factor,
            avg_trade_duration: trade_stats.avg_duration,
            monthly: monthly_stats(ledger),
        }
    }
}

struct TradeStats {
    won: usize,
    lost: usize,
    profit_factor: f64,
    avg_duration: f64,
}

impl TradeStats {
    fn from_trades(trades: &[ClosedTrade]) -> Self {
        let mut won = 0usize;
        let mut lost = 0usize;
        let mut total_wins = 0.0_f64;
        let mut total_losses = 0.0_f64;
        let mut total_duration_days = 0i64;

        for trade in trades {
            if trade.pnl > 0.0 {
                won += 1;
                total_wins += trade.pnl;
            } else if trade.pnl < 0.0 {
                lost += 1;
                total_losses += trade.pnl.abs();
            }
            total_duration_days += trade.duration_days();
        }

        let profit_factor = if total_losses > 0.0 {
            total_wins / total_losses
        } else if total_wins > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        let avg_duration = if trades.is_empty() {
            0.0
        } else {
            total_duration_days as f64 / trades.len() as f64
        };

        TradeStats {
            won,
            lost,
            profit_factor,
            avg_duration,
        }
    }
}

/// Month-end portfolio values compared month to month. The first month has
/// no previous value and contributes no return.
pub fn monthly_returns(ledger: &[LedgerRow]) -> Vec<MonthlyReturn> {
    let mut month_ends: Vec<(i32, u32, f64)> = Vec::new();
    for row in ledger {
        let key = (row.date.year(), row.date.month());
        match month_ends.last_mut() {
            Some(last) if (last.0, last.1) == key => last.2 = row.portfolio_value,
            _ => month_ends.push((key.0, key.1, row.portfolio_value)),
        }
    }

    month_ends
        .windows(2)
        .filter_map(|w| {
            pct_change(w[0].2, w[1].2).map(|ret| MonthlyReturn {
                year: w[1].0,
                month: w[1].1,
                ret,
            })
        })
        .collect()
}

pub fn monthly_stats(ledger: &[LedgerRow]) -> MonthlyStats {
    let returns = monthly_returns(ledger);
    let values: Vec<f64> = returns.iter().map(|m| m.ret).collect();
    MonthlyStats {
        best: values.iter().copied().reduce(f64::max),
        worst: values.iter().copied().reduce(f64::min),
        mean: mean(&values),
        std: sample_std(&values),
        returns,
    }
}

/// Returns (max drawdown, longest drawdown in bars).
fn compute_drawdown(values: &[f64]) -> (f64, usize) {
    let Some(&first) = values.first() else {
        return (0.0, 0);
    };

    let mut peak = first;
    let mut max_dd = 0.0_f64;
    let mut current_duration = 0usize;
    let mut max_duration = 0usize;

    for &value in values {
        if value >= peak {
            peak = value;
            current_duration = 0;
        } else if peak > 0.0 {
            let dd = (peak - value) / peak;
            if dd > max_dd {
                max_dd = dd;
            }
            current_duration += 1;
            if current_duration > max_duration {
                max_duration = current_duration;
            }
        }
    }

    (max_dd, max_duration)
}

/// Annualized Sharpe and Sortino ratios of daily returns over the daily
/// risk-free rate. Zero when the deviation is zero or undefined.
fn compute_risk_adjusted(returns: &[f64], daily_rf: f64) -> (f64, f64) {
    let excess: Vec<f64> = returns.iter().map(|r| r - daily_rf).collect();
    let Some(mean_excess) = mean(&excess) else {
        return (0.0, 0.0);
    };

    let sharpe = match sample_std(&excess) {
        Some(std) if std > f64::EPSILON => mean_excess / std * TRADING_DAYS_PER_YEAR.sqrt(),
        _ => 0.0,
    };

    let downside: f64 = excess.iter().filter(|&&e| e < 0.0).map(|e| e.powi(2)).sum();
    let downside_std = (downside / excess.len() as f64).sqrt();
    let sortino = if downside_std > 0.0 {
        mean_excess / downside_std * TRADING_DAYS_PER_YEAR.sqrt()
    } else {
        0.0
    };

    (sharpe, sortino)
}
