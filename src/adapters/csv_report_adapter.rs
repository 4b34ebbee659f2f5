//! CSV report adapter implementing ReportPort.
//!
//! Writes the per-strategy ledger (`strategy_<name>_results.csv`) and the
//! cross-strategy summary (`performance_comparison.csv`).

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::LevtraderError;
use crate::domain::metrics::Metrics;
use crate::domain::portfolio::LedgerRow;
use crate::ports::report_port::ReportPort;

pub const COMPARISON_FILE: &str = "performance_comparison.csv";

pub fn ledger_file_name(strategy_name: &str) -> String {
    format!("strategy_{}_results.csv", strategy_name)
}

#[derive(Serialize)]
struct LedgerRecord {
    date: String,
    cash: f64,
    position: i64,
    portfolio_value: f64,
    close: f64,
    signal: &'static str,
    volatility: Option<f64>,
    atr: Option<f64>,
    rsi: Option<f64>,
}

impl From<&LedgerRow> for LedgerRecord {
    fn from(row: &LedgerRow) -> Self {
        LedgerRecord {
            date: row.date.to_string(),
            cash: row.cash,
            position: row.position,
            portfolio_value: row.portfolio_value,
            close: row.close,
            signal: row.signal.as_str(),
            volatility: row.volatility,
            atr: row.atr,
            rsi: row.rsi,
        }
    }
}

#[derive(Serialize)]
struct ComparisonRecord {
    strategy: String,
    kind: &'static str,
    start_date: Option<String>,
    end_date: Option<String>,
    initial_value: f64,
    final_value: f64,
    total_return: f64,
    annualized_return: f64,
    sharpe_ratio: f64,
    sortino_ratio: f64,
    max_drawdown: f64,
    max_drawdown_duration: usize,
    win_rate: f64,
    buy_signals: usize,
    sell_signals: usize,
    fills: usize,
    trades_won: usize,
    trades_lost: usize,
    profit_factor: f64,
    avg_trade_duration: f64,
    best_month: Option<f64>,
    worst_month: Option<f64>,
    avg_month: Option<f64>,
    month_std: Option<f64>,
}

impl ComparisonRecord {
    fn new(result: &BacktestResult, metrics: &Metrics) -> Self {
        ComparisonRecord {
            strategy: result.strategy_name.clone(),
            kind: result.kind.as_str(),
            start_date: metrics.start_date.map(|d| d.to_string()),
            end_date: metrics.end_date.map(|d| d.to_string()),
            initial_value: metrics.initial_value,
            final_value: metrics.final_value,
            total_return: metrics.total_return,
            annualized_return: metrics.annualized_return,
            sharpe_ratio: metrics.sharpe_ratio,
            sortino_ratio: metrics.sortino_ratio,
            max_drawdown: metrics.max_drawdown,
            max_drawdown_duration: metrics.max_drawdown_duration,
            win_rate: metrics.win_rate,
            buy_signals: metrics.buy_signals,
            sell_signals: metrics.sell_signals,
            fills: metrics.fill_count,
            trades_won: metrics.trades_won,
            trades_lost: metrics.trades_lost,
            profit_factor: metrics.profit_factor,
            avg_trade_duration: metrics.avg_trade_duration,
            best_month: metrics.monthly.best,
            worst_month: metrics.monthly.worst,
            avg_month: metrics.monthly.mean,
            month_std: metrics.monthly.std,
        }
    }
}

pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CsvReportAdapter {
    fn default() -> Self {
        Self::new()
    }
}

fn write_records<T: Serialize>(path: &Path, records: &[T]) -> Result<(), LevtraderError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let report_err = |e: csv::Error| LevtraderError::Report {
        reason: format!("failed to write {}: {}", path.display(), e),
    };

    let mut writer = csv::Writer::from_path(path).map_err(report_err)?;
    for record in records {
        writer.serialize(record).map_err(report_err)?;
    }
    writer.flush()?;
    Ok(())
}

impl ReportPort for CsvReportAdapter {
    fn write_ledger(
        &self,
        result: &BacktestResult,
        output_dir: &Path,
    ) -> Result<PathBuf, LevtraderError> {
        let path = output_dir.join(ledger_file_name(&result.strategy_name));
        let records: Vec<LedgerRecord> = result.ledger.iter().map(LedgerRecord::from).collect();
        write_records(&path, &records)?;
        Ok(path)
    }

    fn write_comparison(
        &self,
        runs: &[(&BacktestResult, &Metrics)],
        output_dir: &Path,
    ) -> Result<PathBuf, LevtraderError> {
        let path = output_dir.join(COMPARISON_FILE);
        let records: Vec<ComparisonRecord> = runs
            .iter()
            .map(|(result, metrics)| ComparisonRecord::new(result, metrics))
            .collect();
        write_records(&path, &records)?;
        Ok(path)
    }
}
