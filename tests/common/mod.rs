#![allow(dead_code)]

use chrono::NaiveDate;
use levtrader::domain::error::LevtraderError;
pub use levtrader::domain::ohlcv::PriceBar;
use levtrader::domain::signal::Decision;
use levtrader::domain::strategy::{Strategy, StrategyKind};
use levtrader::ports::data_port::DataPort;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

pub const CSV_HEADER: &str = "dt,open,high,low,close,avg,volume,symbol";

pub struct MockDataPort {
    pub data: HashMap<String, Vec<PriceBar>>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<PriceBar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<PriceBar>, LevtraderError> {
        let bars = self
            .data
            .get(symbol)
            .ok_or_else(|| LevtraderError::DataLoad {
                reason: format!("unknown symbol {}", symbol),
            })?;
        Ok(bars
            .iter()
            .filter(|b| start_date.is_none_or(|s| b.date >= s) && end_date.is_none_or(|e| b.date <= e))
            .cloned()
            .collect())
    }

    fn list_symbols(&self) -> Result<Vec<String>, LevtraderError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, LevtraderError> {
        Ok(self.data.get(symbol).and_then(|bars| {
            Some((bars.first()?.date, bars.last()?.date, bars.len()))
        }))
    }
}

pub fn day(offset: usize) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(offset as i64)
}

/// Bar whose open, close and average all sit at `close`, with a 1% range.
pub fn make_bar(offset: usize, close: f64) -> PriceBar {
    PriceBar {
        date: day(offset),
        open: close,
        high: close * 1.01,
        low: close * 0.99,
        close,
        avg: close,
        volume: Some(1_000_000),
    }
}

pub fn bars_from_closes(closes: &[f64]) -> Vec<PriceBar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| make_bar(i, c))
        .collect()
}

pub fn flat_bars(count: usize, price: f64) -> Vec<PriceBar> {
    bars_from_closes(&vec![price; count])
}

/// Closes compounding by `daily` per bar from `start`.
pub fn trending_bars(count: usize, start: f64, daily: f64) -> Vec<PriceBar> {
    let closes: Vec<f64> = (0..count)
        .map(|i| start * (1.0 + daily).powi(i as i32))
        .collect();
    bars_from_closes(&closes)
}

/// Deterministic oscillating series around an upward drift.
pub fn wave_bars(count: usize) -> Vec<PriceBar> {
    let closes: Vec<f64> = (0..count)
        .map(|i| {
            let t = i as f64;
            50.0 + 0.05 * t + 4.0 * (t / 6.0).sin() + 1.5 * (t / 2.3).cos()
        })
        .collect();
    bars_from_closes(&closes)
}

pub fn hold_decisions(count: usize) -> Vec<Decision> {
    vec![Decision::HOLD; count]
}

/// Strategy with transaction costs switched off.
pub fn costless(kind: StrategyKind) -> Strategy {
    let mut strategy = Strategy::new(kind.as_str(), kind);
    strategy.params.commission = 0.0;
    strategy.params.slippage = 0.0;
    strategy
}

pub fn csv_content(bars: &[PriceBar]) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    for b in bars {
        let _ = writeln!(
            out,
            "{},{},{},{},{},{},{},TQQQ",
            b.date,
            b.open,
            b.high,
            b.low,
            b.close,
            b.avg,
            b.volume.unwrap_or(0)
        );
    }
    out
}

pub fn write_symbol_csv(dir: &Path, symbol: &str, bars: &[PriceBar]) -> PathBuf {
    let path = dir.join(format!("{}.csv", symbol));
    std::fs::write(&path, csv_content(bars)).unwrap();
    path
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() <= 1e-6 * expected.abs().max(1.0),
        "expected {expected}, got {actual}"
    );
}
