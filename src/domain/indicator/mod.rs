//! Technical indicator implementations.
//!
//! This module provides types for representing indicator values and series:
//! - `IndicatorPoint`: A single point in an indicator time series
//! - `IndicatorType`: Enum for indicator identity + parameters (serves as HashMap key)
//! - `IndicatorSeries`: A time series of indicator values with per-bar warm-up state

pub mod atr;
pub mod momentum;
pub mod rsi;
pub mod sma;
pub mod volatility;

use chrono::NaiveDate;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorPoint {
    pub date: NaiveDate,
    pub valid: bool,
    pub value: f64,
}

impl IndicatorPoint {
    pub fn warming_up(date: NaiveDate) -> Self {
        IndicatorPoint {
            date,
            valid: false,
            value: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    /// Simple moving average of the bar's average price.
    Sma(usize),
    /// Rolling sample standard deviation of average-price returns.
    Volatility(usize),
    /// Average-price change over a fixed lookback, as a fraction.
    Momentum(usize),
    Atr(usize),
    Rsi(usize),
}

#[derive(Debug, Clone)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    /// Value at bar `index`, or `None` while warming up, out of range, or non-finite.
    pub fn value_at(&self, index: usize) -> Option<f64> {
        self.values
            .get(index)
            .filter(|p| p.valid && p.value.is_finite())
            .map(|p| p.value)
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
            IndicatorType::Volatility(period) => write!(f, "VOLATILITY({})", period),
            IndicatorType::Momentum(period) => write!(f, "MOMENTUM({})", period),
            IndicatorType::Atr(period) => write!(f, "ATR({})", period),
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
        }
    }
}
