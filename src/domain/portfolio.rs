//! Portfolio state and the per-bar ledger.

use chrono::NaiveDate;

use super::position::Position;
use super::signal::Signal;

/// Cash plus at most one long position. Flat whenever `position` is `None`,
/// which also clears the cost basis, highest price and ATR stop.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioState {
    pub cash: f64,
    pub position: Option<Position>,
}

impl PortfolioState {
    pub fn new(initial_cash: f64) -> Self {
        PortfolioState {
            cash: initial_cash,
            position: None,
        }
    }

    pub fn is_flat(&self) -> bool {
        self.position.is_none()
    }

    pub fn shares(&self) -> i64 {
        self.position.as_ref().map_or(0, |p| p.shares)
    }

    pub fn avg_cost(&self) -> Option<f64> {
        self.position.as_ref().map(|p| p.avg_cost)
    }

    /// Highest close since entry; 0 when flat.
    pub fn highest_price(&self) -> f64 {
        self.position.as_ref().map_or(0.0, |p| p.highest_price)
    }

    pub fn atr_stop_price(&self) -> Option<f64> {
        self.position.as_ref().and_then(|p| p.atr_stop_price)
    }

    pub fn value(&self, close: f64) -> f64 {
        self.cash + self.position.as_ref().map_or(0.0, |p| p.market_value(close))
    }
}

/// Snapshot of the portfolio after one simulated bar.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerRow {
    pub date: NaiveDate,
    pub cash: f64,
    pub position: i64,
    pub portfolio_value: f64,
    pub close: f64,
    pub signal: Signal,
    pub volatility: Option<f64>,
    pub atr: Option<f64>,
    pub rsi: Option<f64>,
}
