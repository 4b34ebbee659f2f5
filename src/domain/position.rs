//! Open position, executed fills and completed round trips.

use chrono::NaiveDate;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillKind {
    Entry,
    Exit,
    PartialExit,
}

impl fmt::Display for FillKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FillKind::Entry => "entry",
            FillKind::Exit => "exit",
            FillKind::PartialExit => "partial_exit",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    Signal,
    StopLoss,
    TrailingStop,
    AtrStop,
    TakeProfit,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExitReason::Signal => "signal",
            ExitReason::StopLoss => "stop_loss",
            ExitReason::TrailingStop => "trailing_stop",
            ExitReason::AtrStop => "atr_stop",
            ExitReason::TakeProfit => "take_profit",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fill {
    pub date: NaiveDate,
    pub kind: FillKind,
    pub reason: ExitReason,
    pub shares: i64,
    pub price: f64,
    pub cost: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClosedTrade {
    pub entry_date: NaiveDate,
    pub exit_date: NaiveDate,
    pub shares: i64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub exit_reason: ExitReason,
    /// Net of every transaction cost in the round trip, partial exits included.
    pub pnl: f64,
}

impl ClosedTrade {
    pub fn duration_days(&self) -> i64 {
        (self.exit_date - self.entry_date).num_days()
    }
}

/// A long holding. Only exists while at least one share is held.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub shares: i64,
    pub entry_shares: i64,
    pub avg_cost: f64,
    pub entry_date: NaiveDate,
    /// Highest close seen since entry.
    pub highest_price: f64,
    pub atr_stop_price: Option<f64>,
    /// Cash paid on entry, cost included.
    pub entry_outlay: f64,
    /// Net cash received from partial exits so far.
    pub proceeds: f64,
}

impl Position {
    pub fn open(date: NaiveDate, shares: i64, price: f64, cost: f64) -> Self {
        Position {
            shares,
            entry_shares: shares,
            avg_cost: price,
            entry_date: date,
            highest_price: price,
            atr_stop_price: None,
            entry_outlay: shares as f64 * price + cost,
            proceeds: 0.0,
        }
    }

    pub fn market_value(&self, price: f64) -> f64 {
        self.shares as f64 * price
    }

    /// `price / avg_cost - 1`.
    pub fn unrealized_return(&self, price: f64) -> f64 {
        price / self.avg_cost - 1.0
    }

    pub fn update_highest(&mut self, close: f64) {
        if close > self.highest_price {
            self.highest_price = close;
        }
    }

    pub fn should_stop_loss(&self, close: f64, stop_loss: f64) -> bool {
        stop_loss > 0.0 && self.unrealized_return(close) < -stop_loss
    }

    pub fn should_trailing_stop(&self, close: f64, trailing_stop: f64) -> bool {
        trailing_stop > 0.0 && close < self.highest_price * (1.0 - trailing_stop)
    }

    pub fn should_atr_stop(&self, close: f64) -> bool {
        self.atr_stop_price.is_some_and(|stop| close < stop)
    }
}
