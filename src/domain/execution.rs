//! Trade execution: sizing, transaction costs, stop checks and fills.
//!
//! Every function here mutates a [`PortfolioState`] only when the trade
//! actually happens. A zero-share or unaffordable order leaves state untouched.

use chrono::NaiveDate;

use super::indicator::IndicatorType;
use super::indicator_helpers::IndicatorSet;
use super::ohlcv::PriceBar;
use super::portfolio::PortfolioState;
use super::position::{ClosedTrade, ExitReason, Fill, FillKind, Position};
use super::strategy::{
    MA_LONG, MA_MEDIUM, MA_TREND, RSI_PERIOD, Strategy, StrategyKind, StrategyParams,
    VOLATILITY_WINDOW,
};

/// Upper bound on the share of a position sold by one take-profit.
pub const MAX_PARTIAL_SELL: f64 = 0.8;

/// `price * shares * (commission + slippage)`.
pub fn transaction_cost(price: f64, shares: i64, params: &StrategyParams) -> f64 {
    price * shares as f64 * params.cost_rate()
}

/// Price at which a trade decided on bar `index` executes.
pub fn trade_price(kind: StrategyKind, bars: &[PriceBar], index: usize) -> Option<f64> {
    match kind {
        StrategyKind::Threshold => bars.get(index + 1).map(|b| b.open),
        StrategyKind::Trend | StrategyKind::Scored => bars.get(index).map(|b| b.close),
    }
}

/// Fraction of capital to commit on an entry at bar `index`.
pub fn position_fraction(
    strategy: &Strategy,
    indicators: &IndicatorSet,
    index: usize,
) -> Option<f64> {
    let params = &strategy.params;
    match strategy.kind {
        StrategyKind::Threshold => Some(params.max_position),
        StrategyKind::Trend => {
            let vol = indicators.value(IndicatorType::Volatility(VOLATILITY_WINDOW), index)?;
            Some(params.max_position * volatility_scale(vol, params.vol_threshold, 0.3))
        }
        StrategyKind::Scored => {
            let vol = indicators.value(IndicatorType::Volatility(VOLATILITY_WINDOW), index)?;
            let rsi = indicators.value(IndicatorType::Rsi(RSI_PERIOD), index)?;
            let medium = indicators.value(IndicatorType::Sma(MA_MEDIUM), index)?;
            let trend = indicators.value(IndicatorType::Sma(MA_TREND), index)?;
            let long = indicators.value(IndicatorType::Sma(MA_LONG), index)?;

            let trend_adj = if trend > long && medium > trend { 1.2 } else { 1.0 };
            Some(
                params.max_position
                    * volatility_scale(vol, params.vol_threshold, 0.4)
                    * rsi_adjustment(rsi)
                    * trend_adj,
            )
        }
    }
}

/// `max(floor, 1 - vol / (1.5 * threshold))`.
fn volatility_scale(vol: f64, vol_threshold: f64, floor: f64) -> f64 {
    (1.0 - vol / (vol_threshold * 1.5)).max(floor)
}

pub fn rsi_adjustment(rsi: f64) -> f64 {
    if !(30.0..=70.0).contains(&rsi) {
        0.6
    } else if (45.0..=65.0).contains(&rsi) {
        1.0
    } else {
        0.8
    }
}

/// Whole shares to buy at `price`. The scored variant sizes from cash; the
/// others from total portfolio value at the current close.
pub fn entry_shares(
    strategy: &Strategy,
    state: &PortfolioState,
    indicators: &IndicatorSet,
    index: usize,
    close: f64,
    price: f64,
) -> i64 {
    if price <= 0.0 || !price.is_finite() {
        return 0;
    }
    let Some(fraction) = position_fraction(strategy, indicators, index) else {
        return 0;
    };
    let capital = match strategy.kind {
        StrategyKind::Scored => state.cash,
        StrategyKind::Threshold | StrategyKind::Trend => state.value(close),
    };
    let shares = (capital * fraction / price).floor();
    if shares.is_finite() && shares > 0.0 {
        shares as i64
    } else {
        0
    }
}

/// First stop that trips on this close: fixed, then trailing, then ATR.
pub fn check_stops(position: &Position, close: f64, params: &StrategyParams) -> Option<ExitReason> {
    if position.should_stop_loss(close, params.stop_loss) {
        Some(ExitReason::StopLoss)
    } else if position.should_trailing_stop(close, params.trailing_stop) {
        Some(ExitReason::TrailingStop)
    } else if position.should_atr_stop(close) {
        Some(ExitReason::AtrStop)
    } else {
        None
    }
}

/// Shares to sell for the partial take-profit, if it triggers.
pub fn partial_exit_shares(position: &Position, close: f64, params: &StrategyParams) -> Option<i64> {
    if params.partial_sell_ratio <= 0.0 {
        return None;
    }
    let gain = position.unrealized_return(close);
    if gain < params.partial_sell_gain {
        return None;
    }
    let ratio = (params.partial_sell_ratio * (1.0 + gain)).min(MAX_PARTIAL_SELL);
    let shares = (position.shares as f64 * ratio).floor() as i64;
    (shares > 0).then_some(shares)
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntryResult {
    Entered(Fill),
    InsufficientCapital,
}

/// Buy `shares` at `price`; the position must be flat.
pub fn enter_long(
    state: &mut PortfolioState,
    date: NaiveDate,
    shares: i64,
    price: f64,
    params: &StrategyParams,
) -> EntryResult {
    if shares <= 0 || !state.is_flat() {
        return EntryResult::InsufficientCapital;
    }
    let cost = transaction_cost(price, shares, params);
    let total = shares as f64 * price + cost;
    if total > state.cash {
        return EntryResult::InsufficientCapital;
    }

    state.cash -= total;
    state.position = Some(Position::open(date, shares, price, cost));

    EntryResult::Entered(Fill {
        date,
        kind: FillKind::Entry,
        reason: ExitReason::Signal,
        shares,
        price,
        cost,
    })
}

/// Sell part of the position. Cost basis is unchanged. Selling every share
/// is not allowed here; use [`exit_position`].
pub fn reduce_position(
    state: &mut PortfolioState,
    date: NaiveDate,
    shares: i64,
    price: f64,
    reason: ExitReason,
    params: &StrategyParams,
) -> Option<Fill> {
    let position = state.position.as_mut()?;
    if shares <= 0 || shares >= position.shares {
        return None;
    }
    let cost = transaction_cost(price, shares, params);
    let net = shares as f64 * price - cost;

    position.shares -= shares;
    position.proceeds += net;
    state.cash += net;

    Some(Fill {
        date,
        kind: FillKind::PartialExit,
        reason,
        shares,
        price,
        cost,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExitResult {
    pub fill: Fill,
    pub trade: ClosedTrade,
}

/// Liquidate the whole position and close the round trip.
pub fn exit_position(
    state: &mut PortfolioState,
    date: NaiveDate,
    price: f64,
    reason: ExitReason,
    params: &StrategyParams,
) -> Option<ExitResult> {
    let position = state.position.take()?;
    let shares = position.shares;
    let cost = transaction_cost(price, shares, params);
    let net = shares as f64 * price - cost;

    state.cash += net;

    let trade = ClosedTrade {
        entry_date: position.entry_date,
        exit_date: date,
        shares: position.entry_shares,
        entry_price: position.avg_cost,
        exit_price: price,
        exit_reason: reason,
        pnl: position.proceeds + net - position.entry_outlay,
    };

    Some(ExitResult {
        fill: Fill {
            date,
            kind: FillKind::Exit,
            reason,
            shares,
            price,
            cost,
        },
        trade,
    })
}
