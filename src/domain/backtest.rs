//! Backtest engine: one simulation loop shared by every strategy variant.
//!
//! Per bar, in order: update the highest close and check stops (a tripped
//! stop ends the bar), partial take-profit, then the buy/sell decision. A
//! ledger row is recorded for every simulated bar whether or not anything
//! traded.

use tracing::{debug, info};

use super::error::LevtraderError;
use super::execution::{
    EntryResult, check_stops, enter_long, entry_shares, exit_position, partial_exit_shares,
    reduce_position, trade_price,
};
use super::indicator::IndicatorType;
use super::indicator_helpers::{IndicatorSet, compute_indicators};
use super::ohlcv::PriceBar;
use super::portfolio::{LedgerRow, PortfolioState};
use super::position::{ClosedTrade, ExitReason, Fill};
use super::signal::{Decision, Signal, generate_decisions};
use super::strategy::{RSI_PERIOD, Strategy, StrategyKind, VOLATILITY_WINDOW};

pub const DEFAULT_INITIAL_CASH: f64 = 100_000.0;
pub const DEFAULT_RISK_FREE_RATE: f64 = 0.02;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub initial_cash: f64,
    pub risk_free_rate: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            initial_cash: DEFAULT_INITIAL_CASH,
            risk_free_rate: DEFAULT_RISK_FREE_RATE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub strategy_name: String,
    pub kind: StrategyKind,
    pub initial_cash: f64,
    pub ledger: Vec<LedgerRow>,
    pub fills: Vec<Fill>,
    pub trades: Vec<ClosedTrade>,
}

impl BacktestResult {
    pub fn final_value(&self) -> f64 {
        self.ledger
            .last()
            .map_or(self.initial_cash, |row| row.portfolio_value)
    }

    pub fn signal_count(&self, signal: Signal) -> usize {
        self.ledger.iter().filter(|row| row.signal == signal).count()
    }
}

/// Portfolio state machine over a borrowed price series.
///
/// Decisions are supplied by the caller so tests can replay hand-written
/// signal sequences through the same loop the strategies use.
pub struct Simulator<'a> {
    strategy: &'a Strategy,
    bars: &'a [PriceBar],
    indicators: &'a IndicatorSet,
    decisions: Vec<Decision>,
    initial_cash: f64,
    state: PortfolioState,
    ledger: Vec<LedgerRow>,
    fills: Vec<Fill>,
    trades: Vec<ClosedTrade>,
}

impl<'a> Simulator<'a> {
    pub fn new(
        strategy: &'a Strategy,
        bars: &'a [PriceBar],
        indicators: &'a IndicatorSet,
        decisions: Vec<Decision>,
        initial_cash: f64,
    ) -> Self {
        Simulator {
            strategy,
            bars,
            indicators,
            decisions,
            initial_cash,
            state: PortfolioState::new(initial_cash),
            ledger: Vec::new(),
            fills: Vec::new(),
            trades: Vec::new(),
        }
    }

    pub fn state(&self) -> &PortfolioState {
        &self.state
    }

    pub fn ledger(&self) -> &[LedgerRow] {
        &self.ledger
    }

    /// Simulate bar `index`. Out-of-range indices are ignored.
    pub fn step(&mut self, index: usize) {
        let bars = self.bars;
        let Some(bar) = bars.get(index) else {
            return;
        };
        let decision = self.decisions.get(index).copied().unwrap_or_default();

        if !self.apply_stops(bar) {
            self.apply_take_profit(bar);
            self.apply_decision(index, decision);
        }

        self.record(index, decision.signal());
    }

    /// Simulate every bar of the strategy's window.
    pub fn run(mut self) -> BacktestResult {
        for index in self.strategy.simulation_range(self.bars.len()) {
            self.step(index);
        }
        self.finish()
    }

    pub fn finish(self) -> BacktestResult {
        BacktestResult {
            strategy_name: self.strategy.name.clone(),
            kind: self.strategy.kind,
            initial_cash: self.initial_cash,
            ledger: self.ledger,
            fills: self.fills,
            trades: self.trades,
        }
    }

    /// Returns true when a stop liquidated the position.
    fn apply_stops(&mut self, bar: &PriceBar) -> bool {
        let strategy = self.strategy;
        let params = &strategy.params;
        let Some(position) = self.state.position.as_mut() else {
            return false;
        };
        position.update_highest(bar.close);

        match check_stops(position, bar.close, params) {
            Some(reason) => {
                self.close(bar, bar.close, reason);
                true
            }
            None => false,
        }
    }

    fn apply_take_profit(&mut self, bar: &PriceBar) {
        let strategy = self.strategy;
        let params = &strategy.params;
        let Some(shares) = self
            .state
            .position
            .as_ref()
            .and_then(|p| partial_exit_shares(p, bar.close, params))
        else {
            return;
        };

        if let Some(fill) = reduce_position(
            &mut self.state,
            bar.date,
            shares,
            bar.close,
            ExitReason::TakeProfit,
            params,
        ) {
            self.push_fill(fill);
        }
    }

    fn apply_decision(&mut self, index: usize, decision: Decision) {
        let strategy = self.strategy;
        let bars = self.bars;
        let bar = &bars[index];
        let Some(price) = trade_price(strategy.kind, bars, index) else {
            return;
        };

        if decision.buy && self.state.is_flat() {
            let shares = entry_shares(
                strategy,
                &self.state,
                self.indicators,
                index,
                bar.close,
                price,
            );
            let atr_stop = self.atr_stop(index, price);
            if let EntryResult::Entered(fill) =
                enter_long(&mut self.state, bar.date, shares, price, &strategy.params)
            {
                if let Some(position) = self.state.position.as_mut() {
                    position.atr_stop_price = atr_stop;
                }
                self.push_fill(fill);
            }
        } else if decision.sell && !self.state.is_flat() {
            self.close(bar, price, ExitReason::Signal);
        }
    }

    /// `entry - multiplier * ATR` at entry, when the ATR stop is enabled.
    fn atr_stop(&self, index: usize, entry_price: f64) -> Option<f64> {
        let params = &self.strategy.params;
        if params.atr_multiplier <= 0.0 {
            return None;
        }
        let atr = self
            .indicators
            .value(IndicatorType::Atr(params.atr_period), index)?;
        Some(entry_price - params.atr_multiplier * atr)
    }

    fn close(&mut self, bar: &PriceBar, price: f64, reason: ExitReason) {
        let strategy = self.strategy;
        if let Some(result) =
            exit_position(&mut self.state, bar.date, price, reason, &strategy.params)
        {
            self.push_fill(result.fill);
            self.trades.push(result.trade);
        }
    }

    fn push_fill(&mut self, fill: Fill) {
        debug!(
            "{} {} {}: {} shares at {:.4} (cost {:.4})",
            fill.date, fill.kind, fill.reason, fill.shares, fill.price, fill.cost
        );
        self.fills.push(fill);
    }

    fn record(&mut self, index: usize, signal: Signal) {
        let bar = &self.bars[index];
        let indicators = self.indicators;
        let atr_period = self.strategy.params.atr_period;
        self.ledger.push(LedgerRow {
            date: bar.date,
            cash: self.state.cash,
            position: self.state.shares(),
            portfolio_value: self.state.value(bar.close),
            close: bar.close,
            signal,
            volatility: indicators.value(IndicatorType::Volatility(VOLATILITY_WINDOW), index),
            atr: indicators.value(IndicatorType::Atr(atr_period), index),
            rsi: indicators.value(IndicatorType::Rsi(RSI_PERIOD), index),
        });
    }
}

/// Compute indicators and decisions for `strategy` and simulate it over `bars`.
pub fn run_backtest(
    bars: &[PriceBar],
    strategy: &Strategy,
    config: &BacktestConfig,
) -> Result<BacktestResult, LevtraderError> {
    let range = strategy.simulation_range(bars.len());
    if range.is_empty() {
        return Err(LevtraderError::InsufficientData {
            strategy: strategy.name.clone(),
            bars: bars.len(),
            minimum: strategy.start_index() + strategy.lookahead(),
        });
    }

    info!(
        "Running strategy {} ({}) over bars {}..{}",
        strategy.name, strategy.kind, range.start, range.end
    );

    let indicators = compute_indicators(bars, &strategy.required_indicators());
    let decisions = generate_decisions(strategy, bars, &indicators);
    let result = Simulator::new(strategy, bars, &indicators, decisions, config.initial_cash).run();

    info!(
        "Strategy {} finished: {} fills, {} round trips, final value {:.2}",
        result.strategy_name,
        result.fills.len(),
        result.trades.len(),
        result.final_value()
    );
    Ok(result)
}
