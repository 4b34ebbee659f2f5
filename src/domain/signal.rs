//! Per-bar trading decisions.
//!
//! Each variant turns the indicator set into a [`Decision`] for bar `i`. Rules
//! are written as `Option` chains: any indicator that is still warming up (or
//! any bar that does not exist) makes the whole decision Hold.

use std::fmt;

use crate::domain::indicator::IndicatorType;
use crate::domain::indicator_helpers::IndicatorSet;
use crate::domain::ohlcv::PriceBar;
use crate::domain::strategy::{
    MA_LONG, MA_MEDIUM, MA_SHORT, MA_TREND, MOMENTUM_LONG_PERIOD, MOMENTUM_PERIOD, RSI_PERIOD,
    Strategy, StrategyKind, StrategyParams, VOLATILITY_WINDOW,
};

pub const BUY_SCORE_THRESHOLD: u8 = 4;
pub const MAX_BUY_SCORE: u8 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Signal {
    Buy,
    Sell,
    #[default]
    Hold,
}

impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::Buy => "buy",
            Signal::Sell => "sell",
            Signal::Hold => "hold",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Buy and sell conditions for one bar. Both can hold at once; the simulator
/// only acts on `buy` when flat and on `sell` when long.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Decision {
    pub buy: bool,
    pub sell: bool,
}

impl Decision {
    pub const HOLD: Decision = Decision {
        buy: false,
        sell: false,
    };
    pub const BUY: Decision = Decision {
        buy: true,
        sell: false,
    };
    pub const SELL: Decision = Decision {
        buy: false,
        sell: true,
    };

    /// Label recorded in the ledger; buy takes precedence.
    pub fn signal(&self) -> Signal {
        if self.buy {
            Signal::Buy
        } else if self.sell {
            Signal::Sell
        } else {
            Signal::Hold
        }
    }
}

/// Fresh crossover of the short average over the medium one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crossover {
    pub bullish: bool,
    pub bearish: bool,
}

/// The six binary conditions of the scored variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreCard {
    pub fresh_bullish: bool,
    pub trend_up: bool,
    pub long_trend_up: bool,
    pub rsi_in_band: bool,
    pub volatility_ok: bool,
    pub momentum_ok: bool,
}

impl ScoreCard {
    pub fn score(&self) -> u8 {
        [
            self.fresh_bullish,
            self.trend_up,
            self.long_trend_up,
            self.rsi_in_band,
            self.volatility_ok,
            self.momentum_ok,
        ]
        .iter()
        .filter(|&&c| c)
        .count() as u8
    }

    pub fn is_buy(&self) -> bool {
        self.score() >= BUY_SCORE_THRESHOLD
    }
}

/// Decisions for every bar of the series.
pub fn generate_decisions(
    strategy: &Strategy,
    bars: &[PriceBar],
    indicators: &IndicatorSet,
) -> Vec<Decision> {
    (0..bars.len())
        .map(|i| decide(strategy, bars, indicators, i))
        .collect()
}

pub fn decide(
    strategy: &Strategy,
    bars: &[PriceBar],
    indicators: &IndicatorSet,
    index: usize,
) -> Decision {
    let params = &strategy.params;
    let decision = match strategy.kind {
        StrategyKind::Threshold => threshold_decision(params, bars, indicators, index),
        StrategyKind::Trend => trend_decision(params, indicators, index),
        StrategyKind::Scored => scored_decision(params, indicators, index),
    };
    decision.unwrap_or_default()
}

/// Short-over-medium state at bar `index`.
fn cross_state(indicators: &IndicatorSet, index: usize) -> Option<bool> {
    let short = indicators.value(IndicatorType::Sma(MA_SHORT), index)?;
    let medium = indicators.value(IndicatorType::Sma(MA_MEDIUM), index)?;
    Some(short > medium)
}

/// Whether the cross state changed between `index - 1` and `index`.
pub fn crossover(indicators: &IndicatorSet, index: usize) -> Option<Crossover> {
    let prev = cross_state(indicators, index.checked_sub(1)?)?;
    let curr = cross_state(indicators, index)?;
    Some(Crossover {
        bullish: curr && !prev,
        bearish: !curr && prev,
    })
}

/// Look-ahead rule: reads the average price of the next two bars.
fn threshold_decision(
    params: &StrategyParams,
    bars: &[PriceBar],
    indicators: &IndicatorSet,
    index: usize,
) -> Option<Decision> {
    let avg_next = bars.get(index + 1)?.avg;
    let avg_after = bars.get(index + 2)?.avg;
    let short = indicators.value(IndicatorType::Sma(MA_SHORT), index)?;
    let medium = indicators.value(IndicatorType::Sma(MA_MEDIUM), index)?;
    let medium_next = indicators.value(IndicatorType::Sma(MA_MEDIUM), index + 1)?;

    let buy = avg_next - short > params.buy_threshold
        && avg_after / medium_next - 1.0 >= params.sell_threshold;
    let sell = avg_next / medium - 1.0 < params.sell_threshold;

    Some(Decision { buy, sell })
}

fn trend_decision(
    params: &StrategyParams,
    indicators: &IndicatorSet,
    index: usize,
) -> Option<Decision> {
    let cross = crossover(indicators, index)?;
    let medium = indicators.value(IndicatorType::Sma(MA_MEDIUM), index)?;
    let trend = indicators.value(IndicatorType::Sma(MA_TREND), index)?;
    let volatility = indicators.value(IndicatorType::Volatility(VOLATILITY_WINDOW), index)?;
    let momentum = indicators.value(IndicatorType::Momentum(MOMENTUM_PERIOD), index)?;

    let trend_up = medium > trend;
    let buy = cross.bullish
        && (trend_up || momentum > 0.01)
        && volatility < params.vol_threshold * 1.2;
    let sell = cross.bearish && (!trend_up || volatility > params.vol_threshold * 2.0);

    Some(Decision { buy, sell })
}

/// Score the six buy conditions at bar `index`.
pub fn score_card(
    params: &StrategyParams,
    indicators: &IndicatorSet,
    index: usize,
) -> Option<ScoreCard> {
    let cross = crossover(indicators, index)?;
    let medium = indicators.value(IndicatorType::Sma(MA_MEDIUM), index)?;
    let trend = indicators.value(IndicatorType::Sma(MA_TREND), index)?;
    let long = indicators.value(IndicatorType::Sma(MA_LONG), index)?;
    let rsi = indicators.value(IndicatorType::Rsi(RSI_PERIOD), index)?;
    let volatility = indicators.value(IndicatorType::Volatility(VOLATILITY_WINDOW), index)?;
    let momentum = indicators.value(IndicatorType::Momentum(MOMENTUM_PERIOD), index)?;
    let momentum_long = indicators.value(IndicatorType::Momentum(MOMENTUM_LONG_PERIOD), index)?;

    Some(ScoreCard {
        fresh_bullish: cross.bullish,
        trend_up: medium > trend,
        long_trend_up: trend > long,
        rsi_in_band: (45.0..=75.0).contains(&rsi),
        volatility_ok: volatility < params.vol_threshold * 1.2,
        momentum_ok: momentum > -0.01 && momentum_long > 0.0,
    })
}

fn scored_decision(
    params: &StrategyParams,
    indicators: &IndicatorSet,
    index: usize,
) -> Option<Decision> {
    let card = score_card(params, indicators, index)?;
    let cross = crossover(indicators, index)?;
    let rsi = indicators.value(IndicatorType::Rsi(RSI_PERIOD), index)?;
    let volatility = indicators.value(IndicatorType::Volatility(VOLATILITY_WINDOW), index)?;
    let momentum = indicators.value(IndicatorType::Momentum(MOMENTUM_PERIOD), index)?;

    let rsi_extreme = !(35.0..=85.0).contains(&rsi);
    let stressed = volatility > params.vol_threshold * 2.5 && momentum < 0.0;
    let sell = cross.bearish && (rsi_extreme || stressed);

    Some(Decision {
        buy: card.is_buy(),
        sell,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::{IndicatorPoint, IndicatorSeries};
    use chrono::NaiveDate;

    fn date(i: usize) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(i as i64)
    }

    /// Indicator series from raw values; NaN marks a warm-up bar.
    fn series(indicator: IndicatorType, values: &[f64]) -> IndicatorSeries {
        IndicatorSeries {
            indicator_type: indicator,
            values: values
                .iter()
                .enumerate()
                .map(|(i, &v)| IndicatorPoint {
                    date: date(i),
                    valid: !v.is_nan(),
                    value: if v.is_nan() { 0.0 } else { v },
                })
                .collect(),
        }
    }

    fn flat_bars(avgs: &[f64]) -> Vec<PriceBar> {
        avgs.iter()
            .enumerate()
            .map(|(i, &avg)| PriceBar {
                date: date(i),
                open: avg,
                high: avg,
                low: avg,
                close: avg,
                avg,
                volume: None,
            })
            .collect()
    }

    /// Two-bar indicator set for the causal variants: bar 0 is "yesterday".
    struct Bars2 {
        short: [f64; 2],
        medium: [f64; 2],
        trend: [f64; 2],
        long: [f64; 2],
        volatility: f64,
        momentum: f64,
        momentum_long: f64,
        rsi: f64,
    }

    impl Default for Bars2 {
        fn default() -> Self {
            Bars2 {
                // fresh bullish crossover at bar 1
                short: [9.0, 11.0],
                medium: [10.0, 10.0],
                trend: [9.0, 9.0],
                long: [8.0, 8.0],
                volatility: 0.01,
                momentum: 0.02,
                momentum_long: 0.05,
                rsi: 60.0,
            }
        }
    }

    impl Bars2 {
        fn build(&self) -> IndicatorSet {
            let mut set = IndicatorSet::default();
            set.insert(series(IndicatorType::Sma(MA_SHORT), &self.short));
            set.insert(series(IndicatorType::Sma(MA_MEDIUM), &self.medium));
            set.insert(series(IndicatorType::Sma(MA_TREND), &self.trend));
            set.insert(series(IndicatorType::Sma(MA_LONG), &self.long));
            set.insert(series(
                IndicatorType::Volatility(VOLATILITY_WINDOW),
                &[f64::NAN, self.volatility],
            ));
            set.insert(series(
                IndicatorType::Momentum(MOMENTUM_PERIOD),
                &[f64::NAN, self.momentum],
            ));
            set.insert(series(
                IndicatorType::Momentum(MOMENTUM_LONG_PERIOD),
                &[f64::NAN, self.momentum_long],
            ));
            set.insert(series(IndicatorType::Rsi(RSI_PERIOD), &[f64::NAN, self.rsi]));
            set
        }
    }

    fn trend_params() -> StrategyParams {
        StrategyParams::defaults_for(StrategyKind::Trend)
    }

    fn scored_params() -> StrategyParams {
        StrategyParams::defaults_for(StrategyKind::Scored)
    }

    #[test]
    fn signal_display() {
        assert_eq!(Signal::Buy.to_string(), "buy");
        assert_eq!(Signal::Sell.to_string(), "sell");
        assert_eq!(Signal::Hold.to_string(), "hold");
    }

    #[test]
    fn decision_label_prefers_buy() {
        let both = Decision {
            buy: true,
            sell: true,
        };
        assert_eq!(both.signal(), Signal::Buy);
        assert_eq!(Decision::SELL.signal(), Signal::Sell);
        assert_eq!(Decision::HOLD.signal(), Signal::Hold);
    }

    #[test]
    fn crossover_needs_previous_bar() {
        let set = Bars2::default().build();
        assert_eq!(crossover(&set, 0), None);
        assert_eq!(
            crossover(&set, 1),
            Some(Crossover {
                bullish: true,
                bearish: false
            })
        );
    }

    #[test]
    fn crossover_not_fresh_when_state_unchanged() {
        let set = Bars2 {
            short: [11.0, 12.0],
            ..Default::default()
        }
        .build();
        let cross = crossover(&set, 1).unwrap();
        assert!(!cross.bullish);
        assert!(!cross.bearish);
    }

    #[test]
    fn crossover_bearish() {
        let set = Bars2 {
            short: [11.0, 9.0],
            ..Default::default()
        }
        .build();
        let cross = crossover(&set, 1).unwrap();
        assert!(cross.bearish);
        assert!(!cross.bullish);
    }

    #[test]
    fn trend_buys_on_fresh_cross_in_uptrend() {
        let set = Bars2::default().build();
        assert_eq!(trend_decision(&trend_params(), &set, 1), Some(Decision::BUY));
    }

    #[test]
    fn trend_buy_accepts_strong_momentum_without_trend() {
        let set = Bars2 {
            trend: [11.0, 11.0],
            momentum: 0.02,
            ..Default::default()
        }
        .build();
        assert!(trend_decision(&trend_params(), &set, 1).unwrap().buy);

        let weak = Bars2 {
            trend: [11.0, 11.0],
            momentum: 0.005,
            ..Default::default()
        }
        .build();
        assert!(!trend_decision(&trend_params(), &weak, 1).unwrap().buy);
    }

    #[test]
    fn trend_buy_blocked_by_high_volatility() {
        // threshold 0.025 * 1.2 = 0.03
        let set = Bars2 {
            volatility: 0.031,
            ..Default::default()
        }
        .build();
        assert!(!trend_decision(&trend_params(), &set, 1).unwrap().buy);
    }

    #[test]
    fn trend_sells_on_fresh_bearish_cross_in_downtrend() {
        let set = Bars2 {
            short: [11.0, 9.0],
            trend: [11.0, 11.0],
            ..Default::default()
        }
        .build();
        assert_eq!(trend_decision(&trend_params(), &set, 1), Some(Decision::SELL));
    }

    #[test]
    fn trend_bearish_cross_in_uptrend_needs_extreme_volatility() {
        let calm = Bars2 {
            short: [11.0, 9.0],
            ..Default::default()
        }
        .build();
        assert!(!trend_decision(&trend_params(), &calm, 1).unwrap().sell);

        let wild = Bars2 {
            short: [11.0, 9.0],
            volatility: 0.06,
            ..Default::default()
        }
        .build();
        assert!(trend_decision(&trend_params(), &wild, 1).unwrap().sell);
    }

    #[test]
    fn warmup_forces_hold() {
        let strategy = Strategy::new("trend", StrategyKind::Trend);
        let set = Bars2::default().build();
        let bars = flat_bars(&[10.0, 10.0]);
        // bar 0 has undefined volatility and no previous bar
        assert_eq!(decide(&strategy, &bars, &set, 0), Decision::HOLD);
        assert_eq!(decide(&strategy, &bars, &set, 5), Decision::HOLD);
    }

    #[test]
    fn missing_indicator_forces_hold() {
        let strategy = Strategy::new("scored", StrategyKind::Scored);
        let bars = flat_bars(&[10.0, 10.0]);
        assert_eq!(
            decide(&strategy, &bars, &IndicatorSet::default(), 1),
            Decision::HOLD
        );
    }

    #[test]
    fn score_card_all_conditions() {
        let set = Bars2::default().build();
        let card = score_card(&scored_params(), &set, 1).unwrap();
        assert_eq!(card.score(), MAX_BUY_SCORE);
        assert!(card.is_buy());
    }

    #[test]
    fn score_of_exactly_four_buys() {
        // no fresh cross, RSI outside the band → 4 of 6
        let set = Bars2 {
            short: [11.0, 12.0],
            rsi: 80.0,
            ..Default::default()
        }
        .build();
        let card = score_card(&scored_params(), &set, 1).unwrap();
        assert_eq!(card.score(), 4);
        assert!(card.is_buy());
        assert!(scored_decision(&scored_params(), &set, 1).unwrap().buy);
    }

    #[test]
    fn score_of_three_does_not_buy() {
        let set = Bars2 {
            short: [11.0, 12.0],
            rsi: 80.0,
            volatility: 0.05,
            ..Default::default()
        }
        .build();
        let card = score_card(&scored_params(), &set, 1).unwrap();
        assert_eq!(card.score(), 3);
        assert!(!scored_decision(&scored_params(), &set, 1).unwrap().buy);
    }

    #[test]
    fn rsi_band_is_inclusive() {
        for rsi in [45.0, 75.0] {
            let set = Bars2 {
                rsi,
                ..Default::default()
            }
            .build();
            assert!(score_card(&scored_params(), &set, 1).unwrap().rsi_in_band);
        }
        let set = Bars2 {
            rsi: 44.9,
            ..Default::default()
        }
        .build();
        assert!(!score_card(&scored_params(), &set, 1).unwrap().rsi_in_band);
    }

    #[test]
    fn momentum_condition_needs_both_lookbacks() {
        let set = Bars2 {
            momentum: -0.005,
            momentum_long: -0.01,
            ..Default::default()
        }
        .build();
        assert!(!score_card(&scored_params(), &set, 1).unwrap().momentum_ok);
    }

    #[test]
    fn scored_sells_on_bearish_cross_with_extreme_rsi() {
        let set = Bars2 {
            short: [11.0, 9.0],
            rsi: 30.0,
            ..Default::default()
        }
        .build();
        assert!(scored_decision(&scored_params(), &set, 1).unwrap().sell);
    }

    #[test]
    fn scored_sells_on_bearish_cross_in_stressed_market() {
        let set = Bars2 {
            short: [11.0, 9.0],
            rsi: 50.0,
            volatility: 0.08,
            momentum: -0.02,
            ..Default::default()
        }
        .build();
        assert!(scored_decision(&scored_params(), &set, 1).unwrap().sell);
    }

    #[test]
    fn scored_holds_bearish_cross_with_neutral_rsi() {
        let set = Bars2 {
            short: [11.0, 9.0],
            rsi: 50.0,
            ..Default::default()
        }
        .build();
        assert!(!scored_decision(&scored_params(), &set, 1).unwrap().sell);
    }

    fn threshold_set(short: &[f64], medium: &[f64]) -> IndicatorSet {
        let mut set = IndicatorSet::default();
        set.insert(series(IndicatorType::Sma(MA_SHORT), short));
        set.insert(series(IndicatorType::Sma(MA_MEDIUM), medium));
        set
    }

    #[test]
    fn threshold_reads_future_average_prices() {
        let params = StrategyParams::defaults_for(StrategyKind::Threshold);
        let set = threshold_set(&[10.0, 10.0, 10.0], &[10.0, 10.0, 10.0]);

        // tomorrow's average well above today's short MA → buy
        let bars = flat_bars(&[10.0, 10.5, 10.5]);
        let decision = threshold_decision(&params, &bars, &set, 0).unwrap();
        assert!(decision.buy);
        assert!(!decision.sell);

        // same indicators, only the future bar changes → sell
        let bars = flat_bars(&[10.0, 9.5, 9.5]);
        let decision = threshold_decision(&params, &bars, &set, 0).unwrap();
        assert!(!decision.buy);
        assert!(decision.sell);
    }

    #[test]
    fn threshold_holds_without_two_future_bars() {
        let params = StrategyParams::defaults_for(StrategyKind::Threshold);
        let set = threshold_set(&[10.0, 10.0, 10.0], &[10.0, 10.0, 10.0]);
        let bars = flat_bars(&[10.0, 11.0, 11.0]);
        assert_eq!(threshold_decision(&params, &bars, &set, 1), None);
        assert_eq!(threshold_decision(&params, &bars, &set, 2), None);
    }

    #[test]
    fn threshold_buy_and_sell_can_coincide() {
        let params = StrategyParams::defaults_for(StrategyKind::Threshold);
        // next avg 9.0 is above short MA 8.0 but below medium MA 10.0
        let set = threshold_set(&[8.0, 8.0, 8.0], &[10.0, 9.0, 9.0]);
        let bars = flat_bars(&[8.0, 9.0, 9.0]);
        let decision = threshold_decision(&params, &bars, &set, 0).unwrap();
        assert!(decision.buy);
        assert!(decision.sell);
        assert_eq!(decision.signal(), Signal::Buy);
    }

    #[test]
    fn generate_decisions_covers_every_bar() {
        let strategy = Strategy::new("basic", StrategyKind::Threshold);
        let bars = flat_bars(&[10.0; 12]);
        let set = crate::domain::indicator_helpers::compute_indicators(
            &bars,
            &strategy.required_indicators(),
        );
        let decisions = generate_decisions(&strategy, &bars, &set);
        assert_eq!(decisions.len(), 12);
        assert!(decisions.iter().all(|d| *d == Decision::HOLD));
    }
}
