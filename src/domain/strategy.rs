//! Strategy variants and their parameters.
//!
//! The three variants share one simulation loop; everything that differs
//! between them (indicator set, decision rule, sizing, stop policy, trade price)
//! is selected by [`StrategyKind`].

use std::fmt;
use std::str::FromStr;

use crate::domain::indicator::IndicatorType;

pub const MA_SHORT: usize = 2;
pub const MA_MEDIUM: usize = 7;
pub const MA_TREND: usize = 20;
pub const MA_LONG: usize = 50;
pub const VOLATILITY_WINDOW: usize = 20;
pub const MOMENTUM_PERIOD: usize = 5;
pub const MOMENTUM_LONG_PERIOD: usize = 20;
pub const RSI_PERIOD: usize = 14;

/// Bars of future data the threshold variant reads past the current one.
pub const THRESHOLD_LOOKAHEAD: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    /// Moving-average thresholds on future average prices. Look-ahead biased:
    /// bar i's decision reads bars i+1 and i+2, so it is a reference baseline
    /// rather than a tradable rule.
    Threshold,
    /// Fresh 2/7 crossover gated by trend, momentum and volatility, with fixed
    /// and trailing stops.
    Trend,
    /// Six-factor buy score with ATR stop and partial take-profit.
    Scored,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 3] = [
        StrategyKind::Threshold,
        StrategyKind::Trend,
        StrategyKind::Scored,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Threshold => "threshold",
            StrategyKind::Trend => "trend",
            StrategyKind::Scored => "scored",
        }
    }

    /// Run name used in reports when no strategy section is configured.
    pub fn default_name(&self) -> &'static str {
        match self {
            StrategyKind::Threshold => "basic",
            StrategyKind::Trend => "volatility-aware",
            StrategyKind::Scored => "scored",
        }
    }

    /// Whether decisions for a bar only use that bar and earlier ones.
    pub fn is_causal(&self) -> bool {
        !matches!(self, StrategyKind::Threshold)
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "threshold" | "basic" | "v1" => Ok(StrategyKind::Threshold),
            "trend" | "volatility" | "v2" => Ok(StrategyKind::Trend),
            "scored" | "score" | "v3" => Ok(StrategyKind::Scored),
            other => Err(format!(
                "unknown strategy kind '{other}' (expected threshold, trend or scored)"
            )),
        }
    }
}

/// Numeric parameters of one run. Fractions are plain ratios (0.05 = 5%).
/// A stop or take-profit parameter of zero disables that rule.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyParams {
    pub buy_threshold: f64,
    pub sell_threshold: f64,
    pub max_position: f64,
    pub stop_loss: f64,
    pub trailing_stop: f64,
    pub commission: f64,
    pub slippage: f64,
    pub vol_threshold: f64,
    pub partial_sell_ratio: f64,
    pub partial_sell_gain: f64,
    pub atr_period: usize,
    pub atr_multiplier: f64,
}

impl StrategyParams {
    pub fn defaults_for(kind: StrategyKind) -> Self {
        match kind {
            StrategyKind::Threshold => StrategyParams {
                buy_threshold: 0.0003,
                sell_threshold: -0.0002,
                max_position: 0.97,
                stop_loss: 0.0,
                trailing_stop: 0.0,
                commission: 0.0,
                slippage: 0.0,
                vol_threshold: 0.025,
                partial_sell_ratio: 0.0,
                partial_sell_gain: 0.0,
                atr_period: 14,
                atr_multiplier: 0.0,
            },
            StrategyKind::Trend => StrategyParams {
                buy_threshold: 0.005,
                sell_threshold: -0.008,
                max_position: 0.7,
                stop_loss: 0.05,
                trailing_stop: 0.08,
                commission: 0.0003,
                slippage: 0.0002,
                vol_threshold: 0.025,
                partial_sell_ratio: 0.0,
                partial_sell_gain: 0.0,
                atr_period: 14,
                atr_multiplier: 0.0,
            },
            StrategyKind::Scored => StrategyParams {
                buy_threshold: 0.005,
                sell_threshold: -0.008,
                max_position: 0.8,
                stop_loss: 0.07,
                trailing_stop: 0.10,
                commission: 0.0003,
                slippage: 0.0002,
                vol_threshold: 0.03,
                partial_sell_ratio: 0.4,
                partial_sell_gain: 0.03,
                atr_period: 14,
                atr_multiplier: 3.5,
            },
        }
    }

    /// Combined per-trade cost rate applied to notional.
    pub fn cost_rate(&self) -> f64 {
        self.commission + self.slippage
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Strategy {
    pub name: String,
    pub kind: StrategyKind,
    pub params: StrategyParams,
}

impl Strategy {
    pub fn new(name: impl Into<String>, kind: StrategyKind) -> Self {
        Strategy {
            name: name.into(),
            kind,
            params: StrategyParams::defaults_for(kind),
        }
    }

    /// The three reference variants with default parameters.
    pub fn defaults() -> Vec<Strategy> {
        StrategyKind::ALL
            .iter()
            .map(|&kind| Strategy::new(kind.default_name(), kind))
            .collect()
    }

    pub fn required_indicators(&self) -> Vec<IndicatorType> {
        match self.kind {
            StrategyKind::Threshold => vec![
                IndicatorType::Sma(MA_SHORT),
                IndicatorType::Sma(MA_MEDIUM),
            ],
            StrategyKind::Trend => vec![
                IndicatorType::Sma(MA_SHORT),
                IndicatorType::Sma(MA_MEDIUM),
                IndicatorType::Sma(MA_TREND),
                IndicatorType::Volatility(VOLATILITY_WINDOW),
                IndicatorType::Momentum(MOMENTUM_PERIOD),
            ],
            StrategyKind::Scored => vec![
                IndicatorType::Sma(MA_SHORT),
                IndicatorType::Sma(MA_MEDIUM),
                IndicatorType::Sma(MA_TREND),
                IndicatorType::Sma(MA_LONG),
                IndicatorType::Volatility(VOLATILITY_WINDOW),
                IndicatorType::Momentum(MOMENTUM_PERIOD),
                IndicatorType::Momentum(MOMENTUM_LONG_PERIOD),
                IndicatorType::Atr(self.params.atr_period),
                IndicatorType::Rsi(RSI_PERIOD),
            ],
        }
    }

    /// First bar the simulator processes.
    pub fn start_index(&self) -> usize {
        match self.kind {
            StrategyKind::Threshold => MA_MEDIUM,
            StrategyKind::Trend => MA_TREND,
            StrategyKind::Scored => MA_LONG.max(self.params.atr_period),
        }
    }

    /// Bars trimmed from the end of the series because decisions read ahead.
    pub fn lookahead(&self) -> usize {
        match self.kind {
            StrategyKind::Threshold => THRESHOLD_LOOKAHEAD,
            StrategyKind::Trend | StrategyKind::Scored => 0,
        }
    }

    /// Half-open range of bar indices simulated over a series of `len` bars.
    pub fn simulation_range(&self, len: usize) -> std::ops::Range<usize> {
        let start = self.start_index();
        let end = len.saturating_sub(self.lookahead());
        start..end.max(start)
    }
}
