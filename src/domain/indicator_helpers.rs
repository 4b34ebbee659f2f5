//! Indicator computation for a backtest run.

use std::collections::HashMap;

use crate::domain::indicator::atr::calculate_atr;
use crate::domain::indicator::momentum::calculate_momentum;
use crate::domain::indicator::rsi::calculate_rsi;
use crate::domain::indicator::sma::calculate_sma;
use crate::domain::indicator::volatility::calculate_volatility;
use crate::domain::indicator::{IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::PriceBar;

/// Derived indicators for one run, kept apart from the price series they were
/// computed from.
#[derive(Debug, Clone, Default)]
pub struct IndicatorSet {
    series: HashMap<IndicatorType, IndicatorSeries>,
}

impl IndicatorSet {
    pub fn insert(&mut self, series: IndicatorSeries) {
        self.series.insert(series.indicator_type, series);
    }

    pub fn series(&self, indicator: IndicatorType) -> Option<&IndicatorSeries> {
        self.series.get(&indicator)
    }

    /// Value of `indicator` at bar `index`; `None` if not computed or not yet defined.
    pub fn value(&self, indicator: IndicatorType, index: usize) -> Option<f64> {
        self.series.get(&indicator)?.value_at(index)
    }
}

pub fn calculate(bars: &[PriceBar], indicator: IndicatorType) -> IndicatorSeries {
    match indicator {
        IndicatorType::Sma(period) => calculate_sma(bars, period),
        IndicatorType::Volatility(period) => calculate_volatility(bars, period),
        IndicatorType::Momentum(period) => calculate_momentum(bars, period),
        IndicatorType::Atr(period) => calculate_atr(bars, period),
        IndicatorType::Rsi(period) => calculate_rsi(bars, period),
    }
}

/// Compute every requested indicator once, duplicates included only once.
pub fn compute_indicators(bars: &[PriceBar], indicators: &[IndicatorType]) -> IndicatorSet {
    let mut set = IndicatorSet::default();
    for &indicator in indicators {
        if set.series(indicator).is_none() {
            set.insert(calculate(bars, indicator));
        }
    }
    set
}
