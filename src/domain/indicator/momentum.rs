//! Momentum indicator.
//!
//! MOMENTUM(n)[i] = avg[i] / avg[i-n] - 1
//! If avg[i-n] == 0 the bar stays invalid.
//! Warmup: first n bars invalid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::PriceBar;
use crate::domain::stats::pct_change;

pub fn calculate_momentum(bars: &[PriceBar], period: usize) -> IndicatorSeries {
    let mut values = Vec::with_capacity(bars.len());

    for i in 0..bars.len() {
        let date = bars[i].date;
        let change = if period > 0 && i >= period {
            pct_change(bars[i - period].avg, bars[i].avg)
        } else {
            None
        };

        values.push(match change {
            Some(value) => IndicatorPoint {
                date,
                valid: true,
                value,
            },
            None => IndicatorPoint::warming_up(date),
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Momentum(period),
        values,
    }
}
