//! Average True Range.
//!
//! TR[0] = high - low (no previous close), TR[i] = PriceBar::true_range(C[i-1]).
//! ATR(n)[i] = simple mean of TR[i-n+1..=i].
//! Warmup: first (n-1) bars are invalid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::PriceBar;

pub fn calculate_atr(bars: &[PriceBar], period: usize) -> IndicatorSeries {
    let tr_values: Vec<f64> = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            if i == 0 {
                bar.high - bar.low
            } else {
                bar.true_range(bars[i - 1].close)
            }
        })
        .collect();

    let mut values: Vec<IndicatorPoint> = Vec::with_capacity(bars.len());

    for (i, bar) in bars.iter().enumerate() {
        if period == 0 || i + 1 < period {
            values.push(IndicatorPoint::warming_up(bar.date));
            continue;
        }

        let window = &tr_values[i + 1 - period..=i];
        values.push(IndicatorPoint {
            date: bar.date,
            valid: true,
            value: window.iter().sum::<f64>() / period as f64,
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Atr(period),
        values,
    }
}
