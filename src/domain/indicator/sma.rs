//! Simple moving average of the bar's average price.
//!
//! SMA(n)[i] = sum(avg[i-j] for j in 0..n) / n
//! Warmup: first (n-1) bars are invalid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::PriceBar;

pub fn calculate_sma(bars: &[PriceBar], period: usize) -> IndicatorSeries {
    let mut values = Vec::with_capacity(bars.len());

    for i in 0..bars.len() {
        let date = bars[i].date;
        if period == 0 || i + 1 < period {
            values.push(IndicatorPoint::warming_up(date));
            continue;
        }

        let window = &bars[i + 1 - period..=i];
        let value = window.iter().map(|b| b.avg).sum::<f64>() / period as f64;

        values.push(IndicatorPoint {
            date,
            valid: true,
            value,
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Sma(period),
        values,
    }
}
