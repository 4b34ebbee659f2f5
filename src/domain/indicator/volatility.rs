//! Return volatility indicator.
//!
//! r[j] = avg[j] / avg[j-1] - 1 (undefined at j = 0)
//! VOLATILITY(n)[i] = sample stddev of r[i-n+1..=i]
//! Warmup: first n bars are invalid (n returns need n + 1 prices).

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::PriceBar;
use crate::domain::stats::{pct_change, sample_std};

pub fn calculate_volatility(bars: &[PriceBar], period: usize) -> IndicatorSeries {
    let returns: Vec<Option<f64>> = (0..bars.len())
        .map(|j| {
            if j == 0 {
                None
            } else {
                pct_change(bars[j - 1].avg, bars[j].avg)
            }
        })
        .collect();

    let mut values = Vec::with_capacity(bars.len());

    for i in 0..bars.len() {
        let date = bars[i].date;
        if period < 2 || i < period {
            values.push(IndicatorPoint::warming_up(date));
            continue;
        }

        let window: Option<Vec<f64>> = returns[i + 1 - period..=i].iter().copied().collect();
        match window.as_deref().and_then(sample_std) {
            Some(value) => values.push(IndicatorPoint {
                date,
                valid: true,
                value,
            }),
            None => values.push(IndicatorPoint::warming_up(date)),
        }
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Volatility(period),
        values,
    }
}
