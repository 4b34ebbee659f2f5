//! RSI (Relative Strength Index) indicator implementation.
//!
//! Uses simple rolling means of gains and losses over the closing price:
//! - change[i] = C[i] - C[i-1] (the first bar counts as no change)
//! - avg_gain / avg_loss = mean of max(change, 0) / max(-change, 0) over n bars
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! A zero avg_loss is clamped to `LOSS_EPSILON`, so a flat window reads 0 and a
//! window of pure gains reads just under 100.
//!
//! Warmup: first (n-1) bars are invalid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::PriceBar;

pub const LOSS_EPSILON: f64 = 1e-10;

pub fn calculate_rsi(bars: &[PriceBar], period: usize) -> IndicatorSeries {
    let mut gains: Vec<f64> = Vec::with_capacity(bars.len());
    let mut losses: Vec<f64> = Vec::with_capacity(bars.len());

    for i in 0..bars.len() {
        let change = if i == 0 {
            0.0
        } else {
            bars[i].close - bars[i - 1].close
        };
        gains.push(change.max(0.0));
        losses.push((-change).max(0.0));
    }

    let mut values = Vec::with_capacity(bars.len());

    for (i, bar) in bars.iter().enumerate() {
        if period == 0 || i + 1 < period {
            values.push(IndicatorPoint::warming_up(bar.date));
            continue;
        }

        let start = i + 1 - period;
        let avg_gain = gains[start..=i].iter().sum::<f64>() / period as f64;
        let mut avg_loss = losses[start..=i].iter().sum::<f64>() / period as f64;
        if avg_loss == 0.0 {
            avg_loss = LOSS_EPSILON;
        }

        let rs = avg_gain / avg_loss;
        values.push(IndicatorPoint {
            date: bar.date,
            valid: true,
            value: 100.0 - 100.0 / (1.0 + rs),
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Rsi(period),
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn make_bar(date: &str, close: f64) -> PriceBar {
        PriceBar {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            open: close,
            high: close,
            low: close,
            close,
            avg: close,
            volume: Some(1000),
        }
    }

    fn closes(prices: &[f64]) -> Vec<PriceBar> {
        prices
            .iter()
            .enumerate()
            .map(|(i, &p)| make_bar(&format!("2024-01-{:02}", i + 1), p))
            .collect()
    }

    #[test]
    fn rsi_empty_bars() {
        let bars: Vec<PriceBar> = vec![];
        let series = calculate_rsi(&bars, 14);
        assert_eq!(series.values.len(), 0);
    }

    #[test]
    fn rsi_single_bar() {
        let bars = vec![make_bar("2024-01-01", 100.0)];
        let series = calculate_rsi(&bars, 14);
        assert_eq!(series.values.len(), 1);
        assert!(!series.values[0].valid);
    }

    #[test]
    fn rsi_warmup_period() {
        let bars: Vec<PriceBar> = (1..=15)
            .map(|i| {
                let date = format!("2024-01-{:02}", i);
                make_bar(&date, 100.0 + (i as f64 % 5.0) * 2.0)
            })
            .collect();

        let series = calculate_rsi(&bars, 14);

        assert_eq!(series.values.len(), 15);

        for i in 0..13 {
            assert!(!series.values[i].valid, "Bar {} should be invalid", i);
        }
        assert!(series.values[13].valid, "Bar 13 should be valid");
        assert!(series.values[14].valid, "Bar 14 should be valid");
    }

    #[test]
    fn rsi_all_gains_no_losses() {
        let prices: Vec<f64> = (0..15).map(|i| 100.0 + i as f64).collect();
        let series = calculate_rsi(&closes(&prices), 14);

        let rsi = series.value_at(14).unwrap();
        assert!(rsi < 100.0);
        assert!((rsi - 100.0).abs() < 1e-6, "RSI should be ~100 when all gains");
    }

    #[test]
    fn rsi_all_losses_no_gains() {
        let prices: Vec<f64> = (0..15).map(|i| 100.0 - i as f64).collect();
        let series = calculate_rsi(&closes(&prices), 14);

        let rsi = series.value_at(14).unwrap();
        assert!(rsi.abs() < f64::EPSILON, "RSI should be 0 when all losses");
    }

    #[test]
    fn rsi_flat_prices_do_not_divide_by_zero() {
        let series = calculate_rsi(&closes(&[50.0; 20]), 14);
        let rsi = series.value_at(19).unwrap();
        assert!(rsi.is_finite());
        assert!(rsi.abs() < f64::EPSILON);
    }

    #[test]
    fn rsi_known_calculation() {
        // changes: +2, -1, +2, -1 → avg gain 1.0, avg loss 0.5 → RS 2
        let series = calculate_rsi(&closes(&[10.0, 12.0, 11.0, 13.0, 12.0]), 4);
        let rsi = series.value_at(4).unwrap();
        let expected = 100.0 - 100.0 / 3.0;
        assert!((rsi - expected).abs() < 1e-9);
    }

    #[test]
    fn rsi_in_range() {
        let bars: Vec<PriceBar> = (1..=20)
            .map(|i| {
                let date = format!("2024-01-{:02}", i);
                let close = 100.0 + (i as f64 % 7.0 - 3.0) * 2.0;
                make_bar(&date, close)
            })
            .collect();

        let series = calculate_rsi(&bars, 14);

        for point in series.values.iter().filter(|p| p.valid) {
            assert!(
                point.value >= 0.0 && point.value <= 100.0,
                "RSI {} out of range",
                point.value
            );
        }
    }

    #[test]
    fn rsi_indicator_type() {
        let bars = vec![make_bar("2024-01-01", 100.0)];
        let series = calculate_rsi(&bars, 14);
        assert_eq!(series.indicator_type, IndicatorType::Rsi(14));
    }

    #[test]
    fn rsi_zero_period() {
        let bars = vec![make_bar("2024-01-01", 100.0), make_bar("2024-01-02", 101.0)];
        let series = calculate_rsi(&bars, 0);
        assert_eq!(series.values.len(), 2);
        for point in &series.values {
            assert!(!point.valid);
        }
    }
}
