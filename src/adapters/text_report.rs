//! Plain-text performance report printed to stdout.

use std::fmt::Write;

use crate::domain::backtest::BacktestResult;
use crate::domain::metrics::Metrics;

fn pct(value: f64) -> String {
    format!("{:.2}%", value * 100.0)
}

fn opt_pct(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), pct)
}

pub fn format_report(result: &BacktestResult, metrics: &Metrics) -> String {
    let mut out = String::new();
    let period = match (metrics.start_date, metrics.end_date) {
        (Some(start), Some(end)) => format!("{} to {}", start, end),
        _ => "n/a".to_string(),
    };

    let _ = writeln!(out, "=== {} ({}) ===", result.strategy_name, result.kind);
    if !result.kind.is_causal() {
        let _ = writeln!(out, "note: decisions read future prices; reference only");
    }
    let _ = writeln!(out, "Period:            {}", period);
    let _ = writeln!(out, "Initial value:     {:.2}", metrics.initial_value);
    let _ = writeln!(out, "Final value:       {:.2}", metrics.final_value);
    let _ = writeln!(out, "Total return:      {}", pct(metrics.total_return));
    let _ = writeln!(out, "Annualized return: {}", pct(metrics.annualized_return));
    let _ = writeln!(out, "Sharpe ratio:      {:.2}", metrics.sharpe_ratio);
    let _ = writeln!(out, "Sortino ratio:     {:.2}", metrics.sortino_ratio);
    let _ = writeln!(
        out,
        "Max drawdown:      {} ({} bars)",
        pct(metrics.max_drawdown),
        metrics.max_drawdown_duration
    );
    let _ = writeln!(out, "Daily win rate:    {}", pct(metrics.win_rate));
    let _ = writeln!(
        out,
        "Signals:           {} buy / {} sell",
        metrics.buy_signals, metrics.sell_signals
    );
    let _ = writeln!(
        out,
        "Trades:            {} fills, {} won / {} lost, profit factor {:.2}, avg {:.1} days",
        metrics.fill_count,
        metrics.trades_won,
        metrics.trades_lost,
        metrics.profit_factor,
        metrics.avg_trade_duration
    );
    let _ = writeln!(
        out,
        "Monthly returns:   best {}, worst {}, mean {}, std {}",
        opt_pct(metrics.monthly.best),
        opt_pct(metrics.monthly.worst),
        opt_pct(metrics.monthly.mean),
        opt_pct(metrics.monthly.std)
    );
    out
}

/// One line per run, for a quick side-by-side view.
pub fn format_comparison(runs: &[(&BacktestResult, &Metrics)]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<16} {:>12} {:>10} {:>8} {:>10} {:>7}",
        "strategy", "final value", "return", "sharpe", "drawdown", "trades"
    );
    for (result, metrics) in runs {
        let _ = writeln!(
            out,
            "{:<16} {:>12.2} {:>10} {:>8.2} {:>10} {:>7}",
            result.strategy_name,
            metrics.final_value,
            pct(metrics.total_return),
            metrics.sharpe_ratio,
            pct(metrics.max_drawdown),
            result.trades.len()
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::portfolio::LedgerRow;
    use crate::domain::signal::Signal;
    use crate::domain::strategy::StrategyKind;
    use chrono::NaiveDate;

    fn sample_result(kind: StrategyKind) -> BacktestResult {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let ledger = [1000.0, 1100.0]
            .iter()
            .enumerate()
            .map(|(i, &v)| LedgerRow {
                date: start + chrono::Duration::days(i as i64),
                cash: v,
                position: 0,
                portfolio_value: v,
                close: 10.0,
                signal: Signal::Hold,
                volatility: None,
                atr: None,
                rsi: None,
            })
            .collect();
        BacktestResult {
            strategy_name: kind.as_str().to_string(),
            kind,
            initial_cash: 1000.0,
            ledger,
            fills: Vec::new(),
            trades: Vec::new(),
        }
    }

    #[test]
    fn report_contains_headline_numbers() {
        let result = sample_result(StrategyKind::Trend);
        let metrics = Metrics::compute(&result, 0.02);
        let text = format_report(&result, &metrics);

        assert!(text.contains("=== trend (trend) ==="));
        assert!(text.contains("2024-01-01 to 2024-01-02"));
        assert!(text.contains("Final value:       1100.00"));
        assert!(text.contains("Total return:      10.00%"));
        assert!(text.contains("best n/a"));
        assert!(!text.contains("reference only"));
    }

    #[test]
    fn non_causal_variant_is_flagged() {
        let result = sample_result(StrategyKind::Threshold);
        let metrics = Metrics::compute(&result, 0.02);
        assert!(format_report(&result, &metrics).contains("reference only"));
    }

    #[test]
    fn comparison_has_header_and_rows() {
        let a = sample_result(StrategyKind::Trend);
        let b = sample_result(StrategyKind::Scored);
        let ma = Metrics::compute(&a, 0.02);
        let mb = Metrics::compute(&b, 0.02);
        let text = format_comparison(&[(&a, &ma), (&b, &mb)]);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("strategy"));
        assert!(lines[2].starts_with("scored"));
    }
}
