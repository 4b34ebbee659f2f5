//! Configuration validation.
//!
//! Validates the `[backtest]` section and every `[strategy.<name>]` section
//! before any data is loaded.

use crate::domain::error::LevtraderError;
use crate::domain::strategy::{StrategyKind, StrategyParams};
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub const BACKTEST_SECTION: &str = "backtest";
pub const STRATEGY_SECTION_PREFIX: &str = "strategy.";

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), LevtraderError> {
    validate_backtest_config(config)?;
    for section in strategy_sections(config) {
        validate_strategy_config(config, &section)?;
    }
    Ok(())
}

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), LevtraderError> {
    validate_initial_cash(config)?;
    validate_risk_free_rate(config)?;
    validate_dates(config)?;
    Ok(())
}

/// `[strategy.<name>]` sections, sorted by name.
pub fn strategy_sections(config: &dyn ConfigPort) -> Vec<String> {
    let mut sections: Vec<String> = config
        .sections()
        .into_iter()
        .filter(|s| {
            s.strip_prefix(STRATEGY_SECTION_PREFIX)
                .is_some_and(|name| !name.trim().is_empty())
        })
        .collect();
    sections.sort();
    sections
}

pub fn strategy_name(section: &str) -> &str {
    section
        .strip_prefix(STRATEGY_SECTION_PREFIX)
        .unwrap_or(section)
        .trim()
}

pub fn validate_strategy_config(config: &dyn ConfigPort, section: &str) -> Result<(), LevtraderError> {
    let kind = parse_kind(config, section)?;
    let defaults = StrategyParams::defaults_for(kind);

    let max_position = read_double(config, section, "max_position", defaults.max_position)?;
    if max_position <= 0.0 || max_position > 1.0 {
        return Err(invalid(section, "max_position", "max_position must be in (0, 1]"));
    }

    for (key, default) in [
        ("stop_loss", defaults.stop_loss),
        ("trailing_stop", defaults.trailing_stop),
    ] {
        let value = read_double(config, section, key, default)?;
        if !(0.0..1.0).contains(&value) {
            return Err(invalid(section, key, &format!("{key} must be in [0, 1)")));
        }
    }

    for (key, default) in [
        ("commission", defaults.commission),
        ("slippage", defaults.slippage),
        ("partial_sell_gain", defaults.partial_sell_gain),
        ("atr_multiplier", defaults.atr_multiplier),
    ] {
        let value = read_double(config, section, key, default)?;
        if value < 0.0 {
            return Err(invalid(section, key, &format!("{key} must be non-negative")));
        }
    }

    // exit proceeds are shares * price * (1 - rate)
    let commission = read_double(config, section, "commission", defaults.commission)?;
    let slippage = read_double(config, section, "slippage", defaults.slippage)?;
    if commission + slippage >= 1.0 {
        return Err(invalid(
            section,
            "commission",
            "commission + slippage must be below 1",
        ));
    }

    let vol_threshold = read_double(config, section, "vol_threshold", defaults.vol_threshold)?;
    if vol_threshold <= 0.0 {
        return Err(invalid(section, "vol_threshold", "vol_threshold must be positive"));
    }

    let ratio = read_double(
        config,
        section,
        "partial_sell_ratio",
        defaults.partial_sell_ratio,
    )?;
    if !(0.0..=1.0).contains(&ratio) {
        return Err(invalid(
            section,
            "partial_sell_ratio",
            "partial_sell_ratio must be in [0, 1]",
        ));
    }

    let atr_period = read_int(config, section, "atr_period", defaults.atr_period as i64)?;
    if atr_period < 1 {
        return Err(invalid(section, "atr_period", "atr_period must be at least 1"));
    }

    read_double(config, section, "buy_threshold", defaults.buy_threshold)?;
    read_double(config, section, "sell_threshold", defaults.sell_threshold)?;
    Ok(())
}

/// The section's `kind`, falling back to the strategy name itself
/// (so `[strategy.scored]` needs no `kind` line).
pub fn parse_kind(config: &dyn ConfigPort, section: &str) -> Result<StrategyKind, LevtraderError> {
    match config.get_string(section, "kind") {
        Some(kind) => kind
            .parse::<StrategyKind>()
            .map_err(|reason| invalid(section, "kind", &reason)),
        None => strategy_name(section)
            .parse::<StrategyKind>()
            .map_err(|_| LevtraderError::ConfigMissing {
                section: section.to_string(),
                key: "kind".to_string(),
            }),
    }
}

/// A float value, `default` when absent, an error when present but malformed.
pub fn read_double(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, LevtraderError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(raw) => match raw.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(v),
            _ => Err(invalid(section, key, &format!("expected a number, got '{raw}'"))),
        },
    }
}

pub fn read_int(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: i64,
) -> Result<i64, LevtraderError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<i64>()
            .map_err(|_| invalid(section, key, &format!("expected an integer, got '{raw}'"))),
    }
}

fn validate_initial_cash(config: &dyn ConfigPort) -> Result<(), LevtraderError> {
    let value = read_double(
        config,
        BACKTEST_SECTION,
        "initial_cash",
        crate::domain::backtest::DEFAULT_INITIAL_CASH,
    )?;
    if value <= 0.0 {
        return Err(invalid(
            BACKTEST_SECTION,
            "initial_cash",
            "initial_cash must be positive",
        ));
    }
    Ok(())
}

fn validate_risk_free_rate(config: &dyn ConfigPort) -> Result<(), LevtraderError> {
    let value = read_double(
        config,
        BACKTEST_SECTION,
        "risk_free_rate",
        crate::domain::backtest::DEFAULT_RISK_FREE_RATE,
    )?;
    if !(0.0..1.0).contains(&value) {
        return Err(invalid(
            BACKTEST_SECTION,
            "risk_free_rate",
            "risk_free_rate must be between 0 and 1",
        ));
    }
    Ok(())
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), LevtraderError> {
    let start = optional_date(config, "start_date")?;
    let end = optional_date(config, "end_date")?;

    if let (Some(start), Some(end)) = (start, end) {
        if start >= end {
            return Err(invalid(
                BACKTEST_SECTION,
                "start_date",
                "start_date must be before end_date",
            ));
        }
    }
    Ok(())
}

/// `start_date` / `end_date` of the backtest section, if set.
pub fn optional_date(
    config: &dyn ConfigPort,
    field: &str,
) -> Result<Option<NaiveDate>, LevtraderError> {
    match config.get_string(BACKTEST_SECTION, field) {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => parse_date(&s, field).map(Some),
    }
}

pub fn parse_date(value: &str, field: &str) -> Result<NaiveDate, LevtraderError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        invalid(
            BACKTEST_SECTION,
            field,
            &format!("invalid {field} format, expected YYYY-MM-DD"),
        )
    })
}

fn invalid(section: &str, key: &str, reason: &str) -> LevtraderError {
    LevtraderError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}
