//! Core domain types and logic.

pub mod ohlcv;
pub mod stats;
pub mod indicator;
pub mod indicator_helpers;
pub mod strategy;
pub mod signal;
pub mod position;
pub mod portfolio;
pub mod execution;
pub mod backtest;
pub mod metrics;
pub mod config_validation;
pub mod error;
