//! Report generation port trait.

use std::path::{Path, PathBuf};

use crate::domain::backtest::BacktestResult;
use crate::domain::error::LevtraderError;
use crate::domain::metrics::Metrics;

/// Port for writing backtest reports. Implementations return the path written.
pub trait ReportPort {
    /// Per-bar ledger of one strategy run.
    fn write_ledger(
        &self,
        result: &BacktestResult,
        output_dir: &Path,
    ) -> Result<PathBuf, LevtraderError>;

    /// One summary row per strategy run.
    fn write_comparison(
        &self,
        runs: &[(&BacktestResult, &Metrics)],
        output_dir: &Path,
    ) -> Result<PathBuf, LevtraderError>;
}
