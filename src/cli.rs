//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{ArgAction, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::text_report;
use crate::domain::backtest::{
    BacktestConfig, BacktestResult, DEFAULT_INITIAL_CASH, DEFAULT_RISK_FREE_RATE, run_backtest,
};
use crate::domain::config_validation::{
    BACKTEST_SECTION, optional_date, parse_kind, read_double, read_int, strategy_name,
    strategy_sections, validate_backtest_config, validate_config, validate_strategy_config,
};
use crate::domain::error::LevtraderError;
use crate::domain::metrics::Metrics;
use crate::domain::ohlcv::PriceBar;
use crate::domain::strategy::{Strategy, StrategyParams};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

pub const DEFAULT_SYMBOL: &str = "tqqq";
pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_OUTPUT_DIR: &str = "results";

#[derive(Parser, Debug)]
#[command(name = "levtrader", about = "Backtester for leveraged ETF trading strategies")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the configured strategies and report their performance
    Run {
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(long)]
        data_dir: Option<PathBuf>,
        #[arg(long)]
        symbol: Option<String>,
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
        /// Only run the named strategy (repeatable)
        #[arg(long = "strategy")]
        strategies: Vec<String>,
        /// Print the report without writing CSV files
        #[arg(long)]
        no_write: bool,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show the data range of one symbol, or of every symbol in the data directory
    Info {
        #[arg(long)]
        data_dir: Option<PathBuf>,
        #[arg(long)]
        symbol: Option<String>,
    },
}

/// Everything a run needs beyond the strategy list.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    pub symbol: String,
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub backtest: BacktestConfig,
}

/// One completed strategy run.
#[derive(Debug)]
pub struct StrategyRun {
    pub result: BacktestResult,
    pub metrics: Metrics,
}

pub fn run(cli: Cli) -> ExitCode {
    init_tracing(cli.verbose);

    let outcome = match cli.command {
        Command::Run {
            config,
            data_dir,
            symbol,
            output_dir,
            strategies,
            no_write,
        } => run_strategies(
            config.as_deref(),
            RunOverrides {
                data_dir,
                symbol,
                output_dir,
            },
            &strategies,
            no_write,
        ),
        Command::Validate { config } => run_validate(&config),
        Command::Info { data_dir, symbol } => run_info(data_dir, symbol.as_deref()),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(&e)
        }
    }
}

/// `RUST_LOG` wins; otherwise the level follows the `-v` count.
pub fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    // A subscriber may already be installed when run() is called repeatedly.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, LevtraderError> {
    info!("Loading config from {}", path.display());
    FileConfigAdapter::from_file(path)
}

/// Command-line values that take precedence over the `[backtest]` section.
#[derive(Debug, Default, Clone)]
pub struct RunOverrides {
    pub data_dir: Option<PathBuf>,
    pub symbol: Option<String>,
    pub output_dir: Option<PathBuf>,
}

pub fn build_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, LevtraderError> {
    Ok(BacktestConfig {
        initial_cash: read_double(config, BACKTEST_SECTION, "initial_cash", DEFAULT_INITIAL_CASH)?,
        risk_free_rate: read_double(
            config,
            BACKTEST_SECTION,
            "risk_free_rate",
            DEFAULT_RISK_FREE_RATE,
        )?,
    })
}

pub fn build_run_settings(
    config: &dyn ConfigPort,
    overrides: RunOverrides,
) -> Result<RunSettings, LevtraderError> {
    let setting = |key: &str| {
        config
            .get_string(BACKTEST_SECTION, key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    Ok(RunSettings {
        symbol: overrides
            .symbol
            .or_else(|| setting("symbol"))
            .unwrap_or_else(|| DEFAULT_SYMBOL.to_string()),
        data_dir: overrides
            .data_dir
            .or_else(|| setting("data_dir").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
        output_dir: overrides
            .output_dir
            .or_else(|| setting("output_dir").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
        start_date: optional_date(config, "start_date")?,
        end_date: optional_date(config, "end_date")?,
        backtest: build_backtest_config(config)?,
    })
}

/// Build the strategy declared by one `[strategy.<name>]` section.
pub fn build_strategy(config: &dyn ConfigPort, section: &str) -> Result<Strategy, LevtraderError> {
    validate_strategy_config(config, section)?;
    let kind = parse_kind(config, section)?;
    let d = StrategyParams::defaults_for(kind);
    let double = |key: &str, default: f64| read_double(config, section, key, default);

    let params = StrategyParams {
        buy_threshold: double("buy_threshold", d.buy_threshold)?,
        sell_threshold: double("sell_threshold", d.sell_threshold)?,
        max_position: double("max_position", d.max_position)?,
        stop_loss: double("stop_loss", d.stop_loss)?,
        trailing_stop: double("trailing_stop", d.trailing_stop)?,
        commission: double("commission", d.commission)?,
        slippage: double("slippage", d.slippage)?,
        vol_threshold: double("vol_threshold", d.vol_threshold)?,
        partial_sell_ratio: double("partial_sell_ratio", d.partial_sell_ratio)?,
        partial_sell_gain: double("partial_sell_gain", d.partial_sell_gain)?,
        atr_period: read_int(config, section, "atr_period", d.atr_period as i64)? as usize,
        atr_multiplier: double("atr_multiplier", d.atr_multiplier)?,
    };

    Ok(Strategy {
        name: strategy_name(section).to_string(),
        kind,
        params,
    })
}

/// Every configured strategy, or the three defaults when none is configured.
/// A non-empty `only` keeps the strategies with those names.
pub fn build_strategies(
    config: &dyn ConfigPort,
    only: &[String],
) -> Result<Vec<Strategy>, LevtraderError> {
    let sections = strategy_sections(config);
    let strategies = if sections.is_empty() {
        Strategy::defaults()
    } else {
        sections
            .iter()
            .map(|section| build_strategy(config, section))
            .collect::<Result<Vec<_>, _>>()?
    };

    if only.is_empty() {
        return Ok(strategies);
    }

    for name in only {
        if !strategies.iter().any(|s| &s.name == name) {
            warn!("Unknown strategy {}, ignoring", name);
        }
    }
    Ok(strategies
        .into_iter()
        .filter(|s| only.contains(&s.name))
        .collect())
}

pub fn load_bars(
    data_port: &dyn DataPort,
    settings: &RunSettings,
) -> Result<Vec<PriceBar>, LevtraderError> {
    let bars = data_port.fetch_bars(&settings.symbol, settings.start_date, settings.end_date)?;
    if bars.is_empty() {
        return Err(LevtraderError::NoData {
            symbol: settings.symbol.clone(),
        });
    }
    info!(
        "Loaded {} bars for {} ({} to {})",
        bars.len(),
        settings.symbol,
        bars[0].date,
        bars[bars.len() - 1].date
    );
    Ok(bars)
}

#[cfg(feature = "parallel")]
fn backtest_all(
    bars: &[PriceBar],
    strategies: &[Strategy],
    config: &BacktestConfig,
) -> Vec<Result<BacktestResult, LevtraderError>> {
    use rayon::prelude::*;
    strategies
        .par_iter()
        .map(|strategy| run_backtest(bars, strategy, config))
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn backtest_all(
    bars: &[PriceBar],
    strategies: &[Strategy],
    config: &BacktestConfig,
) -> Vec<Result<BacktestResult, LevtraderError>> {
    strategies
        .iter()
        .map(|strategy| run_backtest(bars, strategy, config))
        .collect()
}

/// Load data, backtest every strategy and write the CSV reports when a
/// report port is given. Strategies without enough history are skipped;
/// if none can run the first such error is returned.
pub fn run_pipeline(
    data_port: &dyn DataPort,
    report_port: Option<&dyn ReportPort>,
    strategies: &[Strategy],
    settings: &RunSettings,
) -> Result<Vec<StrategyRun>, LevtraderError> {
    let bars = load_bars(data_port, settings)?;

    let mut runs = Vec::with_capacity(strategies.len());
    let mut skipped = None;
    for outcome in backtest_all(&bars, strategies, &settings.backtest) {
        match outcome {
            Ok(result) => {
                let metrics = Metrics::compute(&result, settings.backtest.risk_free_rate);
                runs.push(StrategyRun { result, metrics });
            }
            Err(e @ LevtraderError::InsufficientData { .. }) => {
                warn!("Skipping strategy: {}", e);
                skipped.get_or_insert(e);
            }
            Err(e) => return Err(e),
        }
    }

    if runs.is_empty() {
        if let Some(e) = skipped {
            return Err(e);
        }
        return Ok(runs);
    }

    if let Some(port) = report_port {
        for run in &runs {
            let path = port.write_ledger(&run.result, &settings.output_dir)?;
            info!("Ledger written to {}", path.display());
        }
        let pairs: Vec<(&BacktestResult, &Metrics)> =
            runs.iter().map(|r| (&r.result, &r.metrics)).collect();
        let path = port.write_comparison(&pairs, &settings.output_dir)?;
        info!("Comparison written to {}", path.display());
    }

    Ok(runs)
}

fn run_strategies(
    config_path: Option<&Path>,
    overrides: RunOverrides,
    only: &[String],
    no_write: bool,
) -> Result<(), LevtraderError> {
    let config = match config_path {
        Some(path) => load_config(path)?,
        None => FileConfigAdapter::empty(),
    };
    validate_config(&config)?;

    let settings = build_run_settings(&config, overrides)?;
    let strategies = build_strategies(&config, only)?;
    if strategies.is_empty() {
        warn!("No strategies selected");
        return Ok(());
    }

    let data_port = CsvAdapter::new(settings.data_dir.clone());
    let report_port = CsvReportAdapter::new();
    let report: Option<&dyn ReportPort> = if no_write { None } else { Some(&report_port) };

    let runs = run_pipeline(&data_port, report, &strategies, &settings)?;

    for run in &runs {
        println!("{}", text_report::format_report(&run.result, &run.metrics));
    }
    if runs.len() > 1 {
        let pairs: Vec<(&BacktestResult, &Metrics)> =
            runs.iter().map(|r| (&r.result, &r.metrics)).collect();
        println!("{}", text_report::format_comparison(&pairs));
    }
    if !no_write {
        eprintln!("Reports written to {}", settings.output_dir.display());
    }
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), LevtraderError> {
    eprintln!("Validating config: {}", config_path.display());
    let config = load_config(config_path)?;
    validate_backtest_config(&config)?;
    let settings = build_run_settings(&config, RunOverrides::default())?;
    let strategies = build_strategies(&config, &[])?;

    eprintln!("\nBacktest:");
    eprintln!("  symbol:         {}", settings.symbol);
    eprintln!("  data_dir:       {}", settings.data_dir.display());
    eprintln!("  initial_cash:   {:.2}", settings.backtest.initial_cash);
    eprintln!("  risk_free_rate: {}", settings.backtest.risk_free_rate);

    eprintln!("\nStrategies:");
    for strategy in &strategies {
        let p = &strategy.params;
        eprintln!(
            "  {} ({}): max_position {}, stop_loss {}, trailing_stop {}, cost {}",
            strategy.name,
            strategy.kind,
            p.max_position,
            p.stop_loss,
            p.trailing_stop,
            p.cost_rate()
        );
    }

    eprintln!("\nConfiguration is valid.");
    Ok(())
}

fn run_info(data_dir: Option<PathBuf>, symbol: Option<&str>) -> Result<(), LevtraderError> {
    let adapter = CsvAdapter::new(data_dir.unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)));
    let symbols = match symbol {
        Some(s) => vec![s.to_string()],
        None => adapter.list_symbols()?,
    };

    if symbols.is_empty() {
        eprintln!("No symbols found");
        return Ok(());
    }

    for symbol in &symbols {
        match adapter.get_data_range(symbol) {
            Ok(Some((first, last, count))) => {
                println!("{}: {} bars, {} to {}", symbol, count, first, last);
            }
            Ok(None) => eprintln!("{}: no data found", symbol),
            Err(e) if symbols.len() > 1 => eprintln!("error reading {}: {}", symbol, e),
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
