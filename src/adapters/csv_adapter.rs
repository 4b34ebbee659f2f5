//! CSV file price data adapter.
//!
//! Reads `<base_path>/<symbol>.csv`. Columns are matched by header name, case
//! insensitive, so extra columns and any column order are accepted.

use crate::domain::error::LevtraderError;
use crate::domain::ohlcv::PriceBar;
use crate::ports::data_port::DataPort;
use chrono::{NaiveDate, NaiveDateTime};
use std::fs;
use std::path::PathBuf;

const DATE_COLUMNS: [&str; 2] = ["dt", "date"];
const PRICE_COLUMNS: [&str; 5] = ["open", "high", "low", "close", "avg"];
const VOLUME_COLUMN: &str = "volume";

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct CsvAdapter {
    base_path: PathBuf,
}

/// Positions of the columns a price file needs.
struct ColumnMap {
    date: usize,
    prices: [usize; 5],
    volume: Option<usize>,
}

impl ColumnMap {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self, LevtraderError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };

        let date = DATE_COLUMNS.iter().find_map(|name| find(name));
        let prices: Vec<Option<usize>> = PRICE_COLUMNS.iter().map(|name| find(name)).collect();

        let mut missing = Vec::new();
        if date.is_none() {
            missing.push("date".to_string());
        }
        for (name, index) in PRICE_COLUMNS.iter().zip(&prices) {
            if index.is_none() {
                missing.push(name.to_string());
            }
        }

        match (date, prices.as_slice()) {
            (Some(date), &[Some(open), Some(high), Some(low), Some(close), Some(avg)]) => {
                Ok(ColumnMap {
                    date,
                    prices: [open, high, low, close, avg],
                    volume: find(VOLUME_COLUMN),
                })
            }
            _ => Err(LevtraderError::MissingColumns { columns: missing }),
        }
    }
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }

    /// Every bar in the file, sorted by date; a repeated date keeps the last row.
    fn read_all(&self, symbol: &str) -> Result<Vec<PriceBar>, LevtraderError> {
        let path = self.csv_path(symbol);
        let content = fs::read_to_string(&path).map_err(|e| LevtraderError::DataLoad {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());
        let headers = rdr.headers().map_err(|e| LevtraderError::DataLoad {
            reason: format!("CSV header error in {}: {}", path.display(), e),
        })?;
        let columns = ColumnMap::from_headers(headers)?;

        let mut bars = Vec::new();
        for (row, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| LevtraderError::DataLoad {
                reason: format!("CSV parse error: {}", e),
            })?;
            // header is line 1
            bars.push(parse_record(&record, &columns, row + 2)?);
        }

        bars.sort_by_key(|b| b.date);
        let mut deduped: Vec<PriceBar> = Vec::with_capacity(bars.len());
        for bar in bars {
            match deduped.last_mut() {
                Some(last) if last.date == bar.date => *last = bar,
                _ => deduped.push(bar),
            }
        }
        Ok(deduped)
    }
}

fn parse_record(
    record: &csv::StringRecord,
    columns: &ColumnMap,
    line: usize,
) -> Result<PriceBar, LevtraderError> {
    let field = |index: usize| record.get(index).unwrap_or("");

    let date = parse_date(field(columns.date)).ok_or_else(|| LevtraderError::DataLoad {
        reason: format!("line {}: invalid date '{}'", line, field(columns.date)),
    })?;

    let mut prices = [0.0_f64; 5];
    for (slot, (&index, name)) in prices
        .iter_mut()
        .zip(columns.prices.iter().zip(PRICE_COLUMNS))
    {
        *slot = field(index)
            .parse()
            .map_err(|e| LevtraderError::DataLoad {
                reason: format!("line {}: invalid {} value: {}", line, name, e),
            })?;
    }
    let [open, high, low, close, avg] = prices;

    let volume = match columns.volume.map(field) {
        None | Some("") => None,
        Some(raw) => Some(parse_volume(raw).ok_or_else(|| LevtraderError::DataLoad {
            reason: format!("line {}: invalid volume value '{}'", line, raw),
        })?),
    };

    Ok(PriceBar {
        date,
        open,
        high,
        low,
        close,
        avg,
        volume,
    })
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, DATETIME_FORMAT)
                .ok()
                .map(|dt| dt.date())
        })
}

fn parse_volume(raw: &str) -> Option<i64> {
    raw.parse::<i64>().ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(|v| v.round() as i64)
    })
}

impl DataPort for CsvAdapter {
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<PriceBar>, LevtraderError> {
        let mut bars = self.read_all(symbol)?;
        bars.retain(|b| {
            start_date.is_none_or(|start| b.date >= start) && end_date.is_none_or(|end| b.date <= end)
        });
        Ok(bars)
    }

    fn list_symbols(&self) -> Result<Vec<String>, LevtraderError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| LevtraderError::DataLoad {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| LevtraderError::DataLoad {
                reason: format!("directory entry error: {}", e),
            })?;
            let name = entry.file_name();
            if let Some(symbol) = name.to_string_lossy().strip_suffix(".csv") {
                symbols.push(symbol.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, LevtraderError> {
        let bars = self.read_all(symbol)?;
        Ok(match (bars.first(), bars.last()) {
            (Some(first), Some(last)) => Some((first.date, last.date, bars.len())),
            _ => None,
        })
    }
}
