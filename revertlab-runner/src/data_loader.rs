//! Bar loading: CSV price files and a seeded synthetic random walk.
//!
//! The CSV needs a header with `open`, `high`, `low`, `close` (exact,
//! case-sensitive) and a time column. Missing columns fail before any row
//! is read. Rows must be in strictly increasing time order; the series
//! constructor rejects anything else. A row with all four prices present must
//! form a sane bar (positive low, body inside the high-low range); rows with
//! a NaN price load as void bars.
//!
//! Synthetic data is for demos and tests only.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use revertlab_core::domain::{Bar, PriceSeries, SeriesError};

use crate::backtest::BarFrequency;

pub const PRICE_COLUMNS: [&str; 4] = ["open", "high", "low", "close"];

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("required column '{0}' not found in header")]
    MissingColumn(String),

    #[error("row {row}: cannot parse {column} value '{value}'")]
    BadValue {
        row: u64,
        column: String,
        value: String,
    },

    #[error("row {row}: inconsistent bar (open {open}, high {high}, low {low}, close {close})")]
    InsaneBar {
        row: u64,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
    },

    #[error("invalid series: {0}")]
    Series(#[from] SeriesError),
}

/// Load a CSV price file.
pub fn load_csv(path: &Path, time_column: &str) -> Result<PriceSeries, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    parse_csv(file, time_column)
}

/// Parse CSV price data from any reader.
pub fn parse_csv<R: Read>(reader: R, time_column: &str) -> Result<PriceSeries, LoadError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = rdr.headers()?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| LoadError::MissingColumn(name.to_string()))
    };
    let time_idx = column(time_column)?;
    let price_idx = [
        column(PRICE_COLUMNS[0])?,
        column(PRICE_COLUMNS[1])?,
        column(PRICE_COLUMNS[2])?,
        column(PRICE_COLUMNS[3])?,
    ];

    let mut bars = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let row = record.position().map_or(0, |p| p.line());
        let field = |idx: usize| record.get(idx).unwrap_or("");

        let raw_time = field(time_idx);
        let timestamp = parse_timestamp(raw_time).ok_or_else(|| LoadError::BadValue {
            row,
            column: time_column.to_string(),
            value: raw_time.to_string(),
        })?;

        let mut ohlc = [0.0; 4];
        for (slot, (&idx, name)) in ohlc.iter_mut().zip(price_idx.iter().zip(PRICE_COLUMNS)) {
            let raw = field(idx);
            *slot = raw.parse().map_err(|_| LoadError::BadValue {
                row,
                column: name.to_string(),
                value: raw.to_string(),
            })?;
        }
        let [open, high, low, close] = ohlc;
        let bar = Bar::new(timestamp, open, high, low, close);
        if !bar.is_void() && !bar.is_sane() {
            return Err(LoadError::InsaneBar {
                row,
                open,
                high,
                low,
                close,
            });
        }
        bars.push(bar);
    }

    Ok(PriceSeries::new(bars)?)
}

/// RFC 3339, `%Y-%m-%d %H:%M:%S`, `%Y-%m-%d`, or integer epoch milliseconds.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(dt);
    }
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return d.and_hms_opt(0, 0, 0);
    }
    raw.parse::<i64>()
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .map(|dt| dt.naive_utc())
}

/// Deterministic random-walk bars starting 2024-01-01 at 100.0.
pub fn generate_synthetic(
    bars: usize,
    seed: u64,
    freq: BarFrequency,
) -> Result<PriceSeries, LoadError> {
    let seed_hash = blake3::hash(&seed.to_le_bytes());
    let mut rng = StdRng::from_seed(*seed_hash.as_bytes());

    let start = NaiveDate::from_ymd_opt(2024, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default();
    let step = freq.duration();

    let mut out = Vec::with_capacity(bars);
    let mut price = 100.0_f64;
    let mut timestamp = start;
    for _ in 0..bars {
        let ret: f64 = rng.gen_range(-0.01..0.01);
        let open = price;
        let close = price * (1.0 + ret);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.005));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.005));
        out.push(Bar::new(timestamp, open, high, low, close));

        price = close;
        timestamp += step;
    }
    Ok(PriceSeries::new(out)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
timestamp,open,high,low,close,volume
2024-01-01 00:00:00,100,101,99,100.5,10
2024-01-01 00:30:00,100.5,102,100,101.5,12
2024-01-01 01:00:00,101.5,101.8,100.2,100.4,9
";

    #[test]
    fn parses_csv_with_extra_columns() {
        let series = parse_csv(CSV.as_bytes(), "timestamp").unwrap();
        assert_eq!(series.len(), 3);
        let b = series.bars()[1];
        assert_eq!((b.open, b.high, b.low, b.close), (100.5, 102.0, 100.0, 101.5));
    }

    #[test]
    fn missing_price_column_fails_before_rows() {
        let csv = "timestamp,Open,high,low,close\n2024-01-01,1,1,1,1\n";
        let err = parse_csv(csv.as_bytes(), "timestamp").unwrap_err();
        assert!(matches!(err, LoadError::MissingColumn(c) if c == "open"));
    }

    #[test]
    fn missing_time_column() {
        let err = parse_csv(CSV.as_bytes(), "date").unwrap_err();
        assert!(matches!(err, LoadError::MissingColumn(c) if c == "date"));
    }

    #[test]
    fn non_monotonic_rows_rejected() {
        let csv = "date,open,high,low,close\n2024-01-02,1,1,1,1\n2024-01-01,1,1,1,1\n";
        let err = parse_csv(csv.as_bytes(), "date").unwrap_err();
        assert!(matches!(
            err,
            LoadError::Series(SeriesError::NonMonotonicTimestamp { index: 1, .. })
        ));
    }

    #[test]
    fn bad_number_reports_row_and_column() {
        let csv = "date,open,high,low,close\n2024-01-01,1,x,1,1\n";
        let err = parse_csv(csv.as_bytes(), "date").unwrap_err();
        assert!(matches!(err, LoadError::BadValue { row: 2, ref column, .. } if column == "high"));
    }

    #[test]
    fn inconsistent_bars_rejected() {
        let high_below_low = "date,open,high,low,close\n2024-01-01,100,101,99,100\n2024-01-02,100,98,99,100\n";
        let err = parse_csv(high_below_low.as_bytes(), "date").unwrap_err();
        assert!(matches!(err, LoadError::InsaneBar { row: 3, .. }));

        let zero_low = "date,open,high,low,close\n2024-01-01,1,2,0,1\n";
        let err = parse_csv(zero_low.as_bytes(), "date").unwrap_err();
        assert!(matches!(err, LoadError::InsaneBar { row: 2, low, .. } if low == 0.0));
    }

    #[test]
    fn void_rows_load_as_nan_bars() {
        let csv = "date,open,high,low,close\n2024-01-01,100,101,99,100\n2024-01-02,NaN,NaN,NaN,NaN\n";
        let series = parse_csv(csv.as_bytes(), "date").unwrap();
        assert!(series.bars()[1].is_void());
    }

    #[test]
    fn timestamp_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(12, 30, 0)
            .unwrap();
        assert_eq!(parse_timestamp("2024-03-01T12:30:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01T14:30:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01 12:30:00"), Some(expected));
        assert_eq!(
            parse_timestamp("1709296200000"),
            Some(expected)
        );
        assert_eq!(
            parse_timestamp("2024-03-01"),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap().and_hms_opt(0, 0, 0)
        );
        assert_eq!(parse_timestamp("March 1st"), None);
    }

    #[test]
    fn load_csv_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bars.csv");
        std::fs::write(&path, CSV).unwrap();
        assert_eq!(load_csv(&path, "timestamp").unwrap().len(), 3);
        assert!(matches!(
            load_csv(&dir.path().join("missing.csv"), "timestamp"),
            Err(LoadError::Open { .. })
        ));
    }

    #[test]
    fn synthetic_is_deterministic_and_sane() {
        let freq: BarFrequency = "1h".parse().unwrap();
        let a = generate_synthetic(200, 42, freq).unwrap();
        let b = generate_synthetic(200, 42, freq).unwrap();
        let c = generate_synthetic(200, 43, freq).unwrap();
        assert_eq!(a.dataset_hash(), b.dataset_hash());
        assert_ne!(a.dataset_hash(), c.dataset_hash());
        assert!(a.bars().iter().all(|bar| bar.is_sane()));
        assert_eq!(
            a.bars()[1].timestamp - a.bars()[0].timestamp,
            chrono::Duration::hours(1)
        );
    }

    #[test]
    fn synthetic_zero_bars_is_an_error() {
        assert!(matches!(
            generate_synthetic(0, 1, BarFrequency::default()),
            Err(LoadError::Series(SeriesError::Empty))
        ));
    }
}
