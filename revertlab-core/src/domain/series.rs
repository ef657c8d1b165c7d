//! PriceSeries — an immutable, time-ordered sequence of bars.

use super::bar::Bar;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum SeriesError {
    #[error("price series is empty")]
    Empty,

    #[error("timestamps must be strictly increasing: bar {index} at {current} follows {previous}")]
    NonMonotonicTimestamp {
        index: usize,
        previous: NaiveDateTime,
        current: NaiveDateTime,
    },

    #[error("slice {start}..{end} out of range for series of length {len}")]
    SliceOutOfRange { start: usize, end: usize, len: usize },
}

/// Validated bar sequence. Timestamps strictly increase; prices may contain
/// NaN (void bars), which downstream indicators propagate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    bars: Vec<Bar>,
}

impl PriceSeries {
    pub fn new(bars: Vec<Bar>) -> Result<Self, SeriesError> {
        if bars.is_empty() {
            return Err(SeriesError::Empty);
        }
        for (index, pair) in bars.windows(2).enumerate() {
            if pair[1].timestamp <= pair[0].timestamp {
                return Err(SeriesError::NonMonotonicTimestamp {
                    index: index + 1,
                    previous: pair[0].timestamp,
                    current: pair[1].timestamp,
                });
            }
        }
        Ok(Self { bars })
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first_timestamp(&self) -> NaiveDateTime {
        self.bars[0].timestamp
    }

    pub fn last_timestamp(&self) -> NaiveDateTime {
        self.bars[self.bars.len() - 1].timestamp
    }

    /// Contiguous sub-series `[start, end)`. Ordering is inherited, so the
    /// result is valid whenever the range is non-empty and in bounds.
    pub fn slice(&self, start: usize, end: usize) -> Result<PriceSeries, SeriesError> {
        if start >= end || end > self.bars.len() {
            return Err(SeriesError::SliceOutOfRange {
                start,
                end,
                len: self.bars.len(),
            });
        }
        Ok(Self {
            bars: self.bars[start..end].to_vec(),
        })
    }

    /// BLAKE3 hash over every timestamp and price, used to tie reports to the
    /// exact data they were produced from.
    pub fn dataset_hash(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for bar in &self.bars {
            hasher.update(&bar.timestamp.and_utc().timestamp_millis().to_le_bytes());
            hasher.update(&bar.open.to_le_bytes());
            hasher.update(&bar.high.to_le_bytes());
            hasher.update(&bar.low.to_le_bytes());
            hasher.update(&bar.close.to_le_bytes());
        }
        hasher.finalize().to_hex().to_string()
    }
}
