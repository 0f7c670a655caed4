//! Raw provider rows to storable minute bars.
//!
//! Assigns 1-based minute indices and drops whatever cannot be indexed:
//! out-of-session stamps, incomplete fields and repeated minutes (first
//! occurrence wins).

use basket_core::{storage_symbol, Bar, MinuteIndex, RawBar, SessionClock};
use chrono::NaiveDate;
use std::collections::HashSet;
use tracing::debug;

/// Converts raw provider rows into session-indexed bars.
pub struct BarNormalizer {
    /// Session clock used for timezone conversion and minute indexing.
    clock: SessionClock,
}

impl BarNormalizer {
    /// Create a normalizer over the given session clock.
    pub fn new(clock: SessionClock) -> Self {
        Self { clock }
    }

    /// Normalize one ticker/date batch of raw rows.
    ///
    /// Row-level anomalies are filtered, never raised: rows outside the
    /// session window, rows with missing or non-finite fields and rows
    /// repeating an already-seen minute index are dropped. Surviving bars
    /// carry the caller's trading date and the storage form of the symbol.
    pub fn normalize(&self, raw_symbol: &str, date: NaiveDate, rows: &[RawBar]) -> Vec<Bar> {
        let ticker = storage_symbol(raw_symbol);
        let mut seen: HashSet<MinuteIndex> = HashSet::new();
        let mut bars = Vec::with_capacity(rows.len());
        let mut dropped = 0usize;

        for row in rows {
            let local = self.clock.to_session_time(row.timestamp);
            let minute_index = match self.clock.minute_index(local) {
                Ok(index) => index,
                Err(_) => {
                    dropped += 1;
                    continue;
                }
            };
            let (open, high, low, close, volume) = match complete_fields(row) {
                Some(fields) => fields,
                None => {
                    dropped += 1;
                    continue;
                }
            };
            // First occurrence of a minute wins. A close-auction print
            // stamped at 16:00 folds into the final minute and loses to an
            // existing regular bar for that minute.
            if !seen.insert(minute_index) {
                dropped += 1;
                continue;
            }
            bars.push(Bar {
                ticker: ticker.clone(),
                date,
                minute_index,
                timestamp: local,
                open,
                high,
                low,
                close,
                volume,
            });
        }

        if dropped > 0 {
            debug!(symbol = %ticker, %date, kept = bars.len(), dropped, "normalized raw rows");
        }
        bars
    }
}

/// Extract OHLCV from a raw row, rejecting missing or unusable values.
fn complete_fields(row: &RawBar) -> Option<(f64, f64, f64, f64, u64)> {
    let open = finite(row.open)?;
    let high = finite(row.high)?;
    let low = finite(row.low)?;
    let close = finite(row.close)?;
    let volume = finite(row.volume)?;
    if volume < 0.0 {
        return None;
    }
    Some((open, high, low, close, volume as u64))
}

fn finite(value: Option<f64>) -> Option<f64> {
    match value {
        Some(v) if v.is_finite() => Some(v),
        _ => None,
    }
}
