//! Core data types for the basket-bars system.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// 1-based position of a minute within the trading session.
pub type MinuteIndex = u32;

/// Strip exchange prefix characters from a provider symbol.
///
/// Index symbols carry a leading caret at the provider (`^VIX`); bars are
/// stored under the plain name (`VIX`).
#[inline]
pub fn storage_symbol(raw: &str) -> String {
    raw.replace('^', "")
}

/// One minute's OHLCV record for one ticker on one trading date.
///
/// The triple (ticker, date, minute_index) is unique across the store.
/// Bars are immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Normalized ticker symbol (prefix characters stripped).
    pub ticker: String,
    /// Trading date (session-local calendar date).
    pub date: NaiveDate,
    /// Minute index within the session (1 = opening minute).
    pub minute_index: MinuteIndex,
    /// Bar timestamp as session-local wall time.
    pub timestamp: NaiveDateTime,
    /// Open price.
    pub open: f64,
    /// High price.
    pub high: f64,
    /// Low price.
    pub low: f64,
    /// Close price.
    pub close: f64,
    /// Total volume (shares).
    pub volume: u64,
}

impl Bar {
    /// Intraminute price change: close minus open.
    #[inline]
    pub fn price_change(&self) -> f64 {
        self.close - self.open
    }

    /// The (ticker, date, minute_index) uniqueness key.
    pub fn key(&self) -> (&str, NaiveDate, MinuteIndex) {
        (&self.ticker, self.date, self.minute_index)
    }
}

/// A raw provider row before normalization.
///
/// Timestamps are naive and interpreted as UTC. OHLCV fields are optional
/// because providers emit nulls for missing minutes; the normalizer rejects
/// rows with missing or unusable fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBar {
    /// Naive timestamp, assumed UTC.
    pub timestamp: NaiveDateTime,
    /// Open price, if present.
    pub open: Option<f64>,
    /// High price, if present.
    pub high: Option<f64>,
    /// Low price, if present.
    pub low: Option<f64>,
    /// Close price, if present.
    pub close: Option<f64>,
    /// Volume, if present.
    pub volume: Option<f64>,
}

/// A universe member selected for analytics, with its allocation weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    /// Ticker symbol.
    pub ticker: String,
    /// Allocation weight as a fraction (percentage / 100).
    pub weight: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_bar(ticker: &str, minute_index: MinuteIndex, open: f64, close: f64) -> Bar {
        Bar {
            ticker: ticker.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            minute_index,
            timestamp: NaiveDate::from_ymd_opt(2024, 1, 10)
                .unwrap()
                .and_hms_opt(9, 30, 0)
                .unwrap(),
            open,
            high: open.max(close),
            low: open.min(close),
            close,
            volume: 100,
        }
    }

    #[test]
    fn test_storage_symbol() {
        assert_eq!(storage_symbol("^VIX"), "VIX");
        assert_eq!(storage_symbol("AAPL"), "AAPL");
        assert_eq!(storage_symbol("^^X"), "X");
    }

    #[test]
    fn test_price_change() {
        let bar = make_bar("AAPL", 1, 100.0, 101.5);
        assert!((bar.price_change() - 1.5).abs() < 1e-10);

        let down = make_bar("AAPL", 2, 100.0, 99.0);
        assert!((down.price_change() + 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_bar_key() {
        let bar = make_bar("MSFT", 42, 400.0, 401.0);
        let (ticker, date, idx) = bar.key();
        assert_eq!(ticker, "MSFT");
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
        assert_eq!(idx, 42);
    }
}
