//! Minute-axis alignment of stored bars.
//!
//! Pivots a day's bars into a wide table: one sorted minute axis (the union
//! over the selected tickers) and one sparse column per ticker. All
//! cross-sectional analytics read bars through this shape.

use basket_core::{Bar, Error, MinuteIndex, Result};
use basket_ingestion::BarStore;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

/// Which per-bar value a table carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarField {
    /// Close minus open.
    PriceChange,
    /// Traded volume.
    Volume,
}

impl BarField {
    fn extract(&self, bar: &Bar) -> f64 {
        match self {
            BarField::PriceChange => bar.price_change(),
            BarField::Volume => bar.volume as f64,
        }
    }
}

/// Wide minute-indexed table with one sparse column per ticker.
#[derive(Debug, Clone)]
pub struct AlignedTable {
    minutes: Vec<MinuteIndex>,
    columns: Vec<String>,
    /// Column values keyed by minute index, parallel to `columns`.
    values: Vec<BTreeMap<MinuteIndex, f64>>,
}

impl AlignedTable {
    /// Query the store for a day and pivot the result.
    ///
    /// Fails with `NoData` when no bars match.
    pub fn from_store(
        store: &dyn BarStore,
        tickers: &[String],
        date: NaiveDate,
        field: BarField,
    ) -> Result<Self> {
        let bars = store.query(tickers, date)?;
        Self::from_bars(tickers, date, &bars, field)
    }

    /// Pivot already-loaded bars. Bars for tickers outside `tickers` are
    /// ignored; column order follows `tickers`.
    pub fn from_bars(
        tickers: &[String],
        date: NaiveDate,
        bars: &[Bar],
        field: BarField,
    ) -> Result<Self> {
        if bars.is_empty() {
            return Err(Error::no_data(format!("no bars stored for {date}")));
        }
        let column_index: HashMap<&str, usize> = tickers
            .iter()
            .enumerate()
            .map(|(i, t)| (t.as_str(), i))
            .collect();
        let mut values: Vec<BTreeMap<MinuteIndex, f64>> = vec![BTreeMap::new(); tickers.len()];
        let mut minutes: BTreeSet<MinuteIndex> = BTreeSet::new();

        for bar in bars {
            if let Some(&col) = column_index.get(bar.ticker.as_str()) {
                values[col].insert(bar.minute_index, field.extract(bar));
                minutes.insert(bar.minute_index);
            }
        }
        if minutes.is_empty() {
            return Err(Error::no_data(format!("no bars stored for {date}")));
        }
        debug!(
            "aligned {} bars into {} minutes x {} columns",
            bars.len(),
            minutes.len(),
            tickers.len()
        );
        Ok(Self {
            minutes: minutes.into_iter().collect(),
            columns: tickers.to_vec(),
            values,
        })
    }

    /// Sorted union of minute indices present in any column.
    pub fn minutes(&self) -> &[MinuteIndex] {
        &self.minutes
    }

    /// Column tickers in construction order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// The value for a ticker at a minute, `None` for a gap.
    pub fn cell(&self, ticker: &str, minute: MinuteIndex) -> Option<f64> {
        let col = self.columns.iter().position(|c| c == ticker)?;
        self.values[col].get(&minute).copied()
    }

    /// A single ticker's series keyed by minute index.
    pub fn column(&self, ticker: &str) -> Option<&BTreeMap<MinuteIndex, f64>> {
        let col = self.columns.iter().position(|c| c == ticker)?;
        Some(&self.values[col])
    }

    /// Per-minute sum across all columns. Missing cells contribute nothing,
    /// so a minute present in any column appears in the result.
    pub fn sum_by_minute(&self) -> BTreeMap<MinuteIndex, f64> {
        let mut sums: BTreeMap<MinuteIndex, f64> = BTreeMap::new();
        for column in &self.values {
            for (&minute, &value) in column {
                *sums.entry(minute).or_insert(0.0) += value;
            }
        }
        sums
    }
}
