//! Lagged prediction dataset construction.
//!
//! Builds a per-minute feature matrix of price changes for the top
//! allocation-weighted universe members, labeled with the reference
//! instrument's price change one minute ahead.

use crate::align::{AlignedTable, BarField};
use basket_core::{storage_symbol, Error, MinuteIndex, Result, Universe};
use basket_ingestion::BarStore;
use chrono::NaiveDate;
use tracing::debug;

/// One observation: features at minute k, label at minute k+1.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetRow {
    /// Feature minute (1-based session index).
    pub minute_index: MinuteIndex,
    /// Price changes parallel to the dataset's feature tickers; gaps are
    /// kept as `None`.
    pub features: Vec<Option<f64>>,
    /// Reference price change at `minute_index + 1`.
    pub label: f64,
}

/// Feature matrix plus next-minute labels for one trading date.
#[derive(Debug, Clone)]
pub struct PredictionDataset {
    /// Feature column tickers in storage form.
    pub feature_tickers: Vec<String>,
    /// Ticker whose next-minute change is the label.
    pub reference_ticker: String,
    pub date: NaiveDate,
    /// Rows ordered by minute index; minutes without a label are dropped.
    pub rows: Vec<DatasetRow>,
}

/// Builds prediction datasets from stored bars and the universe file.
pub struct PredictionDatasetBuilder<'a> {
    store: &'a dyn BarStore,
    universe: &'a Universe,
    /// Index ETF in storage form; also the label source.
    index_etf: String,
    /// Volatility index in storage form.
    volatility_index: String,
}

impl<'a> PredictionDatasetBuilder<'a> {
    /// Reference symbols come in raw provider form and are stored
    /// caret-stripped.
    pub fn new(
        store: &'a dyn BarStore,
        universe: &'a Universe,
        index_etf: &str,
        volatility_index: &str,
    ) -> Self {
        Self {
            store,
            universe,
            index_etf: storage_symbol(index_etf),
            volatility_index: storage_symbol(volatility_index),
        }
    }

    /// Build the dataset for a date.
    ///
    /// Features are the price changes of the top `top_n` members by
    /// allocation weight (ties broken by universe file order); with
    /// `include_references` the index ETF and volatility index are appended
    /// when absent. The label at minute k is the index ETF's price change at
    /// minute k+1; rows without a label are dropped.
    pub fn build(
        &self,
        date: NaiveDate,
        top_n: usize,
        include_references: bool,
    ) -> Result<PredictionDataset> {
        if top_n == 0 {
            return Err(Error::invalid_argument("top_n must be positive"));
        }
        let mut feature_tickers: Vec<String> = self
            .universe
            .top_holdings(top_n)?
            .iter()
            .map(|h| storage_symbol(&h.ticker))
            .collect();
        if include_references {
            for reference in [&self.index_etf, &self.volatility_index] {
                if !feature_tickers.iter().any(|t| t == reference) {
                    feature_tickers.push(reference.clone());
                }
            }
        }

        let features =
            AlignedTable::from_store(self.store, &feature_tickers, date, BarField::PriceChange)?;
        let reference = AlignedTable::from_store(
            self.store,
            std::slice::from_ref(&self.index_etf),
            date,
            BarField::PriceChange,
        )?;
        // Single-column table, the column is always present
        let labels = reference
            .column(&self.index_etf)
            .ok_or_else(|| Error::no_data(format!("no reference bars for {date}")))?;

        let mut rows = Vec::new();
        for &minute in features.minutes() {
            // Label lives at the next minute index, not the next row; a
            // reference gap at k+1 drops the row
            let label = match labels.get(&(minute + 1)) {
                Some(&value) => value,
                None => continue,
            };
            let values = feature_tickers
                .iter()
                .map(|t| features.cell(t, minute))
                .collect();
            rows.push(DatasetRow {
                minute_index: minute,
                features: values,
                label,
            });
        }
        debug!(
            "built dataset for {}: {} rows x {} features",
            date,
            rows.len(),
            feature_tickers.len()
        );
        Ok(PredictionDataset {
            feature_tickers,
            reference_ticker: self.index_etf.clone(),
            date,
            rows,
        })
    }
}
