//! Holdings aggregate vs reference comparisons.
//!
//! Compares the per-minute sum over every universe member against the index
//! ETF on the same minute axis, for volume and for price change.

use crate::align::{AlignedTable, BarField};
use basket_core::{storage_symbol, MinuteIndex, Result, Universe};
use basket_ingestion::BarStore;
use chrono::NaiveDate;
use std::collections::BTreeSet;

/// One minute of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonRow {
    /// 1-based session minute.
    pub minute_index: MinuteIndex,
    /// Sum over all universe members, zero-filled when absent.
    pub holdings: f64,
    /// Reference value, zero-filled when absent.
    pub reference: f64,
    /// holdings - reference.
    pub difference: f64,
}

/// A full-day comparison with totals.
#[derive(Debug, Clone)]
pub struct Comparison {
    /// Rows sorted by minute index ascending.
    pub rows: Vec<ComparisonRow>,
    pub holdings_total: f64,
    pub reference_total: f64,
    pub difference_total: f64,
}

/// Computes holdings-vs-reference comparisons from stored bars.
pub struct ComparisonAnalytics<'a> {
    store: &'a dyn BarStore,
    universe: &'a Universe,
    /// Reference instrument in storage form.
    reference: String,
}

impl<'a> ComparisonAnalytics<'a> {
    /// `reference` is the raw reference symbol (stored caret-stripped).
    pub fn new(store: &'a dyn BarStore, universe: &'a Universe, reference: &str) -> Self {
        Self {
            store,
            universe,
            reference: storage_symbol(reference),
        }
    }

    /// Per-minute traded volume: holdings sum vs reference.
    pub fn volume_comparison(&self, date: NaiveDate) -> Result<Comparison> {
        self.compare(date, BarField::Volume)
    }

    /// Per-minute price change (close - open): holdings sum vs reference.
    pub fn price_change_comparison(&self, date: NaiveDate) -> Result<Comparison> {
        self.compare(date, BarField::PriceChange)
    }

    fn compare(&self, date: NaiveDate, field: BarField) -> Result<Comparison> {
        let members: Vec<String> = self
            .universe
            .members()?
            .iter()
            .map(|t| storage_symbol(t))
            .collect();
        let holdings = AlignedTable::from_store(self.store, &members, date, field)?;
        let reference = AlignedTable::from_store(
            self.store,
            std::slice::from_ref(&self.reference),
            date,
            field,
        )?;

        let holdings_sums = holdings.sum_by_minute();
        let reference_sums = reference.sum_by_minute();
        let minutes: BTreeSet<MinuteIndex> = holdings_sums
            .keys()
            .chain(reference_sums.keys())
            .copied()
            .collect();

        let mut rows = Vec::with_capacity(minutes.len());
        let mut holdings_total = 0.0;
        let mut reference_total = 0.0;
        for minute in minutes {
            let h = holdings_sums.get(&minute).copied().unwrap_or(0.0);
            let r = reference_sums.get(&minute).copied().unwrap_or(0.0);
            holdings_total += h;
            reference_total += r;
            rows.push(ComparisonRow {
                minute_index: minute,
                holdings: h,
                reference: r,
                difference: h - r,
            });
        }
        Ok(Comparison {
            rows,
            holdings_total,
            reference_total,
            difference_total: holdings_total - reference_total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use basket_core::universe::UniverseEntry;
    use basket_core::{Bar, Error};
    use basket_ingestion::SqliteBarStore;
    use chrono::NaiveTime;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 16).unwrap()
    }

    fn make_bar(ticker: &str, minute_index: u32, open: f64, close: f64, volume: u64) -> Bar {
        Bar {
            ticker: ticker.to_string(),
            date: day(),
            minute_index,
            timestamp: day().and_time(NaiveTime::from_hms_opt(9, 30, 0).unwrap()),
            open,
            high: open.max(close) + 0.1,
            low: open.min(close) - 0.1,
            close,
            volume,
        }
    }

    fn universe() -> Universe {
        Universe::from_entries(vec![
            UniverseEntry {
                ticker: "AAPL".to_string(),
                index_member: true,
                allocation_pct: 8.8,
            },
            UniverseEntry {
                ticker: "MSFT".to_string(),
                index_member: true,
                allocation_pct: 8.0,
            },
            UniverseEntry {
                ticker: "QQQ".to_string(),
                index_member: false,
                allocation_pct: 0.0,
            },
        ])
    }

    fn store_with(bars: &[Bar]) -> SqliteBarStore {
        let mut store = SqliteBarStore::open_in_memory().unwrap();
        store.insert_many(bars).unwrap();
        store
    }

    #[test]
    fn test_volume_comparison_sums_all_members() {
        let store = store_with(&[
            make_bar("AAPL", 1, 100.0, 100.5, 100),
            make_bar("MSFT", 1, 200.0, 199.5, 200),
            make_bar("QQQ", 1, 400.0, 400.5, 200),
        ]);
        let universe = universe();
        let analytics = ComparisonAnalytics::new(&store, &universe, "QQQ");

        let comparison = analytics.volume_comparison(day()).unwrap();

        assert_eq!(comparison.rows.len(), 1);
        let row = &comparison.rows[0];
        assert_eq!(row.minute_index, 1);
        assert!((row.holdings - 300.0).abs() < 1e-10);
        assert!((row.reference - 200.0).abs() < 1e-10);
        assert!((row.difference - 100.0).abs() < 1e-10);
    }

    #[test]
    fn test_volume_totals() {
        let store = store_with(&[
            make_bar("AAPL", 1, 100.0, 100.5, 100),
            make_bar("AAPL", 2, 100.5, 101.0, 200),
            make_bar("QQQ", 1, 400.0, 400.5, 50),
            make_bar("QQQ", 2, 400.5, 401.0, 50),
        ]);
        let universe = universe();
        let analytics = ComparisonAnalytics::new(&store, &universe, "QQQ");

        let comparison = analytics.volume_comparison(day()).unwrap();

        assert!((comparison.rows[0].difference - 50.0).abs() < 1e-10);
        assert!((comparison.rows[1].difference - 150.0).abs() < 1e-10);
        assert!((comparison.holdings_total - 300.0).abs() < 1e-10);
        assert!((comparison.reference_total - 100.0).abs() < 1e-10);
        assert!((comparison.difference_total - 200.0).abs() < 1e-10);
    }

    #[test]
    fn test_missing_minutes_zero_filled_both_sides() {
        let store = store_with(&[
            make_bar("AAPL", 1, 100.0, 100.5, 100),
            make_bar("QQQ", 2, 400.0, 400.5, 500),
        ]);
        let universe = universe();
        let analytics = ComparisonAnalytics::new(&store, &universe, "QQQ");

        let comparison = analytics.volume_comparison(day()).unwrap();

        assert_eq!(comparison.rows.len(), 2);
        // Minute 1: reference missing
        assert!((comparison.rows[0].reference - 0.0).abs() < 1e-10);
        assert!((comparison.rows[0].difference - 100.0).abs() < 1e-10);
        // Minute 2: holdings missing
        assert!((comparison.rows[1].holdings - 0.0).abs() < 1e-10);
        assert!((comparison.rows[1].difference - (-500.0)).abs() < 1e-10);
    }

    #[test]
    fn test_price_change_comparison_and_totals() {
        let store = store_with(&[
            make_bar("AAPL", 1, 100.0, 100.5, 100), // +0.5
            make_bar("MSFT", 1, 200.0, 199.0, 100), // -1.0
            make_bar("AAPL", 2, 100.5, 101.0, 100), // +0.5
            make_bar("QQQ", 1, 400.0, 400.2, 500),  // +0.2
            make_bar("QQQ", 2, 400.2, 400.1, 500),  // -0.1
        ]);
        let universe = universe();
        let analytics = ComparisonAnalytics::new(&store, &universe, "QQQ");

        let comparison = analytics.price_change_comparison(day()).unwrap();

        assert!((comparison.rows[0].holdings - (-0.5)).abs() < 1e-10);
        assert!((comparison.rows[0].difference - (-0.7)).abs() < 1e-10);
        assert!((comparison.holdings_total - 0.0).abs() < 1e-10);
        assert!((comparison.reference_total - 0.1).abs() < 1e-10);
        assert!((comparison.difference_total - (-0.1)).abs() < 1e-10);
    }

    #[test]
    fn test_no_reference_bars_is_no_data() {
        let store = store_with(&[make_bar("AAPL", 1, 100.0, 100.5, 100)]);
        let universe = universe();
        let analytics = ComparisonAnalytics::new(&store, &universe, "QQQ");

        assert!(matches!(
            analytics.volume_comparison(day()),
            Err(Error::NoData(_))
        ));
    }

    #[test]
    fn test_no_holdings_bars_is_no_data() {
        let store = store_with(&[make_bar("QQQ", 1, 400.0, 400.5, 500)]);
        let universe = universe();
        let analytics = ComparisonAnalytics::new(&store, &universe, "QQQ");

        assert!(matches!(
            analytics.volume_comparison(day()),
            Err(Error::NoData(_))
        ));
    }
}
