//! Ingestion orchestration.
//!
//! Drives fetch, normalize and insert over the effective universe with
//! idempotent skip on already-stored ticker/days and per-ticker failure
//! isolation: one bad ticker never aborts the run.

use crate::normalizer::BarNormalizer;
use crate::source::BarSource;
use crate::store::BarStore;
use basket_core::{storage_symbol, SessionClock};
use chrono::NaiveDate;
use std::fmt;
use tracing::{debug, info, warn};

/// Counters reported by an ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestStats {
    /// Provider calls made.
    pub fetched: usize,
    /// Bars written to the store.
    pub inserted: usize,
    /// Ticker/days skipped because bars were already stored.
    pub skipped: usize,
    /// Ticker/days whose fetch normalized to zero bars.
    pub empty: usize,
    /// Ticker/days that failed to fetch or insert.
    pub failed: usize,
}

impl fmt::Display for IngestStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "fetched {}, inserted {} bars, skipped {}, empty {}, failed {}",
            self.fetched, self.inserted, self.skipped, self.empty, self.failed
        )
    }
}

/// Runs the ingestion pipeline over a source, a store and the universe.
pub struct IngestionOrchestrator<S: BarSource, B: BarStore> {
    source: S,
    store: B,
    clock: SessionClock,
    normalizer: BarNormalizer,
    /// Universe tickers in file order, raw provider form.
    universe_tickers: Vec<String>,
    /// Reference symbols in raw provider form, appended when absent.
    references: Vec<String>,
}

impl<S: BarSource, B: BarStore> IngestionOrchestrator<S, B> {
    /// Create an orchestrator. `universe_tickers` and `references` carry raw
    /// provider symbols; storage symbols are derived where needed.
    pub fn new(
        source: S,
        store: B,
        clock: SessionClock,
        universe_tickers: Vec<String>,
        references: Vec<String>,
    ) -> Self {
        let normalizer = BarNormalizer::new(clock.clone());
        Self {
            source,
            store,
            clock,
            normalizer,
            universe_tickers,
            references,
        }
    }

    /// Append reference symbols that have no equivalent already in the list,
    /// compared in storage form so `^VIX` and `VIX` count as the same.
    fn with_references(&self, tickers: &[String]) -> Vec<String> {
        let mut all = tickers.to_vec();
        for reference in &self.references {
            let stored = storage_symbol(reference);
            if !all.iter().any(|t| storage_symbol(t) == stored) {
                all.push(reference.clone());
            }
        }
        all
    }

    /// Ingest the given dates. `tickers` restricts the universe; `None` means
    /// the full universe file. References are appended either way.
    pub fn backfill(&mut self, dates: &[NaiveDate], tickers: Option<&[String]>) -> IngestStats {
        let base = match tickers {
            Some(list) => list.to_vec(),
            None => self.universe_tickers.clone(),
        };
        let all = self.with_references(&base);
        let mut stats = IngestStats::default();
        for date in dates {
            info!("backfilling {} tickers for {}", all.len(), date);
            for symbol in &all {
                self.ingest_one(symbol, *date, false, &mut stats);
            }
        }
        info!("backfill done: {}", stats);
        stats
    }

    /// Ingest today's session for the full universe. `force` bypasses the
    /// existence check, so already-stored days surface as insert failures
    /// rather than skips.
    pub fn update_all(&mut self, force: bool) -> IngestStats {
        let today = self.clock.today();
        let all = self.with_references(&self.universe_tickers);
        info!("updating {} tickers for {}", all.len(), today);
        let mut stats = IngestStats::default();
        for symbol in &all {
            self.ingest_one(symbol, today, force, &mut stats);
        }
        info!("update done: {}", stats);
        stats
    }

    fn ingest_one(&mut self, symbol: &str, date: NaiveDate, force: bool, stats: &mut IngestStats) {
        let stored = storage_symbol(symbol);
        if !force {
            match self.store.exists(&stored, date) {
                Ok(true) => {
                    debug!("{} {}: already stored, skipping", stored, date);
                    stats.skipped += 1;
                    return;
                }
                Ok(false) => {}
                Err(e) => {
                    warn!("{} {}: existence check failed: {}", stored, date, e);
                    stats.failed += 1;
                    return;
                }
            }
        }

        let rows = match self.source.fetch_day(symbol, date) {
            Ok(rows) => rows,
            Err(e) => {
                warn!("{} {}: fetch failed: {}", symbol, date, e);
                stats.failed += 1;
                return;
            }
        };
        stats.fetched += 1;

        let bars = self.normalizer.normalize(symbol, date, &rows);
        if bars.is_empty() {
            info!("{} {}: no bars in session window", stored, date);
            stats.empty += 1;
            return;
        }

        match self.store.insert_many(&bars) {
            Ok(count) => {
                info!("{} {}: inserted {} bars", stored, date, count);
                stats.inserted += count;
            }
            Err(e) => {
                warn!("{} {}: insert failed: {}", stored, date, e);
                stats.failed += 1;
            }
        }
    }

    /// The store, for post-run inspection.
    pub fn store(&self) -> &B {
        &self.store
    }
}
