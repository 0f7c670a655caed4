//! Ticker universe reference file.
//!
//! The universe is a CSV file with columns `ticker`, `QQQ_holding`
//! (0/1 membership flag) and `allocation_percentage` (optionally
//! percent-suffixed). Parsing is lenient to match the upstream file:
//! non-numeric membership flags coerce to non-member and malformed
//! allocations to zero.

use crate::error::{Error, Result};
use crate::types::Holding;
use ordered_float::OrderedFloat;
use serde::Deserialize;
use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::path::Path;

/// One parsed row of the universe file.
#[derive(Debug, Clone, PartialEq)]
pub struct UniverseEntry {
    /// Ticker symbol.
    pub ticker: String,
    /// Whether the ticker is a member of the tracked index.
    pub index_member: bool,
    /// Allocation weight as a percentage (0.0 when absent or malformed).
    pub allocation_pct: f64,
}

/// Raw CSV record. Fields come in as strings and are coerced in code so a
/// single malformed cell never rejects the file.
#[derive(Debug, Deserialize)]
struct UniverseRecord {
    ticker: String,
    #[serde(rename = "QQQ_holding")]
    membership: String,
    #[serde(rename = "allocation_percentage")]
    allocation: String,
}

fn parse_membership(raw: &str) -> bool {
    raw.trim().parse::<f64>().map(|v| v == 1.0).unwrap_or(false)
}

fn parse_allocation(raw: &str) -> f64 {
    raw.trim()
        .trim_end_matches('%')
        .parse::<f64>()
        .unwrap_or(0.0)
}

/// In-memory view of the universe reference file, preserving file order.
#[derive(Debug, Clone)]
pub struct Universe {
    entries: Vec<UniverseEntry>,
}

impl Universe {
    /// Load the universe from a CSV file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)?;
        let mut entries = Vec::new();
        for record in reader.deserialize() {
            let record: UniverseRecord = record?;
            entries.push(UniverseEntry {
                ticker: record.ticker.trim().to_string(),
                index_member: parse_membership(&record.membership),
                allocation_pct: parse_allocation(&record.allocation),
            });
        }
        Ok(Self { entries })
    }

    /// Build a universe directly from entries (primarily for tests).
    pub fn from_entries(entries: Vec<UniverseEntry>) -> Self {
        Self { entries }
    }

    /// All parsed rows in file order.
    pub fn entries(&self) -> &[UniverseEntry] {
        &self.entries
    }

    /// Every ticker in the file, in file order.
    pub fn tickers(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.ticker.clone()).collect()
    }

    /// Tickers flagged as index members, in file order.
    ///
    /// Fails with `NoData` when the file contains no members.
    pub fn members(&self) -> Result<Vec<String>> {
        let members: Vec<String> = self
            .entries
            .iter()
            .filter(|e| e.index_member)
            .map(|e| e.ticker.clone())
            .collect();
        if members.is_empty() {
            return Err(Error::no_data("no index members in universe file"));
        }
        Ok(members)
    }

    /// The top `n` index members ranked by allocation weight descending,
    /// ties broken by file order, with weights as fractions.
    pub fn top_holdings(&self, n: usize) -> Result<Vec<Holding>> {
        let mut members: Vec<&UniverseEntry> =
            self.entries.iter().filter(|e| e.index_member).collect();
        if members.is_empty() {
            return Err(Error::no_data("no index members in universe file"));
        }
        // Stable sort keeps file order between equal allocations
        members.sort_by_key(|e| Reverse(OrderedFloat(e.allocation_pct)));
        Ok(members
            .into_iter()
            .take(n)
            .map(|e| Holding {
                ticker: e.ticker.clone(),
                weight: e.allocation_pct / 100.0,
            })
            .collect())
    }

    /// Allocation weights for every row, as fractions keyed by ticker.
    pub fn weights(&self) -> BTreeMap<String, f64> {
        self.entries
            .iter()
            .map(|e| (e.ticker.clone(), e.allocation_pct / 100.0))
            .collect()
    }
}
