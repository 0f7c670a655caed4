//! Minute bar ingestion for the basket-bars system.
//!
//! This crate handles:
//! - Raw row normalization (session filtering, minute indexing, dedup)
//! - Bar persistence (SQLite behind a storage trait)
//! - Market data fetching (chart API behind a source trait)
//! - Run orchestration (idempotent skip, per-ticker failure isolation)

pub mod normalizer;
pub mod orchestrator;
pub mod source;
pub mod store;

pub use normalizer::BarNormalizer;
pub use orchestrator::{IngestStats, IngestionOrchestrator};
pub use source::{BarSource, YahooChartSource};
pub use store::{BarStore, SqliteBarStore};
