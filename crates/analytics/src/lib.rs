//! Cross-sectional analytics over stored minute bars.
//!
//! This crate handles:
//! - Minute-axis alignment of per-ticker series
//! - Holdings vs reference volume and price-change comparisons
//! - Lagged prediction dataset construction
//! - Weighted-correlation and OLS regression analysis

pub mod align;
pub mod comparison;
pub mod prediction;
pub mod regression;

pub use align::{AlignedTable, BarField};
pub use comparison::{Comparison, ComparisonAnalytics, ComparisonRow};
pub use prediction::{DatasetRow, PredictionDataset, PredictionDatasetBuilder};
pub use regression::{RegressionAnalyzer, RegressionReport};
