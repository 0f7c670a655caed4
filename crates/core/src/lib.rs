//! Core types and configuration for the basket-bars system.
//!
//! This crate provides shared building blocks used across all other crates:
//! - Minute-bar data types
//! - Session clock (timezone conversion and minute indexing)
//! - Ticker universe reference-file loading
//! - Configuration structures
//! - Common error types

pub mod config;
pub mod error;
pub mod session;
pub mod types;
pub mod universe;

pub use config::Config;
pub use error::{Error, Result};
pub use session::SessionClock;
pub use types::*;
pub use universe::Universe;
