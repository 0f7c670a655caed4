//! Configuration structures for the basket-bars system.

use serde::{Deserialize, Serialize};

/// Main configuration for the ingestion and analytics pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Trading session configuration.
    pub session: SessionConfig,
    /// Reference instrument configuration.
    pub reference: ReferenceConfig,
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Ticker universe configuration.
    pub universe: UniverseConfig,
    /// Market-data fetch configuration.
    pub fetch: FetchConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            reference: ReferenceConfig::default(),
            storage: StorageConfig::default(),
            universe: UniverseConfig::default(),
            fetch: FetchConfig::default(),
        }
    }
}

/// Regular trading session parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// IANA timezone name of the session (e.g., "US/Eastern").
    pub timezone: String,
    /// Session open hour (local wall clock).
    pub open_hour: u32,
    /// Session open minute.
    pub open_minute: u32,
    /// Session close hour (local wall clock).
    pub close_hour: u32,
    /// Session close minute.
    pub close_minute: u32,
    /// Session length in minutes.
    pub minutes_per_session: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timezone: "US/Eastern".to_string(),
            open_hour: 9,
            open_minute: 30,
            close_hour: 16,
            close_minute: 0,
            // 6.5 trading hours * 60
            minutes_per_session: 390,
        }
    }
}

/// Reference instruments tracked alongside the universe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceConfig {
    /// Index ETF whose holdings the universe tracks (comparison
    /// reference and prediction label).
    pub index_etf: String,
    /// Volatility index, provider symbol (stored with the caret stripped).
    pub volatility_index: String,
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            index_etf: "QQQ".to_string(),
            volatility_index: "^VIX".to_string(),
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    pub db_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: "minute_bars.db".to_string(),
        }
    }
}

/// Ticker universe reference file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UniverseConfig {
    /// Path to the universe CSV file.
    pub csv_path: String,
}

impl Default for UniverseConfig {
    fn default() -> Self {
        Self {
            csv_path: "tickers.csv".to_string(),
        }
    }
}

/// Market-data fetch configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Base URL of the chart API.
    pub base_url: String,
    /// Bar interval to request.
    pub interval: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: "https://query1.finance.yahoo.com".to_string(),
            interval: "1m".to_string(),
            timeout_secs: 30,
        }
    }
}
