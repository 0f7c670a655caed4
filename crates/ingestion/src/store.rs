//! Minute bar persistence.
//!
//! `BarStore` is the storage seam consumed by the ingestion orchestrator and
//! the analytics read path; `SqliteBarStore` implements it over a single
//! SQLite table with a (ticker, date, minute_index) uniqueness constraint.

use basket_core::{Bar, Error, Result};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, params_from_iter, Connection};
use std::path::Path;
use tracing::debug;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Storage interface for minute bars.
pub trait BarStore {
    /// Whether any bars are stored for the ticker on the date.
    fn exists(&self, ticker: &str, date: NaiveDate) -> Result<bool>;

    /// Insert a batch of bars atomically.
    ///
    /// The whole batch is applied in one transaction. The first uniqueness
    /// conflict rolls everything back and surfaces `DuplicateKey`; a batch is
    /// never applied partially. Returns the number of bars written.
    fn insert_many(&mut self, bars: &[Bar]) -> Result<usize>;

    /// All bars for the given tickers on a date, ordered by ticker then
    /// minute index.
    fn query(&self, tickers: &[String], date: NaiveDate) -> Result<Vec<Bar>>;

    /// Sorted distinct dates with bars, optionally restricted to tickers.
    fn distinct_dates(&self, tickers: Option<&[String]>) -> Result<Vec<NaiveDate>>;

    /// Sorted distinct tickers with bars.
    fn distinct_tickers(&self) -> Result<Vec<String>>;

    /// Number of stored bars, optionally for a single ticker.
    fn count(&self, ticker: Option<&str>) -> Result<u64>;
}

/// SQLite-backed bar store.
pub struct SqliteBarStore {
    conn: Connection,
}

impl SqliteBarStore {
    /// Open (or create) a file-backed store.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())
            .map_err(|e| Error::storage(format!("open database: {e}")))?;
        debug!("opened bar store at {}", path.as_ref().display());
        Self::with_connection(conn)
    }

    /// Open an in-memory store (used by tests).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::storage(format!("open in-memory database: {e}")))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS minute_bars (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    ticker TEXT NOT NULL,
                    date TEXT NOT NULL,
                    minute_index INTEGER NOT NULL,
                    timestamp TEXT NOT NULL,
                    open REAL NOT NULL,
                    high REAL NOT NULL,
                    low REAL NOT NULL,
                    close REAL NOT NULL,
                    volume INTEGER NOT NULL,
                    UNIQUE (ticker, date, minute_index)
                );
                CREATE INDEX IF NOT EXISTS idx_minute_bars_ticker_date
                    ON minute_bars (ticker, date);",
            )
            .map_err(|e| Error::storage(format!("initialize schema: {e}")))
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

fn row_to_bar(row: &rusqlite::Row<'_>) -> rusqlite::Result<Bar> {
    let date_text: String = row.get(1)?;
    let timestamp_text: String = row.get(3)?;
    let date = NaiveDate::parse_from_str(&date_text, DATE_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let timestamp =
        NaiveDateTime::parse_from_str(&timestamp_text, TIMESTAMP_FORMAT).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
        })?;
    let minute_index: i64 = row.get(2)?;
    let volume: i64 = row.get(8)?;
    Ok(Bar {
        ticker: row.get(0)?,
        date,
        minute_index: minute_index as u32,
        timestamp,
        open: row.get(4)?,
        high: row.get(5)?,
        low: row.get(6)?,
        close: row.get(7)?,
        volume: volume as u64,
    })
}

impl BarStore for SqliteBarStore {
    fn exists(&self, ticker: &str, date: NaiveDate) -> Result<bool> {
        let count: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM minute_bars WHERE ticker = ?1 AND date = ?2",
                params![ticker, date.format(DATE_FORMAT).to_string()],
                |row| row.get(0),
            )
            .map_err(|e| Error::storage(format!("existence check: {e}")))?;
        Ok(count > 0)
    }

    fn insert_many(&mut self, bars: &[Bar]) -> Result<usize> {
        if bars.is_empty() {
            return Ok(0);
        }
        let tx = self
            .conn
            .transaction()
            .map_err(|e| Error::storage(format!("begin transaction: {e}")))?;
        {
            let mut stmt = tx
                .prepare_cached(
                    "INSERT INTO minute_bars
                     (ticker, date, minute_index, timestamp, open, high, low, close, volume)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                )
                .map_err(|e| Error::storage(format!("prepare insert: {e}")))?;
            for bar in bars {
                stmt.execute(params![
                    bar.ticker,
                    bar.date.format(DATE_FORMAT).to_string(),
                    bar.minute_index,
                    bar.timestamp.format(TIMESTAMP_FORMAT).to_string(),
                    bar.open,
                    bar.high,
                    bar.low,
                    bar.close,
                    bar.volume as i64,
                ])
                .map_err(|e| {
                    // Dropping the transaction on the error path rolls the
                    // whole batch back
                    if is_unique_violation(&e) {
                        Error::duplicate_key(format!(
                            "bar already stored for {} {} minute {}",
                            bar.ticker, bar.date, bar.minute_index
                        ))
                    } else {
                        Error::storage(format!("insert bar: {e}"))
                    }
                })?;
            }
        }
        tx.commit()
            .map_err(|e| Error::storage(format!("commit insert: {e}")))?;
        Ok(bars.len())
    }

    fn query(&self, tickers: &[String], date: NaiveDate) -> Result<Vec<Bar>> {
        if tickers.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; tickers.len()].join(", ");
        let sql = format!(
            "SELECT ticker, date, minute_index, timestamp, open, high, low, close, volume
             FROM minute_bars
             WHERE ticker IN ({placeholders}) AND date = ?
             ORDER BY ticker, minute_index"
        );
        let mut values: Vec<String> = tickers.to_vec();
        values.push(date.format(DATE_FORMAT).to_string());

        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| Error::storage(format!("prepare query: {e}")))?;
        let rows = stmt
            .query_map(params_from_iter(values.iter()), row_to_bar)
            .map_err(|e| Error::storage(format!("query bars: {e}")))?;

        let mut bars = Vec::new();
        for row in rows {
            bars.push(row.map_err(|e| Error::storage(format!("read bar row: {e}")))?);
        }
        Ok(bars)
    }

    fn distinct_dates(&self, tickers: Option<&[String]>) -> Result<Vec<NaiveDate>> {
        let (sql, values) = match tickers {
            Some(list) => {
                if list.is_empty() {
                    return Ok(Vec::new());
                }
                let placeholders = vec!["?"; list.len()].join(", ");
                (
                    format!(
                        "SELECT DISTINCT date FROM minute_bars
                         WHERE ticker IN ({placeholders}) ORDER BY date"
                    ),
                    list.to_vec(),
                )
            }
            None => (
                "SELECT DISTINCT date FROM minute_bars ORDER BY date".to_string(),
                Vec::new(),
            ),
        };
        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| Error::storage(format!("prepare date query: {e}")))?;
        let rows = stmt
            .query_map(params_from_iter(values.iter()), |row| {
                row.get::<_, String>(0)
            })
            .map_err(|e| Error::storage(format!("query dates: {e}")))?;

        let mut dates = Vec::new();
        for row in rows {
            let text = row.map_err(|e| Error::storage(format!("read date row: {e}")))?;
            let date = NaiveDate::parse_from_str(&text, DATE_FORMAT)
                .map_err(|e| Error::storage(format!("parse stored date '{text}': {e}")))?;
            dates.push(date);
        }
        Ok(dates)
    }

    fn distinct_tickers(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT ticker FROM minute_bars ORDER BY ticker")
            .map_err(|e| Error::storage(format!("prepare ticker query: {e}")))?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| Error::storage(format!("query tickers: {e}")))?;

        let mut tickers = Vec::new();
        for row in rows {
            tickers.push(row.map_err(|e| Error::storage(format!("read ticker row: {e}")))?);
        }
        Ok(tickers)
    }

    fn count(&self, ticker: Option<&str>) -> Result<u64> {
        let count: i64 = match ticker {
            Some(ticker) => self
                .conn
                .query_row(
                    "SELECT COUNT(*) FROM minute_bars WHERE ticker = ?1",
                    params![ticker],
                    |row| row.get(0),
                )
                .map_err(|e| Error::storage(format!("count bars: {e}")))?,
            None => self
                .conn
                .query_row("SELECT COUNT(*) FROM minute_bars", [], |row| row.get(0))
                .map_err(|e| Error::storage(format!("count bars: {e}")))?,
        };
        Ok(count as u64)
    }
}
