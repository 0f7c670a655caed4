//! Market data source for raw minute bars.
//!
//! `BarSource` is the provider seam; `YahooChartSource` implements it with
//! blocking HTTP calls against the v8 chart endpoint. Payload parsing is
//! split out so it can be tested without network access.

use basket_core::config::FetchConfig;
use basket_core::{Error, RawBar, Result};
use chrono::{DateTime, NaiveDate, NaiveTime};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Provider interface: one call per ticker and trading date.
pub trait BarSource {
    /// Fetch the raw rows for a symbol on a date. An empty vector means the
    /// provider had no data; provider-reported failures are `Fetch` errors.
    fn fetch_day(&self, symbol: &str, date: NaiveDate) -> Result<Vec<RawBar>>;
}

/// Chart API response envelope.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteBlock>,
}

/// Per-minute value arrays, index-aligned with the timestamp array.
/// Provider gaps come through as nulls.
#[derive(Debug, Default, Deserialize)]
struct QuoteBlock {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

fn value_at(values: &[Option<f64>], index: usize) -> Option<f64> {
    values.get(index).copied().flatten()
}

/// Parse a chart API body into raw rows.
///
/// An error payload or an absent result is a `Fetch` error; a result with no
/// timestamps is an empty fetch. Null cells stay `None` so the normalizer can
/// reject the row.
pub fn parse_chart(body: &str, symbol: &str) -> Result<Vec<RawBar>> {
    let response: ChartResponse = serde_json::from_str(body)
        .map_err(|e| Error::fetch(format!("{symbol}: malformed chart payload: {e}")))?;

    if let Some(err) = response.chart.error {
        return Err(Error::fetch(format!(
            "{symbol}: {}: {}",
            err.code, err.description
        )));
    }
    let result = response
        .chart
        .result
        .and_then(|mut r| if r.is_empty() { None } else { Some(r.remove(0)) })
        .ok_or_else(|| Error::fetch(format!("{symbol}: chart response has no result")))?;

    if result.timestamp.is_empty() {
        return Ok(Vec::new());
    }
    let quote = result
        .indicators
        .quote
        .into_iter()
        .next()
        .unwrap_or_default();

    let mut rows = Vec::with_capacity(result.timestamp.len());
    for (i, epoch) in result.timestamp.iter().enumerate() {
        let timestamp = match DateTime::from_timestamp(*epoch, 0) {
            Some(dt) => dt.naive_utc(),
            None => continue,
        };
        rows.push(RawBar {
            timestamp,
            open: value_at(&quote.open, i),
            high: value_at(&quote.high, i),
            low: value_at(&quote.low, i),
            close: value_at(&quote.close, i),
            volume: value_at(&quote.volume, i),
        });
    }
    Ok(rows)
}

/// UTC midnight-to-midnight epoch window covering the requested date.
pub fn day_window(date: NaiveDate) -> Result<(i64, i64)> {
    let next = date
        .succ_opt()
        .ok_or_else(|| Error::invalid_argument(format!("date out of range: {date}")))?;
    let start = date.and_time(NaiveTime::MIN).and_utc().timestamp();
    let end = next.and_time(NaiveTime::MIN).and_utc().timestamp();
    Ok((start, end))
}

/// Blocking chart-API client.
pub struct YahooChartSource {
    base_url: String,
    interval: String,
    client: reqwest::blocking::Client,
}

impl YahooChartSource {
    /// Build a client from fetch configuration.
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent("Mozilla/5.0")
            .build()
            .map_err(|e| Error::fetch(format!("build http client: {e}")))?;
        Ok(Self {
            base_url: config.base_url.clone(),
            interval: config.interval.clone(),
            client,
        })
    }
}

impl BarSource for YahooChartSource {
    fn fetch_day(&self, symbol: &str, date: NaiveDate) -> Result<Vec<RawBar>> {
        let (period1, period2) = day_window(date)?;
        let url = format!("{}/v8/finance/chart/{}", self.base_url, symbol);
        debug!(%symbol, %date, "fetching chart data");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("period1", period1.to_string().as_str()),
                ("period2", period2.to_string().as_str()),
                ("interval", self.interval.as_str()),
                ("includePrePost", "false"),
            ])
            .send()
            .map_err(|e| Error::fetch(format!("{symbol}: request failed: {e}")))?
            .error_for_status()
            .map_err(|e| Error::fetch(format!("{symbol}: http error: {e}")))?;

        let body = response
            .text()
            .map_err(|e| Error::fetch(format!("{symbol}: read response body: {e}")))?;
        parse_chart(&body, symbol)
    }
}
