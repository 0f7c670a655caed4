//! Command implementations for the `basket` binary.

use crate::cli::{Cli, Command};
use anyhow::Context as _;
use basket_analytics::{
    Comparison, ComparisonAnalytics, PredictionDatasetBuilder, RegressionAnalyzer,
};
use basket_core::{storage_symbol, Config, SessionClock, Universe};
use basket_ingestion::{
    BarNormalizer, BarSource, BarStore, IngestionOrchestrator, SqliteBarStore, YahooChartSource,
};
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Shared command context: configuration plus the CLI path overrides.
struct Context {
    config: Config,
    db: PathBuf,
    universe: PathBuf,
}

pub fn run(cli: Cli) -> anyhow::Result<()> {
    let ctx = Context {
        config: Config::default(),
        db: cli.db,
        universe: cli.universe,
    };
    match cli.command {
        Command::Backfill { dates, tickers } => backfill(&ctx, &dates, tickers),
        Command::Update { force } => update(&ctx, force),
        Command::Dates => dates(&ctx),
        Command::Compare { date } => compare(&ctx, date),
        Command::Predict {
            date,
            top_n,
            regression,
        } => predict(&ctx, date, top_n, regression),
        Command::Status => status(&ctx),
        Command::Probe { symbol, date } => probe(&ctx, &symbol, date),
    }
}

fn open_store(path: &Path) -> anyhow::Result<SqliteBarStore> {
    SqliteBarStore::open(path).with_context(|| format!("open bar store at {}", path.display()))
}

fn load_universe(path: &Path) -> anyhow::Result<Universe> {
    Universe::load(path).with_context(|| format!("load universe file {}", path.display()))
}

fn orchestrator(
    ctx: &Context,
) -> anyhow::Result<IngestionOrchestrator<YahooChartSource, SqliteBarStore>> {
    let store = open_store(&ctx.db)?;
    let universe = load_universe(&ctx.universe)?;
    let clock = SessionClock::new(&ctx.config.session).context("construct session clock")?;
    let source = YahooChartSource::new(&ctx.config.fetch)?;
    let references = vec![
        ctx.config.reference.index_etf.clone(),
        ctx.config.reference.volatility_index.clone(),
    ];
    Ok(IngestionOrchestrator::new(
        source,
        store,
        clock,
        universe.tickers(),
        references,
    ))
}

fn backfill(
    ctx: &Context,
    dates: &[NaiveDate],
    tickers: Option<Vec<String>>,
) -> anyhow::Result<()> {
    let stats = orchestrator(ctx)?.backfill(dates, tickers.as_deref());
    println!("{stats}");
    Ok(())
}

fn update(ctx: &Context, force: bool) -> anyhow::Result<()> {
    let stats = orchestrator(ctx)?.update_all(force);
    println!("{stats}");
    Ok(())
}

/// Sorted dates present on the reference side that also appear on the
/// holdings side.
fn common_dates(reference_dates: Vec<NaiveDate>, member_dates: Vec<NaiveDate>) -> Vec<NaiveDate> {
    let members: BTreeSet<NaiveDate> = member_dates.into_iter().collect();
    reference_dates
        .into_iter()
        .filter(|date| members.contains(date))
        .collect()
}

fn dates(ctx: &Context) -> anyhow::Result<()> {
    let store = open_store(&ctx.db)?;
    let universe = load_universe(&ctx.universe)?;
    let reference = storage_symbol(&ctx.config.reference.index_etf);
    let members: Vec<String> = universe
        .members()?
        .iter()
        .map(|t| storage_symbol(t))
        .collect();

    let reference_dates = store.distinct_dates(Some(std::slice::from_ref(&reference)))?;
    let member_dates = store.distinct_dates(Some(&members))?;
    let common = common_dates(reference_dates, member_dates);

    if common.is_empty() {
        println!("no dates with both {reference} and holdings bars");
    } else {
        for date in common {
            println!("{date}");
        }
    }
    Ok(())
}

fn print_comparison(comparison: &Comparison, precision: usize) {
    println!(
        "{:>6} {:>16} {:>16} {:>16}",
        "minute", "holdings", "reference", "difference"
    );
    for row in &comparison.rows {
        println!(
            "{:>6} {:>16.precision$} {:>16.precision$} {:>16.precision$}",
            row.minute_index,
            row.holdings,
            row.reference,
            row.difference,
            precision = precision
        );
    }
    println!(
        "{:>6} {:>16.precision$} {:>16.precision$} {:>16.precision$}",
        "TOTAL",
        comparison.holdings_total,
        comparison.reference_total,
        comparison.difference_total,
        precision = precision
    );
}

fn compare(ctx: &Context, date: NaiveDate) -> anyhow::Result<()> {
    let store = open_store(&ctx.db)?;
    let universe = load_universe(&ctx.universe)?;
    let analytics = ComparisonAnalytics::new(&store, &universe, &ctx.config.reference.index_etf);
    let reference = storage_symbol(&ctx.config.reference.index_etf);

    let volume = analytics.volume_comparison(date)?;
    println!("Volume comparison for {date} (holdings vs {reference})");
    print_comparison(&volume, 0);

    let change = analytics.price_change_comparison(date)?;
    println!();
    println!("Price change comparison for {date} (holdings vs {reference})");
    print_comparison(&change, 4);
    Ok(())
}

fn predict(ctx: &Context, date: NaiveDate, top_n: usize, regression: bool) -> anyhow::Result<()> {
    let store = open_store(&ctx.db)?;
    let universe = load_universe(&ctx.universe)?;
    let builder = PredictionDatasetBuilder::new(
        &store,
        &universe,
        &ctx.config.reference.index_etf,
        &ctx.config.reference.volatility_index,
    );
    let dataset = builder.build(date, top_n, true)?;

    println!(
        "Prediction dataset for {date}: {} rows x {} features",
        dataset.rows.len(),
        dataset.feature_tickers.len()
    );
    print!("{:>6}", "minute");
    for ticker in &dataset.feature_tickers {
        print!(" {ticker:>10}");
    }
    println!(" {:>10}", "label");
    for row in &dataset.rows {
        print!("{:>6}", row.minute_index);
        for value in &row.features {
            match value {
                Some(v) => print!(" {v:>10.4}"),
                None => print!(" {:>10}", "-"),
            }
        }
        println!(" {:>10.4}", row.label);
    }

    if regression {
        let analyzer = RegressionAnalyzer::new(&universe);
        let report = analyzer.analyze(&dataset, &BTreeMap::new())?;
        println!();
        print!("{}", report.summary());
    }
    Ok(())
}

fn status(ctx: &Context) -> anyhow::Result<()> {
    let store = open_store(&ctx.db)?;
    let total = store.count(None)?;
    let tickers = store.distinct_tickers()?;
    let all_dates = store.distinct_dates(None)?;

    println!("Total bars: {total}");
    println!("Distinct tickers: {}", tickers.len());
    match (all_dates.first(), all_dates.last()) {
        (Some(first), Some(last)) => println!("Date range: {first} to {last}"),
        _ => println!("Date range: empty"),
    }
    if let Some(sample) = tickers.first() {
        let count = store.count(Some(sample))?;
        println!("Sample ticker {sample}: {count} bars");
        let sample_dates = store.distinct_dates(Some(std::slice::from_ref(sample)))?;
        if let Some(first_date) = sample_dates.first() {
            let bars = store.query(std::slice::from_ref(sample), *first_date)?;
            if let Some(bar) = bars.first() {
                println!("First bar: {}", serde_json::to_string_pretty(bar)?);
            }
        }
    }
    Ok(())
}

fn probe(ctx: &Context, symbol: &str, date: NaiveDate) -> anyhow::Result<()> {
    let clock = SessionClock::new(&ctx.config.session).context("construct session clock")?;
    let source = YahooChartSource::new(&ctx.config.fetch)?;
    let rows = source.fetch_day(symbol, date)?;
    let bars = BarNormalizer::new(clock).normalize(symbol, date, &rows);

    println!(
        "{symbol} {date}: {} raw rows, {} session bars",
        rows.len(),
        bars.len()
    );
    for bar in bars.iter().take(5) {
        println!(
            "  minute {:>3} {} o={:.4} h={:.4} l={:.4} c={:.4} v={}",
            bar.minute_index, bar.timestamp, bar.open, bar.high, bar.low, bar.close, bar.volume
        );
    }
    if bars.len() > 5 {
        println!("  ... {} more", bars.len() - 5);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn test_common_dates_keeps_sorted_intersection() {
        let reference = vec![d(15), d(16), d(17), d(18)];
        let members = vec![d(16), d(18), d(19)];
        assert_eq!(common_dates(reference, members), vec![d(16), d(18)]);
    }

    #[test]
    fn test_common_dates_empty_when_disjoint() {
        assert!(common_dates(vec![d(15)], vec![d(16)]).is_empty());
        assert!(common_dates(vec![], vec![d(16)]).is_empty());
    }
}
