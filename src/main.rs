//! Listings aggregator CLI
//!
//! Usage:
//!   listings-aggregator --view overview
//!   listings-aggregator --view short-stay --params "neighbourhood_group=Queens&room_type=both"
//!   listings-aggregator --view trend --params "room_type=Private room" --format table

mod config;

use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use jemallocator::Jemalloc;
use listings_aggregator::processor::aggregator::AggregateRecord;
use listings_aggregator::processor::listing_table::ListingTable;
use listings_aggregator::processor::query_builder::QueryCache;
use listings_aggregator::processor::trend::ReferencePoint;
use listings_aggregator::view::{ChartView, NavigationParams, ViewKind, ViewOutput};
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::{Config, OutputFormat};

#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

#[derive(Parser)]
#[command(name = "listings-aggregator")]
#[command(about = "Aggregate NYC Airbnb listings into chart-ready records")]
struct Cli {
    /// Listings CSV (defaults to $LISTINGS_CSV or ./NYC-Airbnb-2023.csv)
    #[arg(long)]
    data: Option<PathBuf>,

    /// Chart to compute
    #[arg(long, value_enum, default_value_t = ViewKind::Overview)]
    view: ViewKind,

    /// Navigation query string, e.g. "neighbourhood_group=Brooklyn&room_type=Private room"
    #[arg(long, default_value = "")]
    params: String,

    /// Fold groups smaller than this into "Other"
    #[arg(long)]
    threshold: Option<usize>,

    /// Defaults to $OUTPUT_FORMAT or json
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("listings_aggregator=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut cfg = Config::from_env()?;
    if let Some(data) = cli.data {
        cfg.data_path = data;
    }
    if cli.threshold.is_some() {
        cfg.bucket_threshold = cli.threshold;
    }
    if let Some(format) = cli.format {
        cfg.format = format;
    }

    let params = NavigationParams::parse(&cli.params);
    let view = ChartView::from_navigation(cli.view, &params)?;

    let mut table = ListingTable::new();
    table
        .load_csv(&cfg.data_path)
        .with_context(|| format!("failed to load {}", cfg.data_path.display()))?;
    let table = Rc::new(table);
    let cache = Rc::new(QueryCache::new());

    info!(?view, threshold = ?cfg.bucket_threshold, "computing view");
    let output = view.compute(&table, Some(&cache), cfg.bucket_threshold)?;

    match cfg.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&output)?),
        OutputFormat::Table => print_table(&view, &output),
    }

    Ok(())
}

/// Display width of the key column; padding counts chars, not bytes
fn key_width(records: &[AggregateRecord]) -> usize {
    records
        .iter()
        .map(|r| r.key.chars().count())
        .max()
        .unwrap_or(3)
        .max(3)
}

/// CLI arguments that open the view behind a pie slice
fn drill_link(view: &ChartView, key: &str) -> Option<String> {
    let target = view.drill_target(key)?;
    let kind = target.kind().to_possible_value()?;
    Some(format!(
        "--view {} --params \"{}\"",
        kind.get_name(),
        target.navigation().to_query()
    ))
}

fn print_table(view: &ChartView, output: &ViewOutput) {
    match output {
        ViewOutput::Pie {
            records,
            price_extent,
        } => {
            let width = key_width(records);
            println!(
                "{:<width$}  {:>8}  {:>10}  {:>7}  drill-down",
                "key", "count", "avg price", "share"
            );
            for r in records {
                let link = drill_link(view, &r.key).unwrap_or_default();
                println!(
                    "{:<width$}  {:>8}  {:>10.2}  {:>6.2}%  {link}",
                    r.key, r.count, r.average_price, r.percentage
                );
            }
            if let Some(extent) = price_extent {
                println!("\naverage per-night cost: {}", extent.caption());
            }
        }
        ViewOutput::Line { points, hotel, rent } => {
            println!(
                "{:>6}  {:>8}  {:>10}  {:>10}  {:>10}",
                "year", "count", "avg price", "hotel", "rent"
            );
            for p in points {
                println!(
                    "{:>6}  {:>8}  {:>10.2}  {:>10}  {:>10}",
                    p.year,
                    p.count,
                    p.average_price,
                    reference_price(hotel, p.year),
                    reference_price(rent, p.year)
                );
            }
        }
    }
}

fn reference_price(series: &[ReferencePoint], year: i32) -> String {
    series
        .iter()
        .find(|r| r.year == year)
        .map(|r| format!("{:.2}", r.nightly_price))
        .unwrap_or_else(|| "-".to_string())
}
