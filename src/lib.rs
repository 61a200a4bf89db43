//! Schema-as-data pipeline for spreadsheet-backed dashboards.
//!
//! Config rows declare the fields; data rows carry the observations. The
//! library classifies the schema, maps rows into records, normalizes dates,
//! filters, and derives KPI summaries, time series, and rankings, along with
//! flags describing which of those views the schema can support. Every step
//! is a pure function over in-memory row matrices.

pub mod cli;
pub mod commands;
pub mod data;
pub mod dates;
pub mod error;
pub mod filter;
pub mod io_utils;
pub mod planner;
pub mod profile;
pub mod ranking;
pub mod records;
pub mod report;
pub mod schema;
pub mod series;
pub mod stats;
pub mod table;

use std::{env, sync::OnceLock};

use anyhow::Result;
use clap::Parser;
use log::{LevelFilter, debug};

use crate::cli::{Cli, Commands};

pub use crate::{
    data::{Cell, Row},
    dates::{CanonicalDate, DateNormalizer, DateOrder, normalize},
    error::SchemaError,
    filter::{DateRange, filter_by_date_range, filter_by_period},
    planner::{VisualizationFlags, plan_visualizations},
    ranking::{RankingRow, create_ranking},
    records::{Alignment, Record, map_records},
    report::{Report, ReportOptions, build_report},
    schema::{ConfigLayout, FieldDescriptor, FieldGroups, FieldType, classify_by_type, parse_fields},
    series::{TimeSeriesPoint, group_by_date},
    stats::{AbsencePolicy, AggregateResult, compute_aggregate, compute_aggregate_with},
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("sheet_insights", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    debug!("Parsed command line: {:?}", cli.command);
    match cli.command {
        Commands::Fields(args) => commands::fields(&args),
        Commands::Records(args) => commands::records(&args),
        Commands::Summary(args) => commands::summary(&args),
        Commands::Series(args) => commands::series(&args),
        Commands::Ranking(args) => commands::ranking(&args),
        Commands::Plan(args) => commands::plan(&args),
        Commands::Report(args) => commands::full_report(&args),
    }
}
