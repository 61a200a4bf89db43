use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::{
    dates::DateOrder, records::Alignment, schema::ConfigLayout, stats::AbsencePolicy,
};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Turn spreadsheet config and data rows into typed records and dashboard views",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Parse the config sheet and list its classified fields
    Fields(FieldsArgs),
    /// Map data rows into records and apply filters
    Records(ViewArgs),
    /// KPI summary (sum, avg, min, max, count) for every numeric field
    Summary(ViewArgs),
    /// Numeric totals grouped by date
    Series(ViewArgs),
    /// Top-N groups of a categorical field by summed numeric fields
    Ranking(RankingArgs),
    /// Show which views the config schema can support
    Plan(FieldsArgs),
    /// Emit fields, records, and every derived view as one JSON document
    Report(RankingArgs),
}

#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq)]
#[value(rename_all = "kebab-case")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Debug, Args)]
pub struct SourceArgs {
    /// Config sheet export (CSV, TSV, or a JSON array of rows)
    #[arg(short = 'c', long = "config")]
    pub config: PathBuf,
    /// YAML report profile supplying defaults for the flags below
    #[arg(short = 'p', long = "profile")]
    pub profile: Option<PathBuf>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of CSV inputs (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// How config columns are located: headers or fixed
    #[arg(long)]
    pub layout: Option<ConfigLayout>,
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Debug, Args)]
pub struct FieldsArgs {
    #[command(flatten)]
    pub source: SourceArgs,
}

#[derive(Debug, Args)]
pub struct ViewArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// Data sheet export (CSV, TSV, or a JSON array of rows)
    #[arg(short = 'd', long = "data")]
    pub data: PathBuf,
    /// Column alignment for data rows: index (config order) or header (names)
    #[arg(long)]
    pub align: Option<Alignment>,
    /// Reading of ambiguous dates such as 05/06/2024: month_first or day_first
    #[arg(long = "date-order")]
    pub date_order: Option<DateOrder>,
    /// Date field used for range filtering and time series
    #[arg(long = "date-field")]
    pub date_field: Option<String>,
    /// Inclusive start date
    #[arg(long)]
    pub start: Option<String>,
    /// Inclusive end date
    #[arg(long)]
    pub end: Option<String>,
    /// Period field to filter on (defaults to the schema's period field)
    #[arg(long = "period-field")]
    pub period_field: Option<String>,
    /// Keep only records whose period field equals this value
    #[arg(long)]
    pub period: Option<String>,
    /// Which numeric values count as absent in KPIs: zero or none
    #[arg(long = "absent")]
    pub absent: Option<AbsencePolicy>,
    /// Numeric fields summed in the time series (comma-separated)
    #[arg(long = "series-fields", value_delimiter = ',')]
    pub series_fields: Vec<String>,
}

#[derive(Debug, Args)]
pub struct RankingArgs {
    #[command(flatten)]
    pub view: ViewArgs,
    /// Categorical field to group by (defaults to the first text field)
    #[arg(long = "group-field")]
    pub group_field: Option<String>,
    /// Numeric fields to sum; the first one drives the order
    #[arg(long = "rank-fields", value_delimiter = ',')]
    pub rank_fields: Vec<String>,
    /// Number of groups to keep (0 keeps all)
    #[arg(long)]
    pub top: Option<usize>,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
