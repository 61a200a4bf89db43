//! Command handlers: load the row matrices, run the engine, print the result.

use anyhow::{Context, Result};
use itertools::Itertools;
use log::info;
use serde::Serialize;

use crate::{
    cli::{FieldsArgs, OutputFormat, RankingArgs, SourceArgs, ViewArgs},
    data::{Row, format_number},
    filter::DateRange,
    io_utils,
    planner::plan_visualizations,
    profile::Profile,
    report::{self, ReportOptions},
    schema::Schema,
    stats::compute_aggregates,
    table,
};

fn base_options(source: &SourceArgs) -> Result<ReportOptions> {
    let mut options = match &source.profile {
        Some(path) => Profile::load(path)
            .with_context(|| format!("Loading profile from {path:?}"))?
            .to_options(),
        None => ReportOptions::default(),
    };
    if let Some(layout) = source.layout {
        options.layout = layout;
    }
    Ok(options)
}

fn view_options(args: &ViewArgs) -> Result<ReportOptions> {
    let mut options = base_options(&args.source)?;
    if let Some(alignment) = args.align {
        options.alignment = alignment;
    }
    if let Some(order) = args.date_order {
        options.date_order = order;
    }
    if let Some(absent) = args.absent {
        options.absence = absent;
    }
    if args.date_field.is_some() {
        options.date_field = args.date_field.clone();
    }
    if args.period_field.is_some() {
        options.period_field = args.period_field.clone();
    }
    options.range = DateRange::new(args.start.as_deref(), args.end.as_deref());
    options.period = args.period.clone();
    if !args.series_fields.is_empty() {
        options.series_fields = args.series_fields.clone();
    }
    Ok(options)
}

fn ranking_options(args: &RankingArgs) -> Result<ReportOptions> {
    let mut options = view_options(&args.view)?;
    if args.group_field.is_some() {
        options.ranking_group = args.group_field.clone();
    }
    if !args.rank_fields.is_empty() {
        options.ranking_fields = args.rank_fields.clone();
    }
    if let Some(top) = args.top {
        options.top_n = top;
    }
    Ok(options)
}

fn load_config_rows(source: &SourceArgs) -> Result<Vec<Row>> {
    let encoding = io_utils::resolve_encoding(source.input_encoding.as_deref())?;
    io_utils::read_rows(&source.config, source.delimiter, encoding)
        .with_context(|| format!("Loading config rows from {:?}", source.config))
}

fn load_data_rows(args: &ViewArgs) -> Result<Vec<Row>> {
    let encoding = io_utils::resolve_encoding(args.source.input_encoding.as_deref())?;
    io_utils::read_rows(&args.data, args.source.delimiter, encoding)
        .with_context(|| format!("Loading data rows from {:?}", args.data))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("Serializing JSON output")?;
    println!("{rendered}");
    Ok(())
}

fn metric(value: f64) -> String {
    if value.fract() == 0.0 {
        format_number(value)
    } else {
        format!("{value:.4}")
    }
}

fn strings<const N: usize>(values: [&str; N]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

pub fn fields(args: &FieldsArgs) -> Result<()> {
    let options = base_options(&args.source)?;
    let rows = load_config_rows(&args.source)?;
    let schema = Schema::from_rows(&rows, options.layout)
        .with_context(|| format!("Parsing config rows from {:?}", args.source.config))?;

    match args.source.format {
        OutputFormat::Json => print_json(&schema.fields())?,
        OutputFormat::Table => {
            let rendered = schema
                .fields()
                .iter()
                .enumerate()
                .map(|(idx, field)| {
                    vec![
                        (idx + 1).to_string(),
                        field.field_name.clone(),
                        field.label.clone(),
                        field.field_type.to_string(),
                        if field.has_order() {
                            field.order.to_string()
                        } else {
                            String::new()
                        },
                    ]
                })
                .collect_vec();
            table::print_table(&strings(["#", "field", "label", "type", "order"]), &rendered);
        }
    }
    info!(
        "Classified {} field(s) from {:?}",
        schema.fields().len(),
        args.source.config
    );
    Ok(())
}

pub fn plan(args: &FieldsArgs) -> Result<()> {
    let options = base_options(&args.source)?;
    let rows = load_config_rows(&args.source)?;
    let schema = Schema::from_rows(&rows, options.layout)
        .with_context(|| format!("Parsing config rows from {:?}", args.source.config))?;
    let flags = plan_visualizations(&schema.groups());

    match args.source.format {
        OutputFormat::Json => print_json(&flags)?,
        OutputFormat::Table => {
            let rendered = [
                ("timeSeries", flags.time_series),
                ("ranking", flags.ranking),
                ("kpiSummary", flags.kpi_summary),
                ("periodSelector", flags.period_selector),
            ]
            .into_iter()
            .map(|(view, available)| vec![view.to_string(), available.to_string()])
            .collect_vec();
            table::print_table(&strings(["view", "available"]), &rendered);
        }
    }
    Ok(())
}

pub fn records(args: &ViewArgs) -> Result<()> {
    let options = view_options(args)?;
    let config = load_config_rows(&args.source)?;
    let data = load_data_rows(args)?;
    let dataset = report::load_dataset(&config, &data, &options)
        .with_context(|| format!("Parsing config rows from {:?}", args.source.config))?;

    match args.source.format {
        OutputFormat::Json => print_json(&dataset)?,
        OutputFormat::Table => {
            let headers = dataset
                .fields
                .iter()
                .map(|field| field.field_name.clone())
                .collect_vec();
            let rendered = dataset
                .records
                .iter()
                .map(|record| {
                    headers
                        .iter()
                        .map(|name| record.get(name).to_string())
                        .collect()
                })
                .collect::<Vec<Vec<String>>>();
            table::print_table(&headers, &rendered);
        }
    }
    info!("Mapped {} record(s) from {:?}", dataset.records.len(), args.data);
    Ok(())
}

pub fn summary(args: &ViewArgs) -> Result<()> {
    let options = view_options(args)?;
    let config = load_config_rows(&args.source)?;
    let data = load_data_rows(args)?;
    let dataset = report::load_dataset(&config, &data, &options)
        .with_context(|| format!("Parsing config rows from {:?}", args.source.config))?;
    let summary = compute_aggregates(
        &dataset.records,
        &dataset.groups.number_fields,
        options.absence,
    );

    match args.source.format {
        OutputFormat::Json => print_json(&summary)?,
        OutputFormat::Table => {
            let rendered = summary
                .entries
                .iter()
                .map(|entry| {
                    vec![
                        entry.field.clone(),
                        entry.label.clone(),
                        entry.result.count.to_string(),
                        metric(entry.result.sum),
                        metric(entry.result.avg),
                        metric(entry.result.min),
                        metric(entry.result.max),
                    ]
                })
                .collect_vec();
            table::print_table(
                &strings(["field", "label", "count", "sum", "avg", "min", "max"]),
                &rendered,
            );
        }
    }
    info!(
        "Computed KPI summary for {} numeric field(s)",
        summary.entries.len()
    );
    Ok(())
}

pub fn series(args: &ViewArgs) -> Result<()> {
    let options = view_options(args)?;
    let config = load_config_rows(&args.source)?;
    let data = load_data_rows(args)?;
    let report = report::build_report(&config, &data, &options)
        .with_context(|| format!("Parsing config rows from {:?}", args.source.config))?;
    if !report.visualization_flags.time_series {
        info!("Schema has no date field paired with a numeric field; series is empty");
    }

    match args.source.format {
        OutputFormat::Json => print_json(&report.series)?,
        OutputFormat::Table => {
            let mut headers = vec!["date".to_string()];
            if let Some(first) = report.series.first() {
                headers.extend(first.totals.iter().map(|(name, _)| name.clone()));
            }
            let rendered = report
                .series
                .iter()
                .map(|point| {
                    std::iter::once(point.date.clone())
                        .chain(point.totals.iter().map(|(_, total)| metric(*total)))
                        .collect()
                })
                .collect::<Vec<Vec<String>>>();
            table::print_table(&headers, &rendered);
        }
    }
    info!("Built {} time series point(s)", report.series.len());
    Ok(())
}

pub fn ranking(args: &RankingArgs) -> Result<()> {
    let options = ranking_options(args)?;
    let config = load_config_rows(&args.view.source)?;
    let data = load_data_rows(&args.view)?;
    let report = report::build_report(&config, &data, &options)
        .with_context(|| format!("Parsing config rows from {:?}", args.view.source.config))?;
    if !report.visualization_flags.ranking {
        info!("Schema has no text field paired with a numeric field; ranking is empty");
    }

    match args.view.source.format {
        OutputFormat::Json => print_json(&report.ranking)?,
        OutputFormat::Table => {
            let mut headers = strings(["#", "group"]);
            if let Some(first) = report.ranking.first() {
                headers.extend(first.totals.iter().map(|(name, _)| name.clone()));
            }
            let rendered = report
                .ranking
                .iter()
                .enumerate()
                .map(|(idx, row)| {
                    [(idx + 1).to_string(), row.group.clone()]
                        .into_iter()
                        .chain(row.totals.iter().map(|(_, total)| metric(*total)))
                        .collect()
                })
                .collect::<Vec<Vec<String>>>();
            table::print_table(&headers, &rendered);
        }
    }
    info!("Ranked {} group(s)", report.ranking.len());
    Ok(())
}

pub fn full_report(args: &RankingArgs) -> Result<()> {
    let options = ranking_options(args)?;
    let config = load_config_rows(&args.view.source)?;
    let data = load_data_rows(&args.view)?;
    let report = report::build_report(&config, &data, &options)
        .with_context(|| format!("Parsing config rows from {:?}", args.view.source.config))?;
    print_json(&report)
}
