//! End-to-end pipeline from the two row matrices to every derived view.
//!
//! [`build_report()`] runs the components in dependency order:
//!
//! 1. parse and classify the config rows ([`crate::schema`])
//! 2. map the data rows into records ([`crate::records`])
//! 3. apply the date-range and period filters ([`crate::filter`])
//! 4. derive the KPI summary, time series, and ranking
//!    ([`crate::stats`], [`crate::series`], [`crate::ranking`])
//! 5. report which views the schema supports ([`crate::planner`])
//!
//! Field overrides in [`ReportOptions`] are resolved against the schema; an
//! unknown name is logged and the schema default is used instead. A view whose
//! visualization flag is off is returned empty.

use log::{debug, info, warn};
use serde::Serialize;

use crate::{
    data::Row,
    dates::{DateNormalizer, DateOrder},
    error::SchemaError,
    filter::{DateRange, FilterSet, PeriodFilter},
    planner::{VisualizationFlags, plan_visualizations},
    ranking::{DEFAULT_TOP_N, RankingRow, create_ranking},
    records::{Alignment, Record, map_records},
    schema::{ConfigLayout, FieldDescriptor, FieldGroups, Schema},
    series::{TimeSeriesPoint, group_by_date},
    stats::{AbsencePolicy, KpiSummary, compute_aggregates},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOptions {
    pub layout: ConfigLayout,
    pub alignment: Alignment,
    pub date_order: DateOrder,
    pub absence: AbsencePolicy,
    pub top_n: usize,
    /// Date field used for the range filter and the time series.
    pub date_field: Option<String>,
    pub range: DateRange,
    pub period_field: Option<String>,
    pub period: Option<String>,
    pub ranking_group: Option<String>,
    pub ranking_fields: Vec<String>,
    pub series_fields: Vec<String>,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            layout: ConfigLayout::default(),
            alignment: Alignment::default(),
            date_order: DateOrder::default(),
            absence: AbsencePolicy::default(),
            top_n: DEFAULT_TOP_N,
            date_field: None,
            range: DateRange::default(),
            period_field: None,
            period: None,
            ranking_group: None,
            ranking_fields: Vec::new(),
            series_fields: Vec::new(),
        }
    }
}

impl ReportOptions {
    pub fn normalizer(&self) -> DateNormalizer {
        DateNormalizer::new(self.date_order)
    }
}

/// Raw mapped data: the schema and its filtered records.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Dataset {
    pub fields: Vec<FieldDescriptor>,
    pub records: Vec<Record>,
    #[serde(skip)]
    pub groups: FieldGroups,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub fields: Vec<FieldDescriptor>,
    pub records: Vec<Record>,
    pub aggregates: KpiSummary,
    pub series: Vec<TimeSeriesPoint>,
    pub ranking: Vec<RankingRow>,
    pub visualization_flags: VisualizationFlags,
}

fn resolve_field<'a>(
    schema: &'a Schema,
    requested: Option<&str>,
    fallback: Option<&'a FieldDescriptor>,
    role: &str,
) -> Option<&'a FieldDescriptor> {
    match requested.map(str::trim).filter(|name| !name.is_empty()) {
        Some(name) => match schema.field(name) {
            Some(field) => Some(field),
            None => {
                warn!("Unknown {role} field '{name}'; using the schema default");
                fallback
            }
        },
        None => fallback,
    }
}

fn resolve_fields(schema: &Schema, requested: &[String], fallback: &[FieldDescriptor], role: &str) -> Vec<String> {
    let resolved = requested
        .iter()
        .filter_map(|name| match schema.field(name) {
            Some(field) => Some(field.field_name.clone()),
            None => {
                warn!("Unknown {role} field '{name}' ignored");
                None
            }
        })
        .collect::<Vec<_>>();
    if resolved.is_empty() {
        fallback.iter().map(|field| field.field_name.clone()).collect()
    } else {
        resolved
    }
}

fn filters_for(schema: &Schema, groups: &FieldGroups, options: &ReportOptions) -> FilterSet {
    let date_field = resolve_field(
        schema,
        options.date_field.as_deref(),
        groups.date_fields.first(),
        "date",
    );
    let period = options
        .period
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .and_then(|value| {
            let field = resolve_field(
                schema,
                options.period_field.as_deref(),
                groups.period_field.as_ref(),
                "period",
            );
            if field.is_none() {
                warn!("Period '{value}' requested but the schema has no period field");
            }
            field.map(|field| PeriodFilter {
                field: field.field_name.clone(),
                value: value.to_string(),
            })
        });
    FilterSet {
        date_field: date_field.map(|field| field.field_name.clone()),
        range: options.range.clone(),
        period,
    }
}

/// Parses the schema, maps the data rows, and applies the filters.
pub fn load_dataset(
    config_rows: &[Row],
    data_rows: &[Row],
    options: &ReportOptions,
) -> Result<Dataset, SchemaError> {
    let schema = Schema::from_rows(config_rows, options.layout)?;
    let groups = schema.groups();
    let records = map_records(data_rows, schema.fields(), options.alignment);
    let filters = filters_for(&schema, &groups, options);
    debug!("Applying filters {filters:?}");
    let records = filters.apply(records, &options.normalizer());
    Ok(Dataset {
        fields: schema.into_fields(),
        records,
        groups,
    })
}

/// Builds every derived view over the filtered records.
pub fn build_report(
    config_rows: &[Row],
    data_rows: &[Row],
    options: &ReportOptions,
) -> Result<Report, SchemaError> {
    let dataset = load_dataset(config_rows, data_rows, options)?;
    let schema = Schema::new(dataset.fields.clone());
    let groups = &dataset.groups;
    let flags = plan_visualizations(groups);
    let normalizer = options.normalizer();

    let aggregates = if flags.kpi_summary {
        compute_aggregates(&dataset.records, &groups.number_fields, options.absence)
    } else {
        KpiSummary::default()
    };

    let series = match resolve_field(
        &schema,
        options.date_field.as_deref(),
        groups.date_fields.first(),
        "date",
    ) {
        Some(date_field) if flags.time_series => {
            let fields = resolve_fields(&schema, &options.series_fields, &groups.number_fields, "series");
            group_by_date(&dataset.records, &date_field.field_name, &fields, &normalizer)
        }
        _ => Vec::new(),
    };

    let ranking = match resolve_field(
        &schema,
        options.ranking_group.as_deref(),
        groups.text_fields.first(),
        "ranking group",
    ) {
        Some(group_field) if flags.ranking => {
            let fields = resolve_fields(&schema, &options.ranking_fields, &groups.number_fields, "ranking");
            create_ranking(&dataset.records, &group_field.field_name, &fields, options.top_n)
        }
        _ => Vec::new(),
    };

    info!(
        "Report covers {} field(s), {} record(s), {} series point(s), {} ranking row(s)",
        dataset.fields.len(),
        dataset.records.len(),
        series.len(),
        ranking.len()
    );
    Ok(Report {
        fields: dataset.fields,
        records: dataset.records,
        aggregates,
        series,
        ranking,
        visualization_flags: flags,
    })
}
