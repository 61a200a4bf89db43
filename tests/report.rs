mod common;

use common::{SALES_CONFIG, SALES_DATA, TestWorkspace, matrix};
use encoding_rs::UTF_8;
use sheet_insights::{
    Alignment, DateOrder, DateRange, ReportOptions, build_report, io_utils, profile::Profile,
    report::load_dataset,
};

fn load(workspace: &TestWorkspace) -> (Vec<sheet_insights::Row>, Vec<sheet_insights::Row>) {
    let config_path = workspace.write("config.csv", SALES_CONFIG);
    let data_path = workspace.write("data.csv", SALES_DATA);
    let config = io_utils::read_rows(&config_path, None, UTF_8).expect("config rows");
    let data = io_utils::read_rows(&data_path, None, UTF_8).expect("data rows");
    (config, data)
}

#[test]
fn report_from_csv_exports() {
    let workspace = TestWorkspace::new();
    let (config, data) = load(&workspace);

    let report = build_report(&config, &data, &ReportOptions::default()).expect("report");

    assert_eq!(report.records.len(), 5);
    let sales = report.aggregates.get("sales").expect("sales aggregate");
    assert_eq!(sales.count, 3);
    assert_eq!(sales.sum, 220.0);
    assert_eq!(sales.max, 100.0);
    assert_eq!(sales.min, 50.0);

    let dates = report
        .series
        .iter()
        .map(|point| point.date.as_str())
        .collect::<Vec<_>>();
    assert_eq!(
        dates,
        vec!["2024-01-01", "01/02/2024", "2024-01-02", "2024-04-01", "13/04/2024"]
    );

    let groups = report
        .ranking
        .iter()
        .map(|row| row.group.as_str())
        .collect::<Vec<_>>();
    assert_eq!(groups, vec!["South", "North", "East"]);
    assert!(report.visualization_flags.period_selector);
}

#[test]
fn period_and_range_filters_narrow_every_view() {
    let workspace = TestWorkspace::new();
    let (config, data) = load(&workspace);
    let options = ReportOptions {
        range: DateRange::new(Some("2024-04-01"), None),
        period: Some("Q2".to_string()),
        ..ReportOptions::default()
    };

    let report = build_report(&config, &data, &options).expect("report");

    assert_eq!(report.records.len(), 2);
    assert_eq!(report.aggregates.get("sales").map(|a| a.sum), Some(70.0));
    assert_eq!(report.ranking.len(), 2);
    assert_eq!(report.series.len(), 2);
}

#[test]
fn day_first_order_reinterprets_ambiguous_dates() {
    let workspace = TestWorkspace::new();
    let (config, data) = load(&workspace);
    let options = ReportOptions {
        date_order: DateOrder::DayFirst,
        range: DateRange::new(Some("2024-02-01"), Some("2024-02-01")),
        ..ReportOptions::default()
    };

    let report = build_report(&config, &data, &options).expect("report");

    assert_eq!(report.records.len(), 1);
    assert_eq!(report.records[0].get("d"), "01/02/2024");
}

#[test]
fn header_alignment_handles_reordered_data_columns() {
    let config = matrix(&[
        &["field", "label", "type", "order"],
        &["sales", "Sales", "number", "1"],
        &["region", "Region", "text", "2"],
        &["notes", "Notes", "text", "3"],
    ]);
    let data = matrix(&[
        &["REGION", "Unused", "sales"],
        &["West", "-", "12"],
        &["West", "-", "8"],
    ]);
    let options = ReportOptions {
        alignment: Alignment::Header,
        ..ReportOptions::default()
    };

    let dataset = load_dataset(&config, &data, &options).expect("dataset");

    assert_eq!(dataset.records.len(), 2);
    assert!(!dataset.records[0].contains("notes"));
    let report = build_report(&config, &data, &options).expect("report");
    assert_eq!(report.ranking[0].group, "West");
    assert_eq!(report.ranking[0].total("sales"), 20.0);
}

#[test]
fn json_exports_feed_the_same_pipeline() {
    let workspace = TestWorkspace::new();
    let config_path = workspace.write(
        "config.json",
        r#"[["field","label","type","order"],["amt","Amount","number",1],["who","Who","text",2]]"#,
    );
    let data_path = workspace.write("data.json", r#"[["Amount","Who"],[10,"a"],[0,"b"],[null,null]]"#);
    let config = io_utils::read_rows(&config_path, None, UTF_8).expect("config rows");
    let data = io_utils::read_rows(&data_path, None, UTF_8).expect("data rows");

    let report = build_report(&config, &data, &ReportOptions::default()).expect("report");

    assert_eq!(report.records.len(), 2);
    assert_eq!(report.aggregates.get("amt").map(|a| a.count), Some(1));
    assert_eq!(report.fields[0].order, 1);
}

#[test]
fn profile_options_drive_the_report() {
    let workspace = TestWorkspace::new();
    let (config, data) = load(&workspace);
    let profile_path = workspace.write(
        "profile.yml",
        "absent_values: none\ntop_n: 1\nranking:\n  group_field: cycle\n",
    );

    let options = Profile::load(&profile_path).expect("profile").to_options();
    let report = build_report(&config, &data, &options).expect("report");

    assert_eq!(report.aggregates.get("sales").map(|a| a.count), Some(4));
    assert_eq!(report.ranking.len(), 1);
    assert_eq!(report.ranking[0].group, "Q1");
}

#[test]
fn report_serializes_to_the_output_contract() {
    let workspace = TestWorkspace::new();
    let (config, data) = load(&workspace);

    let report = build_report(&config, &data, &ReportOptions::default()).expect("report");
    let json = serde_json::to_value(&report).expect("json");

    assert_eq!(json["fields"][0]["fieldName"], "sales");
    assert_eq!(json["fields"][0]["type"], "number");
    assert_eq!(json["records"][0]["region"], "North");
    assert!(json["aggregates"].is_object());
    assert_eq!(json["aggregates"]["sales"]["label"], "Sales");
    assert_eq!(json["aggregates"]["sales"]["count"], 3);
    assert_eq!(json["visualizationFlags"]["timeSeries"], true);
    assert_eq!(json["visualizationFlags"]["periodSelector"], true);
    assert_eq!(json["ranking"][0]["totals"]["sales"], 120.0);
}
