mod common;

use chrono::NaiveDate;
use csv_insight::{
    config::{DashboardConfig, SampleConfig},
    dataset::{Column, Dataset},
    error::{NotApplicable, Warning},
    export::{self, ExportFormat},
    filter::{self, DatePreset, FilterSpec},
    loader, quality,
    schema::ColumnKind,
    session::Session,
    stats::{self, TrendDirection},
    transform::{self, FillMissingMode, TransformKind},
    view,
};

use common::{load_fixture, numbers};

fn values(data: &Dataset, column: &str) -> Vec<Option<f64>> {
    data.column(column).expect("column present").as_f64s()
}

#[test]
fn fixture_loads_with_inferred_kinds() {
    let data = load_fixture("sales.csv");
    let kinds = data.columns().iter().map(Column::kind).collect::<Vec<_>>();
    assert_eq!(
        kinds,
        vec![
            ColumnKind::Date,
            ColumnKind::Float,
            ColumnKind::Integer,
            ColumnKind::Integer,
            ColumnKind::Categorical,
            ColumnKind::Categorical,
            ColumnKind::Categorical,
        ]
    );
    assert_eq!(data.missing_cell_count(), 4);
}

#[test]
fn single_extreme_value_is_the_only_outlier() {
    let mut raw = (1..=9).map(|v| Some(v as f64)).collect::<Vec<_>>();
    raw.push(Some(1000.0));
    let stats = stats::describe(&numbers("v", &raw), "v").expect("numeric column");
    assert_eq!(stats.outliers.count, 1);
    assert!((stats.outliers.percentage - 10.0).abs() < 1e-12);
    assert!(stats.outliers.upper_bound < 1000.0);
}

#[test]
fn rising_series_has_increasing_trend() {
    let dates = (1..=5)
        .map(|day| NaiveDate::from_ymd_opt(2023, 1, day).map(csv_insight::data::Value::Date))
        .collect::<Vec<_>>();
    let data = Dataset::new(vec![
        Column::new("Date", ColumnKind::Date, dates),
        Column::from_f64s(
            "Sales",
            &[Some(10.0), Some(20.0), Some(30.0), Some(40.0), Some(50.0)],
        ),
    ])
    .expect("dataset");
    let trend = stats::fit_trend(&data, "Sales").expect("trend");
    assert_eq!(trend.direction, TrendDirection::Increasing);
    assert!((trend.slope - 10.0).abs() < 1e-9);
    assert!((trend.r_squared - 1.0).abs() < 1e-12);
    assert_eq!(trend.p_value, 0.0);
}

#[test]
fn absent_region_value_empties_the_view() {
    let data = load_fixture("sales.csv");
    let filtered = filter::apply(
        &data,
        &FilterSpec::new().with_membership("Region", ["Atlantis"]),
    );
    assert_eq!(filtered.dataset.row_count(), 0);
    assert_eq!(filtered.dataset.column_names(), data.column_names());
    assert_eq!(quality::assess(&filtered.dataset).missing_percentage, 0.0);
}

#[test]
fn absent_column_membership_is_a_no_op() {
    let data = load_fixture("sales.csv");
    let filtered = filter::apply(
        &data,
        &FilterSpec::new().with_membership("Channel", ["Online"]),
    );
    assert_eq!(filtered.dataset, data);
}

#[test]
fn reversed_date_bounds_warn_and_keep_rows() {
    let data = load_fixture("sales.csv");
    let filtered = filter::apply(
        &data,
        &FilterSpec::new().with_date_range("2023-01-09", "2023-01-02"),
    );
    assert_eq!(filtered.dataset.row_count(), 10);
    assert!(matches!(
        filtered.warnings.as_slice(),
        [Warning::MalformedDateBounds { .. }]
    ));
}

#[test]
fn unparseable_date_bound_warns_and_keeps_rows() {
    let data = load_fixture("sales.csv");
    let filtered = filter::apply(
        &data,
        &FilterSpec::new()
            .with_date_range("2023-13-45", "2023-01-10")
            .with_membership("Region", ["North"]),
    );
    assert_eq!(filtered.dataset.row_count(), 3);
    assert!(matches!(
        filtered.warnings.as_slice(),
        [Warning::MalformedDateBounds { .. }]
    ));

    let filtered = filter::apply(
        &data,
        &FilterSpec::new().with_date_range("yesterday", "2023-01-10"),
    );
    assert_eq!(filtered.dataset, data);
    assert_eq!(filtered.warnings.len(), 1);
}

#[test]
fn oversized_page_is_clamped_to_the_only_page() {
    let data = numbers("v", &(0..10).map(|v| Some(v as f64)).collect::<Vec<_>>());
    let page = view::paginate(&data, 25, 1);
    assert_eq!(page.info.total_pages, 1);
    assert_eq!(page.info.page_number, 1);
    assert_eq!(page.rows.row_count(), 10);

    let page = view::paginate(&data, 3, 0);
    assert_eq!(page.info.page_number, 1);
    assert_eq!(view::paginate(&data, 3, 99).rows.row_count(), 1);
}

#[test]
fn fill_mean_closes_the_gap() {
    let data = numbers("v", &[Some(1.0), None, Some(3.0)]);
    let filled = transform::transform(&data, TransformKind::FillMissing(FillMissingMode::Mean));
    assert_eq!(values(&filled, "v"), vec![Some(1.0), Some(2.0), Some(3.0)]);
    // The input is left untouched.
    assert_eq!(values(&data, "v"), vec![Some(1.0), None, Some(3.0)]);
}

#[test]
fn drop_missing_and_dedupe_on_fixture() {
    let data = load_fixture("sales.csv");
    assert_eq!(
        transform::transform(&data, TransformKind::DropMissing).row_count(),
        6
    );
    let deduped = transform::transform(&data, TransformKind::RemoveDuplicates);
    assert_eq!(deduped.row_count(), 9);
    assert_eq!(quality::assess(&deduped).duplicate_rows, 0);
}

#[test]
fn top_records_rejects_text_columns() {
    let data = load_fixture("sales.csv");
    assert_eq!(
        view::top_records(&data, "Region", 3).unwrap_err(),
        NotApplicable::NotNumeric("Region".to_string())
    );
    let top = view::top_records(&data, "Sales", 3).expect("numeric column");
    assert_eq!(values(&top, "Sales"), vec![Some(240.0), Some(220.0), Some(200.0)]);
}

#[test]
fn preset_window_is_clamped_to_the_data() {
    let data = load_fixture("sales.csv");
    let today = NaiveDate::from_ymd_opt(2023, 1, 12).expect("date");
    let date_filter = DatePreset::Last7Days.resolve(today, &data, None);
    assert_eq!(date_filter.start, "2023-01-05");
    assert_eq!(date_filter.end, "2023-01-10");
    let filtered = filter::apply(&data, &FilterSpec::new().with_date_filter(date_filter));
    assert_eq!(filtered.dataset.row_count(), 6);
}

#[test]
fn session_pipeline_runs_end_to_end() {
    let data = loader::generate_sample(&SampleConfig::default()).expect("sample");
    let mut session = Session::open(data, DashboardConfig::default()).expect("session");
    session.apply_filters(
        FilterSpec::new()
            .with_date_range("2023-06-01", "2023-06-30")
            .with_membership("Region", ["North", "South"]),
    );
    let rows = session.view().row_count();
    assert!(rows > 0 && rows <= 30);

    let summary = session.summary();
    assert_eq!(summary.total_records, rows);
    assert_eq!(summary.numeric_columns, vec!["Sales", "Revenue", "Customers"]);

    let json = export::export(session.view(), ExportFormat::Json, b',').expect("json");
    let records: serde_json::Value = serde_json::from_slice(&json).expect("parse");
    assert_eq!(records.as_array().map(Vec::len), Some(rows));

    let standardized = session.transform(TransformKind::Standardize);
    let sales = standardized.column("Sales").expect("sales").numeric_values();
    let mean = sales.iter().sum::<f64>() / sales.len() as f64;
    assert!(mean.abs() < 1e-9);
}
