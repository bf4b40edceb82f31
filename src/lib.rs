pub mod chart;
pub mod cli;
pub mod config;
pub mod data;
pub mod dataset;
pub mod error;
pub mod export;
pub mod filter;
pub mod io_utils;
pub mod loader;
pub mod quality;
pub mod schema;
pub mod session;
pub mod stats;
pub mod table;
pub mod transform;
pub mod validate;
pub mod view;

use std::{collections::BTreeMap, env, sync::OnceLock};

use anyhow::{Context, Result, anyhow};
use chrono::{Local, NaiveDate};
use clap::Parser;
use log::{LevelFilter, debug, info, warn};
use serde_json::json;

use crate::{
    chart::Slot,
    cli::{Cli, Commands, DataSource, FilterArgs, OutputArgs, SourceArgs},
    config::DashboardConfig,
    dataset::Dataset,
    error::NotApplicable,
    export::{Capabilities, ExportFormat},
    filter::{DateFilter, FilterSpec, MembershipFilter},
    loader::CsvOptions,
    session::Session,
    stats::ColumnStatistics,
    table::{Table, format_number, format_optional},
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("csv_insight", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Validate(args) => handle_validate(&args),
        Commands::Quality(args) => handle_quality(&args),
        Commands::Describe(args) => handle_describe(&args),
        Commands::Trend(args) => handle_trend(&args),
        Commands::View(args) => handle_view(&args),
        Commands::Top(args) => handle_top(&args),
        Commands::Transform(args) => {
            let session = open_session(&args.source, &args.filters)?;
            let result = session.transform(args.kind.into());
            write_dataset(&result, &args.output)
        }
        Commands::Sample(args) => {
            let session = open_session(&args.source, &args.filters)?;
            let rows = args.rows.unwrap_or(session.config().sample_size);
            let sampled = transform::sample(session.view(), rows, args.seed);
            write_dataset(&sampled, &args.output)
        }
        Commands::Export(args) => {
            let session = open_session(&args.source, &args.filters)?;
            write_dataset(session.view(), &args.output)
        }
        Commands::Summary(args) => {
            let session = open_session(&args.source, &args.filters)?;
            println!("{}", serde_json::to_string_pretty(&session.summary())?);
            Ok(())
        }
        Commands::Chart(args) => handle_chart(&args),
        Commands::Correlate(args) => handle_correlate(&args),
        Commands::Generate(args) => handle_generate(&args),
        Commands::Capabilities => handle_capabilities(),
    }
}

fn load_dataset(source: &SourceArgs, config: &DashboardConfig) -> Result<Dataset> {
    match source.data_source()? {
        DataSource::File(path) => {
            let options = CsvOptions {
                delimiter: io_utils::resolve_input_delimiter(path, source.delimiter),
                encoding: io_utils::resolve_encoding(source.input_encoding.as_deref())?,
                max_categories: config.max_categories,
            };
            info!(
                "Reading '{}' using delimiter '{}'",
                path.display(),
                printable_delimiter(options.delimiter)
            );
            loader::load_csv(path, &options)
        }
        DataSource::Sample { requested } => {
            if requested {
                info!("Using the generated sample dataset");
            } else {
                info!("No input given; using the generated sample dataset");
            }
            loader::generate_sample(&config.sample)
        }
    }
}

fn open_session(source: &SourceArgs, filters: &FilterArgs) -> Result<Session> {
    let config = DashboardConfig::load_or_default(source.config.as_deref())?;
    let dataset = load_dataset(source, &config)?;
    let mut session = Session::open(dataset, config)?;
    let spec = build_filter_spec(&session, filters)?;
    if !spec.is_empty() {
        debug!("Applying filters: {spec:?}");
    }
    session.apply_filters(spec);
    Ok(session)
}

fn build_filter_spec(session: &Session, args: &FilterArgs) -> Result<FilterSpec> {
    let mut spec = FilterSpec::new();
    let date_column = args
        .date_column
        .clone()
        .or_else(|| session.date_column().map(str::to_string));

    if let Some(preset) = args.preset {
        let today = args.today.unwrap_or_else(|| Local::now().date_naive());
        spec = spec.with_date_filter(preset.resolve(
            today,
            session.dataset(),
            date_column.as_deref(),
        ));
    } else if args.from.is_some() || args.to.is_some() {
        // An open end falls back to the data's own first or last date.
        let extent = filter::date_extent(session.dataset(), date_column.as_deref());
        let bound = |given: &Option<String>, fallback: Option<NaiveDate>| {
            given
                .clone()
                .or_else(|| fallback.map(|d| d.format("%Y-%m-%d").to_string()))
        };
        match (
            bound(&args.from, extent.map(|(start, _)| start)),
            bound(&args.to, extent.map(|(_, end)| end)),
        ) {
            (Some(start), Some(end)) => {
                spec = spec.with_date_filter(DateFilter {
                    column: date_column.clone(),
                    start,
                    end,
                });
            }
            _ => warn!("Date filter skipped: the dataset has no dates to complete the range"),
        }
    }

    for raw in &args.memberships {
        spec.memberships.push(MembershipFilter::parse(raw)?);
    }
    for (column, values) in [
        ("Region", &args.region),
        ("Product", &args.product),
        ("Category", &args.category),
    ] {
        if !values.is_empty() {
            spec = spec.with_membership(column, values.iter().map(|v| v.trim().to_string()));
        }
    }
    Ok(spec)
}

fn report_not_applicable(reason: &NotApplicable) {
    info!("{reason}");
    println!("Not applicable: {reason}");
}

fn handle_validate(args: &cli::ValidateArgs) -> Result<()> {
    let config = DashboardConfig::load_or_default(args.source.config.as_deref())?;
    let dataset = load_dataset(&args.source, &config)?;
    let result = validate::validate(Some(&dataset));

    if args.json {
        let report = json!({
            "valid": result.is_valid(),
            "errors": result.errors.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "warnings": result.warnings,
            "info": result.info,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        let info = &result.info;
        Table::key_value([
            ("rows", info.rows.to_string()),
            ("columns", info.columns.to_string()),
        ])
        .print();
        println!();
        let mut kinds = Table::new(["column", "kind", "missing"]).align_right(2);
        for ((name, kind), (_, missing)) in info.kinds.iter().zip(&info.missing_by_column) {
            kinds.push_row([name.clone(), kind.to_string(), missing.to_string()]);
        }
        kinds.print();

        let mut options = Table::new(["filter", "values"]);
        for name in &config.membership_columns {
            if let Some(column) = dataset.column(name) {
                options.push_row([name.clone(), column.distinct_labels().join(", ")]);
            }
        }
        if options.row_count() > 0 {
            println!();
            options.print();
        }
        for warning in &result.warnings {
            println!("warning: {warning}");
        }
    }

    match result.errors.into_iter().next() {
        Some(err) => Err(err.into()),
        None => Ok(()),
    }
}

fn handle_quality(args: &cli::ReportArgs) -> Result<()> {
    let session = open_session(&args.source, &args.filters)?;
    let report = session.quality();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    Table::key_value([
        ("rows", report.rows.to_string()),
        ("columns", report.columns.to_string()),
        ("missing cells", report.missing_cells.to_string()),
        ("missing %", format!("{:.2}", report.missing_percentage)),
        ("duplicate rows", report.duplicate_rows.to_string()),
        ("duplicate %", format!("{:.2}", report.duplicate_percentage)),
        ("numeric columns", report.numeric_columns.to_string()),
        ("categorical columns", report.categorical_columns.to_string()),
    ])
    .print();
    Ok(())
}

fn handle_describe(args: &cli::DescribeArgs) -> Result<()> {
    let session = open_session(&args.source, &args.filters)?;
    let Some(column) = &args.column else {
        let all = stats::describe_all(session.view());
        if args.json {
            println!("{}", serde_json::to_string_pretty(&all)?);
        } else {
            print_summary_statistics(&all);
        }
        return Ok(());
    };

    let stats = match session.describe(column) {
        Ok(stats) => stats,
        Err(reason) => {
            report_not_applicable(&reason);
            return Ok(());
        }
    };
    if args.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }
    Table::key_value([
        ("count", stats.count.to_string()),
        ("missing", stats.missing.to_string()),
        ("mean", format_number(stats.mean)),
        ("median", format_number(stats.median)),
        ("mode", format_number(stats.mode)),
        ("std", format_optional(stats.std)),
        ("variance", format_optional(stats.variance)),
        ("min", format_number(stats.min)),
        ("max", format_number(stats.max)),
        ("range", format_number(stats.range)),
        ("q1", format_number(stats.q1)),
        ("q3", format_number(stats.q3)),
        ("iqr", format_number(stats.iqr)),
        ("cv %", format_optional(stats.coefficient_of_variation)),
        ("skewness", format_optional(stats.skewness)),
        ("kurtosis", format_optional(stats.kurtosis)),
        ("outlier lower bound", format_number(stats.outliers.lower_bound)),
        ("outlier upper bound", format_number(stats.outliers.upper_bound)),
        ("outliers", stats.outliers.count.to_string()),
        ("outlier %", format!("{:.2}", stats.outliers.percentage)),
    ])
    .print();
    Ok(())
}

fn print_summary_statistics(all: &[ColumnStatistics]) {
    let mut table = Table::new([
        "column", "count", "mean", "std", "min", "25%", "50%", "75%", "max",
    ]);
    for stats in all {
        table.push_row([
            stats.column.clone(),
            stats.count.to_string(),
            format_number(stats.mean),
            format_optional(stats.std),
            format_number(stats.min),
            format_number(stats.q1),
            format_number(stats.median),
            format_number(stats.q3),
            format_number(stats.max),
        ]);
    }
    let table = (1..9).fold(table, Table::align_right);
    table.print();
}

fn handle_trend(args: &cli::TrendArgs) -> Result<()> {
    let session = open_session(&args.source, &args.filters)?;
    let trend = match session.fit_trend(&args.column) {
        Ok(trend) => trend,
        Err(reason) => {
            report_not_applicable(&reason);
            return Ok(());
        }
    };
    if args.json {
        println!("{}", serde_json::to_string_pretty(&trend)?);
        return Ok(());
    }
    Table::key_value([
        ("column", trend.column.clone()),
        ("ordered by", trend.date_column.clone()),
        ("points", trend.points.to_string()),
        ("slope", format_number(trend.slope)),
        ("intercept", format_number(trend.intercept)),
        ("r squared", format_number(trend.r_squared)),
        ("p-value", format_number(trend.p_value)),
        ("std err", format_number(trend.std_err)),
        ("direction", trend.direction.to_string()),
    ])
    .print();
    Ok(())
}

fn handle_view(args: &cli::ViewArgs) -> Result<()> {
    let session = open_session(&args.source, &args.filters)?;
    let page = session.paginate(args.search.as_deref(), args.page_size, args.page);
    Table::from_dataset(&page.rows).print();
    println!(
        "Page {} of {} ({} row(s))",
        page.info.page_number, page.info.total_pages, page.info.total_rows
    );
    Ok(())
}

fn handle_top(args: &cli::TopArgs) -> Result<()> {
    let session = open_session(&args.source, &args.filters)?;
    let limit = args.limit.unwrap_or(session.config().top_records);
    match view::top_records(session.view(), &args.column, limit) {
        Ok(rows) => Table::from_dataset(&rows).print(),
        Err(reason) => report_not_applicable(&reason),
    }
    Ok(())
}

fn handle_chart(args: &cli::ChartArgs) -> Result<()> {
    let session = open_session(&args.source, &args.filters)?;
    let mut overrides = BTreeMap::new();
    for raw in &args.bindings {
        let (slot, columns): (Slot, Vec<String>) = Slot::parse_binding(raw)?;
        if overrides.insert(slot, columns).is_some() {
            return Err(anyhow!("Slot '{slot}' is bound more than once"));
        }
    }
    match session.chart(args.kind, &overrides) {
        Ok(descriptor) => println!("{}", serde_json::to_string_pretty(&descriptor)?),
        Err(reason) => report_not_applicable(&reason),
    }
    Ok(())
}

fn handle_correlate(args: &cli::ReportArgs) -> Result<()> {
    let session = open_session(&args.source, &args.filters)?;
    let matrix = stats::correlation_matrix(session.view());
    if args.json {
        println!("{}", serde_json::to_string_pretty(&matrix)?);
        return Ok(());
    }
    let mut table = Table::new(std::iter::once(String::new()).chain(matrix.columns.clone()));
    for (name, row) in matrix.columns.iter().zip(&matrix.values) {
        table.push_row(
            std::iter::once(name.clone()).chain(row.iter().map(|v| format_optional(*v))),
        );
    }
    let table = (1..=matrix.columns.len()).fold(table, Table::align_right);
    table.print();
    Ok(())
}

fn handle_generate(args: &cli::GenerateArgs) -> Result<()> {
    let config = DashboardConfig::load_or_default(args.config.as_deref())?;
    let mut sample = config.sample;
    if let Some(seed) = args.seed {
        sample.seed = seed;
    }
    if let Some(start) = args.start {
        sample.start = start;
    }
    if let Some(end) = args.end {
        sample.end = end;
    }
    if sample.start > sample.end {
        return Err(anyhow!(
            "Start date {} is after end date {}",
            sample.start,
            sample.end
        ));
    }
    let dataset = loader::generate_sample(&sample)?;
    write_dataset(&dataset, &args.output)
}

fn handle_capabilities() -> Result<()> {
    let capabilities = Capabilities::detect();
    let mut table = Table::new(["format", "available"]);
    for format in [ExportFormat::Csv, ExportFormat::Json, ExportFormat::Xlsx] {
        let available = if capabilities.supports(format) { "yes" } else { "no" };
        table.push_row([format.extension(), available]);
    }
    table.print();
    Ok(())
}

fn write_dataset(dataset: &Dataset, output: &OutputArgs) -> Result<()> {
    let path = output.output.as_deref();
    let format = output
        .format
        .or_else(|| path.and_then(ExportFormat::from_path))
        .unwrap_or(ExportFormat::Csv);
    let delimiter = io_utils::resolve_output_delimiter(path, output.output_delimiter);
    let mut bytes = export::export(dataset, format, delimiter)?;
    if format == ExportFormat::Json {
        bytes.push(b'\n');
    }
    io_utils::write_output(path, &bytes)
        .with_context(|| format!("Writing {} output", format.extension()))?;
    info!(
        "Wrote {} row(s) as {} to {}",
        dataset.row_count(),
        format.extension(),
        path.map(|p| p.display().to_string())
            .unwrap_or_else(|| "stdout".to_string())
    );
    Ok(())
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        b'\n' => "\\n".to_string(),
        other => (other as char).to_string(),
    }
}
