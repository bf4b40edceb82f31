use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::{
    chart::ChartKind,
    export::ExportFormat,
    filter::DatePreset,
    transform::{FillMissingMode, TransformKind},
};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Filter, profile, and transform tabular datasets",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Check that a dataset loads and report its shape, kinds, and warnings
    Validate(ValidateArgs),
    /// Report completeness and duplication metrics for the filtered view
    Quality(ReportArgs),
    /// Describe one numeric column, or summarize every numeric column
    Describe(DescribeArgs),
    /// Fit a linear trend of a numeric column over date order
    Trend(TrendArgs),
    /// Page through the filtered view, optionally narrowed by a search term
    View(ViewArgs),
    /// Show the rows with the largest values in a numeric column
    Top(TopArgs),
    /// Apply a cleaning or scaling transform and write the result
    Transform(TransformArgs),
    /// Draw a reproducible random sample of rows
    Sample(SampleArgs),
    /// Write the filtered view as CSV, JSON, or XLSX
    Export(ExportArgs),
    /// Print the dashboard summary as JSON
    Summary(SummaryArgs),
    /// Resolve a chart's column bindings and print the descriptor as JSON
    Chart(ChartArgs),
    /// Print the pairwise correlation matrix of numeric columns
    Correlate(ReportArgs),
    /// Write the generated sample sales dataset
    Generate(GenerateArgs),
    /// List the export formats available in this build
    Capabilities,
}

#[derive(Debug, Args)]
pub struct SourceArgs {
    /// Input CSV file (`-` reads stdin); the generated sample is used when omitted
    #[arg(short = 'i', long = "input", conflicts_with = "sample")]
    pub input: Option<PathBuf>,
    /// Use the generated sample sales dataset
    #[arg(long)]
    pub sample: bool,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// YAML configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Where a command reads its rows from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource<'a> {
    File(&'a Path),
    /// Generated sample, chosen by `--sample` or by omitting `--input`.
    Sample { requested: bool },
}

impl SourceArgs {
    pub fn data_source(&self) -> Result<DataSource<'_>> {
        match (self.input.as_deref(), self.sample) {
            (Some(_), true) => bail!("--input and --sample cannot be combined"),
            (Some(path), false) => Ok(DataSource::File(path)),
            (None, requested) => Ok(DataSource::Sample { requested }),
        }
    }
}

#[derive(Debug, Args, Default)]
pub struct FilterArgs {
    /// Keep rows on or after this date (YYYY-MM-DD)
    #[arg(long = "from")]
    pub from: Option<String>,
    /// Keep rows on or before this date (YYYY-MM-DD)
    #[arg(long = "to")]
    pub to: Option<String>,
    /// Relative date window, clamped to the data's date range
    #[arg(long, value_enum, conflicts_with_all = ["from", "to"])]
    pub preset: Option<DatePreset>,
    /// Reference date for presets (defaults to today)
    #[arg(long, value_parser = parse_date)]
    pub today: Option<NaiveDate>,
    /// Date column to filter on (defaults to the configured or first date column)
    #[arg(long = "date-column")]
    pub date_column: Option<String>,
    /// Membership filters of the form `column=a,b`
    #[arg(long = "in", action = clap::ArgAction::Append)]
    pub memberships: Vec<String>,
    /// Allowed values for the Region column
    #[arg(long, value_delimiter = ',')]
    pub region: Vec<String>,
    /// Allowed values for the Product column
    #[arg(long, value_delimiter = ',')]
    pub product: Vec<String>,
    /// Allowed values for the Category column
    #[arg(long, value_delimiter = ',')]
    pub category: Vec<String>,
}

#[derive(Debug, Args)]
pub struct OutputArgs {
    /// Output file (stdout if omitted); the extension selects the format
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Output format (defaults to the output extension, then csv)
    #[arg(long, value_enum)]
    pub format: Option<ExportFormat>,
    /// Delimiter for CSV output
    #[arg(long = "output-delimiter", value_parser = parse_delimiter)]
    pub output_delimiter: Option<u8>,
}

#[derive(Debug, Args)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// Emit the validation report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ReportArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    #[command(flatten)]
    pub filters: FilterArgs,
    /// Emit JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct SummaryArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    #[command(flatten)]
    pub filters: FilterArgs,
}

#[derive(Debug, Args)]
pub struct DescribeArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    #[command(flatten)]
    pub filters: FilterArgs,
    /// Column to describe; every numeric column when omitted
    #[arg(short = 'c', long = "column")]
    pub column: Option<String>,
    /// Emit JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct TrendArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    #[command(flatten)]
    pub filters: FilterArgs,
    /// Numeric column to fit
    #[arg(short = 'c', long = "column")]
    pub column: String,
    /// Emit JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ViewArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    #[command(flatten)]
    pub filters: FilterArgs,
    /// Rows per page (defaults to the configured page size)
    #[arg(long = "page-size")]
    pub page_size: Option<usize>,
    /// 1-based page number; out-of-range values are clamped
    #[arg(long, default_value_t = 1)]
    pub page: usize,
    /// Case-insensitive text to look for in any cell
    #[arg(long)]
    pub search: Option<String>,
}

#[derive(Debug, Args)]
pub struct TopArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    #[command(flatten)]
    pub filters: FilterArgs,
    /// Numeric column to rank by
    #[arg(short = 'c', long = "column")]
    pub column: String,
    /// Number of rows (defaults to the configured top-record count)
    #[arg(short = 'n', long = "limit")]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TransformArg {
    None,
    RemoveDuplicates,
    FillMean,
    FillMedian,
    FillMode,
    DropMissing,
    Normalize,
    Standardize,
}

impl From<TransformArg> for TransformKind {
    fn from(value: TransformArg) -> Self {
        match value {
            TransformArg::None => TransformKind::None,
            TransformArg::RemoveDuplicates => TransformKind::RemoveDuplicates,
            TransformArg::FillMean => TransformKind::FillMissing(FillMissingMode::Mean),
            TransformArg::FillMedian => TransformKind::FillMissing(FillMissingMode::Median),
            TransformArg::FillMode => TransformKind::FillMissing(FillMissingMode::Mode),
            TransformArg::DropMissing => TransformKind::DropMissing,
            TransformArg::Normalize => TransformKind::Normalize,
            TransformArg::Standardize => TransformKind::Standardize,
        }
    }
}

#[derive(Debug, Args)]
pub struct TransformArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    #[command(flatten)]
    pub filters: FilterArgs,
    /// Transform to apply
    #[arg(short = 'k', long = "kind", value_enum)]
    pub kind: TransformArg,
    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Debug, Args)]
pub struct SampleArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    #[command(flatten)]
    pub filters: FilterArgs,
    /// Number of rows to draw (defaults to the configured sample size)
    #[arg(short = 'n', long = "rows")]
    pub rows: Option<usize>,
    /// Random seed
    #[arg(long, default_value_t = crate::transform::DEFAULT_SAMPLE_SEED)]
    pub seed: u64,
    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    #[command(flatten)]
    pub filters: FilterArgs,
    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Debug, Args)]
pub struct ChartArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    #[command(flatten)]
    pub filters: FilterArgs,
    /// Chart type
    #[arg(short = 'k', long = "kind", value_enum)]
    pub kind: ChartKind,
    /// Explicit slot bindings such as `x=Date` or `values=Sales,Revenue`
    #[arg(long = "bind", action = clap::ArgAction::Append)]
    pub bindings: Vec<String>,
}

#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// YAML configuration file supplying sample defaults
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Random seed (overrides the configuration)
    #[arg(long)]
    pub seed: Option<u64>,
    /// First day of the generated range
    #[arg(long, value_parser = parse_date)]
    pub start: Option<NaiveDate>,
    /// Last day of the generated range
    #[arg(long, value_parser = parse_date)]
    pub end: Option<NaiveDate>,
    #[command(flatten)]
    pub output: OutputArgs,
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

pub fn parse_date(value: &str) -> Result<NaiveDate, String> {
    crate::data::parse_naive_date(value).map_err(|err| err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_shared_filter_arguments() {
        let cli = Cli::parse_from([
            "csv-insight",
            "quality",
            "--sample",
            "--from",
            "2023-01-01",
            "--region",
            "North,South",
            "--in",
            "Product=Product A",
        ]);
        let Commands::Quality(args) = cli.command else {
            panic!("expected quality command");
        };
        assert!(args.source.sample);
        assert_eq!(args.filters.region, vec!["North", "South"]);
        assert_eq!(args.filters.memberships, vec!["Product=Product A"]);
    }

    fn source(args: &[&str]) -> SourceArgs {
        let cli = Cli::parse_from(["csv-insight", "validate"].iter().chain(args));
        let Commands::Validate(args) = cli.command else {
            panic!("expected validate command");
        };
        args.source
    }

    #[test]
    fn sample_flag_selects_the_generated_dataset() {
        assert_eq!(
            source(&["--sample"]).data_source().unwrap(),
            DataSource::Sample { requested: true }
        );
        assert_eq!(
            source(&[]).data_source().unwrap(),
            DataSource::Sample { requested: false }
        );
        assert_eq!(
            source(&["-i", "sales.csv"]).data_source().unwrap(),
            DataSource::File(Path::new("sales.csv"))
        );
        assert!(Cli::try_parse_from(["csv-insight", "validate", "--sample", "-i", "x.csv"]).is_err());

        let mut both = source(&["--sample"]);
        both.input = Some(PathBuf::from("sales.csv"));
        assert!(both.data_source().is_err());
    }

    #[test]
    fn delimiter_parser_accepts_names() {
        assert_eq!(parse_delimiter("tab"), Ok(b'\t'));
        assert!(parse_delimiter("ab").is_err());
    }
}
