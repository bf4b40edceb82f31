//! Error, warning, and applicability types shared by the pipeline stages.
//!
//! The pipeline distinguishes four outcomes that are not successes:
//!
//! - [`StructuralError`]: the dataset is absent or empty; nothing downstream runs.
//! - [`Warning`]: something is off (missing cells, duplicates, bad filter bounds)
//!   but processing continues.
//! - [`NotApplicable`]: a statistic, trend, or chart cannot be produced for the
//!   requested column or state. This is a normal return value.
//! - [`ExportError`]: an export format failed or its backing capability is
//!   missing.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralError {
    #[error("No dataset is loaded")]
    Absent,
    #[error("Dataset has no rows")]
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DatasetError {
    #[error("Column '{column}' has {actual} value(s) but the dataset has {expected} row(s)")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },
    #[error("Column name '{0}' appears more than once")]
    DuplicateColumn(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    MissingCells { count: usize },
    DuplicateRows { count: usize },
    MalformedDateBounds { detail: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::MissingCells { count } => {
                write!(f, "Found {count} missing value(s) across columns")
            }
            Warning::DuplicateRows { count } => write!(f, "Found {count} duplicate row(s)"),
            Warning::MalformedDateBounds { detail } => {
                write!(f, "Date filter ignored: {detail}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotApplicable {
    #[error("Column '{0}' not found")]
    ColumnNotFound(String),
    #[error("Column '{0}' is not numeric")]
    NotNumeric(String),
    #[error("Column '{0}' has no non-missing values")]
    NoValues(String),
    #[error("A date column is required for trend analysis")]
    NoTemporalColumn,
    #[error("Not enough valid data points for trend analysis on '{column}' ({valid_rows} usable)")]
    InsufficientData { column: String, valid_rows: usize },
    #[error("{chart} chart cannot be drawn: {detail}")]
    ChartRoles { chart: String, detail: String },
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("{format} export is unavailable: {reason}")]
    Unavailable {
        format: &'static str,
        reason: &'static str,
    },
    #[error("Writing CSV output failed")]
    Csv(#[from] csv::Error),
    #[error("Writing JSON output failed")]
    Json(#[from] serde_json::Error),
    #[error("I/O failure during export")]
    Io(#[from] std::io::Error),
    #[cfg(feature = "xlsx")]
    #[error("Building spreadsheet package failed")]
    Zip(#[from] zip::result::ZipError),
}
