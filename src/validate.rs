use log::warn;
use serde::Serialize;

use crate::{
    dataset::Dataset,
    error::{StructuralError, Warning},
    schema::ColumnKind,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DatasetInfo {
    pub rows: usize,
    pub columns: usize,
    pub column_names: Vec<String>,
    pub kinds: Vec<(String, ColumnKind)>,
    pub missing_by_column: Vec<(String, usize)>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationResult {
    pub errors: Vec<StructuralError>,
    pub warnings: Vec<Warning>,
    pub info: DatasetInfo,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_result(self) -> Result<Self, StructuralError> {
        match self.errors.first() {
            Some(err) => Err(err.clone()),
            None => Ok(self),
        }
    }
}

/// Checks that a loaded dataset is usable. Never fails: problems are
/// reported through `errors` (fatal) and `warnings` (informational).
pub fn validate(raw: Option<&Dataset>) -> ValidationResult {
    let Some(dataset) = raw else {
        return ValidationResult {
            errors: vec![StructuralError::Absent],
            ..ValidationResult::default()
        };
    };

    let info = DatasetInfo {
        rows: dataset.row_count(),
        columns: dataset.column_count(),
        column_names: dataset.column_names(),
        kinds: dataset
            .columns()
            .iter()
            .map(|c| (c.name().to_string(), c.kind()))
            .collect(),
        missing_by_column: dataset
            .columns()
            .iter()
            .map(|c| (c.name().to_string(), c.missing_count()))
            .collect(),
    };

    if dataset.is_empty() {
        return ValidationResult {
            errors: vec![StructuralError::Empty],
            info,
            ..ValidationResult::default()
        };
    }

    let mut warnings = Vec::new();
    let missing = dataset.missing_cell_count();
    if missing > 0 {
        warnings.push(Warning::MissingCells { count: missing });
    }
    let duplicates = dataset.duplicate_row_count();
    if duplicates > 0 {
        warnings.push(Warning::DuplicateRows { count: duplicates });
    }
    for warning in &warnings {
        warn!("{warning}");
    }

    ValidationResult {
        errors: Vec::new(),
        warnings,
        info,
    }
}
