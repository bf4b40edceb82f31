//! The in-memory table the pipeline operates on.
//!
//! A [`Dataset`] is an ordered list of named [`Column`]s of equal length.
//! Nothing in the crate mutates a dataset after construction; every stage
//! that changes rows or values builds a new one.

use std::collections::HashSet;

use itertools::Itertools;

use crate::{data::Value, error::DatasetError, schema::ColumnKind};

/// One row viewed across all columns. `None` marks a missing cell.
pub type Row<'a> = Vec<Option<&'a Value>>;

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    kind: ColumnKind,
    cells: Vec<Option<Value>>,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: ColumnKind, cells: Vec<Option<Value>>) -> Self {
        Self {
            name: name.into(),
            kind,
            cells,
        }
    }

    pub fn from_f64s(name: impl Into<String>, values: &[Option<f64>]) -> Self {
        let cells = values.iter().map(|v| v.map(Value::Float)).collect();
        Self::new(name, ColumnKind::Float, cells)
    }

    pub fn from_labels(name: impl Into<String>, values: &[Option<&str>]) -> Self {
        let cells = values
            .iter()
            .map(|v| v.map(|s| Value::Text(s.to_string())))
            .collect();
        Self::new(name, ColumnKind::Categorical, cells)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ColumnKind {
        self.kind
    }

    pub fn cells(&self) -> &[Option<Value>] {
        &self.cells
    }

    pub fn cell(&self, row: usize) -> Option<&Value> {
        self.cells.get(row).and_then(Option::as_ref)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn missing_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_none()).count()
    }

    /// Numeric view aligned with the rows; non-numeric or missing cells are `None`.
    pub fn as_f64s(&self) -> Vec<Option<f64>> {
        self.cells
            .iter()
            .map(|c| c.as_ref().and_then(Value::as_f64))
            .collect()
    }

    /// Non-missing numeric values in row order.
    pub fn numeric_values(&self) -> Vec<f64> {
        self.cells
            .iter()
            .filter_map(|c| c.as_ref().and_then(Value::as_f64))
            .collect()
    }

    /// Distinct display labels, sorted, missing cells skipped.
    pub fn distinct_labels(&self) -> Vec<String> {
        self.cells
            .iter()
            .flatten()
            .map(Value::as_display)
            .unique()
            .sorted()
            .collect()
    }

    pub(crate) fn take(&self, rows: &[usize]) -> Self {
        let cells = rows
            .iter()
            .map(|&idx| self.cells.get(idx).cloned().flatten())
            .collect();
        Self::new(self.name.clone(), self.kind, cells)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    columns: Vec<Column>,
}

impl Dataset {
    pub fn new(columns: Vec<Column>) -> Result<Self, DatasetError> {
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.name()) {
                return Err(DatasetError::DuplicateColumn(column.name().to_string()));
            }
        }
        if let Some(first) = columns.first() {
            let expected = first.len();
            if let Some(bad) = columns.iter().find(|c| c.len() != expected) {
                return Err(DatasetError::LengthMismatch {
                    column: bad.name().to_string(),
                    expected,
                    actual: bad.len(),
                });
            }
        }
        Ok(Self { columns })
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map(Column::len).unwrap_or(0)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.row_count() == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name().to_string()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name() == name)
    }

    pub fn columns_where(&self, predicate: impl Fn(ColumnKind) -> bool) -> Vec<&Column> {
        self.columns.iter().filter(|c| predicate(c.kind())).collect()
    }

    pub fn numeric_columns(&self) -> Vec<&Column> {
        self.columns_where(ColumnKind::is_numeric)
    }

    pub fn first_temporal_column(&self) -> Option<&Column> {
        self.columns.iter().find(|c| c.kind().is_temporal())
    }

    pub fn row(&self, idx: usize) -> Row<'_> {
        self.columns.iter().map(|c| c.cell(idx)).collect()
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> + '_ {
        (0..self.row_count()).map(move |idx| self.row(idx))
    }

    pub fn missing_cell_count(&self) -> usize {
        self.columns.iter().map(Column::missing_count).sum()
    }

    /// `true` for every row that repeats an earlier row exactly. Missing
    /// cells compare equal to each other.
    pub fn duplicate_mask(&self) -> Vec<bool> {
        let mut seen = HashSet::with_capacity(self.row_count());
        self.rows().map(|row| !seen.insert(row)).collect()
    }

    pub fn duplicate_row_count(&self) -> usize {
        self.duplicate_mask().into_iter().filter(|dup| *dup).count()
    }

    /// New dataset holding the given rows in the given order.
    pub fn take_rows(&self, rows: &[usize]) -> Self {
        Self {
            columns: self.columns.iter().map(|c| c.take(rows)).collect(),
        }
    }

    pub fn filter_rows(&self, keep: impl Fn(usize) -> bool) -> Self {
        let rows = (0..self.row_count()).filter(|&idx| keep(idx)).collect_vec();
        self.take_rows(&rows)
    }

    pub fn slice(&self, start: usize, end: usize) -> Self {
        let end = end.min(self.row_count());
        let start = start.min(end);
        self.take_rows(&(start..end).collect_vec())
    }

    /// Same rows, with columns replaced by `replace` where it returns `Some`.
    pub(crate) fn map_columns(&self, mut replace: impl FnMut(&Column) -> Option<Column>) -> Self {
        Self {
            columns: self
                .columns
                .iter()
                .map(|c| replace(c).unwrap_or_else(|| c.clone()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dataset {
        Dataset::new(vec![
            Column::from_f64s("x", &[Some(1.0), None, Some(1.0), None]),
            Column::from_labels("g", &[Some("a"), Some("b"), Some("a"), Some("b")]),
        ])
        .unwrap()
    }

    #[test]
    fn rejects_ragged_and_duplicate_columns() {
        let ragged = Dataset::new(vec![
            Column::from_f64s("x", &[Some(1.0)]),
            Column::from_f64s("y", &[Some(1.0), Some(2.0)]),
        ]);
        assert!(matches!(ragged, Err(DatasetError::LengthMismatch { .. })));

        let duplicated = Dataset::new(vec![
            Column::from_f64s("x", &[Some(1.0)]),
            Column::from_f64s("x", &[Some(2.0)]),
        ]);
        assert_eq!(duplicated, Err(DatasetError::DuplicateColumn("x".into())));
    }

    #[test]
    fn duplicate_mask_treats_missing_as_equal() {
        let data = sample();
        assert_eq!(data.duplicate_mask(), vec![false, false, true, true]);
        assert_eq!(data.duplicate_row_count(), 2);
        assert_eq!(data.missing_cell_count(), 2);
    }

    #[test]
    fn take_rows_preserves_requested_order() {
        let data = sample();
        let taken = data.take_rows(&[3, 0]);
        assert_eq!(taken.row_count(), 2);
        assert_eq!(
            taken.column("g").unwrap().cell(0),
            Some(&Value::Text("b".into()))
        );
    }

    #[test]
    fn slice_clamps_to_bounds() {
        let data = sample();
        assert_eq!(data.slice(2, 99).row_count(), 2);
        assert_eq!(data.slice(10, 20).row_count(), 0);
    }
}
