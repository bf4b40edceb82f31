use serde::Serialize;

use crate::dataset::Dataset;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityReport {
    pub rows: usize,
    pub columns: usize,
    pub missing_cells: usize,
    /// Share of all cells that are missing, 0 for an empty table.
    pub missing_percentage: f64,
    pub duplicate_rows: usize,
    pub duplicate_percentage: f64,
    pub numeric_columns: usize,
    /// Non-numeric, non-temporal columns (categorical and free text).
    pub categorical_columns: usize,
}

pub fn assess(dataset: &Dataset) -> QualityReport {
    let rows = dataset.row_count();
    let columns = dataset.column_count();
    let missing_cells = dataset.missing_cell_count();
    let duplicate_rows = dataset.duplicate_row_count();

    let total_cells = rows * columns;
    QualityReport {
        rows,
        columns,
        missing_cells,
        missing_percentage: percentage(missing_cells, total_cells),
        duplicate_rows,
        duplicate_percentage: percentage(duplicate_rows, rows),
        numeric_columns: dataset.numeric_columns().len(),
        categorical_columns: dataset.columns_where(|kind| kind.is_textual()).len(),
    }
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Column;

    #[test]
    fn counts_missing_and_duplicates() {
        let data = Dataset::new(vec![
            Column::from_f64s("x", &[Some(1.0), Some(1.0), None, Some(4.0)]),
            Column::from_labels("g", &[Some("a"), Some("a"), Some("b"), None]),
        ])
        .unwrap();
        let report = assess(&data);
        assert_eq!(report.rows, 4);
        assert_eq!(report.missing_cells, 2);
        assert!((report.missing_percentage - 25.0).abs() < 1e-12);
        assert_eq!(report.duplicate_rows, 1);
        assert!((report.duplicate_percentage - 25.0).abs() < 1e-12);
        assert_eq!(report.numeric_columns, 1);
        assert_eq!(report.categorical_columns, 1);
    }

    #[test]
    fn empty_dataset_reports_zero_percentages() {
        let report = assess(&Dataset::default());
        assert_eq!(report.missing_percentage, 0.0);
        assert_eq!(report.duplicate_percentage, 0.0);
    }
}
