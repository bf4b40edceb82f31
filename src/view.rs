//! Read-only queries over a dataset for the table view.

use serde::Serialize;

use crate::{dataset::Dataset, error::NotApplicable};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageInfo {
    /// 1-based, after clamping.
    pub page_number: usize,
    pub page_size: usize,
    pub total_rows: usize,
    pub total_pages: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub rows: Dataset,
    pub info: PageInfo,
}

pub fn total_pages(rows: usize, page_size: usize) -> usize {
    rows.div_ceil(page_size.max(1)).max(1)
}

/// Contiguous slice for `page_number`, clamped into `1..=total_pages`.
pub fn paginate(dataset: &Dataset, page_size: usize, page_number: usize) -> Page {
    let page_size = page_size.max(1);
    let total_rows = dataset.row_count();
    let total_pages = total_pages(total_rows, page_size);
    let page_number = page_number.clamp(1, total_pages);
    let start = (page_number - 1) * page_size;
    Page {
        rows: dataset.slice(start, start + page_size),
        info: PageInfo {
            page_number,
            page_size,
            total_rows,
            total_pages,
        },
    }
}

/// Rows where any non-missing cell contains `term`, ignoring case.
pub fn search(dataset: &Dataset, term: &str) -> Dataset {
    if term.is_empty() {
        return dataset.clone();
    }
    let needle = term.to_lowercase();
    dataset.filter_rows(|row| {
        dataset.columns().iter().any(|column| {
            column
                .cell(row)
                .is_some_and(|v| v.as_display().to_lowercase().contains(&needle))
        })
    })
}

/// The `n` rows with the largest values in `column`, largest first. Missing
/// values are skipped; equal values keep their original order.
pub fn top_records(dataset: &Dataset, column: &str, n: usize) -> Result<Dataset, NotApplicable> {
    let target = dataset
        .column(column)
        .ok_or_else(|| NotApplicable::ColumnNotFound(column.to_string()))?;
    if !target.kind().is_numeric() {
        return Err(NotApplicable::NotNumeric(column.to_string()));
    }
    let mut ranked = target
        .as_f64s()
        .into_iter()
        .enumerate()
        .filter_map(|(row, v)| v.filter(|v| !v.is_nan()).map(|v| (row, v)))
        .collect::<Vec<_>>();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    let rows = ranked.into_iter().take(n).map(|(row, _)| row).collect::<Vec<_>>();
    Ok(dataset.take_rows(&rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Column;

    fn ten_rows() -> Dataset {
        let values = (1..=10).map(|v| Some(v as f64)).collect::<Vec<_>>();
        Dataset::new(vec![Column::from_f64s("x", &values)]).unwrap()
    }

    #[test]
    fn single_page_holds_small_dataset() {
        let page = paginate(&ten_rows(), 25, 1);
        assert_eq!(page.rows.row_count(), 10);
        assert_eq!(page.info.total_pages, 1);
    }

    #[test]
    fn page_number_is_clamped() {
        let page = paginate(&ten_rows(), 3, 99);
        assert_eq!(page.info.page_number, 4);
        assert_eq!(page.rows.column("x").unwrap().numeric_values(), vec![10.0]);
        assert_eq!(paginate(&ten_rows(), 3, 0).info.page_number, 1);
        assert_eq!(paginate(&Dataset::default(), 0, 1).info.total_pages, 1);
    }

    #[test]
    fn search_is_case_insensitive_and_skips_missing() {
        let data = Dataset::new(vec![Column::from_labels(
            "g",
            &[Some("North"), None, Some("northeast"), Some("South")],
        )])
        .unwrap();
        assert_eq!(search(&data, "NORTH").row_count(), 2);
        assert_eq!(search(&data, ""), data);
        assert_eq!(search(&data, "  ").row_count(), 0);
        assert_eq!(search(&data, "none").row_count(), 0);
    }

    #[test]
    fn search_keeps_surrounding_spaces_in_the_term() {
        let data = Dataset::new(vec![Column::from_labels(
            "g",
            &[Some("North"), Some("a North b"), Some("South")],
        )])
        .unwrap();
        let found = search(&data, " North");
        assert_eq!(found.row_count(), 1);
        assert_eq!(found.column("g").unwrap().distinct_labels(), vec!["a North b"]);
        assert_eq!(search(&data, "north ").row_count(), 1);
    }

    #[test]
    fn top_records_orders_descending_and_stably() {
        let data = Dataset::new(vec![
            Column::from_f64s("x", &[Some(2.0), None, Some(5.0), Some(2.0)]),
            Column::from_labels("id", &[Some("a"), Some("b"), Some("c"), Some("d")]),
        ])
        .unwrap();
        let top = top_records(&data, "x", 3).unwrap();
        assert_eq!(top.column("id").unwrap().distinct_labels().len(), 3);
        assert_eq!(top, data.take_rows(&[2, 0, 3]));
        assert_eq!(
            top_records(&data, "id", 1),
            Err(NotApplicable::NotNumeric("id".into()))
        );
    }
}
