use std::{borrow::Cow, fmt::Write as _};

use crate::dataset::Dataset;

/// Plain-text table with a dashed rule under the header. Columns flagged as
/// numeric are right-aligned.
#[derive(Debug, Clone, Default)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    right_aligned: Vec<bool>,
}

impl Table {
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let headers = headers.into_iter().map(Into::into).collect::<Vec<String>>();
        let right_aligned = vec![false; headers.len()];
        Self {
            headers,
            rows: Vec::new(),
            right_aligned,
        }
    }

    pub fn from_dataset(dataset: &Dataset) -> Self {
        let mut table = Self::new(dataset.column_names());
        table.right_aligned = dataset
            .columns()
            .iter()
            .map(|c| c.kind().is_numeric())
            .collect();
        for row in dataset.rows() {
            table.push_row(
                row.iter()
                    .map(|cell| cell.map(|v| v.as_display()).unwrap_or_default()),
            );
        }
        table
    }

    /// Two-column `metric | value` layout.
    pub fn key_value<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut table = Self::new(["metric", "value"]);
        table.right_aligned = vec![false, true];
        for (key, value) in pairs {
            table.push_row([key.into(), value.into()]);
        }
        table
    }

    pub fn align_right(mut self, column: usize) -> Self {
        if let Some(flag) = self.right_aligned.get_mut(column) {
            *flag = true;
        }
        self
    }

    pub fn push_row<I, S>(&mut self, row: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rows.push(row.into_iter().map(Into::into).collect());
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn render(&self) -> String {
        let mut widths = self
            .headers
            .iter()
            .map(|h| display_width(h).max(3))
            .collect::<Vec<_>>();
        for row in &self.rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(display_width(cell));
            }
        }

        let mut output = String::new();
        let _ = writeln!(output, "{}", self.format_row(&self.headers, &widths));
        let rule = widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>();
        let _ = writeln!(output, "{}", self.format_row(&rule, &widths));
        for row in &self.rows {
            let _ = writeln!(output, "{}", self.format_row(row, &widths));
        }
        output
    }

    pub fn print(&self) {
        print!("{}", self.render());
    }

    fn format_row(&self, values: &[String], widths: &[usize]) -> String {
        let cells = widths
            .iter()
            .enumerate()
            .map(|(idx, width)| {
                let value = values.get(idx).map(String::as_str).unwrap_or_default();
                let sanitized = sanitize_cell(value);
                let padding = " ".repeat(width.saturating_sub(display_width(&sanitized)));
                if self.right_aligned.get(idx).copied().unwrap_or(false) {
                    format!("{padding}{sanitized}")
                } else {
                    format!("{sanitized}{padding}")
                }
            })
            .collect::<Vec<_>>();
        cells.join("  ").trim_end().to_string()
    }
}

/// Whole numbers without decimals, everything else to four places.
pub fn format_number(value: f64) -> String {
    if !value.is_finite() {
        value.to_string()
    } else if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.4}")
    }
}

pub fn format_optional(value: Option<f64>) -> String {
    value.map(format_number).unwrap_or_else(|| "n/a".to_string())
}

fn display_width(value: &str) -> usize {
    value.chars().count()
}

fn sanitize_cell(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(value.replace(['\n', '\r', '\t'], " "))
    } else {
        Cow::Borrowed(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Column;

    #[test]
    fn renders_dataset_with_numeric_alignment() {
        let data = Dataset::new(vec![
            Column::from_labels("Region", &[Some("North"), None]),
            Column::from_f64s("Sales", &[Some(5.0), Some(1250.5)]),
        ])
        .unwrap();
        let rendered = Table::from_dataset(&data).render();
        let lines = rendered.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], "Region   Sales");
        assert_eq!(lines[1], "------  ------");
        assert_eq!(lines[2], "North        5");
        assert_eq!(lines[3], "        1250.5");
    }

    #[test]
    fn sanitizes_control_whitespace() {
        let mut table = Table::new(["a"]);
        table.push_row(["x\ny"]);
        assert!(table.render().contains("x y"));
    }

    #[test]
    fn formats_numbers_compactly() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(2.0 / 3.0), "0.6667");
        assert_eq!(format_optional(None), "n/a");
    }
}
