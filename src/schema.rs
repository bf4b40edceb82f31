//! Column kinds and the inference that assigns them.
//!
//! A column is numeric when every non-missing cell parses as a number,
//! temporal when every cell parses as an ISO date or date-time, and text
//! otherwise. Text columns with few distinct labels are categorical.

use std::{collections::HashSet, fmt};

use serde::{Deserialize, Serialize};

use crate::data::{is_missing_token, parse_naive_date, parse_naive_datetime};

pub const DEFAULT_MAX_CATEGORIES: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Integer,
    Float,
    Categorical,
    Text,
    Date,
    DateTime,
}

impl ColumnKind {
    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnKind::Integer | ColumnKind::Float)
    }

    pub fn is_temporal(self) -> bool {
        matches!(self, ColumnKind::Date | ColumnKind::DateTime)
    }

    pub fn is_textual(self) -> bool {
        matches!(self, ColumnKind::Categorical | ColumnKind::Text)
    }

    pub fn label(self) -> &'static str {
        match self {
            ColumnKind::Integer => "integer",
            ColumnKind::Float => "float",
            ColumnKind::Categorical => "categorical",
            ColumnKind::Text => "text",
            ColumnKind::Date => "date",
            ColumnKind::DateTime => "datetime",
        }
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone)]
pub(crate) struct KindCandidate {
    possible_integer: bool,
    possible_float: bool,
    possible_date: bool,
    possible_datetime: bool,
    observed: usize,
    distinct: HashSet<String>,
    distinct_cap: usize,
}

impl KindCandidate {
    pub(crate) fn new(max_categories: usize) -> Self {
        Self {
            possible_integer: true,
            possible_float: true,
            possible_date: true,
            possible_datetime: true,
            observed: 0,
            distinct: HashSet::new(),
            distinct_cap: max_categories.saturating_add(1),
        }
    }

    pub(crate) fn update(&mut self, raw: &str) {
        if is_missing_token(raw) {
            return;
        }
        let value = raw.trim();
        self.observed += 1;
        if self.possible_integer && value.parse::<i64>().is_err() {
            self.possible_integer = false;
        }
        if self.possible_float && value.parse::<f64>().is_err() {
            self.possible_float = false;
        }
        if self.possible_date && parse_naive_date(value).is_err() {
            self.possible_date = false;
        }
        if self.possible_datetime && parse_naive_datetime(value).is_err() {
            self.possible_datetime = false;
        }
        if self.distinct.len() < self.distinct_cap {
            self.distinct.insert(raw.to_string());
        }
    }

    pub(crate) fn decide(&self) -> ColumnKind {
        if self.observed == 0 {
            // An all-missing column behaves like an empty numeric column.
            ColumnKind::Float
        } else if self.possible_integer {
            ColumnKind::Integer
        } else if self.possible_float {
            ColumnKind::Float
        } else if self.possible_date {
            ColumnKind::Date
        } else if self.possible_datetime {
            ColumnKind::DateTime
        } else if self.distinct.len() < self.distinct_cap {
            ColumnKind::Categorical
        } else {
            ColumnKind::Text
        }
    }
}

pub fn infer_kind<'a, I>(values: I, max_categories: usize) -> ColumnKind
where
    I: IntoIterator<Item = &'a str>,
{
    let mut candidate = KindCandidate::new(max_categories);
    for value in values {
        candidate.update(value);
    }
    candidate.decide()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_numeric_kinds() {
        assert_eq!(infer_kind(["1", "2", "", "40"], 50), ColumnKind::Integer);
        assert_eq!(infer_kind(["1", "2.5", "NA"], 50), ColumnKind::Float);
    }

    #[test]
    fn infers_temporal_kinds() {
        assert_eq!(infer_kind(["2023-01-01", "2023-01-02"], 50), ColumnKind::Date);
        assert_eq!(
            infer_kind(["2023-01-01 10:00:00", "2023-01-02T11:30"], 50),
            ColumnKind::DateTime
        );
    }

    #[test]
    fn splits_text_by_distinct_count() {
        assert_eq!(
            infer_kind(["North", "South", "North"], 50),
            ColumnKind::Categorical
        );
        assert_eq!(infer_kind(["a", "b", "c"], 2), ColumnKind::Text);
    }

    #[test]
    fn all_missing_column_is_float() {
        assert_eq!(infer_kind(["", "NA"], 50), ColumnKind::Float);
    }
}
