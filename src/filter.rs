//! Row filtering by date range and categorical membership.
//!
//! A [`FilterSpec`] is a conjunction: a row survives only if it satisfies
//! every date filter and every membership filter. Within one membership
//! filter any of the allowed labels matches. Predicates that cannot be
//! evaluated (absent column, empty allowed set, malformed date bounds) do not
//! exclude anything; malformed bounds are additionally reported as warnings.

use std::collections::BTreeSet;

use anyhow::{Result, anyhow};
use chrono::{Datelike, Duration, NaiveDate};
use clap::ValueEnum;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::{
    data::parse_temporal,
    dataset::{Column, Dataset},
    error::Warning,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateFilter {
    /// Column to filter on; `None` picks the dataset's date column.
    pub column: Option<String>,
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipFilter {
    pub column: String,
    pub allowed: BTreeSet<String>,
}

impl MembershipFilter {
    pub fn new<I, S>(column: impl Into<String>, allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            column: column.into(),
            allowed: allowed.into_iter().map(Into::into).collect(),
        }
    }

    /// Parses `column=value[,value...]`.
    pub fn parse(spec: &str) -> Result<Self> {
        let trimmed = spec.trim();
        let (column, values) = trimmed
            .split_once('=')
            .ok_or_else(|| anyhow!("Membership filter '{trimmed}' must look like column=a,b"))?;
        let column = column.trim();
        if column.is_empty() {
            return Err(anyhow!("Membership filter '{trimmed}' is missing a column"));
        }
        let allowed = values
            .split(',')
            .map(|v| unquote(v.trim()))
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect::<BTreeSet<_>>();
        Ok(Self {
            column: column.to_string(),
            allowed,
        })
    }
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub dates: Vec<DateFilter>,
    pub memberships: Vec<MembershipFilter>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_date_range(self, start: impl Into<String>, end: impl Into<String>) -> Self {
        self.with_date_filter(DateFilter {
            column: None,
            start: start.into(),
            end: end.into(),
        })
    }

    pub fn with_date_filter(mut self, filter: DateFilter) -> Self {
        self.dates.push(filter);
        self
    }

    pub fn with_membership<I, S>(mut self, column: impl Into<String>, allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.memberships.push(MembershipFilter::new(column, allowed));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty() && self.memberships.is_empty()
    }

    /// Filters equivalent to applying `self` and then `other`.
    pub fn conjunction(&self, other: &FilterSpec) -> FilterSpec {
        FilterSpec {
            dates: self.dates.iter().chain(&other.dates).cloned().collect(),
            memberships: self
                .memberships
                .iter()
                .chain(&other.memberships)
                .cloned()
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filtered {
    pub dataset: Dataset,
    pub warnings: Vec<Warning>,
}

enum Predicate<'a> {
    Date {
        column: &'a Column,
        start: NaiveDate,
        end: NaiveDate,
    },
    Member {
        column: &'a Column,
        allowed: &'a BTreeSet<String>,
    },
}

impl Predicate<'_> {
    fn matches(&self, row: usize) -> bool {
        match self {
            Predicate::Date { column, start, end } => column
                .cell(row)
                .and_then(|v| v.as_datetime())
                .map(|dt| dt.date())
                .is_some_and(|d| *start <= d && d <= *end),
            Predicate::Member { column, allowed } => column
                .cell(row)
                .is_some_and(|v| allowed.contains(&v.as_display())),
        }
    }
}

pub fn apply(dataset: &Dataset, spec: &FilterSpec) -> Filtered {
    let mut warnings = Vec::new();
    let mut predicates = Vec::new();

    for filter in &spec.dates {
        let Some(column) = resolve_date_column(dataset, filter.column.as_deref()) else {
            debug!("No date column available; date filter skipped");
            continue;
        };
        match parse_bounds(&filter.start, &filter.end) {
            Ok((start, end)) => predicates.push(Predicate::Date { column, start, end }),
            Err(warning) => {
                warn!("{warning}");
                warnings.push(warning);
            }
        }
    }

    for filter in &spec.memberships {
        if filter.allowed.is_empty() {
            continue;
        }
        match dataset.column(&filter.column) {
            Some(column) => predicates.push(Predicate::Member {
                column,
                allowed: &filter.allowed,
            }),
            None => debug!("Column '{}' absent; membership filter skipped", filter.column),
        }
    }

    let filtered = if predicates.is_empty() {
        dataset.clone()
    } else {
        dataset.filter_rows(|row| predicates.iter().all(|p| p.matches(row)))
    };
    debug!(
        "Filter kept {} of {} row(s)",
        filtered.row_count(),
        dataset.row_count()
    );
    Filtered {
        dataset: filtered,
        warnings,
    }
}

/// Named column, else the first temporal column, else a column called `date`.
pub fn resolve_date_column<'a>(dataset: &'a Dataset, explicit: Option<&str>) -> Option<&'a Column> {
    match explicit {
        Some(name) => dataset.column(name),
        None => dataset.first_temporal_column().or_else(|| {
            dataset
                .columns()
                .iter()
                .find(|c| c.name().eq_ignore_ascii_case("date"))
        }),
    }
}

fn parse_bounds(start: &str, end: &str) -> Result<(NaiveDate, NaiveDate), Warning> {
    let parse = |label: &str, raw: &str| {
        parse_temporal(raw)
            .map(|dt| dt.date())
            .map_err(|_| Warning::MalformedDateBounds {
                detail: format!("{label} bound '{raw}' is not a valid date"),
            })
    };
    let start = parse("start", start)?;
    let end = parse("end", end)?;
    if start > end {
        return Err(Warning::MalformedDateBounds {
            detail: format!("start {start} is after end {end}"),
        });
    }
    Ok((start, end))
}

/// Earliest and latest date present in the date column.
pub fn date_extent(dataset: &Dataset, column: Option<&str>) -> Option<(NaiveDate, NaiveDate)> {
    let column = resolve_date_column(dataset, column)?;
    let dates = column
        .cells()
        .iter()
        .flatten()
        .filter_map(|v| v.as_datetime())
        .map(|dt| dt.date());
    dates.fold(None, |acc, d| match acc {
        None => Some((d, d)),
        Some((lo, hi)) => Some((lo.min(d), hi.max(d))),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
pub enum DatePreset {
    #[value(name = "last-7-days")]
    Last7Days,
    #[value(name = "last-30-days")]
    Last30Days,
    #[value(name = "last-90-days")]
    Last90Days,
    #[value(name = "last-6-months")]
    Last6Months,
    LastYear,
    ThisMonth,
    ThisYear,
}

impl DatePreset {
    /// Window ending `today`, before clamping to the data.
    pub fn window(self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        let days_back = |days: i64| today - Duration::days(days);
        let start = match self {
            DatePreset::Last7Days => days_back(7),
            DatePreset::Last30Days => days_back(30),
            DatePreset::Last90Days => days_back(90),
            DatePreset::Last6Months => days_back(180),
            DatePreset::LastYear => days_back(365),
            DatePreset::ThisMonth => today.with_day(1).unwrap_or(today),
            DatePreset::ThisYear => today.with_ordinal(1).unwrap_or(today),
        };
        (start, today)
    }

    /// Date filter for this preset clamped to the data's date extent. When the
    /// window misses the data entirely the bounds come out reversed and the
    /// filter engine reports them instead of filtering.
    pub fn resolve(self, today: NaiveDate, dataset: &Dataset, column: Option<&str>) -> DateFilter {
        let (mut start, mut end) = self.window(today);
        if let Some((min, max)) = date_extent(dataset, column) {
            start = start.max(min);
            end = end.min(max);
        }
        DateFilter {
            column: column.map(str::to_string),
            start: start.format("%Y-%m-%d").to_string(),
            end: end.format("%Y-%m-%d").to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{data::Value, schema::ColumnKind};

    fn dataset() -> Dataset {
        let dates = ["2023-01-01", "2023-01-02", "2023-01-03", "2023-01-04"]
            .iter()
            .map(|d| Some(Value::Date(NaiveDate::parse_from_str(d, "%Y-%m-%d").unwrap())))
            .collect();
        Dataset::new(vec![
            Column::new("Date", ColumnKind::Date, dates),
            Column::from_labels("Region", &[Some("North"), Some("South"), None, Some("North")]),
        ])
        .unwrap()
    }

    #[test]
    fn parse_membership_filter_trims_and_unquotes() {
        let filter = MembershipFilter::parse(" Region = North,'South', ").unwrap();
        assert_eq!(filter.column, "Region");
        assert_eq!(
            filter.allowed.into_iter().collect::<Vec<_>>(),
            vec!["North", "South"]
        );
        assert!(MembershipFilter::parse("Region").is_err());
        assert!(MembershipFilter::parse("=North").is_err());
    }

    #[test]
    fn date_range_is_inclusive() {
        let spec = FilterSpec::new().with_date_range("2023-01-02", "2023-01-03");
        let result = apply(&dataset(), &spec);
        assert_eq!(result.dataset.row_count(), 2);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn reversed_bounds_warn_and_keep_everything() {
        let spec = FilterSpec::new().with_date_range("2023-01-03", "2023-01-01");
        let result = apply(&dataset(), &spec);
        assert_eq!(result.dataset.row_count(), 4);
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn unparseable_bounds_warn_once_and_keep_everything() {
        for (start, end) in [("2023-13-45", "2023-01-04"), ("2023-01-01", "yesterday")] {
            let spec = FilterSpec::new().with_date_range(start, end);
            let result = apply(&dataset(), &spec);
            assert_eq!(result.dataset, dataset());
            match result.warnings.as_slice() {
                [Warning::MalformedDateBounds { detail }] => {
                    assert!(detail.contains("is not a valid date"), "{detail}");
                }
                other => panic!("unexpected warnings: {other:?}"),
            }
        }
    }

    #[test]
    fn membership_skips_missing_cells() {
        let spec = FilterSpec::new().with_membership("Region", ["North", "South"]);
        assert_eq!(apply(&dataset(), &spec).dataset.row_count(), 3);
    }

    #[test]
    fn empty_membership_and_absent_column_are_no_ops() {
        let spec = FilterSpec::new()
            .with_membership("Region", Vec::<String>::new())
            .with_membership("Product", ["Product A"]);
        assert_eq!(apply(&dataset(), &spec).dataset, dataset());
    }

    #[test]
    fn preset_clamps_to_data_extent() {
        let today = NaiveDate::from_ymd_opt(2023, 1, 10).unwrap();
        let filter = DatePreset::Last7Days.resolve(today, &dataset(), None);
        assert_eq!(filter.start, "2023-01-03");
        assert_eq!(filter.end, "2023-01-04");
        let this_year = DatePreset::ThisYear.window(today);
        assert_eq!(this_year.0, NaiveDate::from_ymd_opt(2023, 1, 1).unwrap());
    }
}
