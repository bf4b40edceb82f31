//! Descriptive statistics, IQR outliers, linear trend fitting and
//! correlation over numeric columns.
//!
//! Missing cells (and NaN values) are excluded from every statistic. Results
//! follow the conventions of common dataframe tooling: quantiles interpolate
//! linearly between closest ranks, dispersion uses the sample (n - 1)
//! denominator, skewness and kurtosis are the bias-adjusted estimators.

use std::{cmp::Ordering, fmt};

use log::debug;
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, StudentsT};

use crate::{
    dataset::{Column, Dataset},
    error::NotApplicable,
    filter,
};

const OUTLIER_FENCE: f64 = 1.5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnStatistics {
    pub column: String,
    pub count: usize,
    pub missing: usize,
    pub mean: f64,
    pub median: f64,
    pub mode: f64,
    pub std: Option<f64>,
    pub variance: Option<f64>,
    pub min: f64,
    pub max: f64,
    pub range: f64,
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
    /// Percentage; absent when the mean is zero.
    pub coefficient_of_variation: Option<f64>,
    pub skewness: Option<f64>,
    pub kurtosis: Option<f64>,
    pub outliers: Outliers,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outliers {
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub count: usize,
    pub percentage: f64,
}

pub fn describe(dataset: &Dataset, column: &str) -> Result<ColumnStatistics, NotApplicable> {
    let column = numeric_column(dataset, column)?;
    let mut values = finite_values(column);
    if values.is_empty() {
        return Err(NotApplicable::NoValues(column.name().to_string()));
    }
    values.sort_by(f64::total_cmp);

    let count = values.len();
    let mean = mean(&values);
    let variance = sample_variance(&values);
    let std = variance.map(f64::sqrt);
    let min = values[0];
    let max = values[count - 1];
    let q1 = quantile(&values, 0.25);
    let q3 = quantile(&values, 0.75);
    let iqr = q3 - q1;

    let lower_bound = q1 - OUTLIER_FENCE * iqr;
    let upper_bound = q3 + OUTLIER_FENCE * iqr;
    let outlier_count = values
        .iter()
        .filter(|v| **v < lower_bound || **v > upper_bound)
        .count();

    let stats = ColumnStatistics {
        column: column.name().to_string(),
        count,
        missing: column.len() - count,
        mean,
        median: quantile(&values, 0.5),
        mode: mode(&values),
        std,
        variance,
        min,
        max,
        range: max - min,
        q1,
        q3,
        iqr,
        coefficient_of_variation: match std {
            Some(std) if mean != 0.0 => Some(std / mean * 100.0),
            _ => None,
        },
        skewness: skewness(&values, mean),
        kurtosis: kurtosis(&values, mean),
        outliers: Outliers {
            lower_bound,
            upper_bound,
            count: outlier_count,
            percentage: outlier_count as f64 / count as f64 * 100.0,
        },
    };
    debug!("Described '{}' over {count} value(s)", stats.column);
    Ok(stats)
}

/// Statistics for every numeric column that has at least one value.
pub fn describe_all(dataset: &Dataset) -> Vec<ColumnStatistics> {
    dataset
        .numeric_columns()
        .into_iter()
        .filter_map(|column| describe(dataset, column.name()).ok())
        .collect()
}

fn numeric_column<'a>(dataset: &'a Dataset, name: &str) -> Result<&'a Column, NotApplicable> {
    let column = dataset
        .column(name)
        .ok_or_else(|| NotApplicable::ColumnNotFound(name.to_string()))?;
    if !column.kind().is_numeric() {
        return Err(NotApplicable::NotNumeric(name.to_string()));
    }
    Ok(column)
}

fn finite_values(column: &Column) -> Vec<f64> {
    column
        .numeric_values()
        .into_iter()
        .filter(|v| !v.is_nan())
        .collect()
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn sample_variance(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n < 2 {
        return None;
    }
    let mean = mean(values);
    let sum_squares = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>();
    Some(sum_squares / (n - 1) as f64)
}

/// Linear interpolation between closest ranks; `sorted` must be non-empty
/// and ascending.
pub(crate) fn quantile(sorted: &[f64], q: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let rank = q * (n - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = (rank.ceil() as usize).min(n - 1);
    let frac = rank - lower as f64;
    if lower == upper {
        sorted[lower]
    } else {
        sorted[lower] * (1.0 - frac) + sorted[upper] * frac
    }
}

/// Most frequent value of an ascending slice; the smallest wins ties.
pub(crate) fn mode(sorted: &[f64]) -> f64 {
    let mut best = (sorted[0], 0usize);
    let mut idx = 0;
    while idx < sorted.len() {
        let value = sorted[idx];
        let run = sorted[idx..].iter().take_while(|v| **v == value).count();
        if run > best.1 {
            best = (value, run);
        }
        idx += run.max(1);
    }
    best.0
}

fn central_moment_sums(values: &[f64], mean: f64) -> (f64, f64, f64) {
    values.iter().fold((0.0, 0.0, 0.0), |(m2, m3, m4), v| {
        let d = v - mean;
        let d2 = d * d;
        (m2 + d2, m3 + d2 * d, m4 + d2 * d2)
    })
}

fn skewness(values: &[f64], mean: f64) -> Option<f64> {
    let n = values.len() as f64;
    if values.len() < 3 {
        return None;
    }
    let (m2, m3, _) = central_moment_sums(values, mean);
    if m2 == 0.0 {
        return Some(0.0);
    }
    Some(n * (n - 1.0).sqrt() / (n - 2.0) * (m3 / m2.powf(1.5)))
}

fn kurtosis(values: &[f64], mean: f64) -> Option<f64> {
    let n = values.len() as f64;
    if values.len() < 4 {
        return None;
    }
    let (m2, _, m4) = central_moment_sums(values, mean);
    let denominator = (n - 2.0) * (n - 3.0) * m2 * m2;
    if denominator == 0.0 {
        return Some(0.0);
    }
    let numerator = n * (n + 1.0) * (n - 1.0) * m4;
    let adjustment = 3.0 * (n - 1.0).powi(2) / ((n - 2.0) * (n - 3.0));
    Some(numerator / denominator - adjustment)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

impl TrendDirection {
    fn from_slope(slope: f64) -> Self {
        match slope.partial_cmp(&0.0) {
            Some(Ordering::Greater) => TrendDirection::Increasing,
            Some(Ordering::Less) => TrendDirection::Decreasing,
            _ => TrendDirection::Stable,
        }
    }
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TrendDirection::Increasing => "Increasing",
            TrendDirection::Decreasing => "Decreasing",
            TrendDirection::Stable => "Stable",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendResult {
    pub column: String,
    pub date_column: String,
    pub points: usize,
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
    pub p_value: f64,
    pub std_err: f64,
    pub direction: TrendDirection,
}

pub fn fit_trend(dataset: &Dataset, column: &str) -> Result<TrendResult, NotApplicable> {
    fit_trend_with(dataset, column, None)
}

/// Least-squares fit of `column` against its rank in date order. Rows missing
/// either the date or the value are dropped first; ties in date keep their
/// original order.
pub fn fit_trend_with(
    dataset: &Dataset,
    column: &str,
    date_column: Option<&str>,
) -> Result<TrendResult, NotApplicable> {
    let target = numeric_column(dataset, column)?;
    let dates = filter::resolve_date_column(dataset, date_column)
        .ok_or(NotApplicable::NoTemporalColumn)?;

    let mut points = (0..dataset.row_count())
        .filter_map(|row| {
            let when = dates.cell(row)?.as_datetime()?;
            let value = target.cell(row)?.as_f64().filter(|v| !v.is_nan())?;
            Some((when, value))
        })
        .collect::<Vec<_>>();
    if points.len() < 2 {
        return Err(NotApplicable::InsufficientData {
            column: column.to_string(),
            valid_rows: points.len(),
        });
    }
    points.sort_by_key(|(when, _)| *when);

    let ys = points.iter().map(|(_, v)| *v).collect::<Vec<_>>();
    let fit = least_squares(&ys);
    debug!(
        "Trend on '{column}' over {} point(s): slope {}",
        ys.len(),
        fit.slope
    );
    Ok(TrendResult {
        column: column.to_string(),
        date_column: dates.name().to_string(),
        points: ys.len(),
        slope: fit.slope,
        intercept: fit.intercept,
        r_squared: fit.r * fit.r,
        p_value: fit.p_value,
        std_err: fit.std_err,
        direction: TrendDirection::from_slope(fit.slope),
    })
}

struct LinearFit {
    slope: f64,
    intercept: f64,
    r: f64,
    p_value: f64,
    std_err: f64,
}

/// Regression of `ys` on `0..n`; needs at least two points.
fn least_squares(ys: &[f64]) -> LinearFit {
    let n = ys.len() as f64;
    let x_mean = (n - 1.0) / 2.0;
    let y_mean = mean(ys);

    if ys.iter().all(|y| *y == ys[0]) {
        return LinearFit {
            slope: 0.0,
            intercept: ys[0],
            r: 0.0,
            p_value: 1.0,
            std_err: 0.0,
        };
    }

    let (mut sxx, mut sxy, mut syy) = (0.0, 0.0, 0.0);
    for (idx, y) in ys.iter().enumerate() {
        let dx = idx as f64 - x_mean;
        let dy = y - y_mean;
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
    }
    let slope = sxy / sxx;
    let intercept = y_mean - slope * x_mean;
    let r = (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0);

    let df = n - 2.0;
    let unexplained = (1.0 - r) * (1.0 + r);
    if df == 0.0 || unexplained <= 0.0 {
        return LinearFit {
            slope,
            intercept,
            r,
            p_value: 0.0,
            std_err: 0.0,
        };
    }
    let t = r * (df / unexplained).sqrt();
    let p_value = StudentsT::new(0.0, 1.0, df)
        .map(|dist| 2.0 * (1.0 - dist.cdf(t.abs())))
        .unwrap_or(f64::NAN);
    let std_err = (unexplained * syy / sxx / df).sqrt();
    LinearFit {
        slope,
        intercept,
        r,
        p_value,
        std_err,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    /// `values[i][j]` is absent when fewer than two rows have both values or
    /// either side is constant over those rows.
    pub values: Vec<Vec<Option<f64>>>,
}

/// Pairwise-complete Pearson correlation across numeric columns.
pub fn correlation_matrix(dataset: &Dataset) -> CorrelationMatrix {
    let columns = dataset.numeric_columns();
    let series = columns.iter().map(|c| c.as_f64s()).collect::<Vec<_>>();
    let values = series
        .iter()
        .map(|a| series.iter().map(|b| pearson(a, b)).collect())
        .collect();
    CorrelationMatrix {
        columns: columns.iter().map(|c| c.name().to_string()).collect(),
        values,
    }
}

fn pearson(a: &[Option<f64>], b: &[Option<f64>]) -> Option<f64> {
    let pairs = a
        .iter()
        .zip(b)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .filter(|(x, y)| !x.is_nan() && !y.is_nan())
        .collect::<Vec<_>>();
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let x_mean = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let y_mean = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;
    let (mut sxx, mut sxy, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        let dx = x - x_mean;
        let dy = y - y_mean;
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
    }
    if sxx == 0.0 || syy == 0.0 {
        return None;
    }
    Some((sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0))
}
