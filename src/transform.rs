//! Data-shaping operations. Every transform returns a new [`Dataset`] and
//! leaves its input untouched.

use log::{debug, info};
use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};
use serde::{Deserialize, Serialize};

use crate::{
    data::Value,
    dataset::{Column, Dataset},
    schema::ColumnKind,
    stats,
};

pub const DEFAULT_SAMPLE_SEED: u64 = 42;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FillMissingMode {
    Mean,
    Median,
    Mode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TransformKind {
    #[default]
    None,
    RemoveDuplicates,
    FillMissing(FillMissingMode),
    DropMissing,
    Normalize,
    Standardize,
}

pub fn transform(dataset: &Dataset, kind: TransformKind) -> Dataset {
    let result = match kind {
        TransformKind::None => dataset.clone(),
        TransformKind::RemoveDuplicates => {
            let mask = dataset.duplicate_mask();
            dataset.filter_rows(|row| !mask[row])
        }
        TransformKind::DropMissing => {
            dataset.filter_rows(|row| dataset.row(row).iter().all(Option::is_some))
        }
        TransformKind::FillMissing(mode) => {
            dataset.map_columns(|column| fill_missing(column, mode))
        }
        TransformKind::Normalize => dataset.map_columns(normalize),
        TransformKind::Standardize => dataset.map_columns(standardize),
    };
    info!(
        "Applied {kind:?}: {} row(s) -> {} row(s)",
        dataset.row_count(),
        result.row_count()
    );
    result
}

/// Sorted non-missing numeric values, or `None` for non-numeric columns.
fn sorted_values(column: &Column) -> Option<Vec<f64>> {
    if !column.kind().is_numeric() {
        return None;
    }
    let mut values = column
        .numeric_values()
        .into_iter()
        .filter(|v| !v.is_nan())
        .collect::<Vec<_>>();
    values.sort_by(f64::total_cmp);
    Some(values)
}

/// Missing numeric cells take the column's mean, median or mode. Text and
/// temporal columns keep their gaps.
fn fill_missing(column: &Column, mode: FillMissingMode) -> Option<Column> {
    if column.missing_count() == 0 {
        return None;
    }
    let values = sorted_values(column)?;
    if values.is_empty() {
        debug!("Column '{}' has no values to fill from", column.name());
        return None;
    }
    let fill = match mode {
        FillMissingMode::Mean => stats::mean(&values),
        FillMissingMode::Median => stats::quantile(&values, 0.5),
        FillMissingMode::Mode => stats::mode(&values),
    };

    let keep_integer = column.kind() == ColumnKind::Integer && fill.fract() == 0.0;
    let (kind, fill_value) = if keep_integer {
        (ColumnKind::Integer, Value::Integer(fill as i64))
    } else {
        (ColumnKind::Float, Value::Float(fill))
    };
    let cells = column
        .cells()
        .iter()
        .map(|cell| match cell {
            None => Some(fill_value.clone()),
            Some(value) if kind == ColumnKind::Float => value.as_f64().map(Value::Float),
            Some(value) => Some(value.clone()),
        })
        .collect();
    Some(Column::new(column.name(), kind, cells))
}

fn rescale(column: &Column, offset: f64, scale: f64) -> Column {
    let cells = column
        .as_f64s()
        .into_iter()
        .map(|v| v.map(|v| Value::Float((v - offset) / scale)))
        .collect();
    Column::new(column.name(), ColumnKind::Float, cells)
}

/// `(v - min) / (max - min)`; constant columns are left as they are.
fn normalize(column: &Column) -> Option<Column> {
    let values = sorted_values(column)?;
    let (min, max) = (*values.first()?, *values.last()?);
    if max == min {
        return None;
    }
    Some(rescale(column, min, max - min))
}

/// `(v - mean) / std` with the sample std; zero-spread columns are unchanged.
fn standardize(column: &Column) -> Option<Column> {
    let values = sorted_values(column)?;
    let std = stats::sample_variance(&values)?.sqrt();
    if std == 0.0 {
        return None;
    }
    Some(rescale(column, stats::mean(&values), std))
}

/// Up to `n` rows drawn without replacement, reproducible for a given seed.
/// Drawn rows keep their original relative order.
pub fn sample(dataset: &Dataset, n: usize, seed: u64) -> Dataset {
    let rows = dataset.row_count();
    if n >= rows {
        return dataset.clone();
    }
    let mut indices = (0..rows).collect::<Vec<_>>();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);
    indices.truncate(n);
    indices.sort_unstable();
    debug!("Sampled {n} of {rows} row(s) with seed {seed}");
    dataset.take_rows(&indices)
}
