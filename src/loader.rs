//! Ingestion: delimited text into a [`Dataset`], or a generated sample.

use std::{collections::HashMap, io::Read, path::Path};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use encoding_rs::Encoding;
use log::{debug, info};
use rand::{Rng, SeedableRng, distributions::Distribution, rngs::StdRng, seq::SliceRandom};
use statrs::distribution::Normal;

use crate::{
    config::SampleConfig,
    data::{Value, parse_typed_value},
    dataset::{Column, Dataset},
    io_utils,
    schema::{ColumnKind, KindCandidate},
};

pub const REGIONS: &[&str] = &["North", "South", "East", "West"];
pub const PRODUCTS: &[&str] = &["Product A", "Product B", "Product C", "Product D"];
pub const CATEGORIES: &[&str] = &["Electronics", "Clothing", "Food", "Books"];

#[derive(Debug, Clone, Copy)]
pub struct CsvOptions {
    pub delimiter: u8,
    pub encoding: &'static Encoding,
    pub max_categories: usize,
}

pub fn load_csv(path: &Path, options: &CsvOptions) -> Result<Dataset> {
    info!("Loading '{}'", path.display());
    let reader = io_utils::open_input(path)?;
    read_csv(reader, options).with_context(|| format!("Reading {path:?}"))
}

pub fn read_csv<R: Read>(reader: R, options: &CsvOptions) -> Result<Dataset> {
    let mut reader = io_utils::open_csv_reader(reader, options.delimiter);
    let headers = dedupe_headers(io_utils::reader_headers(&mut reader, options.encoding)?);
    let mut raw_columns: Vec<Vec<String>> = vec![Vec::new(); headers.len()];

    for (row_idx, record) in reader.byte_records().enumerate() {
        let record = record.with_context(|| format!("Reading row {}", row_idx + 2))?;
        let decoded = io_utils::decode_record(&record, options.encoding)
            .with_context(|| format!("Decoding row {}", row_idx + 2))?;
        for (column, value) in raw_columns.iter_mut().zip(decoded) {
            column.push(value);
        }
    }

    let columns = headers
        .into_iter()
        .zip(raw_columns)
        .map(|(name, raw)| build_column(name, &raw, options.max_categories))
        .collect::<Result<Vec<_>>>()?;
    let dataset = Dataset::new(columns)?;
    debug!(
        "Loaded {} row(s) across {} column(s)",
        dataset.row_count(),
        dataset.column_count()
    );
    Ok(dataset)
}

fn build_column(name: String, raw: &[String], max_categories: usize) -> Result<Column> {
    let mut candidate = KindCandidate::new(max_categories);
    for value in raw {
        candidate.update(value);
    }
    let kind = candidate.decide();
    debug!("Column '{name}' inferred as {kind}");
    let cells = raw
        .iter()
        .enumerate()
        .map(|(idx, value)| {
            parse_typed_value(value, kind)
                .with_context(|| format!("Row {} column '{name}'", idx + 2))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Column::new(name, kind, cells))
}

/// Repeated header names get `.1`, `.2`, ... suffixes so names stay unique.
fn dedupe_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut result = Vec::with_capacity(headers.len());
    for header in headers {
        let mut candidate = header.clone();
        while let Some(count) = seen.get_mut(&candidate) {
            *count += 1;
            candidate = format!("{header}.{count}");
        }
        seen.insert(candidate.clone(), 0);
        result.push(candidate);
    }
    result
}

/// Daily sales sample spanning `config.start..=config.end`, reproducible for
/// a given seed.
pub fn generate_sample(config: &SampleConfig) -> Result<Dataset> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let dates: Vec<NaiveDate> = config
        .start
        .iter_days()
        .take_while(|d| *d <= config.end)
        .collect();
    let rows = dates.len();

    let sales = Normal::new(1000.0, 200.0).context("Building sales distribution")?;
    let revenue = Normal::new(50_000.0, 10_000.0).context("Building revenue distribution")?;

    let sales_values = (0..rows)
        .map(|_| Some(Value::Float(sales.sample(&mut rng).abs())))
        .collect();
    let revenue_values = (0..rows)
        .map(|_| Some(Value::Float(revenue.sample(&mut rng).abs())))
        .collect();
    let customers = (0..rows)
        .map(|_| Some(Value::Integer(rng.gen_range(50..500))))
        .collect();
    let mut labels = |choices: &[&str]| -> Vec<Option<Value>> {
        (0..rows)
            .map(|_| choices.choose(&mut rng).map(|s| Value::Text((*s).to_string())))
            .collect()
    };
    let regions = labels(REGIONS);
    let products = labels(PRODUCTS);
    let categories = labels(CATEGORIES);

    let date_cells = dates.into_iter().map(|d| Some(Value::Date(d))).collect();
    let dataset = Dataset::new(vec![
        Column::new("Date", ColumnKind::Date, date_cells),
        Column::new("Sales", ColumnKind::Float, sales_values),
        Column::new("Revenue", ColumnKind::Float, revenue_values),
        Column::new("Customers", ColumnKind::Integer, customers),
        Column::new("Region", ColumnKind::Categorical, regions),
        Column::new("Product", ColumnKind::Categorical, products),
        Column::new("Category", ColumnKind::Categorical, categories),
    ])?;
    info!(
        "Generated sample dataset with {} row(s) (seed {})",
        dataset.row_count(),
        config.seed
    );
    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::UTF_8;

    fn options() -> CsvOptions {
        CsvOptions {
            delimiter: b',',
            encoding: UTF_8,
            max_categories: 50,
        }
    }

    #[test]
    fn read_csv_infers_kinds_and_missing_cells() {
        let input = "Date,Sales,Region\n2023-01-01,10.5,North\n2023-01-02,NA,\n";
        let data = read_csv(input.as_bytes(), &options()).unwrap();
        assert_eq!(data.row_count(), 2);
        assert_eq!(data.column("Date").unwrap().kind(), ColumnKind::Date);
        assert_eq!(data.column("Sales").unwrap().kind(), ColumnKind::Float);
        assert_eq!(data.column("Region").unwrap().kind(), ColumnKind::Categorical);
        assert_eq!(data.missing_cell_count(), 2);
    }

    #[test]
    fn header_only_input_has_zero_rows() {
        let data = read_csv("a,b\n".as_bytes(), &options()).unwrap();
        assert_eq!(data.column_count(), 2);
        assert_eq!(data.row_count(), 0);
    }

    #[test]
    fn repeated_headers_are_suffixed() {
        assert_eq!(
            dedupe_headers(vec!["a".into(), "a".into(), "b".into(), "a".into()]),
            vec!["a", "a.1", "b", "a.2"]
        );
    }

    #[test]
    fn sample_is_reproducible_and_spans_a_year() {
        let first = generate_sample(&SampleConfig::default()).unwrap();
        let second = generate_sample(&SampleConfig::default()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.row_count(), 365);
        assert!(first.column("Sales").unwrap().numeric_values().iter().all(|v| *v >= 0.0));
        let customers = first.column("Customers").unwrap().numeric_values();
        assert!(customers.iter().all(|v| (50.0..500.0).contains(v)));
    }
}
