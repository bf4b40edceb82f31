//! Dashboard configuration loaded from YAML.
//!
//! Every field has a default, so a config file only needs the keys it changes:
//!
//! ```yaml
//! page_size: 50
//! membership_columns: [Region, Channel]
//! sample:
//!   seed: 7
//! ```

use std::{fs, path::Path};

use anyhow::{Context, Result, ensure};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::schema::DEFAULT_MAX_CATEGORIES;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Column the date range and presets filter on when none is named.
    pub date_column: String,
    /// Categorical columns offered as membership filters.
    pub membership_columns: Vec<String>,
    pub page_size: usize,
    /// Page sizes a caller may pick from; `page_size` must be one of them
    /// unless the list is empty.
    pub page_size_options: Vec<usize>,
    /// Text columns with at most this many distinct labels are categorical.
    pub max_categories: usize,
    pub top_records: usize,
    pub sample_size: usize,
    pub sample: SampleConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SampleConfig {
    pub seed: u64,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            date_column: "Date".to_string(),
            membership_columns: vec![
                "Region".to_string(),
                "Product".to_string(),
                "Category".to_string(),
            ],
            page_size: 25,
            page_size_options: vec![10, 25, 50, 100],
            max_categories: DEFAULT_MAX_CATEGORIES,
            top_records: 10,
            sample_size: 100,
            sample: SampleConfig::default(),
        }
    }
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            start: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or_default(),
            end: NaiveDate::from_ymd_opt(2023, 12, 31).unwrap_or_default(),
        }
    }
}

impl DashboardConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw =
            fs::read_to_string(path).with_context(|| format!("Opening config file {path:?}"))?;
        Self::from_yaml(&raw).with_context(|| format!("Parsing config file {path:?}"))
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(raw)?;
        config.ensure_valid()?;
        Ok(config)
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn ensure_valid(&self) -> Result<()> {
        ensure!(self.page_size > 0, "page_size must be positive");
        ensure!(
            self.page_size_options.iter().all(|size| *size > 0),
            "page_size_options must all be positive"
        );
        ensure!(
            self.page_size_options.is_empty() || self.page_size_options.contains(&self.page_size),
            "page_size {} is not one of page_size_options {:?}",
            self.page_size,
            self.page_size_options
        );
        ensure!(
            self.sample.start <= self.sample.end,
            "sample.start ({}) must not be after sample.end ({})",
            self.sample.start,
            self.sample.end
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config = DashboardConfig::from_yaml("page_size: 50\nsample:\n  seed: 7\n").unwrap();
        assert_eq!(config.page_size, 50);
        assert_eq!(config.sample.seed, 7);
        assert_eq!(config.sample.start, SampleConfig::default().start);
        assert_eq!(config.date_column, "Date");
    }

    #[test]
    fn rejects_zero_page_size() {
        assert!(DashboardConfig::from_yaml("page_size: 0\n").is_err());
    }

    #[test]
    fn page_size_must_be_an_offered_option() {
        let err = DashboardConfig::from_yaml("page_size: 30\n").unwrap_err();
        assert!(err.to_string().contains("not one of page_size_options"));
        let config =
            DashboardConfig::from_yaml("page_size: 30\npage_size_options: [15, 30]\n").unwrap();
        assert_eq!(config.page_size_options, vec![15, 30]);
        assert!(DashboardConfig::from_yaml("page_size: 30\npage_size_options: []\n").is_ok());
        assert!(DashboardConfig::from_yaml("page_size_options: [0, 25]\n").is_err());
    }

    #[test]
    fn rejects_reversed_sample_range() {
        let raw = "sample:\n  start: 2024-01-02\n  end: 2024-01-01\n";
        assert!(DashboardConfig::from_yaml(raw).is_err());
    }
}
