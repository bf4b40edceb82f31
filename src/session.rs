//! Per-user analysis context.
//!
//! A [`Session`] owns the loaded dataset, the active filters and the filtered
//! view every query runs against. Sessions share nothing, so several can
//! live side by side.

use std::{collections::BTreeMap, sync::Arc};

use log::info;

use crate::{
    chart::{ChartDescriptor, ChartKind, Slot},
    config::DashboardConfig,
    dataset::Dataset,
    error::{NotApplicable, StructuralError, Warning},
    export::{self, DashboardSummary},
    filter::{self, FilterSpec},
    quality::{self, QualityReport},
    stats::{self, ColumnStatistics, TrendResult},
    transform::{self, TransformKind},
    validate::{self, ValidationResult},
    view::{self, Page},
};

#[derive(Debug, Clone)]
pub struct Session {
    config: DashboardConfig,
    dataset: Arc<Dataset>,
    validation: ValidationResult,
    filters: FilterSpec,
    view: Arc<Dataset>,
    filter_warnings: Vec<Warning>,
}

impl Session {
    /// Validates `dataset` and starts with no filters applied.
    pub fn open(dataset: Dataset, config: DashboardConfig) -> Result<Self, StructuralError> {
        let validation = validate::validate(Some(&dataset)).into_result()?;
        let dataset = Arc::new(dataset);
        info!(
            "Session opened over {} row(s), {} column(s)",
            dataset.row_count(),
            dataset.column_count()
        );
        Ok(Self {
            config,
            view: Arc::clone(&dataset),
            dataset,
            validation,
            filters: FilterSpec::default(),
            filter_warnings: Vec::new(),
        })
    }

    /// Swaps in a new dataset and re-applies the current filters to it.
    pub fn replace(&mut self, dataset: Dataset) -> Result<(), StructuralError> {
        self.validation = validate::validate(Some(&dataset)).into_result()?;
        self.dataset = Arc::new(dataset);
        let filters = std::mem::take(&mut self.filters);
        self.apply_filters(filters);
        Ok(())
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn view(&self) -> &Dataset {
        &self.view
    }

    pub fn filters(&self) -> &FilterSpec {
        &self.filters
    }

    pub fn validation(&self) -> &ValidationResult {
        &self.validation
    }

    /// Load-time warnings followed by those from the latest filter.
    pub fn warnings(&self) -> impl Iterator<Item = &Warning> {
        self.validation.warnings.iter().chain(&self.filter_warnings)
    }

    /// The configured date column when the dataset has it, otherwise `None`
    /// so the first temporal column is used.
    pub fn date_column(&self) -> Option<&str> {
        let name = self.config.date_column.as_str();
        self.dataset.column(name).map(|_| name)
    }

    /// Replaces the active filters and recomputes the view from the full
    /// dataset.
    pub fn apply_filters(&mut self, spec: FilterSpec) -> &[Warning] {
        if spec.is_empty() {
            self.view = Arc::clone(&self.dataset);
            self.filter_warnings.clear();
        } else {
            let filtered = filter::apply(&self.dataset, &spec);
            self.view = Arc::new(filtered.dataset);
            self.filter_warnings = filtered.warnings;
        }
        self.filters = spec;
        &self.filter_warnings
    }

    pub fn quality(&self) -> QualityReport {
        quality::assess(&self.view)
    }

    pub fn describe(&self, column: &str) -> Result<ColumnStatistics, NotApplicable> {
        stats::describe(&self.view, column)
    }

    pub fn fit_trend(&self, column: &str) -> Result<TrendResult, NotApplicable> {
        stats::fit_trend_with(&self.view, column, self.date_column())
    }

    /// Transformed copy of the current view; the session itself is unchanged.
    pub fn transform(&self, kind: TransformKind) -> Dataset {
        transform::transform(&self.view, kind)
    }

    /// One page of the view, narrowed by `search` first when given. Without
    /// an explicit `page_size` the configured one is used.
    pub fn paginate(
        &self,
        search: Option<&str>,
        page_size: Option<usize>,
        page_number: usize,
    ) -> Page {
        let page_size = page_size.unwrap_or(self.config.page_size);
        match search {
            Some(term) => {
                let matches = view::search(&self.view, term);
                view::paginate(&matches, page_size, page_number)
            }
            None => view::paginate(&self.view, page_size, page_number),
        }
    }

    pub fn search(&self, term: &str) -> Dataset {
        view::search(&self.view, term)
    }

    pub fn top_records(&self, column: &str) -> Result<Dataset, NotApplicable> {
        view::top_records(&self.view, column, self.config.top_records)
    }

    pub fn summary(&self) -> DashboardSummary {
        export::summarize(&self.view)
    }

    pub fn chart(
        &self,
        kind: ChartKind,
        overrides: &BTreeMap<Slot, Vec<String>>,
    ) -> Result<ChartDescriptor, NotApplicable> {
        kind.bind(&self.view, overrides)
    }
}
