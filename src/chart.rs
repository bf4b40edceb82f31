//! Chart descriptors: each chart kind declares the column roles it needs, and
//! binding resolves those roles against a dataset.
//!
//! Rendering is left to the caller. A [`ChartDescriptor`] names the columns
//! that fill each slot plus a display title.

use std::{collections::BTreeMap, fmt};

use anyhow::{Result, anyhow};
use clap::ValueEnum;
use serde::Serialize;

use crate::{
    dataset::{Column, Dataset},
    error::NotApplicable,
    schema::ColumnKind,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    X,
    Y,
    Z,
    Group,
    Values,
}

impl Slot {
    /// Parses `slot=column[,column...]`.
    pub fn parse_binding(spec: &str) -> Result<(Slot, Vec<String>)> {
        let (slot, columns) = spec
            .split_once('=')
            .ok_or_else(|| anyhow!("Binding '{spec}' must look like slot=column"))?;
        let slot = Slot::from_str(slot.trim(), true)
            .map_err(|_| anyhow!("Unknown chart slot '{}'", slot.trim()))?;
        let columns = columns
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect::<Vec<_>>();
        if columns.is_empty() {
            return Err(anyhow!("Binding '{spec}' names no column"));
        }
        Ok((slot, columns))
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Slot::X => "x",
            Slot::Y => "y",
            Slot::Z => "z",
            Slot::Group => "group",
            Slot::Values => "values",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    Temporal,
    Numeric,
    Categorical,
}

impl ColumnRole {
    pub fn of(kind: ColumnKind) -> Self {
        if kind.is_numeric() {
            ColumnRole::Numeric
        } else if kind.is_temporal() {
            ColumnRole::Temporal
        } else {
            ColumnRole::Categorical
        }
    }

    fn label(self) -> &'static str {
        match self {
            ColumnRole::Temporal => "temporal",
            ColumnRole::Numeric => "numeric",
            ColumnRole::Categorical => "categorical",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotSpec {
    pub slot: Slot,
    pub roles: &'static [ColumnRole],
    pub required: bool,
    /// Takes every matching column instead of one.
    pub many: bool,
}

const fn required(slot: Slot, roles: &'static [ColumnRole]) -> SlotSpec {
    SlotSpec {
        slot,
        roles,
        required: true,
        many: false,
    }
}

const fn optional(slot: Slot, roles: &'static [ColumnRole]) -> SlotSpec {
    SlotSpec {
        slot,
        roles,
        required: false,
        many: false,
    }
}

const TEMPORAL: &[ColumnRole] = &[ColumnRole::Temporal];
const NUMERIC: &[ColumnRole] = &[ColumnRole::Numeric];
const CATEGORICAL: &[ColumnRole] = &[ColumnRole::Categorical];
const ANY: &[ColumnRole] = &[
    ColumnRole::Categorical,
    ColumnRole::Numeric,
    ColumnRole::Temporal,
];

const LINE_SLOTS: &[SlotSpec] = &[
    required(Slot::X, TEMPORAL),
    required(Slot::Y, NUMERIC),
    optional(Slot::Group, CATEGORICAL),
];
const BAR_SLOTS: &[SlotSpec] = &[required(Slot::X, CATEGORICAL), optional(Slot::Y, NUMERIC)];
const SCATTER_SLOTS: &[SlotSpec] = &[
    required(Slot::X, NUMERIC),
    required(Slot::Y, NUMERIC),
    optional(Slot::Group, CATEGORICAL),
];
const PIE_SLOTS: &[SlotSpec] = &[
    required(Slot::Group, CATEGORICAL),
    optional(Slot::Values, NUMERIC),
];
const HEATMAP_SLOTS: &[SlotSpec] = &[SlotSpec {
    slot: Slot::Values,
    roles: NUMERIC,
    required: true,
    many: true,
}];
const BOX_SLOTS: &[SlotSpec] = &[required(Slot::Y, NUMERIC), optional(Slot::X, CATEGORICAL)];
const HISTOGRAM_SLOTS: &[SlotSpec] = &[required(Slot::X, NUMERIC)];
const VIOLIN_SLOTS: &[SlotSpec] = &[required(Slot::X, CATEGORICAL), required(Slot::Y, NUMERIC)];
const SCATTER3D_SLOTS: &[SlotSpec] = &[
    required(Slot::X, NUMERIC),
    required(Slot::Y, NUMERIC),
    required(Slot::Z, NUMERIC),
    optional(Slot::Group, ANY),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Line,
    Bar,
    Scatter,
    Pie,
    Area,
    Heatmap,
    BoxPlot,
    Histogram,
    Violin,
    Scatter3d,
}

impl ChartKind {
    pub fn slots(self) -> &'static [SlotSpec] {
        match self {
            ChartKind::Line | ChartKind::Area => LINE_SLOTS,
            ChartKind::Bar => BAR_SLOTS,
            ChartKind::Scatter => SCATTER_SLOTS,
            ChartKind::Pie => PIE_SLOTS,
            ChartKind::Heatmap => HEATMAP_SLOTS,
            ChartKind::BoxPlot => BOX_SLOTS,
            ChartKind::Histogram => HISTOGRAM_SLOTS,
            ChartKind::Violin => VIOLIN_SLOTS,
            ChartKind::Scatter3d => SCATTER3D_SLOTS,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ChartKind::Line => "Line Chart",
            ChartKind::Bar => "Bar Chart",
            ChartKind::Scatter => "Scatter Plot",
            ChartKind::Pie => "Pie Chart",
            ChartKind::Area => "Area Chart",
            ChartKind::Heatmap => "Heatmap",
            ChartKind::BoxPlot => "Box Plot",
            ChartKind::Histogram => "Histogram",
            ChartKind::Violin => "Violin Plot",
            ChartKind::Scatter3d => "3D Scatter",
        }
    }

    /// Fills every slot: explicit bindings are checked against the slot's
    /// roles, remaining required slots take the first unused matching column.
    /// Optional slots are only filled when bound explicitly.
    pub fn bind(
        self,
        dataset: &Dataset,
        overrides: &BTreeMap<Slot, Vec<String>>,
    ) -> Result<ChartDescriptor, NotApplicable> {
        let reject = |detail: String| NotApplicable::ChartRoles {
            chart: self.label().to_string(),
            detail,
        };
        if let Some(slot) = overrides
            .keys()
            .find(|slot| !self.slots().iter().any(|spec| spec.slot == **slot))
        {
            return Err(reject(format!("no {slot} slot")));
        }

        let mut used: Vec<&str> = Vec::new();
        let mut bindings = Vec::new();
        for spec in self.slots() {
            let columns = match overrides.get(&spec.slot) {
                Some(names) => {
                    let mut bound = Vec::with_capacity(names.len());
                    for name in names {
                        let column = dataset
                            .column(name)
                            .ok_or_else(|| reject(format!("column '{name}' not found")))?;
                        check_role(spec, column).map_err(&reject)?;
                        bound.push(column);
                    }
                    bound
                }
                None if !spec.required => continue,
                None => {
                    let candidates = dataset
                        .columns()
                        .iter()
                        .filter(|c| spec.roles.contains(&ColumnRole::of(c.kind())))
                        .filter(|c| !used.contains(&c.name()));
                    let bound: Vec<&Column> = if spec.many {
                        candidates.collect()
                    } else {
                        candidates.take(1).collect()
                    };
                    if bound.is_empty() {
                        return Err(reject(format!(
                            "no {} column available for the {} slot",
                            role_list(spec.roles),
                            spec.slot
                        )));
                    }
                    bound
                }
            };
            if !spec.many && columns.len() > 1 {
                return Err(reject(format!("the {} slot takes one column", spec.slot)));
            }
            used.extend(columns.iter().map(|c| c.name()));
            bindings.push(Binding {
                slot: spec.slot,
                columns: columns.iter().map(|c| c.name().to_string()).collect(),
            });
        }

        let title = self.title(&bindings);
        Ok(ChartDescriptor {
            kind: self,
            title,
            bindings,
        })
    }

    fn title(self, bindings: &[Binding]) -> String {
        let bound = |slot: Slot| {
            bindings
                .iter()
                .find(|b| b.slot == slot)
                .map(|b| b.columns.join(", "))
        };
        let x = bound(Slot::X).unwrap_or_default();
        let y = bound(Slot::Y).unwrap_or_default();
        match self {
            ChartKind::Line => format!("{y} Over Time"),
            ChartKind::Area => format!("{y} Over Time (Area)"),
            ChartKind::Bar => match bound(Slot::Y) {
                Some(y) => format!("{y} by {x}"),
                None => format!("Records by {x}"),
            },
            ChartKind::Scatter => format!("{x} vs {y}"),
            ChartKind::Pie => format!(
                "Distribution by {}",
                bound(Slot::Group).unwrap_or_default()
            ),
            ChartKind::Heatmap => "Correlation Heatmap".to_string(),
            ChartKind::BoxPlot => match bound(Slot::X) {
                Some(x) => format!("Box Plot: {y} by {x}"),
                None => format!("Box Plot: {y}"),
            },
            ChartKind::Histogram => format!("Histogram: {x}"),
            ChartKind::Violin => format!("Violin Plot: {y} by {x}"),
            ChartKind::Scatter3d => format!(
                "3D Scatter: {x} vs {y} vs {}",
                bound(Slot::Z).unwrap_or_default()
            ),
        }
    }
}

fn check_role(spec: &SlotSpec, column: &Column) -> Result<(), String> {
    let role = ColumnRole::of(column.kind());
    if spec.roles.contains(&role) {
        Ok(())
    } else {
        Err(format!(
            "column '{}' is {} but the {} slot needs {}",
            column.name(),
            role.label(),
            spec.slot,
            role_list(spec.roles)
        ))
    }
}

fn role_list(roles: &[ColumnRole]) -> String {
    roles
        .iter()
        .map(|r| r.label())
        .collect::<Vec<_>>()
        .join(" or ")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Binding {
    pub slot: Slot,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartDescriptor {
    pub kind: ChartKind,
    pub title: String,
    pub bindings: Vec<Binding>,
}

impl ChartDescriptor {
    pub fn columns_for(&self, slot: Slot) -> &[String] {
        self.bindings
            .iter()
            .find(|b| b.slot == slot)
            .map(|b| b.columns.as_slice())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::SampleConfig, loader};

    fn sample() -> Dataset {
        loader::generate_sample(&SampleConfig::default()).unwrap()
    }

    #[test]
    fn line_chart_auto_binds_date_and_first_measure() {
        let chart = ChartKind::Line.bind(&sample(), &BTreeMap::new()).unwrap();
        assert_eq!(chart.columns_for(Slot::X), ["Date"]);
        assert_eq!(chart.columns_for(Slot::Y), ["Sales"]);
        assert!(chart.columns_for(Slot::Group).is_empty());
        assert_eq!(chart.title, "Sales Over Time");
    }

    #[test]
    fn scatter_binds_distinct_columns() {
        let chart = ChartKind::Scatter3d.bind(&sample(), &BTreeMap::new()).unwrap();
        assert_eq!(chart.columns_for(Slot::X), ["Sales"]);
        assert_eq!(chart.columns_for(Slot::Y), ["Revenue"]);
        assert_eq!(chart.columns_for(Slot::Z), ["Customers"]);
    }

    #[test]
    fn heatmap_takes_every_numeric_column() {
        let chart = ChartKind::Heatmap.bind(&sample(), &BTreeMap::new()).unwrap();
        assert_eq!(chart.columns_for(Slot::Values).len(), 3);
    }

    #[test]
    fn explicit_bindings_are_role_checked() {
        let overrides = BTreeMap::from([(Slot::X, vec!["Sales".to_string()])]);
        let err = ChartKind::Violin.bind(&sample(), &overrides).unwrap_err();
        assert!(matches!(err, NotApplicable::ChartRoles { .. }));

        let overrides = BTreeMap::from([(Slot::X, vec!["Product".to_string()])]);
        let chart = ChartKind::BoxPlot.bind(&sample(), &overrides).unwrap();
        assert_eq!(chart.title, "Box Plot: Sales by Product");
    }

    #[test]
    fn missing_roles_are_not_applicable() {
        let data = Dataset::new(vec![Column::from_f64s("x", &[Some(1.0)])]).unwrap();
        assert!(ChartKind::Pie.bind(&data, &BTreeMap::new()).is_err());
        assert!(ChartKind::Histogram.bind(&data, &BTreeMap::new()).is_ok());
        let unknown_slot = BTreeMap::from([(Slot::Z, vec!["x".to_string()])]);
        assert!(ChartKind::Histogram.bind(&data, &unknown_slot).is_err());
    }

    #[test]
    fn parses_slot_bindings() {
        let (slot, columns) = Slot::parse_binding("values=Sales, Revenue").unwrap();
        assert_eq!(slot, Slot::Values);
        assert_eq!(columns, vec!["Sales", "Revenue"]);
        assert!(Slot::parse_binding("w=Sales").is_err());
    }
}
