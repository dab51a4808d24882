//! The filter → partition → aggregate pipeline behind `distribution`.
//!
//! A [`PipelineConfig`] names everything that used to vary between the
//! per-dataset scripts: dataset, grouping column, value column, category
//! order, excluded umbrella categories, and row conditions. Columns may be
//! given as registry roles (`age`, `covid-deaths`) or literal headers.

use std::path::Path;

use anyhow::{Context, Result, bail};
use itertools::Itertools;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::{
    aggregate::{AggregateRecord, aggregate, partition},
    filter::{FilterCondition, filter_rows, parse_filter},
    frame::Table,
    registry::{ColumnRole, DatasetId, Registry},
};

fn default_group_by() -> String {
    ColumnRole::Age.to_string()
}

fn default_value() -> String {
    ColumnRole::CovidDeaths.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    pub dataset: DatasetId,
    #[serde(default = "default_group_by")]
    pub group_by: String,
    #[serde(default = "default_value")]
    pub value: String,
    /// Ordered categories; empty means the registry preset, or first
    /// appearance order when the dataset has none.
    #[serde(default)]
    pub categories: Vec<String>,
    /// Umbrella categories to drop; `None` means the registry default.
    #[serde(default)]
    pub exclude: Option<Vec<String>>,
    /// Row conditions such as `sex=Male` or `state!=United States`.
    #[serde(default)]
    pub conditions: Vec<String>,
    /// Drop rows whose value cell is empty instead of failing.
    #[serde(default)]
    pub skip_missing: bool,
    #[serde(default)]
    pub title: Option<String>,
}

impl PipelineConfig {
    pub fn new(dataset: DatasetId) -> Self {
        Self {
            dataset,
            group_by: default_group_by(),
            value: default_value(),
            categories: Vec::new(),
            exclude: None,
            conditions: Vec::new(),
            skip_missing: false,
            title: None,
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Opening pipeline config {path:?}"))?;
        serde_yaml::from_str(&raw).with_context(|| format!("Parsing pipeline config {path:?}"))
    }

    pub fn group_by(mut self, column: impl Into<String>) -> Self {
        self.group_by = column.into();
        self
    }

    pub fn value(mut self, column: impl Into<String>) -> Self {
        self.value = column.into();
        self
    }

    pub fn categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = categories.into_iter().map(Into::into).collect();
        self
    }

    pub fn exclude<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude = Some(categories.into_iter().map(Into::into).collect());
        self
    }

    pub fn condition(mut self, condition: impl Into<String>) -> Self {
        self.conditions.push(condition.into());
        self
    }

    pub fn skip_missing(mut self, skip: bool) -> Self {
        self.skip_missing = skip;
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn display_title(&self, group_by: &str, value: &str) -> String {
        self.title
            .clone()
            .unwrap_or_else(|| format!("{value} by {group_by} ({})", self.dataset))
    }

    fn roles(&self) -> Vec<ColumnRole> {
        let conditions = self
            .conditions
            .iter()
            .filter_map(|c| parse_filter(c).ok())
            .map(|c| c.column);
        [self.group_by.clone(), self.value.clone()]
            .into_iter()
            .chain(conditions)
            .filter_map(|name| name.parse::<ColumnRole>().ok())
            .unique()
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineOutput {
    pub title: String,
    pub group_by: String,
    pub value: String,
    pub rows_considered: usize,
    pub records: Vec<AggregateRecord>,
}

/// Runs the pipeline against an already loaded table for `config.dataset`.
pub fn run(config: &PipelineConfig, registry: &Registry, table: &Table) -> Result<PipelineOutput> {
    registry.validate_headers(config.dataset, &config.roles(), table.headers())?;
    let group_by = registry.column_for(config.dataset, &config.group_by)?;
    let value = registry.column_for(config.dataset, &config.value)?;
    table.require_column(&group_by)?;
    table.require_column(&value)?;

    let mut filtered = table.clone();
    let mut constrained = Vec::new();
    for raw in &config.conditions {
        let condition: FilterCondition = parse_filter(raw)?;
        let column = registry.column_for(config.dataset, &condition.column)?;
        filtered = condition
            .apply(&filtered, &column)
            .with_context(|| format!("Applying condition '{raw}'"))?;
        debug!("{} row(s) remain after '{raw}'", filtered.len());
        constrained.push(column);
    }

    filtered = drop_umbrella_rows(config, registry, filtered, &group_by, &constrained)?;

    if config.skip_missing {
        let idx = filtered.require_column(&value)?;
        let before = filtered.len();
        filtered = filtered.select_rows(|row, _| row.get(idx).is_some_and(Option::is_some));
        if before != filtered.len() {
            info!(
                "Dropped {} row(s) with an empty '{value}' cell",
                before - filtered.len()
            );
        }
    }

    let categories = resolve_categories(config, registry, &filtered, &group_by)?;
    debug!("Category order for '{group_by}': {categories:?}");
    let partitions = partition(&filtered, &group_by, &categories)?;
    let rows_considered = partitions.iter().map(|(_, rows)| rows.len()).sum();
    let records = aggregate(&partitions, &value)?;
    info!(
        "Aggregated {rows_considered} row(s) of '{value}' into {} '{group_by}' categories",
        records.len()
    );

    Ok(PipelineOutput {
        title: config.display_title(&group_by, &value),
        group_by,
        value,
        rows_considered,
        records,
    })
}

/// Drops rollup rows (such as `All Sex`) from every registered role other
/// than the grouping one, so they are not summed alongside their parts.
/// Columns named by a condition, or missing from the table, are left alone.
fn drop_umbrella_rows(
    config: &PipelineConfig,
    registry: &Registry,
    mut table: Table,
    group_by: &str,
    constrained: &[String],
) -> Result<Table> {
    for (role, umbrella) in &registry.record(config.dataset)?.umbrella {
        let column = registry.column_role(config.dataset, *role)?;
        if column == group_by
            || umbrella.is_empty()
            || constrained.iter().any(|c| c == column)
            || table.column_index(column).is_none()
        {
            continue;
        }
        let before = table.len();
        table = filter_rows(&table, column, umbrella.as_slice(), false)?;
        if before != table.len() {
            info!(
                "Dropped {} '{column}' rollup row(s) ({})",
                before - table.len(),
                umbrella.join(", ")
            );
        }
    }
    Ok(table)
}

fn resolve_categories(
    config: &PipelineConfig,
    registry: &Registry,
    table: &Table,
    group_by: &str,
) -> Result<Vec<String>> {
    let role = config.group_by.parse::<ColumnRole>().ok();
    let exclude = match (&config.exclude, role) {
        (Some(exclude), _) => exclude.clone(),
        (None, Some(role)) => registry.umbrella_categories(config.dataset, role).to_vec(),
        (None, None) => Vec::new(),
    };

    let preset = role.and_then(|role| registry.default_categories(config.dataset, role));
    let ordered = if !config.categories.is_empty() {
        config.categories.clone()
    } else if let Some(preset) = preset {
        preset.to_vec()
    } else {
        warn!(
            "No category order configured for '{group_by}' in '{}'; using order of appearance",
            config.dataset
        );
        let remaining = filter_rows(table, group_by, exclude.as_slice(), false)?;
        remaining
            .column_text(group_by)?
            .into_iter()
            .flatten()
            .map(str::to_string)
            .unique()
            .collect()
    };

    let categories = ordered
        .into_iter()
        .filter(|category| !exclude.contains(category))
        .collect::<Vec<_>>();
    if categories.is_empty() {
        bail!("No categories left to aggregate for '{group_by}'");
    }
    Ok(categories)
}
