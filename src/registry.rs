//! Dataset registry: which CSV file backs each dataset and which literal
//! header plays each column role in it.
//!
//! The registry is an ordinary value built once at startup and handed to the
//! commands that need it. A YAML file can overlay file names, headers, and
//! category presets on top of [`Registry::standard`].

use std::{
    collections::BTreeMap,
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::{Context, Result};
use clap::ValueEnum;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
#[value(rename_all = "kebab-case")]
pub enum DatasetId {
    SexAgeState,
    SexAgeWeek,
    #[serde(rename = "focus-ages-0-18")]
    #[value(name = "focus-ages-0-18")]
    FocusAges0To18,
    DcInfPneu,
    Conditions,
    #[serde(rename = "weekly-deaths-14-18")]
    #[value(name = "weekly-deaths-14-18")]
    WeeklyDeaths14To18,
    #[serde(rename = "weekly-deaths-19-20")]
    #[value(name = "weekly-deaths-19-20")]
    WeeklyDeaths19To20,
}

impl DatasetId {
    pub const ALL: [DatasetId; 7] = [
        DatasetId::SexAgeState,
        DatasetId::SexAgeWeek,
        DatasetId::FocusAges0To18,
        DatasetId::DcInfPneu,
        DatasetId::Conditions,
        DatasetId::WeeklyDeaths14To18,
        DatasetId::WeeklyDeaths19To20,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetId::SexAgeState => "sex-age-state",
            DatasetId::SexAgeWeek => "sex-age-week",
            DatasetId::FocusAges0To18 => "focus-ages-0-18",
            DatasetId::DcInfPneu => "dc-inf-pneu",
            DatasetId::Conditions => "conditions",
            DatasetId::WeeklyDeaths14To18 => "weekly-deaths-14-18",
            DatasetId::WeeklyDeaths19To20 => "weekly-deaths-19-20",
        }
    }

    /// File name of the published CDC extract.
    pub fn file_name(&self) -> &'static str {
        match self {
            DatasetId::SexAgeState => "Provisional_COVID-19_Death_Counts_by_Sex__Age__and_State.csv",
            DatasetId::SexAgeWeek => "Provisional_COVID-19_Death_Counts_by_Sex__Age__and_Week.csv",
            DatasetId::FocusAges0To18 => "Provisional_COVID-19_Deaths_Focus_on_Ages_0-18_Years.csv",
            DatasetId::DcInfPneu => {
                "Provisional_Death_Counts_for_Influenza__Pneumonia__and_COVID-19.csv"
            }
            DatasetId::Conditions => {
                "Conditions_contributing_to_deaths_involving_coronavirus_disease_2019__COVID-19__by_age_group_and_state__United_States.csv"
            }
            DatasetId::WeeklyDeaths14To18 => {
                "Weekly_Counts_of_Deaths_by_State_and_Select_Causes__2014-2018.csv"
            }
            DatasetId::WeeklyDeaths19To20 => {
                "Weekly_Counts_of_Deaths_by_State_and_Select_Causes__2019-2020.csv"
            }
        }
    }
}

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatasetId {
    type Err = CoreError;

    fn from_str(value: &str) -> CoreResult<Self> {
        let normalized = value.trim().to_ascii_lowercase().replace('_', "-");
        DatasetId::ALL
            .into_iter()
            .find(|id| id.as_str() == normalized)
            .ok_or_else(|| CoreError::UnknownDataset(value.to_string()))
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
#[value(rename_all = "kebab-case")]
pub enum ColumnRole {
    Week,
    Sex,
    Age,
    TotalDeaths,
    CovidDeaths,
    State,
    DataAsOf,
    StartWeek,
    EndWeek,
}

impl ColumnRole {
    pub const ALL: [ColumnRole; 9] = [
        ColumnRole::Week,
        ColumnRole::Sex,
        ColumnRole::Age,
        ColumnRole::TotalDeaths,
        ColumnRole::CovidDeaths,
        ColumnRole::State,
        ColumnRole::DataAsOf,
        ColumnRole::StartWeek,
        ColumnRole::EndWeek,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnRole::Week => "week",
            ColumnRole::Sex => "sex",
            ColumnRole::Age => "age",
            ColumnRole::TotalDeaths => "total-deaths",
            ColumnRole::CovidDeaths => "covid-deaths",
            ColumnRole::State => "state",
            ColumnRole::DataAsOf => "data-as-of",
            ColumnRole::StartWeek => "start-week",
            ColumnRole::EndWeek => "end-week",
        }
    }

    /// Header the CDC provisional-count extracts use for this role.
    pub fn default_header(&self) -> &'static str {
        match self {
            ColumnRole::Week => "MMWR Week",
            ColumnRole::Sex => "Sex",
            ColumnRole::Age => "Age Group",
            ColumnRole::TotalDeaths => "Total Deaths",
            ColumnRole::CovidDeaths => "COVID-19 Deaths",
            ColumnRole::State => "State",
            ColumnRole::DataAsOf => "Data as of",
            ColumnRole::StartWeek => "Start Week",
            ColumnRole::EndWeek => "End Week",
        }
    }
}

impl fmt::Display for ColumnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColumnRole {
    type Err = CoreError;

    fn from_str(value: &str) -> CoreResult<Self> {
        let normalized = value.trim().to_ascii_lowercase().replace('_', "-");
        ColumnRole::ALL
            .into_iter()
            .find(|role| role.as_str() == normalized)
            .ok_or_else(|| CoreError::UnknownColumn(value.to_string()))
    }
}

/// CDC age brackets used by the weekly sex/age extract, youngest first.
pub const WEEKLY_AGE_GROUPS: [&str; 11] = [
    "Under 1 year",
    "1-4 Years",
    "5-14 Years",
    "15-24 Years",
    "25-34 Years",
    "35-44 Years",
    "45-54 Years",
    "55-64 Years",
    "65-74 Years",
    "75-84 Years",
    "85 Years and Over",
];

pub const ALL_AGES: &str = "All Ages";

pub const ALL_SEXES: &str = "All Sex";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetRecord {
    pub path: PathBuf,
    pub columns: BTreeMap<ColumnRole, String>,
    /// Default display order per grouping role.
    pub categories: BTreeMap<ColumnRole, Vec<String>>,
    /// Aggregate pseudo-categories per grouping role, excluded from totals.
    pub umbrella: BTreeMap<ColumnRole, Vec<String>>,
}

impl DatasetRecord {
    fn with_default_columns(path: PathBuf) -> Self {
        Self {
            path,
            columns: ColumnRole::ALL
                .iter()
                .map(|role| (*role, role.default_header().to_string()))
                .collect(),
            categories: BTreeMap::new(),
            umbrella: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Registry {
    data_dir: PathBuf,
    datasets: BTreeMap<DatasetId, DatasetRecord>,
}

impl Registry {
    pub fn empty(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            datasets: BTreeMap::new(),
        }
    }

    /// Every known dataset under `data_dir`, with the CDC header names.
    pub fn standard(data_dir: impl Into<PathBuf>) -> Self {
        let mut registry = Self::empty(data_dir);
        for id in DatasetId::ALL {
            let path = registry.data_dir.join(id.file_name());
            registry.insert(id, DatasetRecord::with_default_columns(path));
        }
        if let Some(record) = registry.datasets.get_mut(&DatasetId::SexAgeWeek) {
            record.categories.insert(
                ColumnRole::Age,
                WEEKLY_AGE_GROUPS.iter().map(|s| s.to_string()).collect(),
            );
            record
                .umbrella
                .insert(ColumnRole::Age, vec![ALL_AGES.to_string()]);
            record
                .umbrella
                .insert(ColumnRole::Sex, vec![ALL_SEXES.to_string()]);
        }
        registry
    }

    pub fn insert(&mut self, id: DatasetId, record: DatasetRecord) {
        self.datasets.insert(id, record);
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn datasets(&self) -> impl Iterator<Item = (&DatasetId, &DatasetRecord)> {
        self.datasets.iter()
    }

    pub fn record(&self, id: DatasetId) -> CoreResult<&DatasetRecord> {
        self.datasets
            .get(&id)
            .ok_or_else(|| CoreError::UnknownDataset(id.to_string()))
    }

    pub fn resolve(&self, id: DatasetId) -> CoreResult<&Path> {
        self.record(id).map(|record| record.path.as_path())
    }

    pub fn resolve_name(&self, name: &str) -> CoreResult<&Path> {
        self.resolve(name.parse()?)
    }

    pub fn column_role(&self, id: DatasetId, role: ColumnRole) -> CoreResult<&str> {
        self.record(id)?
            .columns
            .get(&role)
            .map(String::as_str)
            .ok_or_else(|| CoreError::UnknownColumn(role.to_string()))
    }

    /// Resolves a role name, or falls back to a literal header when the
    /// argument does not name a role.
    pub fn column_for(&self, id: DatasetId, role_or_header: &str) -> CoreResult<String> {
        match role_or_header.parse::<ColumnRole>() {
            Ok(role) => self.column_role(id, role).map(str::to_string),
            Err(_) => {
                self.record(id)?;
                Ok(role_or_header.to_string())
            }
        }
    }

    pub fn default_categories(&self, id: DatasetId, role: ColumnRole) -> Option<&[String]> {
        self.datasets
            .get(&id)
            .and_then(|record| record.categories.get(&role))
            .map(Vec::as_slice)
    }

    pub fn umbrella_categories(&self, id: DatasetId, role: ColumnRole) -> &[String] {
        self.datasets
            .get(&id)
            .and_then(|record| record.umbrella.get(&role))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Fails with the first required role whose header is absent.
    pub fn validate_headers(
        &self,
        id: DatasetId,
        roles: &[ColumnRole],
        headers: &[String],
    ) -> CoreResult<()> {
        for role in roles {
            let header = self.column_role(id, *role)?;
            if !headers.iter().any(|h| h == header) {
                return Err(CoreError::UnknownColumn(header.to_string()));
            }
        }
        Ok(())
    }

    pub fn apply_overlay(&mut self, overlay: RegistryOverlay) {
        if let Some(dir) = overlay.data_dir {
            self.rebase(dir);
        }
        for (id, patch) in overlay.datasets {
            let data_dir = self.data_dir.clone();
            let record = self
                .datasets
                .entry(id)
                .or_insert_with(|| DatasetRecord::with_default_columns(data_dir.join(id.file_name())));
            if let Some(file) = patch.file {
                record.path = if file.is_absolute() {
                    file
                } else {
                    data_dir.join(file)
                };
            }
            record.columns.extend(patch.columns);
            record.categories.extend(patch.categories);
            record.umbrella.extend(patch.umbrella);
            debug!("Applied registry overlay for dataset '{id}'");
        }
    }

    fn rebase(&mut self, dir: PathBuf) {
        for record in self.datasets.values_mut() {
            if let Ok(relative) = record.path.strip_prefix(&self.data_dir) {
                record.path = dir.join(relative);
            }
        }
        self.data_dir = dir;
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistryOverlay {
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    #[serde(default)]
    pub datasets: BTreeMap<DatasetId, DatasetOverlay>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatasetOverlay {
    #[serde(default)]
    pub file: Option<PathBuf>,
    #[serde(default)]
    pub columns: BTreeMap<ColumnRole, String>,
    #[serde(default)]
    pub categories: BTreeMap<ColumnRole, Vec<String>>,
    #[serde(default)]
    pub umbrella: BTreeMap<ColumnRole, Vec<String>>,
}

impl RegistryOverlay {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Opening registry file {path:?}"))?;
        Self::from_yaml(&raw).with_context(|| format!("Parsing registry file {path:?}"))
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_joins_data_dir_and_file_name() {
        let registry = Registry::standard("data");
        let path = registry.resolve(DatasetId::SexAgeWeek).unwrap();
        assert_eq!(
            path,
            Path::new("data/Provisional_COVID-19_Death_Counts_by_Sex__Age__and_Week.csv")
        );
    }

    #[test]
    fn unknown_dataset_names_fail() {
        let registry = Registry::standard("data");
        assert_eq!(
            registry.resolve_name("sex_age_week").unwrap(),
            registry.resolve(DatasetId::SexAgeWeek).unwrap()
        );
        assert_eq!(
            registry.resolve_name("influenza"),
            Err(CoreError::UnknownDataset("influenza".into()))
        );
        let empty = Registry::empty("data");
        assert_eq!(
            empty.resolve(DatasetId::Conditions),
            Err(CoreError::UnknownDataset("conditions".into()))
        );
    }

    #[test]
    fn column_role_uses_literal_headers() {
        let registry = Registry::standard("data");
        assert_eq!(
            registry
                .column_role(DatasetId::SexAgeWeek, ColumnRole::Week)
                .unwrap(),
            "MMWR Week"
        );
        assert_eq!(
            registry
                .column_for(DatasetId::SexAgeWeek, "covid_deaths")
                .unwrap(),
            "COVID-19 Deaths"
        );
        assert_eq!(
            registry
                .column_for(DatasetId::SexAgeWeek, "Pneumonia Deaths")
                .unwrap(),
            "Pneumonia Deaths"
        );
    }

    #[test]
    fn only_weekly_dataset_ships_age_presets() {
        let registry = Registry::standard("data");
        let ages = registry
            .default_categories(DatasetId::SexAgeWeek, ColumnRole::Age)
            .unwrap();
        assert_eq!(ages.len(), WEEKLY_AGE_GROUPS.len());
        assert!(!ages.iter().any(|a| a == ALL_AGES));
        assert_eq!(
            registry.umbrella_categories(DatasetId::SexAgeWeek, ColumnRole::Age),
            &[ALL_AGES.to_string()]
        );
        assert_eq!(
            registry.umbrella_categories(DatasetId::SexAgeWeek, ColumnRole::Sex),
            &[ALL_SEXES.to_string()]
        );
        assert!(
            registry
                .default_categories(DatasetId::SexAgeState, ColumnRole::Age)
                .is_none()
        );
        assert!(
            registry
                .umbrella_categories(DatasetId::SexAgeState, ColumnRole::Age)
                .is_empty()
        );
    }

    #[test]
    fn validate_headers_reports_missing_role_header() {
        let registry = Registry::standard("data");
        let headers = vec!["Sex".to_string(), "Age Group".to_string()];
        assert!(
            registry
                .validate_headers(
                    DatasetId::SexAgeWeek,
                    &[ColumnRole::Sex, ColumnRole::Age],
                    &headers
                )
                .is_ok()
        );
        assert_eq!(
            registry.validate_headers(DatasetId::SexAgeWeek, &[ColumnRole::CovidDeaths], &headers),
            Err(CoreError::UnknownColumn("COVID-19 Deaths".into()))
        );
    }

    #[test]
    fn overlay_replaces_files_and_headers() {
        let mut registry = Registry::standard("data");
        let overlay = RegistryOverlay::from_yaml(
            r#"
data_dir: /srv/cdc
datasets:
  sex-age-state:
    file: state.csv
    columns:
      covid-deaths: "Deaths involving COVID-19"
    umbrella:
      age: ["All Ages"]
"#,
        )
        .unwrap();
        registry.apply_overlay(overlay);

        assert_eq!(
            registry.resolve(DatasetId::SexAgeState).unwrap(),
            Path::new("/srv/cdc/state.csv")
        );
        assert_eq!(
            registry.resolve(DatasetId::Conditions).unwrap(),
            Path::new("/srv/cdc").join(DatasetId::Conditions.file_name())
        );
        assert_eq!(
            registry
                .column_role(DatasetId::SexAgeState, ColumnRole::CovidDeaths)
                .unwrap(),
            "Deaths involving COVID-19"
        );
        assert_eq!(
            registry.umbrella_categories(DatasetId::SexAgeState, ColumnRole::Age),
            &["All Ages".to_string()]
        );
    }

    #[test]
    fn overlay_rejects_unknown_dataset_keys() {
        assert!(RegistryOverlay::from_yaml("datasets:\n  influenza: {}\n").is_err());
    }
}
