use std::collections::HashSet;

use anyhow::{Result, anyhow};

use crate::{
    data::{Value, parse_finite},
    error::CoreResult,
    frame::Table,
};

/// A set of acceptable cell values.
///
/// A cell is a member when its source text equals one of the values, or
/// when the cell is numeric and equals a value that parses as a number, so
/// `"2"` and `"2.0"` both match a float cell read as `2.0`. Missing cells are
/// never members.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValueSet {
    texts: HashSet<String>,
    numbers: Vec<f64>,
}

impl ValueSet {
    pub fn contains(&self, value: Option<&Value>, source: &str) -> bool {
        let Some(value) = value else {
            return false;
        };
        if self.texts.contains(source.trim()) || self.texts.contains(&value.as_display()) {
            return true;
        }
        match value {
            Value::Integer(_) | Value::Float(_) => value
                .as_f64()
                .is_some_and(|number| self.numbers.contains(&number)),
            Value::String(_) => false,
        }
    }

    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }
}

impl From<&str> for ValueSet {
    fn from(value: &str) -> Self {
        [value].into_iter().collect()
    }
}

impl From<String> for ValueSet {
    fn from(value: String) -> Self {
        [value].into_iter().collect()
    }
}

impl From<Value> for ValueSet {
    fn from(value: Value) -> Self {
        [value.as_display()].into_iter().collect()
    }
}

impl From<&[&str]> for ValueSet {
    fn from(values: &[&str]) -> Self {
        values.iter().copied().collect()
    }
}

impl<const N: usize> From<[&str; N]> for ValueSet {
    fn from(values: [&str; N]) -> Self {
        values.into_iter().collect()
    }
}

impl From<Vec<String>> for ValueSet {
    fn from(values: Vec<String>) -> Self {
        values.into_iter().collect()
    }
}

impl From<&[String]> for ValueSet {
    fn from(values: &[String]) -> Self {
        values.iter().map(String::as_str).collect()
    }
}

impl FromIterator<String> for ValueSet {
    fn from_iter<T: IntoIterator<Item = String>>(iter: T) -> Self {
        let texts = iter
            .into_iter()
            .map(|value| value.trim().to_string())
            .collect::<HashSet<_>>();
        let numbers = texts.iter().filter_map(|text| parse_finite(text)).collect();
        ValueSet { texts, numbers }
    }
}

impl<'a> FromIterator<&'a str> for ValueSet {
    fn from_iter<T: IntoIterator<Item = &'a str>>(iter: T) -> Self {
        iter.into_iter().map(str::to_string).collect()
    }
}

/// Selects the rows whose `column` value is (or, with `include == false`,
/// is not) a member of `acceptable`. Row order is preserved.
pub fn filter_rows(
    table: &Table,
    column: &str,
    acceptable: impl Into<ValueSet>,
    include: bool,
) -> CoreResult<Table> {
    let idx = table.require_column(column)?;
    let acceptable = acceptable.into();
    Ok(table.select_rows(|row, source| {
        let value = row.get(idx).and_then(Option::as_ref);
        let text = source.get(idx).map_or("", String::as_str);
        acceptable.contains(value, text) == include
    }))
}

/// A membership condition parsed from `column=a|b` or `column!=a|b`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCondition {
    pub column: String,
    pub values: Vec<String>,
    pub include: bool,
}

impl FilterCondition {
    pub fn apply(&self, table: &Table, column: &str) -> CoreResult<Table> {
        filter_rows(table, column, self.values.as_slice(), self.include)
    }
}

pub fn parse_filters(filters: &[String]) -> Result<Vec<FilterCondition>> {
    filters.iter().map(|f| parse_filter(f)).collect()
}

pub fn parse_filter(filter: &str) -> Result<FilterCondition> {
    let trimmed = filter.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("Empty filter expression"));
    }

    for (needle, include) in [("!=", false), ("=", true)] {
        if let Some(idx) = trimmed.find(needle) {
            let column = trimmed[..idx].trim();
            if column.is_empty() {
                return Err(anyhow!("Filter '{trimmed}' is missing a column name"));
            }
            let values = trimmed[idx + needle.len()..]
                .split('|')
                .map(|v| unquote(v.trim()).to_string())
                .filter(|v| !v.is_empty())
                .collect::<Vec<_>>();
            if values.is_empty() {
                return Err(anyhow!("Filter '{trimmed}' does not list any values"));
            }
            return Ok(FilterCondition {
                column: column.to_string(),
                values,
                include,
            });
        }
    }

    Err(anyhow!("Failed to parse filter expression '{trimmed}'"))
}

fn unquote(value: &str) -> &str {
    if value.len() >= 2 {
        let bytes = value.as_bytes();
        if (bytes[0] == b'"' && bytes[value.len() - 1] == b'"')
            || (bytes[0] == b'\'' && bytes[value.len() - 1] == b'\'')
        {
            return &value[1..value.len() - 1];
        }
    }
    value
}
