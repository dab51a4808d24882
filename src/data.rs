use std::fmt;

use serde::{Deserialize, Serialize};

/// Inferred storage type for a column of a loaded table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    String,
    Integer,
    Float,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ColumnType::String => "string",
            ColumnType::Integer => "integer",
            ColumnType::Float => "float",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Value {
    Integer(i64),
    Float(f64),
    String(String),
}

impl Value {
    pub fn as_display(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Integer(i) => i.to_string(),
            Value::Float(f) => {
                if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                    (*f as i64).to_string()
                } else {
                    f.to_string()
                }
            }
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::String(_) => None,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.as_f64().is_some_and(|v| v == 0.0)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

/// Picks the narrowest type every non-empty sample satisfies.
pub fn infer_column_type<'a, I>(samples: I) -> ColumnType
where
    I: IntoIterator<Item = &'a str>,
{
    let mut possible_integer = true;
    let mut possible_float = true;
    let mut seen = false;
    for raw in samples {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            continue;
        }
        seen = true;
        if possible_integer && trimmed.parse::<i64>().is_err() {
            possible_integer = false;
        }
        if possible_float && parse_finite(trimmed).is_none() {
            possible_float = false;
        }
        if !possible_integer && !possible_float {
            break;
        }
    }
    match (seen, possible_integer, possible_float) {
        (false, _, _) => ColumnType::String,
        (true, true, _) => ColumnType::Integer,
        (true, false, true) => ColumnType::Float,
        _ => ColumnType::String,
    }
}

/// Converts a raw cell into a typed value. Empty cells are missing.
pub fn parse_typed_value(raw: &str, ty: ColumnType) -> Option<Value> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let parsed = match ty {
        ColumnType::Integer => trimmed
            .parse::<i64>()
            .map(Value::Integer)
            .unwrap_or_else(|_| Value::String(raw.to_string())),
        ColumnType::Float => parse_finite(trimmed)
            .map(Value::Float)
            .unwrap_or_else(|| Value::String(raw.to_string())),
        ColumnType::String => Value::String(raw.to_string()),
    };
    Some(parsed)
}

/// Parses a float, refusing `NaN` and the infinities.
pub fn parse_finite(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|value| value.is_finite())
}

pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.4}")
    }
}

pub fn format_percent(fraction: f64) -> String {
    format!("{:.2}%", fraction * 100.0)
}
