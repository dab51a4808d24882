//! Partitioning and per-category totals, shares, and cumulative shares.

use serde::{Deserialize, Serialize};

use crate::{
    data::Value,
    error::{CoreError, CoreResult},
    filter::filter_rows,
    frame::Table,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRecord {
    pub category: String,
    pub total: f64,
    pub percentage: f64,
    pub cumulative: f64,
}

/// Splits `table` into one partition per category, in the order given.
/// Rows whose value is outside `categories` are left out.
pub fn partition<S: AsRef<str>>(
    table: &Table,
    column: &str,
    categories: &[S],
) -> CoreResult<Vec<(String, Table)>> {
    categories
        .iter()
        .map(|category| {
            let category = category.as_ref();
            filter_rows(table, column, category, true).map(|rows| (category.to_string(), rows))
        })
        .collect()
}

/// Sums `value_column` over one partition, rejecting missing, text, and
/// non-finite cells.
pub fn column_total(table: &Table, value_column: &str) -> CoreResult<f64> {
    let idx = table.require_column(value_column)?;
    let mut total = 0.0;
    for (row_idx, row) in table.rows().iter().enumerate() {
        match row.get(idx).and_then(|cell| cell.as_ref()) {
            Some(value) => match value.as_f64() {
                Some(number) if number.is_finite() => total += number,
                _ => {
                    return Err(invalid(value_column, row_idx, value));
                }
            },
            None => {
                return Err(CoreError::InvalidValue {
                    column: value_column.to_string(),
                    row: row_idx,
                    reason: "missing value".to_string(),
                });
            }
        }
    }
    Ok(total)
}

fn invalid(column: &str, row: usize, value: &Value) -> CoreError {
    CoreError::InvalidValue {
        column: column.to_string(),
        row,
        reason: format!("'{value}' is not a finite number"),
    }
}

pub fn aggregate(
    partitions: &[(String, Table)],
    value_column: &str,
) -> CoreResult<Vec<AggregateRecord>> {
    let totals = partitions
        .iter()
        .map(|(category, table)| column_total(table, value_column).map(|t| (category, t)))
        .collect::<CoreResult<Vec<_>>>()?;
    let grand_total: f64 = totals.iter().map(|(_, total)| total).sum();
    if grand_total == 0.0 {
        return Err(CoreError::DivisionByZero(value_column.to_string()));
    }

    let mut cumulative = 0.0;
    Ok(totals
        .into_iter()
        .map(|(category, total)| {
            let percentage = total / grand_total;
            cumulative += percentage;
            AggregateRecord {
                category: category.clone(),
                total,
                percentage,
                cumulative,
            }
        })
        .collect())
}
