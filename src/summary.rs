//! Dataset overview: per-column types plus missing and zero-valued counts.

use anyhow::{Context, Result};
use log::info;
use serde::Serialize;

use crate::{
    cli::SummaryArgs,
    data::{ColumnType, format_number},
    frame::Table,
    io_utils,
    registry::Registry,
    report,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub name: String,
    pub datatype: ColumnType,
    pub zero_count: usize,
    pub missing_count: usize,
    pub missing_percent: f64,
    pub zero_or_missing_count: usize,
    pub zero_or_missing_percent: f64,
}

/// Columns with at least one missing cell, most incomplete first. With
/// `include_complete` every column is listed in header order instead.
pub fn summarize_columns(table: &Table, include_complete: bool) -> Vec<ColumnSummary> {
    let row_count = table.len();
    let percent = |count: usize| {
        if row_count == 0 {
            0.0
        } else {
            100.0 * count as f64 / row_count as f64
        }
    };

    let mut summaries = table
        .headers()
        .iter()
        .zip(table.column_types())
        .enumerate()
        .map(|(idx, (name, datatype))| {
            let (mut zero_count, mut missing_count) = (0usize, 0usize);
            for row in table.rows() {
                match row.get(idx).and_then(|cell| cell.as_ref()) {
                    Some(value) if value.is_zero() => zero_count += 1,
                    Some(_) => {}
                    None => missing_count += 1,
                }
            }
            let zero_or_missing_count = zero_count + missing_count;
            ColumnSummary {
                name: name.clone(),
                datatype: *datatype,
                zero_count,
                missing_count,
                missing_percent: percent(missing_count),
                zero_or_missing_count,
                zero_or_missing_percent: percent(zero_or_missing_count),
            }
        })
        .collect::<Vec<_>>();

    if !include_complete {
        summaries.retain(|s| s.missing_count > 0);
        summaries.sort_by(|a, b| b.missing_percent.total_cmp(&a.missing_percent));
    }
    summaries
}

pub fn summary_rows(summaries: &[ColumnSummary]) -> Vec<Vec<String>> {
    summaries
        .iter()
        .map(|s| {
            vec![
                s.name.clone(),
                s.datatype.to_string(),
                s.zero_count.to_string(),
                s.missing_count.to_string(),
                format!("{:.1}", s.missing_percent),
                s.zero_or_missing_count.to_string(),
                format!("{:.1}", s.zero_or_missing_percent),
            ]
        })
        .collect()
}

pub fn execute(args: &SummaryArgs, registry: &Registry, input: &crate::cli::InputOptions) -> Result<()> {
    let path = registry.resolve(args.dataset)?;
    let delimiter = io_utils::resolve_input_delimiter(path, input.delimiter);
    let encoding = io_utils::resolve_encoding(input.input_encoding.as_deref())?;
    info!("Reading data from {path:?}");
    let table = io_utils::load_table(path, delimiter, encoding)
        .with_context(|| format!("Loading dataset '{}'", args.dataset))?;
    info!(
        "Dataset '{}' has {} row(s) across {} column(s)",
        args.dataset,
        table.len(),
        table.headers().len()
    );

    let summaries = summarize_columns(&table, args.all_columns);
    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&summaries).context("Serializing summary to JSON")?
        );
        return Ok(());
    }

    println!("rows: {}", format_number(table.len() as f64));
    if summaries.is_empty() {
        info!("No column of '{}' has missing values", args.dataset);
        return Ok(());
    }
    let headers = [
        "column",
        "type",
        "zero",
        "missing",
        "% missing",
        "zero+missing",
        "% zero+missing",
    ]
    .map(String::from);
    report::print_table(&headers, &summary_rows(&summaries));
    Ok(())
}
