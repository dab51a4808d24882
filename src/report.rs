//! Text rendering and export of aggregate records.

use std::borrow::Cow;
use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};

use crate::{
    aggregate::AggregateRecord,
    data::{format_number, format_percent},
    io_utils,
};

pub const RECORD_HEADERS: [&str; 4] = ["category", "total", "percent", "cumulative"];

const BAR_GLYPH: char = '#';

pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let column_count = headers.len();
    let mut widths = headers.iter().map(|h| display_width(h)).collect::<Vec<_>>();
    for row in rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            widths[idx] = widths[idx].max(display_width(cell));
        }
    }

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_row(headers, &widths));
    let rule = widths.iter().map(|w| "-".repeat((*w).max(3))).collect::<Vec<_>>();
    let rule_widths = widths.iter().map(|w| (*w).max(3)).collect::<Vec<_>>();
    let _ = writeln!(output, "{}", format_row(&rule, &rule_widths));
    for row in rows {
        let _ = writeln!(output, "{}", format_row(row, &widths));
    }
    output
}

pub fn print_table(headers: &[String], rows: &[Vec<String>]) {
    print!("{}", render_table(headers, rows));
}

pub fn record_rows(records: &[AggregateRecord]) -> Vec<Vec<String>> {
    records
        .iter()
        .map(|record| {
            vec![
                record.category.clone(),
                format_number(record.total),
                format_percent(record.percentage),
                format_percent(record.cumulative),
            ]
        })
        .collect()
}

pub fn render_records(title: Option<&str>, records: &[AggregateRecord]) -> String {
    let headers = RECORD_HEADERS.map(String::from);
    let mut output = String::new();
    if let Some(title) = title {
        let _ = writeln!(output, "{title}");
        let _ = writeln!(output);
    }
    output.push_str(&render_table(&headers, &record_rows(records)));
    output
}

/// Horizontal bars, one per record, scaled so the largest share spans `width`.
/// With `cumulative` set the bars show the running share instead.
pub fn render_bar_chart(records: &[AggregateRecord], width: usize, cumulative: bool) -> String {
    let label_width = records
        .iter()
        .map(|r| display_width(&r.category))
        .max()
        .unwrap_or(0);
    let metric = |r: &AggregateRecord| if cumulative { r.cumulative } else { r.percentage };
    let peak = records.iter().map(metric).fold(0.0_f64, f64::max);

    let mut output = String::new();
    for record in records {
        let value = metric(record);
        let length = if peak > 0.0 {
            ((value / peak) * width as f64).round() as usize
        } else {
            0
        };
        let padding = label_width.saturating_sub(display_width(&record.category));
        let bar = BAR_GLYPH.to_string().repeat(length);
        let _ = writeln!(
            output,
            "{}{}  |{}  {}",
            sanitize_cell(&record.category),
            " ".repeat(padding),
            bar,
            format_percent(value)
        );
    }
    output
}

pub fn write_records_csv(records: &[AggregateRecord], path: Option<&Path>, delimiter: u8) -> Result<()> {
    let mut writer = io_utils::open_csv_writer(path, delimiter)?;
    writer
        .write_record(RECORD_HEADERS)
        .context("Writing header row")?;
    for record in records {
        writer
            .write_record([
                record.category.clone(),
                record.total.to_string(),
                record.percentage.to_string(),
                record.cumulative.to_string(),
            ])
            .with_context(|| format!("Writing record for '{}'", record.category))?;
    }
    writer.flush().context("Flushing CSV output")?;
    Ok(())
}

pub fn records_to_json(title: Option<&str>, records: &[AggregateRecord]) -> Result<String> {
    let document = serde_json::json!({
        "title": title,
        "records": records,
    });
    serde_json::to_string_pretty(&document).context("Serializing records to JSON")
}

fn format_row(values: &[String], widths: &[usize]) -> String {
    let mut cells = Vec::with_capacity(values.len());
    for (value, width) in values.iter().zip(widths) {
        let sanitized = sanitize_cell(value);
        let padding = width.saturating_sub(display_width(sanitized.as_ref()));
        let mut cell = sanitized.into_owned();
        cell.push_str(&" ".repeat(padding));
        cells.push(cell);
    }
    cells.join("  ").trim_end().to_string()
}

fn display_width(value: &str) -> usize {
    value.chars().filter(|c| !c.is_control()).count()
}

fn sanitize_cell(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(value.replace(['\n', '\r', '\t'], " "))
    } else {
        Cow::Borrowed(value)
    }
}
