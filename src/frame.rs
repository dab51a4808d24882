//! In-memory table model shared by the filter, encoder, and aggregator.
//!
//! A [`Table`] is a header list plus ordered rows of optional typed cells.
//! Each row also keeps the text it was read from, so selections write back
//! exactly what the source held. Operations never mutate a table in place;
//! they build new ones from selected rows.

use crate::{
    data::{ColumnType, Value, infer_column_type, parse_typed_value},
    error::{CoreError, CoreResult},
};

pub type Row = Vec<Option<Value>>;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    headers: Vec<String>,
    types: Vec<ColumnType>,
    rows: Vec<Row>,
    source: Vec<Vec<String>>,
}

impl Table {
    /// Builds a table from typed rows; the source text is their rendering.
    pub fn new(headers: Vec<String>, types: Vec<ColumnType>, rows: Vec<Row>) -> Self {
        debug_assert_eq!(headers.len(), types.len());
        let source = rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| cell.as_ref().map(Value::as_display).unwrap_or_default())
                    .collect()
            })
            .collect();
        Self {
            headers,
            types,
            rows,
            source,
        }
    }

    /// Builds a typed table from raw string rows, inferring each column type.
    pub fn from_raw(headers: Vec<String>, raw_rows: Vec<Vec<String>>) -> Self {
        let width = headers.len();
        let source = raw_rows
            .into_iter()
            .map(|mut raw| {
                raw.resize(width, String::new());
                raw
            })
            .collect::<Vec<_>>();
        let types = (0..width)
            .map(|idx| infer_column_type(source.iter().map(|row| row[idx].as_str())))
            .collect::<Vec<_>>();
        let rows = source
            .iter()
            .map(|raw| {
                raw.iter()
                    .zip(&types)
                    .map(|(cell, ty)| parse_typed_value(cell, *ty))
                    .collect()
            })
            .collect();
        Self {
            headers,
            types,
            rows,
            source,
        }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn column_types(&self) -> &[ColumnType] {
        &self.types
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Rows as the text they were read from, for writers and text tables.
    pub fn source_rows(&self) -> &[Vec<String>] {
        &self.source
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn require_column(&self, name: &str) -> CoreResult<usize> {
        self.column_index(name)
            .ok_or_else(|| CoreError::UnknownColumn(name.to_string()))
    }

    pub fn column_type(&self, name: &str) -> CoreResult<ColumnType> {
        let idx = self.require_column(name)?;
        Ok(self.types[idx])
    }

    /// Cells of one column, in row order.
    pub fn column(&self, name: &str) -> CoreResult<Vec<Option<&Value>>> {
        let idx = self.require_column(name)?;
        Ok(self
            .rows
            .iter()
            .map(|row| row.get(idx).and_then(|cell| cell.as_ref()))
            .collect())
    }

    /// Trimmed source text of one column; `None` marks a missing cell.
    pub fn column_text(&self, name: &str) -> CoreResult<Vec<Option<&str>>> {
        let idx = self.require_column(name)?;
        Ok(self
            .source
            .iter()
            .map(|raw| Some(raw[idx].trim()).filter(|text| !text.is_empty()))
            .collect())
    }

    /// New table sharing this schema, holding the rows `keep` accepts.
    /// `keep` sees the typed row and its source text.
    pub fn select_rows<F>(&self, mut keep: F) -> Self
    where
        F: FnMut(&Row, &[String]) -> bool,
    {
        let (rows, source): (Vec<Row>, Vec<Vec<String>>) = self
            .rows
            .iter()
            .zip(&self.source)
            .filter(|(row, raw)| keep(row, raw))
            .map(|(row, raw)| (row.clone(), raw.clone()))
            .unzip();
        Self {
            headers: self.headers.clone(),
            types: self.types.clone(),
            rows,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|row| row.iter().map(|s| s.to_string()).collect())
            .collect()
    }

    #[test]
    fn from_raw_infers_types_and_missing_cells() {
        let table = Table::from_raw(
            vec!["Sex".into(), "Deaths".into()],
            raw(&[&["Male", "10"], &["Female", ""]]),
        );
        assert_eq!(
            table.column_types(),
            &[ColumnType::String, ColumnType::Integer]
        );
        assert_eq!(table.rows()[0][1], Some(Value::Integer(10)));
        assert_eq!(table.rows()[1][1], None);
    }

    #[test]
    fn require_column_reports_unknown_name() {
        let table = Table::from_raw(vec!["Sex".into()], Vec::new());
        assert_eq!(
            table.require_column("Age Group"),
            Err(CoreError::UnknownColumn("Age Group".into()))
        );
    }

    #[test]
    fn column_text_keeps_source_spelling() {
        let table = Table::from_raw(
            vec!["Rate".into()],
            raw(&[&["2.0"], &[""], &[" 2.50 "]]),
        );
        assert_eq!(table.rows()[0][0], Some(Value::Float(2.0)));
        assert_eq!(
            table.column_text("Rate").unwrap(),
            vec![Some("2.0"), None, Some("2.50")]
        );
    }

    #[test]
    fn selected_rows_carry_their_source_text() {
        let table = Table::from_raw(
            vec!["Sex".into(), "Rate".into()],
            raw(&[&["Male", "2.0"], &["Female", "3.10"], &["Male", "2.50"]]),
        );
        let males = table.select_rows(|_, raw| raw[0] == "Male");
        assert_eq!(males.len(), 2);
        assert_eq!(
            males.source_rows().to_vec(),
            raw(&[&["Male", "2.0"], &["Male", "2.50"]])
        );
        assert_eq!(males.column_types(), table.column_types());
    }

    #[test]
    fn short_rows_are_padded_to_the_header_width() {
        let table = Table::from_raw(vec!["Sex".into(), "Deaths".into()], raw(&[&["Male"]]));
        assert_eq!(table.rows()[0], vec![Some(Value::from("Male")), None]);
        assert_eq!(table.source_rows()[0], vec!["Male", ""]);
    }
}
