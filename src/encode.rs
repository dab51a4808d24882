//! Label encoding for categorical columns.
//!
//! Codes follow the sorted order of the distinct labels, so the same column
//! always encodes the same way regardless of row order. Numeric columns sort
//! by value (`1, 2, 10`), everything else lexicographically.

use std::cmp::Ordering;

use itertools::Itertools;
use serde::Serialize;

use crate::{
    data::{ColumnType, parse_finite},
    error::{CoreError, CoreResult},
    frame::Table,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelOrder {
    #[default]
    Lexical,
    /// Numbers by value ahead of any non-numeric labels.
    Numeric,
}

impl LabelOrder {
    pub fn for_column(ty: ColumnType) -> Self {
        match ty {
            ColumnType::Integer | ColumnType::Float => LabelOrder::Numeric,
            ColumnType::String => LabelOrder::Lexical,
        }
    }

    /// Total order on labels; equal only for identical text.
    pub fn compare(self, a: &str, b: &str) -> Ordering {
        match self {
            LabelOrder::Lexical => a.cmp(b),
            LabelOrder::Numeric => match (parse_finite(a), parse_finite(b)) {
                (Some(x), Some(y)) => x.total_cmp(&y).then_with(|| a.cmp(b)),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => a.cmp(b),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelEncoding {
    classes: Vec<String>,
    order: LabelOrder,
}

impl LabelEncoding {
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn order(&self) -> LabelOrder {
        self.order
    }

    pub fn decode(&self, code: usize) -> Option<&str> {
        self.classes.get(code).map(String::as_str)
    }

    pub fn code(&self, label: &str) -> Option<usize> {
        self.classes
            .binary_search_by(|class| self.order.compare(class, label))
            .ok()
    }

    /// `(code, label)` pairs in code order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.classes
            .iter()
            .enumerate()
            .map(|(code, label)| (code, label.as_str()))
    }
}

/// Encodes labels in lexicographic order.
pub fn encode<S: AsRef<str>>(labels: &[S]) -> CoreResult<(LabelEncoding, Vec<usize>)> {
    encode_with(labels, LabelOrder::Lexical)
}

pub fn encode_with<S: AsRef<str>>(
    labels: &[S],
    order: LabelOrder,
) -> CoreResult<(LabelEncoding, Vec<usize>)> {
    if labels.is_empty() {
        return Err(CoreError::EmptyInput("encode"));
    }
    let classes = labels
        .iter()
        .map(AsRef::as_ref)
        .sorted_by(|a, b| order.compare(a, b))
        .dedup()
        .map(str::to_string)
        .collect::<Vec<_>>();
    // Every label is one of the classes, so the search always lands on it.
    let encoded = labels
        .iter()
        .map(|label| {
            classes
                .binary_search_by(|class| order.compare(class, label.as_ref()))
                .unwrap_or_else(|insert_at| insert_at)
        })
        .collect();
    Ok((LabelEncoding { classes, order }, encoded))
}

/// Encodes one column of `table` by its source text, ordered by the
/// column's inferred type. Missing cells have no label and are rejected.
pub fn encode_column(table: &Table, column: &str) -> CoreResult<(LabelEncoding, Vec<usize>)> {
    let order = LabelOrder::for_column(table.column_type(column)?);
    let labels = table
        .column_text(column)?
        .into_iter()
        .enumerate()
        .map(|(row, text)| {
            text.ok_or_else(|| CoreError::InvalidValue {
                column: column.to_string(),
                row,
                reason: "missing value has no label".to_string(),
            })
        })
        .collect::<CoreResult<Vec<_>>>()?;
    encode_with(&labels, order)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_by_sorted_distinct_labels() {
        let (encoding, encoded) = encode(&["b", "a", "a", "c"]).unwrap();
        assert_eq!(
            encoding.iter().collect::<Vec<_>>(),
            vec![(0, "a"), (1, "b"), (2, "c")]
        );
        assert_eq!(encoded, vec![1, 0, 0, 2]);
    }

    #[test]
    fn decode_round_trips_every_code() {
        let labels = ["85 years and over", "Under 1 year", "1-4 years"];
        let (encoding, encoded) = encode(&labels).unwrap();
        for (label, code) in labels.iter().zip(&encoded) {
            assert_eq!(encoding.decode(*code), Some(*label));
        }
        assert_eq!(encoding.decode(3), None);
    }

    #[test]
    fn numeric_order_sorts_by_value() {
        let (encoding, encoded) = encode_with(&["1", "2", "10"], LabelOrder::Numeric).unwrap();
        assert_eq!(
            encoding.iter().collect::<Vec<_>>(),
            vec![(0, "1"), (1, "2"), (2, "10")]
        );
        assert_eq!(encoded, vec![0, 1, 2]);
        assert_eq!(encoding.code("10"), Some(2));
        assert_eq!(encoding.code("3"), None);
    }

    #[test]
    fn integer_columns_encode_numerically() {
        let table = Table::from_raw(
            vec!["MMWR Week".into()],
            vec![vec!["10".into()], vec!["2".into()], vec!["1".into()], vec!["2".into()]],
        );
        let (encoding, encoded) = encode_column(&table, "MMWR Week").unwrap();
        assert_eq!(encoding.order(), LabelOrder::Numeric);
        assert_eq!(encoding.decode(0), Some("1"));
        assert_eq!(encoding.decode(2), Some("10"));
        assert_eq!(encoded, vec![2, 1, 0, 1]);
    }

    #[test]
    fn missing_cells_cannot_be_encoded() {
        let table = Table::from_raw(
            vec!["Sex".into()],
            vec![vec!["Male".into()], vec!["".into()]],
        );
        assert_eq!(
            encode_column(&table, "Sex"),
            Err(CoreError::InvalidValue {
                column: "Sex".into(),
                row: 1,
                reason: "missing value has no label".into(),
            })
        );
    }

    #[test]
    fn empty_input_is_rejected() {
        let empty: [&str; 0] = [];
        assert_eq!(encode(&empty), Err(CoreError::EmptyInput("encode")));
    }
}
