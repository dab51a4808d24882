//! Error kinds raised by the filtering, encoding, and aggregation core.
//!
//! The core never retries or substitutes defaults; every failure here comes
//! from caller input or undefined arithmetic. Command handlers wrap these in
//! `anyhow` context, and callers that need the kind can `downcast_ref`.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    #[error("Unknown dataset '{0}'")]
    UnknownDataset(String),
    #[error("Column '{0}' not found")]
    UnknownColumn(String),
    #[error("Cannot {0} an empty input")]
    EmptyInput(&'static str),
    #[error("Invalid value in column '{column}' at row {row}: {reason}")]
    InvalidValue {
        column: String,
        row: usize,
        reason: String,
    },
    #[error("Grand total of column '{0}' is zero; percentages are undefined")]
    DivisionByZero(String),
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;
