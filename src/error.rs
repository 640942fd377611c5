//! Error taxonomy for the crossing engine.
//!
//! Every structural problem (missing, ambiguous or colliding column names) is
//! detected before a stage does any real work, so a failed call never leaves
//! partial output behind and can be retried with corrected parameters.

use thiserror::Error;

use crate::classify::ResultFilter;

pub type Result<T> = std::result::Result<T, CrossError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CrossError {
    #[error(
        "Columns '{first}' and '{second}' in '{source_label}' both normalize to '{normalized}'"
    )]
    NameCollision {
        source_label: String,
        first: String,
        second: String,
        normalized: String,
    },
    #[error("Key column '{column}' not found in '{source_label}'")]
    KeyNotFound {
        source_label: String,
        column: String,
    },
    #[error("Result filter '{filter}' requires exactly two inputs, got {tables}")]
    UnsupportedMode { filter: ResultFilter, tables: usize },
    #[error("Column name '{column}' would appear more than once")]
    DuplicateName { column: String },
    #[error("Column '{column}' not found")]
    UnknownColumn { column: String },
    #[error("Crossing needs at least two tables and one key per table (tables: {tables}, keys: {keys})")]
    Arity { tables: usize, keys: usize },
    #[error("Column '{column}' in '{source_label}' has {found} row(s), expected {expected}")]
    RaggedColumn {
        source_label: String,
        column: String,
        expected: usize,
        found: usize,
    },
}
