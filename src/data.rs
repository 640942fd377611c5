use std::fmt;

use serde::{Deserialize, Serialize};

/// A single table cell; `None` marks a missing value.
pub type Cell = Option<Value>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Value {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl Value {
    /// Canonical text form used for key matching, value filters and export.
    pub fn as_display(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Integer(i) => i.to_string(),
            Value::Float(f) => {
                if f.fract() == 0.0 && f.is_finite() && f.abs() < 1e15 {
                    (*f as i64).to_string()
                } else {
                    f.to_string()
                }
            }
            Value::Boolean(b) => b.to_string(),
        }
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

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

/// Display form of a cell, `None` when the cell is missing.
pub fn cell_key(cell: &Cell) -> Option<String> {
    cell.as_ref().map(Value::as_display)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    String,
    Integer,
    Float,
    Boolean,
}

#[derive(Debug, Clone)]
struct TypeCandidate {
    possible_integer: bool,
    possible_float: bool,
    possible_boolean: bool,
}

impl TypeCandidate {
    fn new() -> Self {
        Self {
            possible_integer: true,
            possible_float: true,
            possible_boolean: true,
        }
    }

    fn observe(&mut self, raw: &str) {
        if self.possible_boolean && parse_boolean(raw).is_none() {
            self.possible_boolean = false;
        }
        if self.possible_integer && raw.parse::<i64>().is_err() {
            self.possible_integer = false;
        }
        if self.possible_float && raw.parse::<f64>().is_err() {
            self.possible_float = false;
        }
    }

    fn decide(&self) -> ColumnType {
        if self.possible_boolean {
            ColumnType::Boolean
        } else if self.possible_integer {
            ColumnType::Integer
        } else if self.possible_float {
            ColumnType::Float
        } else {
            ColumnType::String
        }
    }
}

fn parse_boolean(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// Picks the narrowest type that every non-empty value of a column parses as.
/// A column with no values at all stays a string column.
pub fn infer_column_type<'a, I>(raw_values: I) -> ColumnType
where
    I: IntoIterator<Item = &'a str>,
{
    let mut candidate = TypeCandidate::new();
    let mut seen_any = false;
    for raw in raw_values {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            continue;
        }
        seen_any = true;
        candidate.observe(trimmed);
    }
    if seen_any {
        candidate.decide()
    } else {
        ColumnType::String
    }
}

/// Converts raw text to a cell of the given type. Empty text is missing; text
/// that does not parse as the requested type falls back to a string value.
pub fn parse_cell(raw: &str, ty: ColumnType) -> Cell {
    if raw.trim().is_empty() {
        return None;
    }
    let trimmed = raw.trim();
    let parsed = match ty {
        ColumnType::String => None,
        ColumnType::Integer => trimmed.parse::<i64>().ok().map(Value::Integer),
        ColumnType::Float => trimmed.parse::<f64>().ok().map(Value::Float),
        ColumnType::Boolean => parse_boolean(trimmed).map(Value::Boolean),
    };
    Some(parsed.unwrap_or_else(|| Value::String(raw.to_string())))
}
