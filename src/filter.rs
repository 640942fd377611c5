use std::collections::BTreeSet;

use anyhow::anyhow;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    data::{Value, cell_key},
    error::{CrossError, Result},
    table::Table,
};

/// Keeps rows whose value in `column` is one of `allowed`. Values are compared
/// through their display form; missing cells never match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValuePredicate {
    pub column: String,
    #[serde(default)]
    pub allowed: BTreeSet<String>,
}

impl ValuePredicate {
    pub fn new<I, S>(column: impl Into<String>, allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            column: column.into(),
            allowed: allowed.into_iter().map(Into::into).collect(),
        }
    }

    /// Parses `column=value1|value2`. Values may be quoted; `column=` yields
    /// an empty allowed set.
    pub fn parse(expression: &str) -> anyhow::Result<Self> {
        let trimmed = expression.trim();
        let Some((column, values)) = trimmed.split_once('=') else {
            return Err(anyhow!(
                "Failed to parse value filter '{trimmed}' (expected column=value|value)"
            ));
        };
        let column = column.trim();
        if column.is_empty() {
            return Err(anyhow!("Value filter '{trimmed}' is missing a column name"));
        }
        let allowed = values
            .split('|')
            .map(|v| unquote(v.trim()))
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect::<BTreeSet<_>>();
        Ok(Self {
            column: column.to_string(),
            allowed,
        })
    }

    fn accepts(&self, value: Option<String>) -> bool {
        value.is_some_and(|v| self.allowed.contains(&v))
    }
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

/// Row count left after each predicate, in application order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterStep {
    pub column: String,
    pub rows: usize,
}

pub fn apply_filters(table: &Table, predicates: &[ValuePredicate]) -> Result<Table> {
    apply_filters_traced(table, predicates).map(|(table, _)| table)
}

/// Applies the predicates one after another (AND semantics), recording the
/// surviving row count after each.
pub fn apply_filters_traced(
    table: &Table,
    predicates: &[ValuePredicate],
) -> Result<(Table, Vec<FilterStep>)> {
    let mut columns = Vec::with_capacity(predicates.len());
    for predicate in predicates {
        let idx = table
            .column_index(&predicate.column)
            .ok_or_else(|| CrossError::UnknownColumn {
                column: predicate.column.clone(),
            })?;
        columns.push(idx);
    }

    let mut surviving: Vec<usize> = (0..table.row_count()).collect();
    let mut steps = Vec::with_capacity(predicates.len());
    for (predicate, column_idx) in predicates.iter().zip(columns) {
        let values = &table.columns()[column_idx].values;
        surviving.retain(|row| predicate.accepts(cell_key(&values[*row])));
        debug!(
            "Filter on '{}' ({} value(s)): {} row(s) remaining",
            predicate.column,
            predicate.allowed.len(),
            surviving.len()
        );
        steps.push(FilterStep {
            column: predicate.column.clone(),
            rows: surviving.len(),
        });
    }
    Ok((table.take_rows(&surviving), steps))
}

/// Sorted distinct display values of a column, missing cells excluded.
pub fn distinct_values(table: &Table, column: &str) -> Result<Vec<String>> {
    let column = table.column(column).ok_or_else(|| CrossError::UnknownColumn {
        column: column.to_string(),
    })?;
    let values: BTreeSet<String> = column
        .values
        .iter()
        .flatten()
        .map(Value::as_display)
        .collect();
    Ok(values.into_iter().collect())
}
