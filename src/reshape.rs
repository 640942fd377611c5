//! Output shaping: key collapsing, renaming and projection.

use std::collections::{BTreeMap, HashMap, HashSet};

use itertools::Itertools;
use log::debug;
use serde::{Deserialize, Deserializer, Serialize};

use crate::{
    error::{CrossError, Result},
    table::{Column, ColumnRole, Table},
};

/// Folds every key-role column into the first input's key column, renamed to
/// `label`. Missing cells of the surviving key are filled from the first
/// non-missing later key in the same row, so rows contributed only by a
/// later input keep their key value.
pub fn collapse_keys(table: &Table, label: &str) -> Result<Table> {
    let key_positions: Vec<usize> = table
        .columns()
        .iter()
        .positions(|c| c.is_key())
        .collect();
    let Some((&primary, _)) = key_positions.split_first() else {
        return Ok(table.clone());
    };
    if let Some(clash) = table
        .columns()
        .iter()
        .find(|c| !c.is_key() && c.name == label)
    {
        return Err(CrossError::DuplicateName {
            column: clash.name.clone(),
        });
    }

    let mut merged: Column = table.columns()[primary].clone();
    for row in 0..table.row_count() {
        if merged.values[row].is_none() {
            merged.values[row] = key_positions[1..]
                .iter()
                .find_map(|idx| table.columns()[*idx].values[row].clone());
        }
    }
    merged.name = label.to_string();

    let columns = table
        .columns()
        .iter()
        .enumerate()
        .filter_map(|(idx, column)| {
            if idx == primary {
                Some(merged.clone())
            } else if column.is_key() {
                None
            } else {
                Some(column.clone())
            }
        })
        .collect();
    debug!(
        "Collapsed {} key column(s) into '{}'",
        key_positions.len(),
        label
    );
    Table::new(table.source(), columns)
}

/// Renames columns through `mapping`; names absent from the mapping keep
/// their current name.
pub fn rename(table: &Table, mapping: &HashMap<String, String>) -> Result<Table> {
    if let Some(unknown) = mapping
        .keys()
        .sorted()
        .find(|name| table.column_index(name).is_none())
    {
        return Err(CrossError::UnknownColumn {
            column: unknown.clone(),
        });
    }
    let renamed: Vec<Column> = table
        .columns()
        .iter()
        .map(|column| {
            let mut column = column.clone();
            if let Some(target) = mapping.get(&column.name) {
                column.name = target.clone();
            }
            column
        })
        .collect();
    if let Some(duplicate) = renamed.iter().map(|c| c.name.as_str()).duplicates().next() {
        return Err(CrossError::DuplicateName {
            column: duplicate.to_string(),
        });
    }
    Table::new(table.source(), renamed)
}

/// Exactly the requested columns, in the requested order.
pub fn project<S: AsRef<str>>(table: &Table, names: &[S]) -> Result<Table> {
    let mut seen = HashSet::with_capacity(names.len());
    let mut columns = Vec::with_capacity(names.len());
    for name in names {
        let name = name.as_ref();
        if !seen.insert(name) {
            return Err(CrossError::DuplicateName {
                column: name.to_string(),
            });
        }
        let column = table.column(name).ok_or_else(|| CrossError::UnknownColumn {
            column: name.to_string(),
        })?;
        columns.push(column.clone());
    }
    Table::new(table.source(), columns)
}

/// Which columns to export, in which order, under which names.
///
/// `order` names columns as they are before renaming; an empty `order` keeps
/// every column where it is. Renaming and projection are separate steps so a
/// caller can filter on renamed columns that are not exported.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnPlan {
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "deserialize_order"
    )]
    pub order: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub renames: BTreeMap<String, String>,
}

/// Loaded plans drop repeated `order` entries, keeping the first occurrence.
fn deserialize_order<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let order = Vec::<String>::deserialize(deserializer)?;
    Ok(order.into_iter().unique().collect())
}

impl ColumnPlan {
    pub fn new<I, S>(order: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            order: order.into_iter().map(Into::into).unique().collect(),
            renames: BTreeMap::new(),
        }
    }

    pub fn with_rename(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.renames.insert(from.into(), to.into());
        self
    }

    pub fn is_identity(&self) -> bool {
        self.order.is_empty() && self.renames.iter().all(|(from, to)| from == to)
    }

    pub fn display_name<'a>(&'a self, name: &'a str) -> &'a str {
        self.renames.get(name).map(String::as_str).unwrap_or(name)
    }

    /// Renames, then projects to `order`.
    pub fn apply(&self, table: &Table) -> Result<Table> {
        if self.is_identity() {
            return Ok(table.clone());
        }
        let renamed = self.apply_renames(table)?;
        self.apply_order(&renamed)
    }

    pub fn apply_renames(&self, table: &Table) -> Result<Table> {
        if self.renames.is_empty() {
            return Ok(table.clone());
        }
        let mapping: HashMap<String, String> = self
            .renames
            .iter()
            .map(|(from, to)| (from.clone(), to.clone()))
            .collect();
        rename(table, &mapping)
    }

    /// Projects an already renamed table to `order`, translating each entry
    /// through `renames`.
    pub fn apply_order(&self, renamed: &Table) -> Result<Table> {
        if self.order.is_empty() {
            return Ok(renamed.clone());
        }
        let display: Vec<&str> = self
            .order
            .iter()
            .map(|name| {
                let target = self.display_name(name);
                if renamed.column_index(target).is_none() {
                    return Err(CrossError::UnknownColumn {
                        column: name.clone(),
                    });
                }
                Ok(target)
            })
            .collect::<Result<_>>()?;
        project(renamed, &display)
    }
}

/// Key-role columns that are still present, for callers deciding whether a
/// collapse is needed.
pub fn key_columns(table: &Table) -> Vec<&str> {
    table
        .columns()
        .iter()
        .filter(|c| c.provenance.role == ColumnRole::Key)
        .map(|c| c.name.as_str())
        .collect()
}
