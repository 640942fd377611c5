use std::collections::{HashMap, HashSet};

use clap::ValueEnum;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::{
    data::{Cell, cell_key},
    error::{CrossError, Result},
    table::{Column, Table},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
#[value(rename_all = "kebab-case")]
pub enum JoinMode {
    #[default]
    Inner,
    Left,
    Right,
    Full,
}

impl JoinMode {
    fn keeps_unmatched_left(self) -> bool {
        matches!(self, JoinMode::Left | JoinMode::Full)
    }

    fn keeps_unmatched_right(self) -> bool {
        matches!(self, JoinMode::Right | JoinMode::Full)
    }
}

/// One key column per input table plus the join mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinSpec {
    pub keys: Vec<String>,
    #[serde(default)]
    pub mode: JoinMode,
}

impl JoinSpec {
    pub fn new(keys: Vec<String>, mode: JoinMode) -> Self {
        Self { keys, mode }
    }

    /// Checks table/key arity and that every key exists in its table.
    pub fn validate(&self, tables: &[Table]) -> Result<()> {
        if tables.len() < 2 || tables.len() != self.keys.len() {
            return Err(CrossError::Arity {
                tables: tables.len(),
                keys: self.keys.len(),
            });
        }
        for (table, key) in tables.iter().zip(&self.keys) {
            key_index(table, key)?;
        }
        Ok(())
    }
}

/// Crosses `tables` left to right. The running result is always matched on
/// the first table's key column; keys of later tables are kept as separate
/// key-role columns.
pub fn join(tables: &[Table], keys: &[String], mode: JoinMode) -> Result<Table> {
    let spec = JoinSpec::new(keys.to_vec(), mode);
    spec.validate(tables)?;

    let mut running = tables[0].clone().with_origin(0).with_key(&keys[0])?;
    let running_key = key_index(&running, &keys[0])?;

    for (position, (table, key)) in tables.iter().zip(keys).enumerate().skip(1) {
        let incoming = table.clone().with_origin(position).with_key(key)?;
        let incoming_key = key_index(&incoming, key)?;
        let rows_before = running.row_count();
        running = join_step(&running, running_key, &incoming, incoming_key, position, mode)?;
        debug!(
            "Join step {}: {} x {} row(s) from '{}' -> {} row(s)",
            position,
            rows_before,
            incoming.row_count(),
            incoming.source(),
            running.row_count()
        );
    }

    info!(
        "Crossed {} table(s) ({:?}): {} row(s), {} column(s)",
        tables.len(),
        mode,
        running.row_count(),
        running.column_count()
    );
    Ok(running)
}

pub(crate) fn key_index(table: &Table, key: &str) -> Result<usize> {
    table
        .column_index(key)
        .ok_or_else(|| CrossError::KeyNotFound {
            source_label: table.source().to_string(),
            column: key.to_string(),
        })
}

pub(crate) fn build_lookup(table: &Table, key_idx: usize) -> HashMap<String, Vec<usize>> {
    let mut map: HashMap<String, Vec<usize>> = HashMap::new();
    for (row_idx, cell) in table.columns()[key_idx].values.iter().enumerate() {
        // Missing keys never match anything, so they are left out.
        if let Some(key) = cell_key(cell) {
            map.entry(key).or_default().push(row_idx);
        }
    }
    map
}

fn join_step(
    left: &Table,
    left_key: usize,
    right: &Table,
    right_key: usize,
    position: usize,
    mode: JoinMode,
) -> Result<Table> {
    let lookup = build_lookup(right, right_key);
    let mut right_matched = vec![false; right.row_count()];
    let mut pairs: Vec<(Option<usize>, Option<usize>)> = Vec::new();

    for (left_idx, cell) in left.columns()[left_key].values.iter().enumerate() {
        let bucket = cell_key(cell).and_then(|key| lookup.get(&key));
        match bucket {
            Some(rows) => {
                for right_idx in rows {
                    right_matched[*right_idx] = true;
                    pairs.push((Some(left_idx), Some(*right_idx)));
                }
            }
            None if mode.keeps_unmatched_left() => pairs.push((Some(left_idx), None)),
            None => {}
        }
    }

    if mode.keeps_unmatched_right() {
        pairs.extend(
            right_matched
                .iter()
                .enumerate()
                .filter(|(_, matched)| !**matched)
                .map(|(right_idx, _)| (None, Some(right_idx))),
        );
    }

    let mut columns = Vec::with_capacity(left.column_count() + right.column_count());
    for column in left.columns() {
        columns.push(gather(column, column.name.clone(), pairs.iter().map(|p| p.0)));
    }
    let names = disambiguate(left, right, position);
    for (column, name) in right.columns().iter().zip(names) {
        columns.push(gather(column, name, pairs.iter().map(|p| p.1)));
    }
    Table::new(left.source(), columns)
}

fn gather(column: &Column, name: String, rows: impl Iterator<Item = Option<usize>>) -> Column {
    let values: Vec<Cell> = rows
        .map(|row| row.and_then(|idx| column.values[idx].clone()))
        .collect();
    Column {
        name,
        provenance: column.provenance.clone(),
        values,
    }
}

/// Output names for the incoming columns. Names already taken get the
/// 1-based table number appended (`id` -> `id_2`), plus a counter if that is
/// taken as well.
fn disambiguate(left: &Table, right: &Table, position: usize) -> Vec<String> {
    let mut taken: HashSet<String> = left.column_names().into_iter().map(str::to_string).collect();
    let tag = position + 1;
    let mut names = Vec::with_capacity(right.column_count());
    for column in right.columns() {
        let mut candidate = column.name.clone();
        if taken.contains(&candidate) {
            candidate = format!("{}_{tag}", column.name);
            let mut counter = 1usize;
            while taken.contains(&candidate) {
                candidate = format!("{}_{tag}_{counter}", column.name);
                counter += 1;
            }
        }
        taken.insert(candidate.clone());
        names.push(candidate);
    }
    names
}
