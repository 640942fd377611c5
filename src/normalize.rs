//! Column label canonicalization.
//!
//! Inputs coming from different exports rarely agree on capitalisation or
//! accents ("Código ", "codigo"). Each loaded table has its labels normalized
//! once, so same-meaning columns across sources compare equal.

use std::collections::{BTreeSet, HashMap};

use log::debug;
use unicode_normalization::UnicodeNormalization;

use crate::{
    error::{CrossError, Result},
    table::{Column, Table},
};

/// Trim, lowercase, NFKD-decompose and drop every non-ASCII code point.
pub fn normalize_name(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .nfkd()
        .filter(char::is_ascii)
        .collect()
}

/// Returns a copy of `table` with every column label normalized. Two labels
/// that collapse to the same normalized form are rejected rather than merged.
pub fn normalize_table(table: &Table) -> Result<Table> {
    let mut seen: HashMap<String, &str> = HashMap::with_capacity(table.column_count());
    let mut columns = Vec::with_capacity(table.column_count());
    for column in table.columns() {
        let normalized = normalize_name(&column.name);
        if let Some(first) = seen.insert(normalized.clone(), column.name.as_str()) {
            return Err(CrossError::NameCollision {
                source_label: table.source().to_string(),
                first: first.to_string(),
                second: column.name.clone(),
                normalized,
            });
        }
        let mut renamed: Column = column.clone();
        renamed.provenance.origin = normalized.clone();
        renamed.name = normalized;
        columns.push(renamed);
    }
    debug!(
        "Normalized {} column label(s) for '{}'",
        columns.len(),
        table.source()
    );
    Table::new(table.source(), columns)
}

/// Labels present in every table, sorted.
pub fn common_columns(tables: &[Table]) -> Vec<String> {
    let Some((first, rest)) = tables.split_first() else {
        return Vec::new();
    };
    let mut common: BTreeSet<String> = first
        .column_names()
        .into_iter()
        .map(str::to_string)
        .collect();
    for table in rest {
        let names: BTreeSet<&str> = table.column_names().into_iter().collect();
        common.retain(|name| names.contains(name.as_str()));
    }
    common.into_iter().collect()
}
