//! Matched / unmatched classification of crossed rows and the anti-join.

use std::{collections::HashSet, fmt};

use clap::ValueEnum;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::{
    data::cell_key,
    error::{CrossError, Result},
    join::key_index,
    table::Table,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
#[value(rename_all = "kebab-case")]
pub enum ResultFilter {
    #[default]
    All,
    Matched,
    Unmatched,
    /// Rows of the second input whose key is absent from the first.
    AntiJoin,
}

impl fmt::Display for ResultFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ResultFilter::All => "all",
            ResultFilter::Matched => "matched",
            ResultFilter::Unmatched => "unmatched",
            ResultFilter::AntiJoin => "anti-join",
        };
        f.write_str(label)
    }
}

/// A crossed table plus one matched flag per row. The flags never become a
/// column of the table itself.
#[derive(Debug, Clone)]
pub struct Classified {
    pub table: Table,
    pub matched: Vec<bool>,
    /// Number of input tables that were crossed into `table`.
    pub inputs: usize,
}

impl Classified {
    pub fn counts(&self) -> (usize, usize) {
        let matched = self.matched.iter().filter(|m| **m).count();
        (matched, self.matched.len() - matched)
    }
}

/// A row is matched when none of its key-role columns is missing, i.e. every
/// input contributed a real row rather than a null fill.
pub fn classify(joined: &Table, inputs: usize) -> Classified {
    let keys: Vec<_> = joined.columns().iter().filter(|c| c.is_key()).collect();
    let matched = (0..joined.row_count())
        .map(|row| keys.iter().all(|column| column.values[row].is_some()))
        .collect::<Vec<_>>();
    let classified = Classified {
        table: joined.clone(),
        matched,
        inputs,
    };
    let (hits, misses) = classified.counts();
    debug!(
        "Classified {} row(s) over {} key column(s): {} matched, {} unmatched",
        joined.row_count(),
        keys.len(),
        hits,
        misses
    );
    classified
}

pub fn select(classified: &Classified, filter: ResultFilter) -> Result<Table> {
    let wanted = match filter {
        ResultFilter::All => return Ok(classified.table.clone()),
        ResultFilter::Matched => true,
        ResultFilter::Unmatched => false,
        ResultFilter::AntiJoin => {
            return Err(CrossError::UnsupportedMode {
                filter,
                tables: classified.inputs,
            });
        }
    };
    let indices: Vec<usize> = classified
        .matched
        .iter()
        .enumerate()
        .filter(|(_, matched)| **matched == wanted)
        .map(|(idx, _)| idx)
        .collect();
    Ok(classified.table.take_rows(&indices))
}

/// Rows of the second table whose key value does not occur anywhere in the
/// first table's key column. Set difference on keys; never fans out.
pub fn anti_join(tables: &[Table], keys: &[String]) -> Result<Table> {
    if tables.len() != 2 {
        return Err(CrossError::UnsupportedMode {
            filter: ResultFilter::AntiJoin,
            tables: tables.len(),
        });
    }
    if keys.len() != tables.len() {
        return Err(CrossError::Arity {
            tables: tables.len(),
            keys: keys.len(),
        });
    }
    let (base, incoming) = (&tables[0], &tables[1]);
    let base_key = key_index(base, &keys[0])?;
    let incoming_key = key_index(incoming, &keys[1])?;

    let known: HashSet<String> = base.columns()[base_key]
        .values
        .iter()
        .filter_map(cell_key)
        .collect();
    let indices: Vec<usize> = incoming.columns()[incoming_key]
        .values
        .iter()
        .enumerate()
        .filter(|(_, cell)| cell_key(cell).is_none_or(|key| !known.contains(&key)))
        .map(|(idx, _)| idx)
        .collect();

    info!(
        "Anti-join: {} of {} row(s) in '{}' have no key in '{}'",
        indices.len(),
        incoming.row_count(),
        incoming.source(),
        base.source()
    );
    Ok(incoming.take_rows(&indices).with_origin(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        data::{Cell, Value},
        join::{JoinMode, join},
    };

    fn int(v: i64) -> Cell {
        Some(Value::Integer(v))
    }

    fn keys() -> Vec<String> {
        vec!["id".to_string(), "id".to_string()]
    }

    fn pair() -> Vec<Table> {
        vec![
            Table::from_rows("a.csv", &["id", "name"], vec![vec![int(1), None], vec![int(3), None]])
                .unwrap(),
            Table::from_rows(
                "b.csv",
                &["id", "val"],
                vec![vec![int(1), int(10)], vec![int(2), int(20)], vec![None, int(30)]],
            )
            .unwrap(),
        ]
    }

    #[test]
    fn full_join_rows_are_split_by_presence_of_both_sides() {
        let joined = join(&pair(), &keys(), JoinMode::Full).unwrap();
        let classified = classify(&joined, 2);
        assert_eq!(classified.matched, vec![true, false, false, false]);
        assert_eq!(classified.counts(), (1, 3));
        let unmatched = select(&classified, ResultFilter::Unmatched).unwrap();
        assert_eq!(unmatched.row_count(), 3);
        assert_eq!(unmatched.column_names(), joined.column_names());
    }

    #[test]
    fn select_rejects_anti_join() {
        let joined = join(&pair(), &keys(), JoinMode::Inner).unwrap();
        let err = select(&classify(&joined, 2), ResultFilter::AntiJoin).unwrap_err();
        assert!(matches!(err, CrossError::UnsupportedMode { tables: 2, .. }));
    }

    #[test]
    fn anti_join_rejection_reports_inputs_even_after_projection() {
        let joined = join(&pair(), &keys(), JoinMode::Full).unwrap();
        let first_only = crate::reshape::project(&joined, &["id", "name"]).unwrap();
        let err = select(&classify(&first_only, 2), ResultFilter::AntiJoin).unwrap_err();
        assert_eq!(
            err,
            CrossError::UnsupportedMode {
                filter: ResultFilter::AntiJoin,
                tables: 2
            }
        );
    }

    #[test]
    fn anti_join_keeps_new_and_keyless_rows_in_order() {
        let result = anti_join(&pair(), &keys()).unwrap();
        assert_eq!(result.column_names(), vec!["id", "val"]);
        assert_eq!(result.rows(), vec![vec![int(2), int(20)], vec![None, int(30)]]);
    }

    #[test]
    fn anti_join_requires_two_tables() {
        let mut tables = pair();
        tables.push(tables[0].clone());
        let err = anti_join(&tables, &keys()).unwrap_err();
        assert_eq!(
            err,
            CrossError::UnsupportedMode {
                filter: ResultFilter::AntiJoin,
                tables: 3
            }
        );
    }
}
