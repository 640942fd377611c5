mod common;

use std::collections::HashMap;

use common::{int, int_table, keys, text};
use csv_crossmatch::{
    CrossError, JoinMode, Table,
    data::{Value, cell_key},
    join::join,
};
use proptest::prelude::*;

fn key_column() -> impl Strategy<Value = Vec<Option<i64>>> {
    proptest::collection::vec(proptest::option::weighted(0.85, 0i64..5), 0..8)
}

fn keyed(source: &str, data_column: &str, keys: &[Option<i64>]) -> Table {
    let rows: Vec<Vec<Option<i64>>> = keys
        .iter()
        .enumerate()
        .map(|(idx, key)| vec![*key, Some(idx as i64)])
        .collect();
    int_table(source, &["k", data_column], &rows)
}

/// Rows as sorted display tuples, for multiset comparisons.
fn row_bag(table: &Table) -> Vec<Vec<Option<String>>> {
    let mut rows: Vec<Vec<Option<String>>> = table
        .rows()
        .iter()
        .map(|row| row.iter().map(cell_key).collect())
        .collect();
    rows.sort();
    rows
}

fn contains_bag(outer: &[Vec<Option<String>>], inner: &[Vec<Option<String>>]) -> bool {
    let mut counts: HashMap<&Vec<Option<String>>, isize> = HashMap::new();
    for row in outer {
        *counts.entry(row).or_default() += 1;
    }
    inner.iter().all(|row| {
        let slot = counts.entry(row).or_default();
        *slot -= 1;
        *slot >= 0
    })
}

fn counts(keys: &[Option<i64>]) -> HashMap<i64, usize> {
    let mut map = HashMap::new();
    for key in keys.iter().flatten() {
        *map.entry(*key).or_default() += 1;
    }
    map
}

#[test]
fn worked_example_inner_and_left() {
    let a = Table::from_rows("a.csv", &["id", "name"], vec![vec![int(1), text("x")]]).unwrap();
    let b = Table::from_rows(
        "b.csv",
        &["id", "val"],
        vec![vec![int(1), int(10)], vec![int(2), int(20)]],
    )
    .unwrap();
    let inner = join(&[a.clone(), b.clone()], &keys(&["id", "id"]), JoinMode::Inner).unwrap();
    let left = join(&[a, b], &keys(&["id", "id"]), JoinMode::Left).unwrap();
    assert_eq!(inner.rows(), vec![vec![int(1), text("x"), int(1), int(10)]]);
    assert_eq!(left.rows(), inner.rows());
}

#[test]
fn three_way_join_matches_on_first_key_and_tags_by_position() {
    let a = int_table("a.csv", &["id", "v"], &[vec![Some(1), Some(100)], vec![Some(2), Some(200)]]);
    let b = int_table("b.csv", &["code", "v"], &[vec![Some(1), Some(11)]]);
    let c = int_table("c.csv", &["id", "v"], &[vec![Some(2), Some(22)], vec![Some(1), Some(33)]]);
    let joined = join(&[a, b, c], &keys(&["id", "code", "id"]), JoinMode::Left).unwrap();
    assert_eq!(
        joined.column_names(),
        vec!["id", "v", "code", "v_2", "id_3", "v_3"]
    );
    assert_eq!(
        joined.rows(),
        vec![
            vec![int(1), int(100), int(1), int(11), int(1), int(33)],
            vec![int(2), int(200), None, None, int(2), int(22)],
        ]
    );
}

#[test]
fn later_steps_never_match_through_a_null_filled_first_key() {
    let a = int_table("a.csv", &["id"], &[vec![Some(1)]]);
    let b = int_table("b.csv", &["id"], &[vec![Some(2)]]);
    let c = int_table("c.csv", &["id"], &[vec![Some(2)]]);
    let joined = join(&[a, b, c], &keys(&["id", "id", "id"]), JoinMode::Full).unwrap();
    // (1, -, -), (-, 2, -), (-, -, 2): the running key of the second row is missing.
    assert_eq!(joined.row_count(), 3);
}

#[test]
fn full_join_with_an_empty_side_returns_the_other_side() {
    let a = int_table("a.csv", &["id", "v"], &[]);
    let b = int_table("b.csv", &["id", "w"], &[vec![Some(1), Some(5)], vec![Some(2), Some(6)]]);
    let full = join(&[a.clone(), b.clone()], &keys(&["id", "id"]), JoinMode::Full).unwrap();
    assert_eq!(full.row_count(), 2);
    assert_eq!(full.row(0), vec![None, None, int(1), int(5)]);
    let inner = join(&[a.clone(), b.clone()], &keys(&["id", "id"]), JoinMode::Inner).unwrap();
    assert!(inner.is_empty());
    let left = join(&[a, b], &keys(&["id", "id"]), JoinMode::Left).unwrap();
    assert!(left.is_empty());
}

#[test]
fn integral_float_keys_match_integer_keys() {
    let a = int_table("a.csv", &["id"], &[vec![Some(3)]]);
    let b = Table::from_rows("b.csv", &["id"], vec![vec![Some(Value::Float(3.0))]]).unwrap();
    let joined = join(&[a, b], &keys(&["id", "id"]), JoinMode::Inner).unwrap();
    assert_eq!(joined.row_count(), 1);
}

#[test]
fn key_validation_runs_before_any_step() {
    let a = int_table("a.csv", &["id"], &[vec![Some(1)]]);
    let b = int_table("b.csv", &["id"], &[vec![Some(1)]]);
    let c = int_table("c.csv", &["code"], &[vec![Some(1)]]);
    let err = join(&[a, b, c], &keys(&["id", "id", "id"]), JoinMode::Inner).unwrap_err();
    assert_eq!(
        err,
        CrossError::KeyNotFound {
            source_label: "c.csv".to_string(),
            column: "id".to_string()
        }
    );
}

#[test]
fn join_does_not_touch_inputs() {
    let a = int_table("a.csv", &["id"], &[vec![Some(1)]]);
    let b = int_table("b.csv", &["id"], &[vec![Some(1)]]);
    let before = (a.clone(), b.clone());
    let _ = join(&[a.clone(), b.clone()], &keys(&["id", "id"]), JoinMode::Full).unwrap();
    assert_eq!((a, b), before);
}

proptest! {
    #[test]
    fn inner_join_pairs_equal_keys_with_product_counts(left in key_column(), right in key_column()) {
        let joined = join(
            &[keyed("a", "a", &left), keyed("b", "b", &right)],
            &keys(&["k", "k"]),
            JoinMode::Inner,
        ).unwrap();
        let k = &joined.column("k").unwrap().values;
        let k2 = &joined.column("k_2").unwrap().values;
        for (l, r) in k.iter().zip(k2) {
            prop_assert!(l.is_some());
            prop_assert_eq!(l, r);
        }
        let (lc, rc) = (counts(&left), counts(&right));
        let expected: usize = lc.iter().map(|(key, n)| n * rc.get(key).copied().unwrap_or(0)).sum();
        prop_assert_eq!(joined.row_count(), expected);
    }

    #[test]
    fn left_join_is_at_least_inner(left in key_column(), right in key_column()) {
        let tables = [keyed("a", "a", &left), keyed("b", "b", &right)];
        let inner = join(&tables, &keys(&["k", "k"]), JoinMode::Inner).unwrap();
        let outer = join(&tables, &keys(&["k", "k"]), JoinMode::Left).unwrap();
        prop_assert!(outer.row_count() >= inner.row_count());
        let rc = counts(&right);
        let all_partnered = left.iter().all(|k| k.is_some_and(|k| rc.contains_key(&k)));
        prop_assert_eq!(outer.row_count() == inner.row_count(), all_partnered);
    }

    #[test]
    fn full_join_contains_left_and_right(left in key_column(), right in key_column()) {
        let tables = [keyed("a", "a", &left), keyed("b", "b", &right)];
        let full = row_bag(&join(&tables, &keys(&["k", "k"]), JoinMode::Full).unwrap());
        let l = row_bag(&join(&tables, &keys(&["k", "k"]), JoinMode::Left).unwrap());
        let r = row_bag(&join(&tables, &keys(&["k", "k"]), JoinMode::Right).unwrap());
        prop_assert!(contains_bag(&full, &l));
        prop_assert!(contains_bag(&full, &r));
    }
}
