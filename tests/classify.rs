mod common;

use std::collections::HashSet;

use common::{int, int_table, keys, text};
use csv_crossmatch::{
    CrossError, JoinMode, ResultFilter, Table,
    classify::{anti_join, classify, select},
    join::join,
};
use proptest::prelude::*;

fn key_column() -> impl Strategy<Value = Vec<Option<i64>>> {
    proptest::collection::vec(proptest::option::weighted(0.85, 0i64..5), 0..8)
}

fn keyed(source: &str, keys: &[Option<i64>]) -> Table {
    let rows: Vec<Vec<Option<i64>>> = keys
        .iter()
        .enumerate()
        .map(|(idx, key)| vec![*key, Some(idx as i64)])
        .collect();
    int_table(source, &["k", "row"], &rows)
}

fn join_mode() -> impl Strategy<Value = JoinMode> {
    prop_oneof![
        Just(JoinMode::Inner),
        Just(JoinMode::Left),
        Just(JoinMode::Right),
        Just(JoinMode::Full),
    ]
}

#[test]
fn worked_example_anti_join() {
    let a = Table::from_rows("a.csv", &["id", "name"], vec![vec![int(1), text("x")]]).unwrap();
    let b = Table::from_rows(
        "b.csv",
        &["id", "val"],
        vec![vec![int(1), int(10)], vec![int(2), int(20)]],
    )
    .unwrap();
    let fresh = anti_join(&[a, b], &keys(&["id", "id"])).unwrap();
    assert_eq!(fresh.column_names(), vec!["id", "val"]);
    assert_eq!(fresh.rows(), vec![vec![int(2), int(20)]]);
}

#[test]
fn anti_join_ignores_duplicate_base_keys() {
    let a = int_table("a.csv", &["id"], &[vec![Some(1)], vec![Some(1)], vec![Some(1)]]);
    let b = int_table("b.csv", &["code"], &[vec![Some(1)], vec![Some(2)], vec![Some(2)]]);
    let fresh = anti_join(&[a, b], &keys(&["id", "code"])).unwrap();
    assert_eq!(fresh.rows(), vec![vec![int(2)], vec![int(2)]]);
}

#[test]
fn anti_join_reports_missing_key() {
    let a = int_table("a.csv", &["id"], &[]);
    let b = int_table("b.csv", &["id"], &[]);
    assert_eq!(
        anti_join(&[a, b], &keys(&["id", "code"])).unwrap_err(),
        CrossError::KeyNotFound {
            source_label: "b.csv".to_string(),
            column: "code".to_string()
        }
    );
}

#[test]
fn three_way_classification_requires_every_input() {
    let a = int_table("a.csv", &["id"], &[vec![Some(1)], vec![Some(2)]]);
    let b = int_table("b.csv", &["id"], &[vec![Some(1)], vec![Some(2)]]);
    let c = int_table("c.csv", &["id"], &[vec![Some(2)]]);
    let joined = join(&[a, b, c], &keys(&["id", "id", "id"]), JoinMode::Left).unwrap();
    let classified = classify(&joined, 3);
    assert_eq!(classified.matched, vec![false, true]);
    let matched = select(&classified, ResultFilter::Matched).unwrap();
    assert_eq!(matched.rows(), vec![vec![int(2), int(2), int(2)]]);
}

#[test]
fn classification_marker_is_not_a_column() {
    let a = int_table("a.csv", &["id"], &[vec![Some(1)]]);
    let b = int_table("b.csv", &["id"], &[vec![Some(1)]]);
    let joined = join(&[a, b], &keys(&["id", "id"]), JoinMode::Inner).unwrap();
    for filter in [ResultFilter::All, ResultFilter::Matched, ResultFilter::Unmatched] {
        let selected = select(&classify(&joined, 2), filter).unwrap();
        assert_eq!(selected.column_names(), joined.column_names());
    }
}

proptest! {
    #[test]
    fn matched_and_unmatched_partition_all(
        left in key_column(),
        right in key_column(),
        mode in join_mode(),
    ) {
        let joined = join(&[keyed("a", &left), keyed("b", &right)], &keys(&["k", "k"]), mode).unwrap();
        let classified = classify(&joined, 2);
        let all = select(&classified, ResultFilter::All).unwrap();
        let matched = select(&classified, ResultFilter::Matched).unwrap();
        let unmatched = select(&classified, ResultFilter::Unmatched).unwrap();
        prop_assert_eq!(matched.row_count() + unmatched.row_count(), all.row_count());

        // Row identity: (left row number, right row number) is unique per crossed row.
        let identity = |t: &Table| -> HashSet<(Option<String>, Option<String>)> {
            let row = &t.column("row").unwrap().values;
            let row2 = &t.column("row_2").unwrap().values;
            row.iter()
                .zip(row2)
                .map(|(l, r)| (l.as_ref().map(|v| v.as_display()), r.as_ref().map(|v| v.as_display())))
                .collect()
        };
        let (m, u, a) = (identity(&matched), identity(&unmatched), identity(&all));
        prop_assert!(m.is_disjoint(&u));
        prop_assert_eq!(m.union(&u).cloned().collect::<HashSet<_>>(), a);
    }

    #[test]
    fn anti_join_partitions_second_input(left in key_column(), right in key_column()) {
        let a = keyed("a", &left);
        let b = keyed("b", &right);
        let fresh = anti_join(&[a, b.clone()], &keys(&["k", "k"])).unwrap();
        let base: HashSet<i64> = left.iter().flatten().copied().collect();
        let present = right.iter().filter(|k| k.is_some_and(|k| base.contains(&k))).count();
        prop_assert_eq!(fresh.row_count() + present, b.row_count());
        for cell in &fresh.column("k").unwrap().values {
            let overlaps = matches!(cell, Some(csv_crossmatch::data::Value::Integer(k)) if base.contains(k));
            prop_assert!(!overlaps);
        }
    }
}
