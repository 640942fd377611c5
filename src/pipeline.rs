//! End-to-end crossing run.
//!
//! Normalize → join (or anti-join) → classify/select → collapse keys →
//! renames → value filters → column order. Every stage takes the previous
//! table and returns a new one; nothing is kept between runs.
//!
//! Value filters address columns by their renamed names and run before the
//! final projection, so a filter may use a column that is not exported.
//! Column references in keys, predicates and the plan are normalized the
//! same way as input labels, except names chosen for output (the key label
//! and rename targets).

use std::collections::{BTreeMap, HashSet};

use itertools::Itertools;
use log::info;
use serde::Serialize;

use crate::{
    classify::{ResultFilter, anti_join, classify, select},
    error::Result,
    filter::{FilterStep, ValuePredicate, apply_filters_traced},
    join::{JoinMode, JoinSpec, join},
    normalize::{normalize_name, normalize_table},
    reshape::{ColumnPlan, collapse_keys},
    snapshot::ConfigSnapshot,
    table::Table,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    pub spec: JoinSpec,
    pub result: ResultFilter,
    /// Name for the collapsed key column; defaults to the first input's key.
    pub key_label: Option<String>,
    pub predicates: Vec<ValuePredicate>,
    pub plan: ColumnPlan,
}

/// Row counts reported alongside the finished table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStatus {
    pub rows: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unmatched: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub filter_steps: Vec<FilterStep>,
}

#[derive(Debug, Clone)]
pub struct CrossOutput {
    pub table: Table,
    pub status: RunStatus,
}

impl Pipeline {
    pub fn new(keys: Vec<String>, mode: JoinMode) -> Self {
        Self {
            spec: JoinSpec::new(keys, mode),
            result: ResultFilter::default(),
            key_label: None,
            predicates: Vec::new(),
            plan: ColumnPlan::default(),
        }
    }

    pub fn with_result(mut self, result: ResultFilter) -> Self {
        self.result = result;
        self
    }

    pub fn with_key_label(mut self, label: impl Into<String>) -> Self {
        self.key_label = Some(label.into());
        self
    }

    pub fn with_predicates(mut self, predicates: Vec<ValuePredicate>) -> Self {
        self.predicates = predicates;
        self
    }

    pub fn with_plan(mut self, plan: ColumnPlan) -> Self {
        self.plan = plan;
        self
    }

    pub fn from_snapshot(snapshot: &ConfigSnapshot) -> Self {
        let restored = snapshot.restore();
        Self {
            spec: JoinSpec::new(restored.keys, restored.mode),
            result: restored.result,
            key_label: restored.key_label,
            predicates: restored.predicates,
            plan: restored.plan,
        }
    }

    pub fn snapshot(&self) -> ConfigSnapshot {
        ConfigSnapshot::save(
            &self.spec.keys,
            self.spec.mode,
            self.result,
            self.key_label.as_deref(),
            &self.predicates,
            &self.plan,
        )
    }

    pub fn run(&self, tables: &[Table]) -> Result<CrossOutput> {
        let normalized = tables
            .iter()
            .map(normalize_table)
            .collect::<Result<Vec<_>>>()?;
        let keys: Vec<String> = self.spec.keys.iter().map(|k| normalize_name(k)).collect();
        let spec = JoinSpec::new(keys, self.spec.mode);

        let mut status = RunStatus::default();
        let shaped = if self.result == ResultFilter::AntiJoin {
            let fresh = anti_join(&normalized, &spec.keys)?;
            status.new = Some(fresh.row_count());
            fresh
        } else {
            spec.validate(&normalized)?;
            let joined = join(&normalized, &spec.keys, spec.mode)?;
            let classified = classify(&joined, normalized.len());
            let (matched, unmatched) = classified.counts();
            status.matched = Some(matched);
            status.unmatched = Some(unmatched);
            let selected = select(&classified, self.result)?;
            let label = self.key_label.as_deref().unwrap_or(&spec.keys[0]);
            collapse_keys(&selected, label)?
        };

        let (plan, predicates) = self.normalized_references();
        let renamed = plan.apply_renames(&shaped)?;
        let (filtered, steps) = apply_filters_traced(&renamed, &predicates)?;
        let table = plan.apply_order(&filtered)?;
        status.rows = table.row_count();
        status.filter_steps = steps;
        info!(
            "Run finished ({}): {} row(s), {} column(s)",
            self.result,
            table.row_count(),
            table.column_count()
        );
        Ok(CrossOutput { table, status })
    }

    /// Plan and predicates with column references normalized like the input
    /// labels. Names the caller chose for output (the key label and rename
    /// targets) are kept as written.
    fn normalized_references(&self) -> (ColumnPlan, Vec<ValuePredicate>) {
        let chosen: HashSet<&str> = self
            .key_label
            .as_deref()
            .into_iter()
            .chain(self.plan.renames.values().map(String::as_str))
            .collect();
        let resolve = |name: &str| {
            if chosen.contains(name) {
                name.to_string()
            } else {
                normalize_name(name)
            }
        };
        let plan = ColumnPlan {
            order: self.plan.order.iter().map(|n| resolve(n.as_str())).unique().collect(),
            renames: self
                .plan
                .renames
                .iter()
                .map(|(from, to)| (resolve(from.as_str()), to.clone()))
                .collect::<BTreeMap<_, _>>(),
        };
        let predicates = self
            .predicates
            .iter()
            .map(|p| ValuePredicate {
                column: resolve(p.column.as_str()),
                allowed: p.allowed.clone(),
            })
            .collect();
        (plan, predicates)
    }
}
