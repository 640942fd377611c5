//! Reusable crossing configuration.
//!
//! A [`ConfigSnapshot`] records the parameters of a run (keys, join mode,
//! result filter, value predicates and column plan) without any row data.
//! The engine never validates a restored snapshot against tables; problems
//! surface when the restored parameters are fed back into a run.
//!
//! Snapshots are persisted as JSON when the path ends in `.json` and as YAML
//! otherwise.

use std::{
    fs::File,
    io::{BufReader, Read, Write},
    path::Path,
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    classify::ResultFilter, filter::ValuePredicate, join::JoinMode, reshape::ColumnPlan,
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    pub keys: Vec<String>,
    #[serde(default)]
    pub mode: JoinMode,
    #[serde(default)]
    pub result: ResultFilter,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_label: Option<String>,
    #[serde(default)]
    pub predicates: Vec<ValuePredicate>,
    #[serde(default)]
    pub plan: ColumnPlan,
}

/// Parameters recovered from a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoredConfig {
    pub keys: Vec<String>,
    pub mode: JoinMode,
    pub result: ResultFilter,
    pub key_label: Option<String>,
    pub predicates: Vec<ValuePredicate>,
    pub plan: ColumnPlan,
}

impl ConfigSnapshot {
    pub fn save(
        keys: &[String],
        mode: JoinMode,
        result: ResultFilter,
        key_label: Option<&str>,
        predicates: &[ValuePredicate],
        plan: &ColumnPlan,
    ) -> Self {
        Self {
            keys: keys.to_vec(),
            mode,
            result,
            key_label: key_label.map(str::to_string),
            predicates: predicates.to_vec(),
            plan: plan.clone(),
        }
    }

    pub fn restore(&self) -> RestoredConfig {
        RestoredConfig {
            keys: self.keys.clone(),
            mode: self.mode,
            result: self.result,
            key_label: self.key_label.clone(),
            predicates: self.predicates.clone(),
            plan: self.plan.clone(),
        }
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Serializing snapshot to YAML")
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        serde_yaml::from_str(raw).context("Parsing snapshot YAML")
    }

    pub fn write_to_path(&self, path: &Path) -> Result<()> {
        let serialized = if is_json(path) {
            serde_json::to_string_pretty(self).context("Serializing snapshot to JSON")?
        } else {
            self.to_yaml()?
        };
        let mut file =
            File::create(path).with_context(|| format!("Creating snapshot file {path:?}"))?;
        file.write_all(serialized.as_bytes())
            .with_context(|| format!("Writing snapshot file {path:?}"))?;
        file.flush()?;
        Ok(())
    }

    pub fn read_from_path(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening snapshot file {path:?}"))?;
        let mut reader = BufReader::new(file);
        if is_json(path) {
            serde_json::from_reader(reader)
                .with_context(|| format!("Parsing snapshot JSON {path:?}"))
        } else {
            let mut raw = String::new();
            reader
                .read_to_string(&mut raw)
                .with_context(|| format!("Reading snapshot file {path:?}"))?;
            Self::from_yaml(&raw).with_context(|| format!("Loading snapshot {path:?}"))
        }
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}
