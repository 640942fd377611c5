#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use csv_crossmatch::Table;
use csv_crossmatch::data::{Cell, Value};
use tempfile::{TempDir, tempdir};

pub fn int(value: i64) -> Cell {
    Some(Value::Integer(value))
}

pub fn text(value: &str) -> Cell {
    Some(Value::String(value.to_string()))
}

pub fn keys(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

/// Builds a table whose cells are all integers (`None` for missing).
pub fn int_table(source: &str, headers: &[&str], rows: &[Vec<Option<i64>>]) -> Table {
    let rows = rows
        .iter()
        .map(|row| row.iter().map(|v| v.map(Value::Integer)).collect())
        .collect();
    Table::from_rows(source, headers, rows).expect("valid table")
}

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }
}
