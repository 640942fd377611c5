//! In-memory column store handed between pipeline stages.
//!
//! A [`Table`] is an ordered list of uniquely named [`Column`]s of equal
//! length. Each column carries a [`Provenance`] recording which input table it
//! came from and whether it was that input's join key; later stages read the
//! provenance instead of inspecting column names.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{
    data::{Cell, Value},
    error::{CrossError, Result},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    Key,
    Data,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    /// Position of the originating table in the crossing inputs.
    pub source: usize,
    pub role: ColumnRole,
    /// Column name in the originating table, before any disambiguation.
    pub origin: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub provenance: Provenance,
    pub values: Vec<Cell>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Cell>) -> Self {
        let name = name.into();
        Self {
            provenance: Provenance {
                source: 0,
                role: ColumnRole::Data,
                origin: name.clone(),
            },
            name,
            values,
        }
    }

    pub fn is_key(&self) -> bool {
        self.provenance.role == ColumnRole::Key
    }

    fn take(&self, indices: &[usize]) -> Column {
        Column {
            name: self.name.clone(),
            provenance: self.provenance.clone(),
            values: indices.iter().map(|idx| self.values[*idx].clone()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    source: String,
    columns: Vec<Column>,
    row_count: usize,
}

impl Table {
    pub fn new(source: impl Into<String>, columns: Vec<Column>) -> Result<Self> {
        let source = source.into();
        let row_count = columns.first().map(|c| c.values.len()).unwrap_or(0);
        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            if column.values.len() != row_count {
                return Err(CrossError::RaggedColumn {
                    source_label: source.clone(),
                    column: column.name.clone(),
                    expected: row_count,
                    found: column.values.len(),
                });
            }
            if !seen.insert(column.name.as_str()) {
                return Err(CrossError::DuplicateName {
                    column: column.name.clone(),
                });
            }
        }
        Ok(Self {
            source,
            columns,
            row_count,
        })
    }

    /// Builds a table from row-major cells. Every row must have one cell per
    /// header.
    pub fn from_rows<S: AsRef<str>>(
        source: impl Into<String>,
        headers: &[S],
        rows: Vec<Vec<Cell>>,
    ) -> Result<Self> {
        let source = source.into();
        let mut columns: Vec<Column> = headers
            .iter()
            .map(|h| Column::new(h.as_ref(), Vec::with_capacity(rows.len())))
            .collect();
        for row in rows {
            if row.len() != columns.len() {
                let column = columns
                    .get(row.len().min(columns.len().saturating_sub(1)))
                    .map(|c| c.name.clone())
                    .unwrap_or_default();
                return Err(CrossError::RaggedColumn {
                    source_label: source,
                    column,
                    expected: columns.len(),
                    found: row.len(),
                });
            }
            for (column, cell) in columns.iter_mut().zip(row) {
                column.values.push(cell);
            }
        }
        Table::new(source, columns)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn into_columns(self) -> Vec<Column> {
        self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    pub fn row(&self, idx: usize) -> Vec<Cell> {
        self.columns.iter().map(|c| c.values[idx].clone()).collect()
    }

    pub fn rows(&self) -> Vec<Vec<Cell>> {
        (0..self.row_count).map(|idx| self.row(idx)).collect()
    }

    /// Rows rendered as text, missing cells as empty strings.
    pub fn display_rows(&self) -> Vec<Vec<String>> {
        (0..self.row_count)
            .map(|idx| {
                self.columns
                    .iter()
                    .map(|c| c.values[idx].as_ref().map(Value::as_display).unwrap_or_default())
                    .collect()
            })
            .collect()
    }

    /// New table holding the rows at `indices`, in that order.
    pub fn take_rows(&self, indices: &[usize]) -> Table {
        Table {
            source: self.source.clone(),
            columns: self.columns.iter().map(|c| c.take(indices)).collect(),
            row_count: indices.len(),
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Table {
        self.source = source.into();
        self
    }

    /// Stamps every column as originating from input `position`.
    pub fn with_origin(mut self, position: usize) -> Table {
        for column in &mut self.columns {
            column.provenance.source = position;
        }
        self
    }

    /// Marks `name` as this table's only join key.
    pub fn with_key(mut self, name: &str) -> Result<Table> {
        let idx = self
            .column_index(name)
            .ok_or_else(|| CrossError::KeyNotFound {
                source_label: self.source.clone(),
                column: name.to_string(),
            })?;
        for (position, column) in self.columns.iter_mut().enumerate() {
            column.provenance.role = if position == idx {
                ColumnRole::Key
            } else {
                ColumnRole::Data
            };
        }
        Ok(self)
    }
}
