//! In-memory tabular dataset.
//!
//! Cells are stored row-major as `serde_json::Value`; every row has exactly
//! one cell per column. A `Dataset` is never mutated by the flattener: each
//! rewrite builds a new value.

use indexmap::IndexSet;
use serde_json::{Map, Value};

use super::{Column, ColumnKind};
use crate::error::FlattenResult;
use crate::schema::{infer_kind, SchemaHints};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    columns: Vec<Column>,
    rows: Vec<Vec<Value>>,
}

impl Dataset {
    /// Assemble a dataset from columns and positional rows.
    ///
    /// Short rows are padded with nulls, long rows truncated.
    pub fn from_parts(columns: Vec<Column>, mut rows: Vec<Vec<Value>>) -> Self {
        let width = columns.len();
        for row in &mut rows {
            row.resize(width, Value::Null);
        }
        Self { columns, rows }
    }

    /// Build a dataset from JSON objects, one per row.
    ///
    /// The column set is the union of keys in first-seen order and each
    /// column's kind is inferred from its cells.
    pub fn from_records(records: Vec<Map<String, Value>>, hints: &SchemaHints) -> FlattenResult<Self> {
        let mut names: IndexSet<String> = IndexSet::new();
        for record in &records {
            for key in record.keys() {
                if !names.contains(key) {
                    names.insert(key.clone());
                }
            }
        }

        let rows: Vec<Vec<Value>> = records
            .into_iter()
            .map(|mut record| {
                names
                    .iter()
                    .map(|name| record.remove(name).unwrap_or(Value::Null))
                    .collect()
            })
            .collect();

        let mut columns = Vec::with_capacity(names.len());
        for (idx, name) in names.into_iter().enumerate() {
            let kind = infer_kind(&name, rows.iter().map(|row| &row[idx]), hints)?;
            columns.push(Column::new(name, kind));
        }

        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Row `idx` keyed by column name.
    pub fn row(&self, idx: usize) -> Option<Map<String, Value>> {
        let row = self.rows.get(idx)?;
        Some(
            self.columns
                .iter()
                .zip(row)
                .map(|(col, value)| (col.name.clone(), value.clone()))
                .collect(),
        )
    }

    /// Cells of column `idx`, top to bottom.
    pub fn values(&self, idx: usize) -> impl Iterator<Item = &Value> + '_ {
        self.rows.iter().map(move |row| &row[idx])
    }

    /// All rows keyed by column name.
    pub fn to_records(&self) -> Vec<Map<String, Value>> {
        (0..self.rows.len()).filter_map(|idx| self.row(idx)).collect()
    }

    /// True when every column is scalar-kinded.
    pub fn is_flat(&self) -> bool {
        self.columns.iter().all(|c| c.kind.is_scalar())
    }

    /// Names of the columns that still hold nested values.
    pub fn nested_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| !c.kind.is_scalar())
            .map(|c| c.name.clone())
            .collect()
    }

    /// Column `name` set to `values`, replacing it in place if it
    /// exists, appending otherwise.
    pub fn with_column(mut self, name: &str, kind: ColumnKind, values: Vec<Value>) -> Self {
        debug_assert_eq!(values.len(), self.rows.len());
        match self.column_index(name) {
            Some(idx) => {
                self.columns[idx].kind = kind;
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[idx] = value;
                }
            }
            None => {
                self.columns.push(Column::new(name, kind));
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
        self
    }

    /// Column `idx` retagged and every row replaced.
    pub fn with_rows(mut self, idx: usize, kind: ColumnKind, rows: Vec<Vec<Value>>) -> Self {
        self.columns[idx].kind = kind;
        Self::from_parts(self.columns, rows)
    }

    /// Copy without the named columns.
    pub fn without_columns(&self, names: &IndexSet<String>) -> Self {
        if names.is_empty() {
            return self.clone();
        }
        let keep: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| !names.contains(&c.name))
            .map(|(idx, _)| idx)
            .collect();

        let columns = keep.iter().map(|&idx| self.columns[idx].clone()).collect();
        let rows = self
            .rows
            .iter()
            .map(|row| keep.iter().map(|&idx| row[idx].clone()).collect())
            .collect();
        Self { columns, rows }
    }
}
