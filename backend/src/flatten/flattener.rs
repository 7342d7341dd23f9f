//! Pass loop of the flattener.

use indexmap::IndexSet;
use serde_json::Value;
use tracing::debug;

use super::expand::{explode_rows, map_entry_kind, Coalesced};
use super::options::FlattenOptions;
use crate::error::{FlattenError, FlattenResult};
use crate::models::{ColumnKind, Dataset};
use crate::schema::{infer_kind, SchemaHints};

/// Rewrites a dataset until every column is scalar.
#[derive(Debug, Clone, Default)]
pub struct Flattener {
    options: FlattenOptions,
    hints: SchemaHints,
}

impl Flattener {
    pub fn new(options: FlattenOptions) -> Self {
        let hints = options.hints();
        Self { options, hints }
    }

    /// Hints used when kinds are inferred for new columns.
    pub fn hints(&self) -> &SchemaHints {
        &self.hints
    }

    /// Flatten `dataset` completely.
    ///
    /// Fails with [`FlattenError::IterationLimitExceeded`] when nested
    /// columns remain after `max_passes` passes. An already flat dataset is
    /// returned unchanged.
    pub fn flatten(&self, dataset: Dataset) -> FlattenResult<Dataset> {
        let mut current = dataset;
        let mut passes = 0;

        while !current.is_flat() {
            if passes >= self.options.max_passes {
                return Err(FlattenError::IterationLimitExceeded {
                    limit: self.options.max_passes,
                    pending: current.nested_columns(),
                });
            }
            current = self.pass(&current)?;
            passes += 1;
        }

        debug!(
            passes,
            rows = current.row_count(),
            columns = current.column_count(),
            "flatten complete"
        );
        Ok(current)
    }

    /// Run one pass: expand up to `batch_size` nested columns in column
    /// order, then drop the object columns that were split.
    pub fn pass(&self, dataset: &Dataset) -> FlattenResult<Dataset> {
        let nested = dataset.nested_columns();
        let quota = self.options.quota(nested.len());
        let selected = &nested[..quota];
        debug!(?selected, deferred = nested.len() - quota, "flatten pass");

        let mut working = dataset.clone();
        let mut pending_removal: IndexSet<String> = IndexSet::new();

        for name in selected {
            // A split earlier in this pass may have overwritten the column.
            let Some(idx) = working.column_index(name) else {
                continue;
            };
            match working.columns()[idx].kind.clone() {
                ColumnKind::Scalar => {}
                ColumnKind::Object(fields) => {
                    working = self.split_object(working, idx, &fields)?;
                    pending_removal.insert(name.clone());
                }
                ColumnKind::Array => {
                    working = self.explode_array(working, idx)?;
                }
                ColumnKind::Map => {
                    working = self.explode_map(working, idx)?;
                }
            }
        }

        Ok(working.without_columns(&pending_removal))
    }

    /// Add `<column>_<field>` for every field of object column `idx`.
    fn split_object(&self, dataset: Dataset, idx: usize, fields: &[String]) -> FlattenResult<Dataset> {
        let name = dataset.columns()[idx].name.clone();

        let mut split = Vec::with_capacity(fields.len());
        for field in fields {
            let values = dataset
                .values(idx)
                .map(|cell| match cell {
                    Value::Object(map) => Ok(map.get(field).cloned().unwrap_or(Value::Null)),
                    Value::Null => Ok(Value::Null),
                    _ => Err(FlattenError::malformed(&name, "expected object cell, found scalar or array")),
                })
                .collect::<FlattenResult<Vec<Value>>>()?;

            let new_name = format!("{}_{}", name, field);
            let kind = infer_kind(&new_name, &values, &self.hints)?;
            split.push((new_name, kind, values));
        }

        let mut out = dataset;
        for (new_name, kind, values) in split {
            out = out.with_column(&new_name, kind, values);
        }
        Ok(out)
    }

    /// Replace array column `idx` by its elements, one row each.
    fn explode_array(&self, dataset: Dataset, idx: usize) -> FlattenResult<Dataset> {
        let name = dataset.columns()[idx].name.clone();
        let rows = explode_rows(dataset.rows(), idx, self.parallel(&dataset), |cell| {
            Coalesced::array(&name, cell)
        })?;
        let kind = infer_kind(&name, rows.iter().map(|row| &row[idx]), &self.hints)?;
        Ok(dataset.with_rows(idx, kind, rows))
    }

    /// Replace map column `idx` by its `{key, value}` entries, one row each.
    fn explode_map(&self, dataset: Dataset, idx: usize) -> FlattenResult<Dataset> {
        let name = dataset.columns()[idx].name.clone();
        let rows = explode_rows(dataset.rows(), idx, self.parallel(&dataset), |cell| {
            Coalesced::map(&name, cell)
        })?;
        Ok(dataset.with_rows(idx, map_entry_kind(), rows))
    }

    fn parallel(&self, dataset: &Dataset) -> bool {
        dataset.row_count() >= self.options.parallel_threshold
    }
}
