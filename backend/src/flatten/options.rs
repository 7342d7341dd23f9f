//! Flattener tuning.

use serde::{Deserialize, Serialize};

use crate::schema::SchemaHints;

/// Default number of nested columns processed per pass.
pub const DEFAULT_BATCH_SIZE: usize = 2;

/// Default pass limit before flattening is declared non-terminating.
pub const DEFAULT_MAX_PASSES: usize = 10_000;

/// Row count above which row expansion runs on the rayon pool.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 4096;

/// Options for [`super::Flattener`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlattenOptions {
    /// Nested columns expanded per pass; 0 expands every eligible column.
    pub batch_size: usize,

    /// Safety limit on the number of passes.
    pub max_passes: usize,

    /// Expand rows in parallel once a dataset has at least this many rows.
    pub parallel_threshold: usize,

    /// Columns declared to hold maps.
    #[serde(default)]
    pub map_columns: Vec<String>,
}

impl Default for FlattenOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_passes: DEFAULT_MAX_PASSES,
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
            map_columns: Vec::new(),
        }
    }
}

impl FlattenOptions {
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = max_passes;
        self
    }

    pub fn with_map_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.map_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn hints(&self) -> SchemaHints {
        SchemaHints::with_map_columns(self.map_columns.iter().cloned())
    }

    /// Number of columns to take this pass out of `eligible`.
    pub(crate) fn quota(&self, eligible: usize) -> usize {
        if self.batch_size == 0 {
            eligible
        } else {
            self.batch_size.min(eligible)
        }
    }
}
