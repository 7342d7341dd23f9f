//! Flattened table persistence.
//!
//! [`TableSink`] takes a flat [`Dataset`] and a logical location (a
//! relative name such as `"1700000000000-orders.csv"`). [`FsTableSink`]
//! resolves it under an outbox root and writes CSV through a staging file,
//! so the final path only ever holds a complete table.

use serde_json::Value;
use std::borrow::Cow;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Component, Path, PathBuf};

use crate::error::{EgressError, EgressResult};
use crate::models::Dataset;

const STAGING_DIR: &str = ".staging";

/// CSV output settings.
#[derive(Debug, Clone)]
pub struct CsvOptions {
    pub delimiter: u8,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

/// Persists a flat dataset at a logical location.
pub trait TableSink {
    /// Returns the physical path written.
    fn persist(&self, dataset: &Dataset, location: &str) -> EgressResult<PathBuf>;
}

/// Write `dataset` as CSV: header row, then one record per row.
///
/// Null is an empty field, strings are written raw, numbers and booleans
/// as their JSON text. Any nested cell is rejected.
pub fn write_csv<W: Write>(dataset: &Dataset, writer: W, options: &CsvOptions) -> EgressResult<()> {
    if let Some(column) = dataset.nested_columns().into_iter().next() {
        return Err(EgressError::NotFlat { column });
    }

    let mut wtr = csv::WriterBuilder::new()
        .delimiter(options.delimiter)
        .from_writer(writer);

    wtr.write_record(dataset.column_names())?;
    for row in dataset.rows() {
        let fields = row
            .iter()
            .zip(dataset.columns())
            .map(|(cell, column)| render_cell(&column.name, cell))
            .collect::<EgressResult<Vec<_>>>()?;
        wtr.write_record(fields.iter().map(|f| f.as_bytes()))?;
    }
    wtr.flush()?;
    Ok(())
}

fn render_cell<'a>(column: &str, cell: &'a Value) -> EgressResult<Cow<'a, str>> {
    match cell {
        Value::Null => Ok(Cow::Borrowed("")),
        Value::String(s) => Ok(Cow::Borrowed(s)),
        Value::Bool(b) => Ok(Cow::Owned(b.to_string())),
        Value::Number(n) => Ok(Cow::Owned(n.to_string())),
        Value::Array(_) | Value::Object(_) => Err(EgressError::NotFlat {
            column: column.to_string(),
        }),
    }
}

/// CSV files under an outbox directory.
#[derive(Debug, Clone)]
pub struct FsTableSink {
    root: PathBuf,
    options: CsvOptions,
}

impl FsTableSink {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self::with_options(root, CsvOptions::default())
    }

    pub fn with_options(root: impl AsRef<Path>, options: CsvOptions) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            options,
        }
    }

    /// Physical path of a logical location.
    pub fn resolve(&self, location: &str) -> EgressResult<PathBuf> {
        let relative = Path::new(location);
        let valid = !location.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
            && relative.file_name().is_some();
        if !valid {
            return Err(EgressError::InvalidLocation(location.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

impl TableSink for FsTableSink {
    fn persist(&self, dataset: &Dataset, location: &str) -> EgressResult<PathBuf> {
        let target = self.resolve(location)?;

        let staging_dir = self.root.join(STAGING_DIR);
        fs::create_dir_all(&staging_dir)?;
        let staged = staging_dir.join(format!("{}.csv", uuid::Uuid::new_v4()));

        let written = File::create(&staged)
            .map_err(EgressError::from)
            .and_then(|file| write_csv(dataset, BufWriter::new(file), &self.options));
        if let Err(e) = written {
            let _ = fs::remove_file(&staged);
            return Err(e);
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::rename(&staged, &target)?;
        tracing::debug!(path = %target.display(), rows = dataset.row_count(), "Table persisted");
        Ok(target)
    }
}
