//! One-to-many row expansion for array and map columns.
//!
//! Each source row gets a [`Coalesced`] generator over its cell: one item
//! per array element or map entry, or a single null when the cell is null
//! or empty. Output rows from one source row stay contiguous and in element
//! order, on both the sequential and the rayon path.

use rayon::prelude::*;
use serde_json::{json, map, Value};

use crate::error::{FlattenError, FlattenResult};
use crate::models::ColumnKind;

/// Field names of an exploded map entry.
pub const MAP_KEY_FIELD: &str = "key";
pub const MAP_VALUE_FIELD: &str = "value";

/// Kind of an exploded map column.
pub fn map_entry_kind() -> ColumnKind {
    ColumnKind::Object(vec![MAP_KEY_FIELD.to_string(), MAP_VALUE_FIELD.to_string()])
}

/// Lazy sequence of the values one cell explodes into.
pub enum Coalesced<'a> {
    Elements(std::slice::Iter<'a, Value>),
    Entries(map::Iter<'a>),
    Placeholder(bool),
}

impl<'a> Coalesced<'a> {
    /// Generator over an array cell.
    pub fn array(column: &str, cell: &'a Value) -> FlattenResult<Self> {
        match cell {
            Value::Array(items) if !items.is_empty() => Ok(Coalesced::Elements(items.iter())),
            Value::Array(_) | Value::Null => Ok(Coalesced::Placeholder(false)),
            other => Err(unexpected(column, "array", other)),
        }
    }

    /// Generator over a map cell.
    pub fn map(column: &str, cell: &'a Value) -> FlattenResult<Self> {
        match cell {
            Value::Object(entries) if !entries.is_empty() => Ok(Coalesced::Entries(entries.iter())),
            Value::Object(_) | Value::Null => Ok(Coalesced::Placeholder(false)),
            other => Err(unexpected(column, "map", other)),
        }
    }
}

impl Iterator for Coalesced<'_> {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        match self {
            Coalesced::Elements(items) => items.next().cloned(),
            Coalesced::Entries(entries) => entries
                .next()
                .map(|(k, v)| json!({ MAP_KEY_FIELD: k, MAP_VALUE_FIELD: v })),
            Coalesced::Placeholder(done) => {
                if *done {
                    None
                } else {
                    *done = true;
                    Some(Value::Null)
                }
            }
        }
    }
}

fn unexpected(column: &str, expected: &str, found: &Value) -> FlattenError {
    let found = match found {
        Value::Object(_) => "object",
        Value::Array(_) => "array",
        _ => "scalar",
    };
    FlattenError::malformed(column, format!("expected {expected} cell, found {found}"))
}

/// Explode column `idx` of `rows`, one output row per coalesced item.
pub fn explode_rows<'a, F>(
    rows: &'a [Vec<Value>],
    idx: usize,
    parallel: bool,
    generator: F,
) -> FlattenResult<Vec<Vec<Value>>>
where
    F: Fn(&'a Value) -> FlattenResult<Coalesced<'a>> + Sync,
{
    let expand = |row: &'a Vec<Value>| -> FlattenResult<Vec<Vec<Value>>> {
        let items = generator(&row[idx])?;
        Ok(items
            .map(|item| {
                let mut out = row.clone();
                out[idx] = item;
                out
            })
            .collect())
    };

    let groups: Vec<Vec<Vec<Value>>> = if parallel {
        rows.par_iter().map(expand).collect::<FlattenResult<_>>()?
    } else {
        rows.iter().map(expand).collect::<FlattenResult<_>>()?
    };

    Ok(groups.into_iter().flatten().collect())
}
