//! Nested-to-flat dataset rewriting.
//!
//! - `options`: batch size, pass limit, parallelism, map hints
//! - `expand`: coalescing row generators for array and map columns
//! - `flattener`: the pass loop
//!
//! ## Rules per nested column
//!
//! ```text
//! object  {"a": {"x": 1, "y": 2}}   →  a_x=1, a_y=2        (a dropped after the pass)
//! array   {"t": [10, 20]}           →  t=10 | t=20         (one row per element)
//! map     {"m": {"k": "v"}}         →  m={"key","value"}   (then split to m_key, m_value)
//! null / empty array or map         →  a single row with null
//! ```

pub mod expand;
pub mod flattener;
pub mod options;

pub use expand::{Coalesced, MAP_KEY_FIELD, MAP_VALUE_FIELD};
pub use flattener::Flattener;
pub use options::FlattenOptions;

use crate::error::FlattenResult;
use crate::models::Dataset;

/// Flatten `dataset` with default options.
pub fn flatten(dataset: Dataset) -> FlattenResult<Dataset> {
    Flattener::default().flatten(dataset)
}
