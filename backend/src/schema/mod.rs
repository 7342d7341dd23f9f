//! Column kind inference.
//!
//! Every cell is observed as a [`Shape`] and shapes are joined across the
//! column. The join is order-independent apart from object field order,
//! which follows first appearance so expanded columns read naturally.
//!
//! ```text
//!  null ⊔ x        = x
//!  scalar ⊔ scalar = scalar
//!  object ⊔ object = object(fields_a ∪ fields_b)
//!  array ⊔ array   = array
//!  anything else   = MalformedSchema
//! ```

use std::collections::BTreeSet;

use indexmap::IndexSet;
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::{FlattenError, FlattenResult};
use crate::models::{ColumnKind, Dataset};

/// Declarations that JSON alone cannot express.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SchemaHints {
    /// Columns whose object cells are maps rather than records.
    pub map_columns: BTreeSet<String>,
}

impl SchemaHints {
    pub fn with_map_columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            map_columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_map(&self, column: &str) -> bool {
        self.map_columns.contains(column)
    }
}

/// Observed structure of one or more cells.
#[derive(Debug, Clone, PartialEq)]
enum Shape {
    Empty,
    Scalar,
    Object(IndexSet<String>),
    Array,
}

impl Shape {
    fn of(value: &Value) -> Self {
        match value {
            Value::Null => Shape::Empty,
            Value::Bool(_) | Value::Number(_) | Value::String(_) => Shape::Scalar,
            Value::Array(_) => Shape::Array,
            Value::Object(map) => Shape::Object(map.keys().cloned().collect()),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Shape::Empty => "null",
            Shape::Scalar => "scalar",
            Shape::Object(_) => "object",
            Shape::Array => "array",
        }
    }

    fn join(self, other: Shape, column: &str) -> FlattenResult<Shape> {
        match (self, other) {
            (Shape::Empty, x) | (x, Shape::Empty) => Ok(x),
            (Shape::Scalar, Shape::Scalar) => Ok(Shape::Scalar),
            (Shape::Array, Shape::Array) => Ok(Shape::Array),
            (Shape::Object(mut a), Shape::Object(b)) => {
                a.extend(b);
                Ok(Shape::Object(a))
            }
            (a, b) => Err(FlattenError::malformed(
                column,
                format!("cells mix {} and {} values", a.label(), b.label()),
            )),
        }
    }
}

/// Infer the kind of column `name` from its cells.
///
/// A column with no non-null cell is scalar.
pub fn infer_kind<'a, I>(name: &str, cells: I, hints: &SchemaHints) -> FlattenResult<ColumnKind>
where
    I: IntoIterator<Item = &'a Value>,
{
    let mut shape = Shape::Empty;
    for cell in cells {
        shape = shape.join(Shape::of(cell), name)?;
    }

    Ok(match shape {
        Shape::Empty | Shape::Scalar => ColumnKind::Scalar,
        Shape::Array => ColumnKind::Array,
        Shape::Object(_) if hints.is_map(name) => ColumnKind::Map,
        Shape::Object(fields) => ColumnKind::Object(fields.into_iter().collect()),
    })
}

/// JSON description of a dataset's columns, for display.
pub fn describe(dataset: &Dataset) -> Value {
    json!({
        "rows": dataset.row_count(),
        "columns": dataset.columns(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind(cells: Value) -> FlattenResult<ColumnKind> {
        infer_kind("col", cells.as_array().unwrap(), &SchemaHints::default())
    }

    #[test]
    fn test_scalars_and_nulls() {
        assert_eq!(kind(json!([1, "a", true, null])).unwrap(), ColumnKind::Scalar);
        assert_eq!(kind(json!([null, null])).unwrap(), ColumnKind::Scalar);
        assert_eq!(kind(json!([])).unwrap(), ColumnKind::Scalar);
    }

    #[test]
    fn test_object_fields_are_union_in_first_seen_order() {
        let k = kind(json!([{"y": 1, "x": 2}, null, {"z": 3, "x": 4}])).unwrap();
        assert_eq!(k, ColumnKind::Object(vec!["y".into(), "x".into(), "z".into()]));
    }

    #[test]
    fn test_arrays() {
        assert_eq!(kind(json!([[1, 2], null, []])).unwrap(), ColumnKind::Array);
    }

    #[test]
    fn test_map_hint() {
        let hints = SchemaHints::with_map_columns(["attrs"]);
        let cells = json!([{"a": 1}, {"b": 2}]);
        let k = infer_kind("attrs", cells.as_array().unwrap(), &hints).unwrap();
        assert_eq!(k, ColumnKind::Map);

        let k = infer_kind("other", cells.as_array().unwrap(), &hints).unwrap();
        assert!(matches!(k, ColumnKind::Object(_)));
    }

    #[test]
    fn test_mixed_kinds_are_malformed() {
        let err = kind(json!([{"a": 1}, [1]])).unwrap_err();
        match err {
            FlattenError::MalformedSchema { column, message } => {
                assert_eq!(column, "col");
                assert!(message.contains("object"));
                assert!(message.contains("array"));
            }
            other => panic!("unexpected error: {other}"),
        }

        assert!(kind(json!([1, {"a": 1}])).is_err());
        assert!(kind(json!([[1], "x"])).is_err());
    }
}
