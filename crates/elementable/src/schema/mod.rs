//! Per-attribute schema inference
//!
//! Every attribute of every record contributes an observed type. Observed
//! types are joined pairwise into one [`FieldType`] per attribute:
//!
//! | existing | incoming | joined |
//! |----------|----------|--------|
//! | T | T | T |
//! | T | null / absent | optional T |
//! | integer | float | float |
//! | anything else | | conflict |
//!
//! The join is commutative and monotonic, so the result does not depend on
//! record order. A conflict aborts collection construction.
//!
//! Two type maps come out of a scan: `initial` types (after converters, before
//! units) drive query-key normalization; `stored` types (after units) describe
//! the fields of built records.

pub mod inference;
pub mod resolve;

use std::collections::HashMap;
use std::fmt;

pub use inference::{infer_schema, InferredSchema};
pub use resolve::{resolve_field_types, resolve_value_types};

use crate::units::Dimension;
use crate::value::Value;

/// Type of a non-null attribute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Boolean,
    /// 64-bit signed integer
    Integer,
    /// 64-bit floating point
    Float,
    String,
    /// A number carrying a unit of the given dimension
    Quantity(Dimension),
}

impl ValueType {
    pub fn is_numeric(&self) -> bool {
        matches!(self, ValueType::Integer | ValueType::Float)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Boolean => write!(f, "boolean"),
            ValueType::Integer => write!(f, "integer"),
            ValueType::Float => write!(f, "float"),
            ValueType::String => write!(f, "string"),
            ValueType::Quantity(d) => write!(f, "quantity[{}]", d),
        }
    }
}

/// Resolved type of one attribute across all records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// Only nulls observed
    Null,
    Required(ValueType),
    /// Null or missing in at least one record
    Optional(ValueType),
}

impl FieldType {
    /// The non-null part of the type, if any value was observed.
    pub fn base(&self) -> Option<ValueType> {
        match self {
            FieldType::Null => None,
            FieldType::Required(t) | FieldType::Optional(t) => Some(*t),
        }
    }

    pub fn is_nullable(&self) -> bool {
        !matches!(self, FieldType::Required(_))
    }

    /// Same type, admitting nulls.
    pub fn nullable(self) -> FieldType {
        match self {
            FieldType::Required(t) => FieldType::Optional(t),
            other => other,
        }
    }

    /// Whether a value of this field may hold `value` (integers fit floats).
    pub fn accepts(&self, value: &Value) -> bool {
        match (value.value_type(), self.base()) {
            (None, _) => self.is_nullable(),
            (Some(_), None) => false,
            (Some(actual), Some(expected)) => {
                actual == expected
                    || (actual == ValueType::Integer && expected == ValueType::Float)
            }
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Null => write!(f, "null"),
            FieldType::Required(t) => write!(f, "{}", t),
            FieldType::Optional(t) => write!(f, "optional[{}]", t),
        }
    }
}

/// One attribute of the record schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    /// Type after converters and units
    pub stored: FieldType,
    /// Type after converters, before units; used to normalize query keys
    pub initial: FieldType,
}

/// Field layout shared by every record of a collection.
///
/// Fields keep the order in which attributes first appear in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSchema {
    fields: Vec<FieldSpec>,
    positions: HashMap<String, usize>,
}

impl RecordSchema {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        let positions = fields
            .iter()
            .enumerate()
            .map(|(i, f)| (f.name.clone(), i))
            .collect();
        Self { fields, positions }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.position(name).map(|i| &self.fields[i])
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.positions.contains_key(name)
    }

    /// Attribute names in schema order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Attribute names sorted, as listed in unsupported-attribute errors.
    pub fn sorted_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.names().map(str::to_string).collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::Dimension;

    #[test]
    fn test_field_type_display() {
        assert_eq!(FieldType::Required(ValueType::Integer).to_string(), "integer");
        assert_eq!(
            FieldType::Optional(ValueType::Float).to_string(),
            "optional[float]"
        );
        assert_eq!(
            FieldType::Required(ValueType::Quantity(Dimension::Mass)).to_string(),
            "quantity[mass]"
        );
        assert_eq!(FieldType::Null.to_string(), "null");
    }

    #[test]
    fn test_accepts() {
        let float = FieldType::Required(ValueType::Float);
        assert!(float.accepts(&Value::Int(3)));
        assert!(float.accepts(&Value::Float(3.5)));
        assert!(!float.accepts(&Value::Null));
        assert!(!float.accepts(&Value::Str("3".into())));

        let opt_int = FieldType::Optional(ValueType::Integer);
        assert!(opt_int.accepts(&Value::Null));
        assert!(!opt_int.accepts(&Value::Float(1.5)));

        assert!(FieldType::Null.accepts(&Value::Null));
        assert!(!FieldType::Null.accepts(&Value::Int(0)));
    }

    #[test]
    fn test_schema_order_and_sorted_names() {
        let spec = |name: &str| FieldSpec {
            name: name.to_string(),
            stored: FieldType::Required(ValueType::String),
            initial: FieldType::Required(ValueType::String),
        };
        let schema = RecordSchema::new(vec![spec("name"), spec("color"), spec("n_leaves")]);
        assert_eq!(
            schema.names().collect::<Vec<_>>(),
            vec!["name", "color", "n_leaves"]
        );
        assert_eq!(schema.sorted_names(), vec!["color", "n_leaves", "name"]);
        assert_eq!(schema.position("color"), Some(1));
        assert!(schema.field("parsnip").is_none());
    }
}
