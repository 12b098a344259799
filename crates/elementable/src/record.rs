//! Immutable records shaped by a [`RecordSchema`].

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::error::Result;
use crate::schema::RecordSchema;
use crate::value::Value;

#[derive(Debug)]
struct RecordData {
    schema: Arc<RecordSchema>,
    /// One value per schema field, in schema order
    values: Vec<Value>,
}

/// One catalog entry.
///
/// Cloning is cheap and shares the underlying data; a collection's label
/// table and every registry bucket hold clones of the same record, so
/// [`Record::ptr_eq`] observes identity while `==` compares values.
#[derive(Clone)]
pub struct Record(Arc<RecordData>);

impl Record {
    pub(crate) fn new(schema: Arc<RecordSchema>, values: Vec<Value>) -> Self {
        debug_assert_eq!(schema.len(), values.len());
        Self(Arc::new(RecordData { schema, values }))
    }

    /// Value of a field; `None` when the schema has no such field.
    pub fn get(&self, name: &str) -> Option<&Value> {
        let position = self.0.schema.position(name)?;
        self.0.values.get(position)
    }

    /// Value of a field; unknown fields read as null.
    pub fn value(&self, name: &str) -> &Value {
        const NULL: &Value = &Value::Null;
        self.get(name).unwrap_or(NULL)
    }

    pub fn values(&self) -> &[Value] {
        &self.0.values
    }

    pub fn schema(&self) -> &RecordSchema {
        &self.0.schema
    }

    /// `(name, value)` pairs in schema order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.schema.names().zip(self.0.values.iter())
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &Record) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }

    /// JSON object in schema order; quantities contribute their magnitude.
    pub fn to_json(&self) -> serde_json::Map<String, serde_json::Value> {
        self.fields()
            .map(|(name, value)| (name.to_string(), value.to_json()))
            .collect()
    }

    /// Populate any deserializable type from this record.
    ///
    /// ```
    /// #[derive(serde::Deserialize)]
    /// struct Symbolic {
    ///     symbol: String,
    ///     atomic_number: i64,
    /// }
    ///
    /// let elements = elementable::elements().unwrap();
    /// let o: Symbolic = elements.by_label("O").unwrap().decode().unwrap();
    /// assert_eq!((o.symbol.as_str(), o.atomic_number), ("O", 8));
    /// ```
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(serde_json::Value::Object(
            self.to_json(),
        ))?)
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
            || (self.0.values == other.0.values
                && self.0.schema.names().eq(other.0.schema.names()))
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (name, value) in self.fields() {
            map.entry(&name, value);
        }
        map.finish()
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Record(")?;
        for (i, (name, value)) in self.fields().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", name, value)?;
        }
        write!(f, ")")
    }
}
