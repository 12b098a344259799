//! Per-attribute registries
//!
//! A registry maps a normalized key to the record(s) holding that value.
//! Keys are computed from values after converters and before units; float
//! keys are rounded to the configured number of decimals.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::record::Record;
use crate::schema::ValueType;
use crate::value::Value;

/// Hashable, normalized registry key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RegistryKey {
    Bool(bool),
    Int(i64),
    /// Bit pattern of the (rounded) float; `-0.0` is stored as `0.0`
    Float(u64),
    Str(String),
}

impl RegistryKey {
    pub fn float(value: f64) -> Self {
        let value = if value == 0.0 { 0.0 } else { value };
        RegistryKey::Float(value.to_bits())
    }

    /// Exact key for a value, without casting or rounding.
    pub fn exact(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(RegistryKey::Bool(*b)),
            Value::Int(i) => Some(RegistryKey::Int(*i)),
            Value::Float(f) => Some(RegistryKey::float(*f)),
            Value::Str(s) => Some(RegistryKey::Str(s.clone())),
            Value::Null | Value::Quantity(_) => None,
        }
    }

    /// Key for `value` under an attribute whose initial type is `initial`.
    ///
    /// Integers and floats cast to the attribute's type when lossless; float
    /// keys are rounded to `decimals`. `None` means no record can hold `value`.
    pub fn normalized(value: &Value, initial: ValueType, decimals: Option<u32>) -> Option<Self> {
        match (initial, value) {
            (ValueType::Integer, Value::Int(i)) => Some(RegistryKey::Int(*i)),
            (ValueType::Integer, Value::Float(f)) => integral(*f).map(RegistryKey::Int),
            (ValueType::Float, Value::Int(i)) => Some(RegistryKey::float(round_to(*i as f64, decimals))),
            (ValueType::Float, Value::Float(f)) => Some(RegistryKey::float(round_to(*f, decimals))),
            (ValueType::String, Value::Str(s)) => Some(RegistryKey::Str(s.clone())),
            (ValueType::Boolean, Value::Bool(b)) => Some(RegistryKey::Bool(*b)),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            RegistryKey::Bool(b) => Value::Bool(*b),
            RegistryKey::Int(i) => Value::Int(*i),
            RegistryKey::Float(bits) => Value::Float(f64::from_bits(*bits)),
            RegistryKey::Str(s) => Value::Str(s.clone()),
        }
    }
}

impl fmt::Display for RegistryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_value())
    }
}

/// Decimal places past which rounding leaves every `f64` unchanged.
const MAX_ROUNDING_DECIMALS: u32 = 350;

/// Round half-to-even on the exact decimal expansion, like formatting does.
pub fn round_to(value: f64, decimals: Option<u32>) -> f64 {
    match decimals {
        Some(d) if value.is_finite() => {
            let d = d.min(MAX_ROUNDING_DECIMALS) as usize;
            format!("{:.*}", d, value).parse().unwrap_or(value)
        }
        _ => value,
    }
}

/// Whole-number floats within `i64` range.
pub(crate) fn integral(value: f64) -> Option<i64> {
    if value.fract() == 0.0 && value >= i64::MIN as f64 && value < i64::MAX as f64 {
        Some(value as i64)
    } else {
        None
    }
}

/// A registry bucket.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    /// Every key of the attribute is unique
    Single(Record),
    /// The attribute has at least one shared key; records in source order
    Group(Vec<Record>),
}

impl Entry {
    pub fn records(&self) -> &[Record] {
        match self {
            Entry::Single(record) => std::slice::from_ref(record),
            Entry::Group(records) => records,
        }
    }

    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }

    pub fn as_single(&self) -> Option<&Record> {
        match self {
            Entry::Single(record) => Some(record),
            Entry::Group(_) => None,
        }
    }
}

/// Index of one attribute.
#[derive(Debug, Clone)]
pub struct Registry {
    attribute: String,
    /// Keys in first-seen order
    keys: Vec<RegistryKey>,
    entries: HashMap<RegistryKey, Entry>,
}

impl Registry {
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    pub fn get(&self, key: &RegistryKey) -> Option<&Entry> {
        self.entries.get(key)
    }

    /// Look up the exact key of `value` (no casting or rounding).
    pub fn get_value(&self, value: impl Into<Value>) -> Option<&Entry> {
        RegistryKey::exact(&value.into()).and_then(|key| self.entries.get(&key))
    }

    pub fn contains(&self, key: &RegistryKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Whether every key maps to exactly one record.
    pub fn is_unique(&self) -> bool {
        self.entries
            .values()
            .all(|entry| matches!(entry, Entry::Single(_)))
    }

    pub fn keys(&self) -> impl Iterator<Item = &RegistryKey> {
        self.keys.iter()
    }

    /// `(key, entry)` pairs in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&RegistryKey, &Entry)> {
        self.keys.iter().filter_map(|k| self.entries.get(k).map(|e| (k, e)))
    }
}

/// Accumulates buckets for one attribute.
#[derive(Debug)]
pub struct RegistryBuilder {
    attribute: String,
    keys: Vec<RegistryKey>,
    buckets: HashMap<RegistryKey, Vec<Record>>,
}

impl RegistryBuilder {
    pub fn new(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            keys: Vec::new(),
            buckets: HashMap::new(),
        }
    }

    pub fn push(&mut self, key: RegistryKey, record: Record) {
        match self.buckets.get_mut(&key) {
            Some(bucket) => bucket.push(record),
            None => {
                self.keys.push(key.clone());
                self.buckets.insert(key, vec![record]);
            }
        }
    }

    /// Collapse buckets: singletons only if the whole attribute is unique.
    pub fn finish(self) -> Registry {
        let unique = self.buckets.values().all(|bucket| bucket.len() == 1);
        let entries = self
            .buckets
            .into_iter()
            .map(|(key, mut bucket)| {
                let entry = match bucket.pop() {
                    Some(record) if unique => Entry::Single(record),
                    Some(record) => {
                        bucket.push(record);
                        Entry::Group(bucket)
                    }
                    None => Entry::Group(bucket),
                };
                (key, entry)
            })
            .collect();
        Registry {
            attribute: self.attribute,
            keys: self.keys,
            entries,
        }
    }
}

/// All registries of a collection, keyed by attribute name (sorted).
#[derive(Debug, Clone, Default)]
pub struct RegistryIndex {
    registries: BTreeMap<String, Registry>,
}

impl RegistryIndex {
    pub(crate) fn new(registries: impl IntoIterator<Item = Registry>) -> Self {
        Self {
            registries: registries
                .into_iter()
                .map(|r| (r.attribute.clone(), r))
                .collect(),
        }
    }

    pub fn get(&self, attribute: &str) -> Option<&Registry> {
        self.registries.get(attribute)
    }

    /// Attribute names, sorted.
    pub fn attributes(&self) -> impl Iterator<Item = &str> {
        self.registries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Registry)> {
        self.registries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.registries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldSpec, FieldType, RecordSchema};
    use proptest::prelude::*;
    use std::sync::Arc;

    fn records(n: i64) -> Vec<Record> {
        let schema = Arc::new(RecordSchema::new(vec![FieldSpec {
            name: "id".into(),
            stored: FieldType::Required(ValueType::Integer),
            initial: FieldType::Required(ValueType::Integer),
        }]));
        (0..n)
            .map(|i| Record::new(Arc::clone(&schema), vec![Value::Int(i)]))
            .collect()
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(119.90220163, Some(4)), 119.9022);
        assert_eq!(round_to(1.39, Some(4)), 1.39);
        assert_eq!(round_to(0.125, Some(2)), 0.12);
        assert_eq!(round_to(1.23456, None), 1.23456);
        assert!(round_to(f64::NAN, Some(2)).is_nan());
    }

    #[test]
    fn test_round_to_huge_precision_is_identity() {
        for x in [119.90220163, 5e-324, 2.2250738585072014e-308, 1.7976931348623157e308] {
            assert_eq!(round_to(x, Some(u32::MAX)), x);
            assert_eq!(round_to(x, Some(MAX_ROUNDING_DECIMALS)), x);
        }
    }

    #[test]
    fn test_normalized_casts() {
        assert_eq!(
            RegistryKey::normalized(&Value::Float(8.0), ValueType::Integer, Some(4)),
            Some(RegistryKey::Int(8))
        );
        assert_eq!(
            RegistryKey::normalized(&Value::Float(8.5), ValueType::Integer, Some(4)),
            None
        );
        assert_eq!(
            RegistryKey::normalized(&Value::Int(2), ValueType::Float, Some(4)),
            Some(RegistryKey::float(2.0))
        );
        assert_eq!(
            RegistryKey::normalized(&Value::from("8"), ValueType::Integer, None),
            None
        );
        assert_eq!(RegistryKey::float(-0.0), RegistryKey::float(0.0));
    }

    #[test]
    fn test_unique_attribute_stores_singletons() {
        let recs = records(3);
        let mut builder = RegistryBuilder::new("id");
        for r in &recs {
            builder.push(RegistryKey::exact(r.value("id")).unwrap(), r.clone());
        }
        let registry = builder.finish();
        assert!(registry.is_unique());
        let entry = registry.get_value(1).unwrap();
        assert!(entry.as_single().unwrap().ptr_eq(&recs[1]));
    }

    #[test]
    fn test_shared_key_makes_every_bucket_a_group() {
        let recs = records(3);
        let mut builder = RegistryBuilder::new("parity");
        for r in &recs {
            let parity = r.value("id").as_i64().unwrap() % 2;
            builder.push(RegistryKey::Int(parity), r.clone());
        }
        let registry = builder.finish();
        assert!(!registry.is_unique());

        let even = registry.get(&RegistryKey::Int(0)).unwrap();
        let ids: Vec<i64> = even.records().iter().map(|r| r.value("id").as_i64().unwrap()).collect();
        assert_eq!(ids, vec![0, 2]);

        // the lone odd record is still wrapped in a group
        assert!(matches!(registry.get(&RegistryKey::Int(1)), Some(Entry::Group(g)) if g.len() == 1));
        assert_eq!(
            registry.keys().cloned().collect::<Vec<_>>(),
            vec![RegistryKey::Int(0), RegistryKey::Int(1)]
        );
    }

    proptest! {
        #[test]
        fn prop_rounding_is_idempotent(x in -1.0e6f64..1.0e6, d in 0u32..10) {
            let once = round_to(x, Some(d));
            prop_assert_eq!(round_to(once, Some(d)), once);
            prop_assert_eq!(
                RegistryKey::normalized(&Value::Float(once), ValueType::Float, Some(d)),
                RegistryKey::normalized(&Value::Float(x), ValueType::Float, Some(d))
            );
        }
    }
}
