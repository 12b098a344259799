//! Record sources: ordered sequences of flat attribute → value mappings.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{CatalogError, Result};
use crate::value::Value;

/// One source entry before conversion. Attribute order is preserved.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawRecord {
    fields: Vec<(String, Value)>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Insert or overwrite an attribute, keeping its first position.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Convert one JSON object.
    pub fn from_json_object(object: &serde_json::Map<String, serde_json::Value>) -> Result<Self> {
        let fields = object
            .iter()
            .map(|(k, v)| Ok((k.clone(), Value::from_json(v)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { fields })
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for RawRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = RawRecord::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

/// Anything that yields the full, ordered list of records before construction.
pub trait RecordSource {
    fn load(&self) -> Result<Vec<RawRecord>>;

    /// Short description for log lines.
    fn describe(&self) -> String {
        "in-memory records".to_string()
    }
}

impl RecordSource for [RawRecord] {
    fn load(&self) -> Result<Vec<RawRecord>> {
        Ok(self.to_vec())
    }
}

impl RecordSource for Vec<RawRecord> {
    fn load(&self) -> Result<Vec<RawRecord>> {
        Ok(self.clone())
    }
}

impl RecordSource for serde_json::Value {
    fn load(&self) -> Result<Vec<RawRecord>> {
        records_from_json(self)
    }

    fn describe(&self) -> String {
        "JSON value".to_string()
    }
}

/// A JSON file holding a list of flat objects.
#[derive(Debug, Clone)]
pub struct JsonFile {
    path: PathBuf,
}

impl JsonFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSource for JsonFile {
    fn load(&self) -> Result<Vec<RawRecord>> {
        let text = fs::read_to_string(&self.path).map_err(|source| CatalogError::Io {
            path: self.path.clone(),
            source,
        })?;
        parse_records(&text)
    }

    fn describe(&self) -> String {
        format!("JSON file {}", self.path.display())
    }
}

/// JSON text holding a list of flat objects.
#[derive(Debug, Clone, Copy)]
pub struct JsonText<'a>(pub &'a str);

impl RecordSource for JsonText<'_> {
    fn load(&self) -> Result<Vec<RawRecord>> {
        parse_records(self.0)
    }

    fn describe(&self) -> String {
        format!("JSON text ({} bytes)", self.0.len())
    }
}

/// Parse JSON text into raw records.
pub fn parse_records(text: &str) -> Result<Vec<RawRecord>> {
    let json: serde_json::Value = serde_json::from_str(text)?;
    records_from_json(&json)
}

/// The top-level value must be an array of objects with scalar values.
pub fn records_from_json(json: &serde_json::Value) -> Result<Vec<RawRecord>> {
    let items = json
        .as_array()
        .ok_or_else(|| CatalogError::invalid_source("top-level JSON value must be an array"))?;

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let object = item.as_object().ok_or_else(|| {
                CatalogError::invalid_source(format!("entry {} is not a JSON object", index))
            })?;
            RawRecord::from_json_object(object)
        })
        .collect()
}
