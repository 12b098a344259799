//! Labelled, queryable record collections
//!
//! [`build`] turns a record source into a [`Collection`] in one pass:
//! infer the schema, instantiate records, index every attribute, assign
//! labels. Nothing is mutated afterwards.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use crate::config::CatalogConfig;
use crate::error::{CatalogError, Result};
use crate::query::{self, Criterion, Match, Query, Selection};
use crate::record::Record;
use crate::registry::{RegistryBuilder, RegistryIndex, RegistryKey};
use crate::schema::{infer_schema, FieldSpec, InferredSchema, RecordSchema, ValueType};
use crate::source::{JsonFile, JsonText, RawRecord, RecordSource};
use crate::units::{Unit, UnitError};
use crate::value::Value;

/// Build a collection from `source`.
///
/// Construction errors (type conflicts, bad or duplicate labels, malformed
/// sources) abort the build.
pub fn build<S: RecordSource + ?Sized>(source: &S, config: CatalogConfig) -> Result<Collection> {
    let started = Instant::now();
    let raw = source.load()?;
    debug!(source = %source.describe(), records = raw.len(), "loaded record source");

    let InferredSchema {
        schema,
        records: converted,
        ..
    } = infer_schema(&raw, &config)?;
    let schema = Arc::new(schema);

    if !schema.contains(config.key_attr()) {
        return Err(CatalogError::UnknownKeyAttribute {
            attribute: config.key_attr().to_string(),
        });
    }

    let records = converted
        .iter()
        .map(|raw| {
            let values = schema
                .fields()
                .iter()
                .map(|field| {
                    store_value(field, config.unit(&field.name), raw.get(&field.name))
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(Record::new(Arc::clone(&schema), values))
        })
        .collect::<Result<Vec<_>>>()?;

    let registry = index(&schema, &records, &converted, config.decimals());
    let (labels, by_label) = assign_labels(&records, &config)?;

    info!(
        records = records.len(),
        attributes = schema.len(),
        key_attr = config.key_attr(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "built collection"
    );

    Ok(Collection {
        schema,
        records,
        labels,
        by_label,
        registry,
        config,
    })
}

/// Registries keyed by the post-converter, pre-unit value of each attribute.
fn index(
    schema: &RecordSchema,
    records: &[Record],
    converted: &[RawRecord],
    decimals: Option<u32>,
) -> RegistryIndex {
    let registries = schema.fields().iter().map(|field| {
        let mut builder = RegistryBuilder::new(field.name.as_str());
        if let Some(initial) = field.initial.base() {
            for (record, raw) in records.iter().zip(converted) {
                let key = raw
                    .get(&field.name)
                    .and_then(|value| RegistryKey::normalized(value, initial, decimals));
                if let Some(key) = key {
                    builder.push(key, record.clone());
                }
            }
        }
        let registry = builder.finish();
        debug!(
            attribute = %field.name,
            keys = registry.len(),
            unique = registry.is_unique(),
            "built registry"
        );
        registry
    });
    RegistryIndex::new(registries.collect::<Vec<_>>())
}

fn assign_labels(
    records: &[Record],
    config: &CatalogConfig,
) -> Result<(Vec<String>, HashMap<String, usize>)> {
    let key_attr = config.key_attr();
    let mut labels = Vec::with_capacity(records.len());
    let mut by_label = HashMap::with_capacity(records.len());

    for (record_index, record) in records.iter().enumerate() {
        let raw = match record.value(key_attr) {
            Value::Str(s) => s,
            other => {
                return Err(CatalogError::InvalidLabel {
                    label: other.to_string(),
                    record_index,
                    reason: format!("'{}' is not a string", key_attr),
                })
            }
        };
        let label = config.key_transform().apply(raw);
        if !is_identifier(&label) {
            return Err(CatalogError::InvalidLabel {
                label,
                record_index,
                reason: "not a valid identifier".to_string(),
            });
        }
        if let Some(&first) = by_label.get(&label) {
            return Err(CatalogError::DuplicateLabel {
                label,
                first,
                second: record_index,
            });
        }
        by_label.insert(label.clone(), record_index);
        labels.push(label);
    }
    Ok((labels, by_label))
}

/// `[A-Za-z_][A-Za-z0-9_]*`
fn is_identifier(label: &str) -> bool {
    let mut chars = label.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// Converted value → stored value: unit multiplication or int → float widening.
fn store_value(field: &FieldSpec, unit: Option<&Unit>, value: Option<&Value>) -> Result<Value> {
    let value = match value {
        None | Some(Value::Null) => return Ok(Value::Null),
        Some(value) => value,
    };
    match (unit, value) {
        (Some(unit), Value::Quantity(q)) => Ok(Value::Quantity(q.to(unit)?)),
        (Some(unit), Value::Int(_) | Value::Float(_)) => {
            let magnitude = value.as_f64().unwrap_or_default();
            Ok(Value::Quantity(unit.multiply(magnitude)))
        }
        (Some(_), other) => Err(UnitError::NonNumeric {
            attribute: field.name.clone(),
            value: other.to_string(),
        }
        .into()),
        (None, Value::Quantity(q)) => Err(UnitError::UnexpectedQuantity {
            attribute: field.name.clone(),
            value: q.to_string(),
        }
        .into()),
        (None, Value::Int(i)) if field.stored.base() == Some(ValueType::Float) => {
            Ok(Value::Float(*i as f64))
        }
        (None, other) => Ok(other.clone()),
    }
}

/// An immutable catalog of records with label access and equality queries.
///
/// ```
/// use elementable::{build, CatalogConfig, JsonText, Query};
///
/// let veg = build(
///     &JsonText(r#"[{"name": "carrot", "n_leaves": 3}, {"name": "leek", "n_leaves": 7}]"#),
///     CatalogConfig::bare().with_key_attr("name"),
/// )
/// .unwrap();
/// assert_eq!(veg.len(), 2);
/// let found = veg.query(&Query::new().eq("n_leaves", 7)).unwrap();
/// assert!(found.as_single().unwrap().ptr_eq(veg.get("leek").unwrap()));
/// ```
pub struct Collection {
    schema: Arc<RecordSchema>,
    /// Source order
    records: Vec<Record>,
    /// `labels[i]` labels `records[i]`
    labels: Vec<String>,
    by_label: HashMap<String, usize>,
    registry: RegistryIndex,
    config: CatalogConfig,
}

impl Collection {
    pub fn build<S: RecordSource + ?Sized>(source: &S, config: CatalogConfig) -> Result<Self> {
        build(source, config)
    }

    pub fn from_json_file(path: impl Into<std::path::PathBuf>, config: CatalogConfig) -> Result<Self> {
        build(&JsonFile::new(path), config)
    }

    pub fn from_json_str(text: &str, config: CatalogConfig) -> Result<Self> {
        build(&JsonText(text), config)
    }

    pub fn get(&self, label: &str) -> Option<&Record> {
        self.by_label.get(label).map(|&i| &self.records[i])
    }

    /// Like [`get`](Self::get), failing with `NotFound` on the key attribute.
    ///
    /// The error reports the label after the key attribute's converter.
    pub fn by_label(&self, label: &str) -> Result<&Record> {
        self.get(label).ok_or_else(|| {
            let key_attr = self.config.key_attr();
            let value = self.config.convert(key_attr, &Value::from(label));
            CatalogError::not_found(key_attr, value.to_string())
        })
    }

    /// Labels in source order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }

    /// `(label, record)` pairs in source order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Record)> {
        self.labels.iter().map(String::as_str).zip(self.records.iter())
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of records; same as [`len`](Self::len).
    pub fn n_elements(&self) -> usize {
        self.len()
    }

    pub fn schema(&self) -> &RecordSchema {
        &self.schema
    }

    pub fn registry(&self) -> &RegistryIndex {
        &self.registry
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// Look up records by attribute values. See the [`query`](crate::query) module.
    pub fn query(&self, query: &Query) -> Result<Selection> {
        query::execute(&self.schema, &self.records, &self.registry, &self.config, query)
    }

    /// Find the record(s) matching `query`, or construct a fresh one from its values.
    pub fn resolve(&self, query: &Query) -> Result<Match> {
        if query.is_empty() {
            return self.construct(Vec::<(String, Value)>::new()).map(Match::Constructed);
        }
        match self.query(query)? {
            Selection::Single(record) => Ok(Match::Found(record)),
            Selection::Group(mut records) => match records.len() {
                0 => {
                    let fields = query::bind(&self.schema, query)?
                        .into_iter()
                        .map(|(field, criterion)| {
                            let value = match criterion {
                                Criterion::Equals(value) => value.clone(),
                                Criterion::Missing => Value::Null,
                            };
                            (field.name.clone(), value)
                        })
                        .collect::<Vec<_>>();
                    debug!(constraints = query.len(), "no match; constructing record");
                    self.construct(fields).map(Match::Constructed)
                }
                1 => Ok(Match::Found(records.remove(0))),
                _ => Ok(Match::FoundMany(records)),
            },
        }
    }

    /// Build an unregistered record from named values.
    ///
    /// Converters, widening and units apply as at load time. The record is
    /// not added to the collection.
    pub fn construct<I, K, V>(&self, fields: I) -> Result<Record>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut provided = RawRecord::new();
        for (name, value) in fields {
            let name = name.into();
            if !self.schema.contains(&name) {
                return Err(CatalogError::unsupported(name, self.schema.sorted_names()));
            }
            let value = self.config.convert(&name, &value.into());
            provided.insert(name, value);
        }

        let values = self
            .schema
            .fields()
            .iter()
            .map(|field| {
                let value = provided.get(&field.name);
                if value.map_or(true, Value::is_null) && !field.stored.is_nullable() {
                    return Err(CatalogError::MissingField {
                        field: field.name.clone(),
                    });
                }
                let stored = store_value(field, self.config.unit(&field.name), value)?;
                if !field.stored.accepts(&stored) {
                    return Err(CatalogError::FieldTypeMismatch {
                        field: field.name.clone(),
                        expected: field.stored,
                        actual: stored
                            .value_type()
                            .map_or_else(|| "null".to_string(), |t| t.to_string()),
                    });
                }
                Ok(stored)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Record::new(Arc::clone(&self.schema), values))
    }

    /// Build an unregistered record from values in schema order.
    pub fn construct_positional<I, V>(&self, values: I) -> Result<Record>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let arity = self.schema.len();
        let fields = values
            .into_iter()
            .enumerate()
            .map(|(position, value)| {
                let field = self
                    .schema
                    .fields()
                    .get(position)
                    .ok_or(CatalogError::PositionOutOfRange { position, arity })?;
                Ok((field.name.clone(), value.into()))
            })
            .collect::<Result<Vec<_>>>()?;
        self.construct(fields)
    }
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("records", &self.records.len())
            .field("attributes", &self.schema.names().collect::<Vec<_>>())
            .field("key_attr", &self.config.key_attr())
            .finish()
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldType;
    use crate::units::{ANGSTROM, NANOMETER};

    fn source() -> Vec<RawRecord> {
        vec![
            RawRecord::new()
                .with("symbol", "h")
                .with("period", 1)
                .with("radius", 0.31),
            RawRecord::new()
                .with("symbol", "li")
                .with("period", 2)
                .with("radius", 1),
            RawRecord::new()
                .with("symbol", "be")
                .with("period", 2)
                .with("radius", Value::Null),
        ]
    }

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("Fe"));
        assert!(is_identifier("_x1"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("1a"));
        assert!(!is_identifier("*"));
        assert!(!is_identifier("a-b"));
    }

    #[test]
    fn test_build_widens_and_labels() {
        let c = build(&source(), CatalogConfig::default()).unwrap();
        assert_eq!(c.labels().collect::<Vec<_>>(), vec!["H", "Li", "Be"]);
        assert_eq!(
            c.schema().field("radius").unwrap().stored,
            FieldType::Optional(ValueType::Float)
        );
        assert_eq!(c.get("Li").unwrap().value("radius"), &Value::Float(1.0));
        assert!(c.get("Be").unwrap().value("radius").is_null());
    }

    #[test]
    fn test_registry_shape() {
        let c = build(&source(), CatalogConfig::default()).unwrap();
        assert!(c.registry().get("symbol").unwrap().is_unique());
        assert!(!c.registry().get("period").unwrap().is_unique());
        // null values are not indexed
        assert_eq!(c.registry().get("radius").unwrap().len(), 2);
        assert_eq!(
            c.registry().attributes().collect::<Vec<_>>(),
            vec!["period", "radius", "symbol"]
        );
    }

    #[test]
    fn test_units_store_quantities() {
        let config = CatalogConfig::default().with_unit("radius", ANGSTROM);
        let c = build(&source(), config).unwrap();
        let radius = c.get("H").unwrap().value("radius").as_quantity().unwrap();
        assert_eq!(radius.magnitude(), 0.31);
        assert_eq!(radius.unit(), &ANGSTROM);

        let found = c
            .query(&Query::new().eq("radius", NANOMETER.multiply(0.031)))
            .unwrap();
        assert!(found.as_single().unwrap().ptr_eq(c.get("H").unwrap()));
    }

    #[test]
    fn test_source_quantities_rejected() {
        let records = vec![RawRecord::new()
            .with("symbol", "h")
            .with("radius", ANGSTROM.multiply(0.31))];
        let err = build(&records, CatalogConfig::default()).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidSource(_)));
    }

    #[test]
    fn test_construct_applies_converters_and_checks_types() {
        let c = build(&source(), CatalogConfig::default()).unwrap();
        let r = c
            .construct([("symbol", Value::from("NA")), ("period", Value::Int(3))])
            .unwrap();
        assert_eq!(r.value("symbol"), &Value::from("Na"));
        assert!(r.value("radius").is_null());
        assert!(c.records().iter().all(|rec| !rec.ptr_eq(&r)));

        let err = c.construct([("symbol", "Na")]).unwrap_err();
        assert!(matches!(err, CatalogError::MissingField { field } if field == "period"));

        let err = c
            .construct([("symbol", Value::from("Na")), ("period", Value::from("three"))])
            .unwrap_err();
        assert!(matches!(err, CatalogError::FieldTypeMismatch { .. }));
    }

    #[test]
    fn test_construct_positional() {
        let c = build(&source(), CatalogConfig::default()).unwrap();
        let r = c
            .construct_positional([Value::from("k"), Value::Int(4), Value::Float(2.03)])
            .unwrap();
        assert_eq!(r.value("symbol"), &Value::from("K"));

        let err = c
            .construct_positional([Value::Null, Value::Null, Value::Null, Value::Null])
            .unwrap_err();
        assert!(matches!(
            err,
            CatalogError::PositionOutOfRange {
                position: 3,
                arity: 3
            }
        ));
    }

    #[test]
    fn test_by_label_miss() {
        let c = build(&source(), CatalogConfig::default()).unwrap();
        let err = c.by_label("Og").unwrap_err();
        assert_eq!(err.to_string(), "Element symbol=Og is not supported");

        // labels are exact, the message shows the converted value
        let err = c.by_label("OG").unwrap_err();
        assert_eq!(err.to_string(), "Element symbol=Og is not supported");
    }
}
