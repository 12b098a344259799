//! Equality queries against a [`Collection`](crate::Collection)
//!
//! A query with one constraint returns the registry bucket for that value
//! as-is and fails when nothing matches. A query with several constraints
//! intersects buckets, keeping source order, and may come back empty.

use std::collections::HashSet;

use crate::config::CatalogConfig;
use crate::error::{CatalogError, Result};
use crate::record::Record;
use crate::registry::{integral, Entry, RegistryIndex, RegistryKey};
use crate::schema::{FieldSpec, RecordSchema, ValueType};
use crate::units::UnitError;
use crate::value::Value;

/// Relative distance from a whole number tolerated after converting an
/// integer attribute's quantity into its unit.
const INTEGRAL_TOLERANCE: f64 = 1e-9;

/// What a constraint requires of an attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum Criterion {
    /// Equal after normalization. A null is ignored among several constraints.
    Equals(Value),
    /// The attribute is null (or was absent in the source)
    Missing,
}

/// How a constraint names its attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Name(String),
    /// Index into the schema's attribute order
    Position(usize),
}

/// A conjunction of equality constraints.
///
/// ```
/// use elementable::Query;
///
/// let q = Query::new().eq("period", 5).eq("group", 13);
/// assert_eq!(q.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    constraints: Vec<(Target, Criterion)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        self.constraints
            .push((Target::Name(attribute.into()), Criterion::Equals(value.into())));
        self
    }

    /// Require `attribute` to be null.
    pub fn missing(mut self, attribute: impl Into<String>) -> Self {
        self.constraints
            .push((Target::Name(attribute.into()), Criterion::Missing));
        self
    }

    /// Values matched to attributes in schema order.
    pub fn positional<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let constraints = values
            .into_iter()
            .enumerate()
            .map(|(i, v)| (Target::Position(i), Criterion::Equals(v.into())))
            .collect();
        Self { constraints }
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn constraints(&self) -> impl Iterator<Item = (&Target, &Criterion)> {
        self.constraints.iter().map(|(t, c)| (t, c))
    }
}

/// Result of [`Collection::query`](crate::Collection::query).
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// Unique bucket of a single-attribute lookup
    Single(Record),
    /// Shared bucket, or the result of intersecting several constraints
    Group(Vec<Record>),
}

impl Selection {
    pub fn records(&self) -> &[Record] {
        match self {
            Selection::Single(record) => std::slice::from_ref(record),
            Selection::Group(records) => records,
        }
    }

    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records().iter()
    }

    pub fn as_single(&self) -> Option<&Record> {
        match self {
            Selection::Single(record) => Some(record),
            Selection::Group(_) => None,
        }
    }

    pub fn into_vec(self) -> Vec<Record> {
        match self {
            Selection::Single(record) => vec![record],
            Selection::Group(records) => records,
        }
    }
}

impl From<&Entry> for Selection {
    fn from(entry: &Entry) -> Self {
        match entry {
            Entry::Single(record) => Selection::Single(record.clone()),
            Entry::Group(records) => Selection::Group(records.clone()),
        }
    }
}

impl<'a> IntoIterator for &'a Selection {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Result of [`Collection::resolve`](crate::Collection::resolve).
#[derive(Debug, Clone, PartialEq)]
pub enum Match {
    /// Exactly one registered record matched
    Found(Record),
    /// Several registered records matched
    FoundMany(Vec<Record>),
    /// Nothing matched; a fresh, unregistered record was built
    Constructed(Record),
}

impl Match {
    /// The single record, registered or constructed.
    pub fn record(&self) -> Option<&Record> {
        match self {
            Match::Found(record) | Match::Constructed(record) => Some(record),
            Match::FoundMany(_) => None,
        }
    }

    pub fn records(&self) -> &[Record] {
        match self {
            Match::Found(record) | Match::Constructed(record) => std::slice::from_ref(record),
            Match::FoundMany(records) => records,
        }
    }

    pub fn is_constructed(&self) -> bool {
        matches!(self, Match::Constructed(_))
    }
}

/// Map every constraint to its schema field; any unknown name fails the query.
pub(crate) fn bind<'s, 'q>(
    schema: &'s RecordSchema,
    query: &'q Query,
) -> Result<Vec<(&'s FieldSpec, &'q Criterion)>> {
    query
        .constraints
        .iter()
        .map(|(target, criterion)| {
            let field = match target {
                Target::Name(name) => schema
                    .field(name)
                    .ok_or_else(|| CatalogError::unsupported(name.as_str(), schema.sorted_names()))?,
                Target::Position(position) => {
                    schema
                        .fields()
                        .get(*position)
                        .ok_or(CatalogError::PositionOutOfRange {
                            position: *position,
                            arity: schema.len(),
                        })?
                }
            };
            Ok((field, criterion))
        })
        .collect()
}

/// A query input after converters, units, casting and rounding.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Normalized {
    /// The value as compared against the registry; reported on a miss
    pub value: Value,
    /// `None` when no record of the attribute can hold `value`
    pub key: Option<RegistryKey>,
}

impl Normalized {
    fn lookup<'r>(&self, registry: &'r RegistryIndex, attribute: &str) -> Option<&'r Entry> {
        let key = self.key.as_ref()?;
        registry.get(attribute)?.get(key)
    }
}

/// Normalize a query input into a registry key.
pub(crate) fn normalize(
    field: &FieldSpec,
    config: &CatalogConfig,
    value: &Value,
) -> Result<Normalized> {
    let converted = config.convert(&field.name, value);
    let Some(initial) = field.initial.base() else {
        return Ok(Normalized {
            value: converted,
            key: None,
        });
    };

    let plain = match (config.unit(&field.name), converted) {
        (Some(unit), Value::Quantity(q)) => {
            let magnitude = unit.divide(&q)?;
            if initial == ValueType::Integer {
                snap_to_integer(magnitude)
            } else {
                Value::Float(magnitude)
            }
        }
        (None, Value::Quantity(q)) => {
            return Err(UnitError::UnexpectedQuantity {
                attribute: field.name.clone(),
                value: q.to_string(),
            }
            .into())
        }
        (_, other) => other,
    };

    let key = RegistryKey::normalized(&plain, initial, config.decimals());
    Ok(Normalized {
        value: key.as_ref().map_or(plain, RegistryKey::to_value),
        key,
    })
}

/// Unit conversion leaves float noise on whole numbers.
fn snap_to_integer(magnitude: f64) -> Value {
    let nearest = magnitude.round();
    if (magnitude - nearest).abs() <= INTEGRAL_TOLERANCE * nearest.abs().max(1.0) {
        if let Some(i) = integral(nearest) {
            return Value::Int(i);
        }
    }
    Value::Float(magnitude)
}

/// Run `query` over `records` using the collection's registries.
pub(crate) fn execute(
    schema: &RecordSchema,
    records: &[Record],
    registry: &RegistryIndex,
    config: &CatalogConfig,
    query: &Query,
) -> Result<Selection> {
    let bound = bind(schema, query)?;

    match bound.as_slice() {
        [] => Ok(Selection::Group(records.to_vec())),
        [(field, Criterion::Equals(value))] => {
            let normalized = normalize(field, config, value)?;
            match normalized.lookup(registry, &field.name) {
                Some(entry) => Ok(Selection::from(entry)),
                None => Err(CatalogError::not_found(
                    field.name.as_str(),
                    normalized.value.to_string(),
                )),
            }
        }
        constraints => {
            let mut candidates = records.to_vec();
            for (field, criterion) in constraints {
                match criterion {
                    Criterion::Missing => candidates.retain(|r| r.value(&field.name).is_null()),
                    Criterion::Equals(Value::Null) => {}
                    Criterion::Equals(value) => {
                        match normalize(field, config, value)?.lookup(registry, &field.name) {
                            Some(entry) => {
                                let members: HashSet<usize> =
                                    entry.records().iter().map(Record::addr).collect();
                                candidates.retain(|r| members.contains(&r.addr()));
                            }
                            None => candidates.clear(),
                        }
                    }
                }
            }
            Ok(Selection::Group(candidates))
        }
    }
}
