//! Streaming schema inference
//!
//! Records are observed one at a time, in source order. Each observation
//! joins the attribute's accumulated types with the types of the new value.

use std::collections::HashMap;

use tracing::{debug, warn};

use super::resolve::resolve_field_types;
use super::{FieldSpec, FieldType, RecordSchema, ValueType};
use crate::config::CatalogConfig;
use crate::error::{CatalogError, Result};
use crate::source::RawRecord;
use crate::units::{Unit, UnitError};
use crate::value::Value;

/// Result of a full scan.
#[derive(Debug, Clone)]
pub struct InferredSchema {
    pub schema: RecordSchema,
    pub records_scanned: usize,
    /// The scanned records after converters; empty from [`SchemaScanner::finish`]
    pub records: Vec<RawRecord>,
}

impl InferredSchema {
    /// Attribute → type after converters and units.
    pub fn stored_types(&self) -> HashMap<&str, FieldType> {
        self.schema
            .fields()
            .iter()
            .map(|f| (f.name.as_str(), f.stored))
            .collect()
    }

    /// Attribute → type after converters, before units.
    pub fn initial_types(&self) -> HashMap<&str, FieldType> {
        self.schema
            .fields()
            .iter()
            .map(|f| (f.name.as_str(), f.initial))
            .collect()
    }
}

#[derive(Debug)]
struct Slot {
    stored: FieldType,
    initial: FieldType,
    /// Number of records carrying the attribute at all
    present_in: usize,
}

/// Accumulates attribute types over converted records.
#[derive(Debug)]
pub struct SchemaScanner<'a> {
    units: &'a HashMap<String, Unit>,
    order: Vec<String>,
    slots: HashMap<String, Slot>,
    records_scanned: usize,
}

impl<'a> SchemaScanner<'a> {
    pub fn new(units: &'a HashMap<String, Unit>) -> Self {
        Self {
            units,
            order: Vec::new(),
            slots: HashMap::new(),
            records_scanned: 0,
        }
    }

    /// Observe one record whose values already went through the converters.
    pub fn observe(&mut self, record: &RawRecord) -> Result<()> {
        let record_index = self.records_scanned;
        for (name, value) in record.iter() {
            let initial = value.field_type();
            let stored = stored_type(self.units.get(name), name, value)?;

            match self.slots.get_mut(name) {
                Some(slot) => {
                    slot.initial = join(name, slot.initial, initial, record_index)?;
                    slot.stored = join(name, slot.stored, stored, record_index)?;
                    slot.present_in += 1;
                }
                None => {
                    self.order.push(name.to_string());
                    self.slots.insert(
                        name.to_string(),
                        Slot {
                            stored,
                            initial,
                            present_in: 1,
                        },
                    );
                }
            }
        }
        self.records_scanned += 1;
        Ok(())
    }

    pub fn finish(mut self) -> InferredSchema {
        let total = self.records_scanned;
        let fields = self
            .order
            .into_iter()
            .filter_map(|name| {
                let slot = self.slots.remove(&name)?;
                // Absent from some record: same as null there
                let (mut stored, mut initial) = if slot.present_in < total {
                    (slot.stored.nullable(), slot.initial.nullable())
                } else {
                    (slot.stored, slot.initial)
                };
                // Nulls never reach key normalization
                if initial == FieldType::Optional(ValueType::Float) {
                    initial = FieldType::Required(ValueType::Float);
                }
                if stored == FieldType::Null {
                    warn!(attribute = %name, "attribute holds only null values");
                    initial = FieldType::Null;
                    stored = FieldType::Null;
                }
                debug!(attribute = %name, %stored, %initial, "inferred attribute type");
                Some(FieldSpec {
                    name,
                    stored,
                    initial,
                })
            })
            .collect();

        InferredSchema {
            schema: RecordSchema::new(fields),
            records_scanned: total,
            records: Vec::new(),
        }
    }
}

/// Infer the schema of raw records, applying the configured converters first.
///
/// Sources carry plain numbers; a quantity in a record is an `InvalidSource`
/// error since units come from the configuration.
pub fn infer_schema(records: &[RawRecord], config: &CatalogConfig) -> Result<InferredSchema> {
    let mut scanner = SchemaScanner::new(config.units());
    let mut converted = Vec::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        let record = convert_record(index, record, config)?;
        scanner.observe(&record)?;
        converted.push(record);
    }
    let mut inferred = scanner.finish();
    inferred.records = converted;
    Ok(inferred)
}

fn convert_record(index: usize, record: &RawRecord, config: &CatalogConfig) -> Result<RawRecord> {
    record
        .iter()
        .map(|(name, value)| {
            if let Value::Quantity(q) = value {
                return Err(CatalogError::invalid_source(format!(
                    "record {} attribute '{}' holds quantity {}; sources carry plain numbers",
                    index, name, q
                )));
            }
            Ok((name, config.convert(name, value)))
        })
        .collect()
}

fn join(
    attribute: &str,
    existing: FieldType,
    incoming: FieldType,
    record_index: usize,
) -> Result<FieldType> {
    resolve_field_types(existing, incoming).ok_or_else(|| CatalogError::SchemaConflict {
        attribute: attribute.to_string(),
        existing,
        incoming,
        record_index,
    })
}

/// Type of `value` once multiplied by the attribute's unit.
fn stored_type(unit: Option<&Unit>, attribute: &str, value: &Value) -> Result<FieldType> {
    let Some(unit) = unit else {
        return Ok(value.field_type());
    };
    match value {
        Value::Null => Ok(FieldType::Null),
        Value::Int(_) | Value::Float(_) => {
            Ok(FieldType::Required(ValueType::Quantity(unit.dimension())))
        }
        other => Err(UnitError::NonNumeric {
            attribute: attribute.to_string(),
            value: other.to_string(),
        }
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::{Dimension, AMU};

    fn rec(pairs: &[(&str, Value)]) -> RawRecord {
        pairs.iter().cloned().collect()
    }

    #[test]
    fn test_int_float_widening() {
        let records = vec![
            rec(&[("mass", Value::Int(12))]),
            rec(&[("mass", Value::Float(1.008))]),
        ];
        let inferred = infer_schema(&records, &CatalogConfig::bare()).unwrap();
        assert_eq!(
            inferred.stored_types()["mass"],
            FieldType::Required(ValueType::Float)
        );
        assert_eq!(inferred.records_scanned, 2);
    }

    #[test]
    fn test_null_makes_optional_and_initial_float_is_unwrapped() {
        let records = vec![
            rec(&[("group", Value::Int(1)), ("radius", Value::Float(0.31))]),
            rec(&[("group", Value::Null), ("radius", Value::Null)]),
        ];
        let inferred = infer_schema(&records, &CatalogConfig::bare()).unwrap();
        let stored = inferred.stored_types();
        let initial = inferred.initial_types();
        assert_eq!(stored["group"], FieldType::Optional(ValueType::Integer));
        assert_eq!(initial["group"], FieldType::Optional(ValueType::Integer));
        assert_eq!(stored["radius"], FieldType::Optional(ValueType::Float));
        assert_eq!(initial["radius"], FieldType::Required(ValueType::Float));
    }

    #[test]
    fn test_absent_attribute_is_optional() {
        let records = vec![
            rec(&[("name", Value::from("a"))]),
            rec(&[("name", Value::from("b")), ("extra", Value::Int(2))]),
        ];
        let inferred = infer_schema(&records, &CatalogConfig::bare()).unwrap();
        assert_eq!(
            inferred.stored_types()["extra"],
            FieldType::Optional(ValueType::Integer)
        );
        assert_eq!(
            inferred.schema.names().collect::<Vec<_>>(),
            vec!["name", "extra"]
        );
    }

    #[test]
    fn test_conflict_is_an_error() {
        let records = vec![
            rec(&[("period", Value::Int(1))]),
            rec(&[("period", Value::from("two"))]),
        ];
        let err = infer_schema(&records, &CatalogConfig::bare()).unwrap_err();
        match err {
            CatalogError::SchemaConflict {
                attribute,
                record_index,
                ..
            } => {
                assert_eq!(attribute, "period");
                assert_eq!(record_index, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_units_change_stored_type_only() {
        let records = vec![rec(&[("mass", Value::Float(1.008))])];
        let config = CatalogConfig::bare().with_unit("mass", AMU);
        let inferred = infer_schema(&records, &config).unwrap();
        assert_eq!(
            inferred.stored_types()["mass"],
            FieldType::Required(ValueType::Quantity(Dimension::Mass))
        );
        assert_eq!(
            inferred.initial_types()["mass"],
            FieldType::Required(ValueType::Float)
        );
    }

    #[test]
    fn test_unit_on_string_attribute_fails() {
        let records = vec![rec(&[("name", Value::from("tin"))])];
        let config = CatalogConfig::bare().with_unit("name", AMU);
        let err = infer_schema(&records, &config).unwrap_err();
        assert!(matches!(err, CatalogError::Unit(UnitError::NonNumeric { .. })));
    }

    #[test]
    fn test_converters_run_before_inference() {
        let records = vec![rec(&[("code", Value::from("7"))])];
        let config = CatalogConfig::bare().with_converter(
            "code",
            crate::config::Converter::new("parse", |v| match v.as_str() {
                Some(s) => s.parse::<i64>().map(Value::Int).unwrap_or(Value::Null),
                None => v.clone(),
            }),
        );
        let inferred = infer_schema(&records, &config).unwrap();
        assert_eq!(
            inferred.stored_types()["code"],
            FieldType::Required(ValueType::Integer)
        );
        assert_eq!(inferred.records[0].get("code"), Some(&Value::Int(7)));
    }

    #[test]
    fn test_quantity_in_source_rejected() {
        let records = vec![rec(&[("mass", Value::Quantity(AMU.multiply(1.0)))])];
        let config = CatalogConfig::bare().with_unit("mass", AMU);
        let err = infer_schema(&records, &config).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidSource(_)));
    }

    #[test]
    fn test_all_null_attribute() {
        let records = vec![rec(&[("note", Value::Null)]), rec(&[("note", Value::Null)])];
        let inferred = infer_schema(&records, &CatalogConfig::bare()).unwrap();
        assert_eq!(inferred.stored_types()["note"], FieldType::Null);
    }
}
