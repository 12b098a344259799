//! Pairwise type resolution
//!
//! Joins two observed types into the narrowest type accepting both.

use super::{FieldType, ValueType};

/// Join two non-null types: identical types are kept, integer widens to float.
pub fn resolve_value_types(a: ValueType, b: ValueType) -> Option<ValueType> {
    match (a, b) {
        _ if a == b => Some(a),
        (ValueType::Integer, ValueType::Float) | (ValueType::Float, ValueType::Integer) => {
            Some(ValueType::Float)
        }
        _ => None,
    }
}

/// Join two field types. `None` means the types contradict each other.
pub fn resolve_field_types(existing: FieldType, incoming: FieldType) -> Option<FieldType> {
    if existing == incoming {
        return Some(existing);
    }
    match (existing.base(), incoming.base()) {
        (None, None) => Some(FieldType::Null),
        (Some(t), None) | (None, Some(t)) => Some(FieldType::Optional(t)),
        (Some(a), Some(b)) => {
            let joined = resolve_value_types(a, b)?;
            if existing.is_nullable() || incoming.is_nullable() {
                Some(FieldType::Optional(joined))
            } else {
                Some(FieldType::Required(joined))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::Dimension;
    use proptest::prelude::*;

    const INT: FieldType = FieldType::Required(ValueType::Integer);
    const FLOAT: FieldType = FieldType::Required(ValueType::Float);
    const STR: FieldType = FieldType::Required(ValueType::String);

    #[test]
    fn test_identical() {
        assert_eq!(resolve_field_types(INT, INT), Some(INT));
        assert_eq!(
            resolve_field_types(FieldType::Null, FieldType::Null),
            Some(FieldType::Null)
        );
    }

    #[test]
    fn test_null_makes_optional() {
        assert_eq!(
            resolve_field_types(INT, FieldType::Null),
            Some(FieldType::Optional(ValueType::Integer))
        );
        assert_eq!(
            resolve_field_types(FieldType::Null, STR),
            Some(FieldType::Optional(ValueType::String))
        );
        assert_eq!(
            resolve_field_types(FieldType::Optional(ValueType::Float), FLOAT),
            Some(FieldType::Optional(ValueType::Float))
        );
    }

    #[test]
    fn test_int_float_widening() {
        assert_eq!(resolve_field_types(INT, FLOAT), Some(FLOAT));
        assert_eq!(resolve_field_types(FLOAT, INT), Some(FLOAT));
        assert_eq!(
            resolve_field_types(FieldType::Optional(ValueType::Integer), FLOAT),
            Some(FieldType::Optional(ValueType::Float))
        );
    }

    #[test]
    fn test_conflicts() {
        assert_eq!(resolve_field_types(STR, INT), None);
        assert_eq!(
            resolve_field_types(
                FieldType::Required(ValueType::Boolean),
                FieldType::Optional(ValueType::Integer)
            ),
            None
        );
        assert_eq!(
            resolve_value_types(
                ValueType::Quantity(Dimension::Mass),
                ValueType::Quantity(Dimension::Length)
            ),
            None
        );
    }

    fn field_type_strategy() -> impl Strategy<Value = FieldType> {
        let base = prop_oneof![
            Just(ValueType::Boolean),
            Just(ValueType::Integer),
            Just(ValueType::Float),
            Just(ValueType::String),
        ];
        prop_oneof![
            Just(FieldType::Null),
            base.clone().prop_map(FieldType::Required),
            base.prop_map(FieldType::Optional),
        ]
    }

    proptest! {
        #[test]
        fn prop_resolution_is_commutative(a in field_type_strategy(), b in field_type_strategy()) {
            prop_assert_eq!(resolve_field_types(a, b), resolve_field_types(b, a));
        }

        #[test]
        fn prop_resolution_is_associative(
            a in field_type_strategy(),
            b in field_type_strategy(),
            c in field_type_strategy(),
        ) {
            let left = resolve_field_types(a, b).and_then(|ab| resolve_field_types(ab, c));
            let right = resolve_field_types(b, c).and_then(|bc| resolve_field_types(a, bc));
            prop_assert_eq!(left, right);
        }

        #[test]
        fn prop_joined_type_is_a_supertype(a in field_type_strategy(), b in field_type_strategy()) {
            if let Some(joined) = resolve_field_types(a, b) {
                prop_assert_eq!(resolve_field_types(joined, a), Some(joined));
                prop_assert_eq!(resolve_field_types(joined, b), Some(joined));
            }
        }
    }
}
