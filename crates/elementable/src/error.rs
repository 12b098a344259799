//! Error types for catalog construction and lookup.

use std::path::PathBuf;

use thiserror::Error;

use crate::schema::FieldType;
use crate::units::UnitError;

/// Catalog operation result type.
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Catalog errors.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Query or construction named an attribute the schema does not have
    #[error("{attribute} attribute not supported. Available keys: {}", .available.join(", "))]
    UnsupportedAttribute {
        attribute: String,
        /// All valid attribute names, sorted
        available: Vec<String>,
    },

    /// A normalized value has no registry entry
    #[error("Element {attribute}={value} is not supported")]
    NotFound { attribute: String, value: String },

    /// Two records disagree on an attribute's type and no widening applies
    #[error(
        "Conflicting types for attribute '{attribute}': {existing} vs {incoming} (record {record_index})"
    )]
    SchemaConflict {
        attribute: String,
        existing: FieldType,
        incoming: FieldType,
        record_index: usize,
    },

    /// Two records resolve to the same public label
    #[error("Duplicate label '{label}' for records {first} and {second}")]
    DuplicateLabel {
        label: String,
        first: usize,
        second: usize,
    },

    /// A record's label is missing, not a string, or not an identifier
    #[error("Invalid label '{label}' for record {record_index}: {reason}")]
    InvalidLabel {
        label: String,
        record_index: usize,
        reason: String,
    },

    /// The configured key attribute does not occur in the data
    #[error("Key attribute '{attribute}' is not present in the data")]
    UnknownKeyAttribute { attribute: String },

    /// Plain construction without a value for a required field
    #[error("Missing value for required field '{field}'")]
    MissingField { field: String },

    /// Plain construction with a value the stored type does not accept
    #[error("Field '{field}' expects {expected}, got {actual}")]
    FieldTypeMismatch {
        field: String,
        expected: FieldType,
        actual: String,
    },

    /// Positional query or construction with more values than attributes
    #[error("Positional value {position} out of range: schema has {arity} attributes")]
    PositionOutOfRange { position: usize, arity: usize },

    /// Unit conversion failure
    #[error("Unit error: {0}")]
    Unit(#[from] UnitError),

    /// IO error while reading a record source
    #[error("IO error reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Well-formed input that is not a list of flat records
    #[error("Invalid record source: {0}")]
    InvalidSource(String),
}

impl CatalogError {
    /// Create an unsupported-attribute error; `available` is sorted here.
    pub fn unsupported(attribute: impl Into<String>, mut available: Vec<String>) -> Self {
        available.sort();
        Self::UnsupportedAttribute {
            attribute: attribute.into(),
            available,
        }
    }

    /// Create a not-found error.
    pub fn not_found(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self::NotFound {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// Create an invalid-source error.
    pub fn invalid_source(msg: impl Into<String>) -> Self {
        Self::InvalidSource(msg.into())
    }

    /// True for failures of a query against a built collection.
    pub fn is_lookup_failure(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// True for source-data defects that abort a build.
    pub fn is_construction_error(&self) -> bool {
        matches!(
            self,
            Self::SchemaConflict { .. }
                | Self::DuplicateLabel { .. }
                | Self::InvalidLabel { .. }
                | Self::UnknownKeyAttribute { .. }
                | Self::InvalidSource(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_lists_sorted_keys() {
        let err = CatalogError::unsupported(
            "parsnip",
            vec!["name".into(), "color".into(), "n_leaves".into()],
        );
        assert_eq!(
            err.to_string(),
            "parsnip attribute not supported. Available keys: color, n_leaves, name"
        );
    }

    #[test]
    fn test_not_found_message() {
        let err = CatalogError::not_found("atomic_number", "118");
        assert_eq!(err.to_string(), "Element atomic_number=118 is not supported");
        assert!(err.is_lookup_failure());
        assert!(!err.is_construction_error());
    }

    #[test]
    fn test_duplicate_label_is_construction_error() {
        let err = CatalogError::DuplicateLabel {
            label: "X".into(),
            first: 0,
            second: 7,
        };
        assert!(err.is_construction_error());
        assert!(err.to_string().contains("'X'"));
    }
}
