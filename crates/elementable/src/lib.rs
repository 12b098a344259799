//! Elementable: in-memory, queryable record catalogs
//!
//! A [`Collection`] is built once from a list of flat records (typically a
//! JSON file) and is immutable afterwards. It offers three access paths:
//!
//! - **labels**: every record gets an identifier derived from its key
//!   attribute (`O`, `Fe`, `X`)
//! - **single-attribute lookup**: the registry bucket for one value
//! - **filtering**: the intersection of several equality constraints
//!
//! Attribute types are inferred across all records (integers widen to
//! floats, nulls make a field optional). Float keys are rounded, converters
//! normalize strings, and attributes may carry units.
//!
//! # Example
//!
//! ```
//! use elementable::{elements, Query};
//!
//! let table = elements().unwrap();
//! let oxygen = table.by_label("O").unwrap();
//! let hit = table.query(&Query::new().eq("atomic_number", 8)).unwrap();
//! assert!(hit.as_single().unwrap().ptr_eq(oxygen));
//!
//! let in_49 = table
//!     .query(&Query::new().eq("period", 5).eq("group", 13))
//!     .unwrap();
//! assert_eq!(in_49.records()[0].value("symbol").as_str(), Some("In"));
//! ```

pub mod collection;
pub mod config;
pub mod dataset;
pub mod defaults;
pub mod error;
pub mod query;
pub mod record;
pub mod registry;
pub mod schema;
pub mod source;
pub mod units;
pub mod value;

pub use collection::{build, Collection};
pub use config::{CatalogConfig, Converter, KeyTransform};
pub use dataset::{elements, Element};
pub use error::{CatalogError, Result};
pub use query::{Criterion, Match, Query, Selection};
pub use record::Record;
pub use registry::{Entry, Registry, RegistryIndex, RegistryKey};
pub use schema::{FieldSpec, FieldType, RecordSchema, ValueType};
pub use source::{JsonFile, JsonText, RawRecord, RecordSource};
pub use units::{Dimension, Quantity, Unit, UnitError};
pub use value::Value;
