//! Catalog construction configuration.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::defaults::{DEFAULT_DECIMALS, DEFAULT_KEY_ATTR, DUMMY_LABEL, DUMMY_SYMBOL, NAME_ATTR};
use crate::units::Unit;
use crate::value::Value;

type ConvertFn = dyn Fn(&Value) -> Value + Send + Sync;
type TransformFn = dyn Fn(&str) -> String + Send + Sync;

/// A pure transform applied to every value of one attribute, at load time
/// and again to query inputs for that attribute.
#[derive(Clone)]
pub struct Converter {
    name: String,
    func: Arc<ConvertFn>,
}

impl Converter {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    /// Lowercase strings; other values pass through.
    pub fn lowercase() -> Self {
        Self::new("lowercase", |v| match v {
            Value::Str(s) => Value::Str(s.to_lowercase()),
            other => other.clone(),
        })
    }

    /// Uppercase the first character and lowercase the rest (`"NH"` -> `"Nh"`).
    pub fn capitalize() -> Self {
        Self::new("capitalize", |v| match v {
            Value::Str(s) => Value::Str(capitalize(s)),
            other => other.clone(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn apply(&self, value: &Value) -> Value {
        (self.func)(value)
    }
}

impl fmt::Debug for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Converter").field(&self.name).finish()
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Maps a raw key-attribute value to a label.
#[derive(Clone)]
pub struct KeyTransform(Arc<TransformFn>);

impl KeyTransform {
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        Self(Arc::new(func))
    }

    /// Leave values untouched.
    pub fn identity() -> Self {
        Self::new(str::to_string)
    }

    pub fn apply(&self, raw: &str) -> String {
        (self.0)(raw)
    }
}

impl Default for KeyTransform {
    /// `*` becomes `X`; everything else is kept.
    fn default() -> Self {
        Self::new(|raw| {
            if raw == DUMMY_SYMBOL {
                DUMMY_LABEL.to_string()
            } else {
                raw.to_string()
            }
        })
    }
}

impl fmt::Debug for KeyTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("KeyTransform")
    }
}

/// How a [`Collection`](crate::Collection) is built from a record source.
///
/// ```
/// use elementable::{units, CatalogConfig};
///
/// let config = CatalogConfig::default()
///     .with_unit("mass", units::AMU)
///     .with_decimals(Some(10))
///     .with_key_attr("name");
/// assert_eq!(config.decimals(), Some(10));
/// ```
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    units: HashMap<String, Unit>,
    converters: HashMap<String, Converter>,
    decimals: Option<u32>,
    key_attr: String,
    key_transform: KeyTransform,
}

impl Default for CatalogConfig {
    /// `name` lowercased, `symbol` capitalized, 4 decimals, labels from `symbol`.
    fn default() -> Self {
        Self::bare()
            .with_converter(NAME_ATTR, Converter::lowercase())
            .with_converter(DEFAULT_KEY_ATTR, Converter::capitalize())
    }
}

impl CatalogConfig {
    /// Defaults without any converters.
    pub fn bare() -> Self {
        Self {
            units: HashMap::new(),
            converters: HashMap::new(),
            decimals: Some(DEFAULT_DECIMALS),
            key_attr: DEFAULT_KEY_ATTR.to_string(),
            key_transform: KeyTransform::default(),
        }
    }

    pub fn with_unit(mut self, attribute: impl Into<String>, unit: Unit) -> Self {
        self.units.insert(attribute.into(), unit);
        self
    }

    pub fn with_converter(mut self, attribute: impl Into<String>, converter: Converter) -> Self {
        self.converters.insert(attribute.into(), converter);
        self
    }

    pub fn without_converters(mut self) -> Self {
        self.converters.clear();
        self
    }

    /// `None` disables rounding.
    pub fn with_decimals(mut self, decimals: Option<u32>) -> Self {
        self.decimals = decimals;
        self
    }

    pub fn with_key_attr(mut self, attribute: impl Into<String>) -> Self {
        self.key_attr = attribute.into();
        self
    }

    pub fn with_key_transform(mut self, transform: KeyTransform) -> Self {
        self.key_transform = transform;
        self
    }

    pub fn unit(&self, attribute: &str) -> Option<&Unit> {
        self.units.get(attribute)
    }

    pub fn units(&self) -> &HashMap<String, Unit> {
        &self.units
    }

    pub fn converter(&self, attribute: &str) -> Option<&Converter> {
        self.converters.get(attribute)
    }

    pub fn decimals(&self) -> Option<u32> {
        self.decimals
    }

    pub fn key_attr(&self) -> &str {
        &self.key_attr
    }

    pub fn key_transform(&self) -> &KeyTransform {
        &self.key_transform
    }

    /// Apply the attribute's converter, if any.
    pub fn convert(&self, attribute: &str, value: &Value) -> Value {
        match self.converters.get(attribute) {
            Some(converter) => converter.apply(value),
            None => value.clone(),
        }
    }
}
