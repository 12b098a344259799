//! Linear unit system used to attach dimensions to numeric attributes.
//!
//! A [`Unit`] is a scale factor relative to the SI base unit of its
//! [`Dimension`]. Multiplying a raw number by a unit yields a [`Quantity`];
//! dividing a quantity by a unit yields the plain number expressed in that unit.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unit conversion errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UnitError {
    /// Conversion between units of different dimensions
    #[error("Cannot convert {from} ({from_dimension}) to {to} ({to_dimension})")]
    DimensionMismatch {
        from: String,
        from_dimension: Dimension,
        to: String,
        to_dimension: Dimension,
    },

    /// A quantity was supplied for an attribute without a unit
    #[error("Attribute '{attribute}' has no unit but received {value}")]
    UnexpectedQuantity { attribute: String, value: String },

    /// A unit was configured for an attribute holding non-numeric data
    #[error("Attribute '{attribute}' has a unit but value {value} is not numeric")]
    NonNumeric { attribute: String, value: String },
}

/// Physical dimension of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Dimensionless,
    Mass,
    Length,
    Time,
    Energy,
    Temperature,
}

impl Dimension {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Dimensionless => "dimensionless",
            Dimension::Mass => "mass",
            Dimension::Length => "length",
            Dimension::Time => "time",
            Dimension::Energy => "energy",
            Dimension::Temperature => "temperature",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A unit: symbol, dimension and scale to the SI base unit of the dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    symbol: Cow<'static, str>,
    dimension: Dimension,
    /// Size of one of this unit in SI base units
    scale: f64,
}

/// Unified atomic mass unit (dalton).
pub const AMU: Unit = Unit::constant("amu", Dimension::Mass, 1.660_539_066_60e-27);
pub const KILOGRAM: Unit = Unit::constant("kg", Dimension::Mass, 1.0);
pub const GRAM: Unit = Unit::constant("g", Dimension::Mass, 1e-3);
pub const FEMTOGRAM: Unit = Unit::constant("fg", Dimension::Mass, 1e-18);
pub const METER: Unit = Unit::constant("m", Dimension::Length, 1.0);
pub const NANOMETER: Unit = Unit::constant("nm", Dimension::Length, 1e-9);
pub const ANGSTROM: Unit = Unit::constant("angstrom", Dimension::Length, 1e-10);
pub const PICOMETER: Unit = Unit::constant("pm", Dimension::Length, 1e-12);

impl Unit {
    const fn constant(symbol: &'static str, dimension: Dimension, scale: f64) -> Self {
        Self {
            symbol: Cow::Borrowed(symbol),
            dimension,
            scale,
        }
    }

    /// Create a unit from its SI scale.
    pub fn new(symbol: impl Into<Cow<'static, str>>, dimension: Dimension, scale: f64) -> Self {
        Self {
            symbol: symbol.into(),
            dimension,
            scale,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// `magnitude * unit`
    pub fn multiply(&self, magnitude: f64) -> Quantity {
        Quantity {
            magnitude,
            unit: self.clone(),
        }
    }

    /// `quantity / unit`: the quantity's magnitude expressed in this unit.
    pub fn divide(&self, quantity: &Quantity) -> Result<f64, UnitError> {
        Ok(quantity.to(self)?.magnitude)
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol)
    }
}

/// A number with a unit attached.
#[derive(Debug, Clone, PartialEq)]
pub struct Quantity {
    magnitude: f64,
    unit: Unit,
}

impl Quantity {
    pub fn new(magnitude: f64, unit: Unit) -> Self {
        Self { magnitude, unit }
    }

    pub fn magnitude(&self) -> f64 {
        self.magnitude
    }

    pub fn unit(&self) -> &Unit {
        &self.unit
    }

    /// Convert into `target`. Same-unit conversion returns the magnitude untouched.
    pub fn to(&self, target: &Unit) -> Result<Quantity, UnitError> {
        if self.unit.dimension != target.dimension {
            return Err(UnitError::DimensionMismatch {
                from: self.unit.symbol.to_string(),
                from_dimension: self.unit.dimension,
                to: target.symbol.to_string(),
                to_dimension: target.dimension,
            });
        }
        if self.unit == *target {
            return Ok(self.clone());
        }
        Ok(Quantity {
            magnitude: self.magnitude * (self.unit.scale / target.scale),
            unit: target.clone(),
        })
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.magnitude, self.unit)
    }
}
