//! Canonical default values for catalog construction.

/// Float registry keys and float query values are rounded to this many decimals.
pub const DEFAULT_DECIMALS: u32 = 4;
/// Attribute that supplies each record's label.
pub const DEFAULT_KEY_ATTR: &str = "symbol";
/// Symbol of the dummy element, not a valid label by itself.
pub const DUMMY_SYMBOL: &str = "*";
/// Label substituted for [`DUMMY_SYMBOL`].
pub const DUMMY_LABEL: &str = "X";
/// Attribute lowercased by the default converters.
pub const NAME_ATTR: &str = "name";
