//! The embedded periodic table.
//!
//! 118 records, atomic numbers 0 to 117. Entry 0 is the dummy element `*`
//! (label `X`). Masses are those of the most abundant isotope in atomic mass
//! units; covalent radii are in ångström and missing past curium. The
//! f-block has no group.

use once_cell::sync::OnceCell;
use serde::Deserialize;

use crate::collection::{build, Collection};
use crate::config::CatalogConfig;
use crate::error::Result;
use crate::source::JsonText;

/// Raw JSON of the embedded element table.
pub const ELEMENTS_JSON: &str = include_str!("../data/elements.json");

static ELEMENTS: OnceCell<Collection> = OnceCell::new();

/// The default element collection, built on first use.
///
/// ```
/// let elements = elementable::elements().unwrap();
/// assert_eq!(elements.len(), 118);
/// assert_eq!(elements.by_label("Fe").unwrap().value("name").as_str(), Some("iron"));
/// ```
pub fn elements() -> Result<&'static Collection> {
    ELEMENTS.get_or_try_init(|| load(CatalogConfig::default()))
}

/// Build a fresh collection over the embedded table with a custom configuration.
pub fn load(config: CatalogConfig) -> Result<Collection> {
    build(&JsonText(ELEMENTS_JSON), config)
}

/// Typed view of one element record.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Element {
    pub name: String,
    pub symbol: String,
    pub atomic_number: i64,
    /// amu
    pub mass: f64,
    pub period: i64,
    pub group: Option<i64>,
    /// Å
    pub covalent_radius: Option<f64>,
}

impl Element {
    /// Look up an element of the default collection by label.
    pub fn by_label(label: &str) -> Result<Element> {
        elements()?.by_label(label)?.decode()
    }
}
