//! # Core Type Definitions
//!
//! This module contains the data model shared by every Fraglink subsystem:
//! - Element addressing (`ElementRef`, `ModelIdMap`)
//! - Property data (`PropValue`, `Property`, `PropertySet`, `ElementData`)
//! - Measurement shapes (`MeasurementKind`, `Measurement`, `ElementMeasurements`)
//!
//! ## Addressing Guarantees
//!
//! A local identifier is never globally unique on its own; it is always
//! carried together with the model identifier it belongs to. Bulk operations
//! take and return `ModelIdMap`s, and empty or missing entries are skipped,
//! never treated as errors.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// ELEMENT ADDRESSING
// =============================================================================

/// Ordered mapping from model identifier to local element identifiers.
///
/// The unit of input/output for every bulk operation.
pub type ModelIdMap = BTreeMap<String, Vec<u64>>;

/// A fully qualified element reference: (model id, local id).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ElementRef {
    /// The loaded model this element belongs to.
    pub model: String,
    /// Identifier unique only within that model.
    pub local_id: u64,
}

impl ElementRef {
    /// Create a new element reference.
    #[must_use]
    pub fn new(model: impl Into<String>, local_id: u64) -> Self {
        Self {
            model: model.into(),
            local_id,
        }
    }
}

/// Total number of local ids across all models in a map.
#[must_use]
pub fn total_ids(map: &ModelIdMap) -> usize {
    map.values().map(Vec::len).sum()
}

/// Iterate every (model, local id) pair in a map, in model order.
pub fn iter_refs(map: &ModelIdMap) -> impl Iterator<Item = ElementRef> + '_ {
    map.iter().flat_map(|(model, ids)| {
        ids.iter()
            .map(move |id| ElementRef::new(model.clone(), *id))
    })
}

// =============================================================================
// PROPERTY VALUES
// =============================================================================

/// A nominal property value as it appears on the wire.
///
/// Values may arrive wrapped in a `{ "value": ... }` envelope; `from_json`
/// always unwraps that envelope when present. Arrays and nested objects have
/// no meaning as nominal values and collapse to `Null`.
#[derive(Debug, Clone, PartialEq)]
pub enum PropValue {
    /// Absent or unrepresentable value.
    Null,
    /// Boolean scalar.
    Bool(bool),
    /// Numeric scalar (all JSON numbers are carried as f64).
    Number(f64),
    /// Textual scalar.
    Text(String),
}

impl PropValue {
    /// Convert a raw JSON value, unwrapping a `{ "value": T }` envelope if present.
    #[must_use]
    pub fn from_json(raw: &serde_json::Value) -> Self {
        let inner = match raw {
            serde_json::Value::Object(map) => match map.get("value") {
                Some(v) => v,
                None => return Self::Null,
            },
            other => other,
        };
        match inner {
            serde_json::Value::Bool(b) => Self::Bool(*b),
            serde_json::Value::Number(n) => n.as_f64().map_or(Self::Null, Self::Number),
            serde_json::Value::String(s) => Self::Text(s.clone()),
            _ => Self::Null,
        }
    }

    /// Render back to plain (unwrapped) JSON.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Number(n) => serde_json::Number::from_f64(*n)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Self::Text(s) => serde_json::Value::String(s.clone()),
        }
    }

    /// Whether this value is absent.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Whether this value is a numeric scalar.
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Number(_))
    }

    /// The textual content, if this is a text value.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Stringified form used for pattern matching and report cells.
    ///
    /// `Null` renders as the empty string, never as a literal "null".
    #[must_use]
    pub fn display_text(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(b) => b.to_string(),
            Self::Number(n) => format_number(*n),
            Self::Text(s) => s.clone(),
        }
    }
}

impl Serialize for PropValue {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PropValue {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        Ok(Self::from_json(&raw))
    }
}

/// Format a float the way the wire expects: no grouping, no trailing `.0`.
#[must_use]
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

// =============================================================================
// PROPERTY SETS
// =============================================================================

/// A single named property with its nominal value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    /// Property name (e.g. "GrossVolume").
    pub name: String,
    /// Nominal value; the `{ "value": T }` envelope is unwrapped on read.
    pub value: PropValue,
}

/// A named bundle of properties attached to an element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySet {
    /// Property set name (e.g. "Pset_WallCommon").
    pub name: String,
    /// Properties in declaration order.
    pub properties: Vec<Property>,
}

/// Raw per-element data as returned by an element index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementData {
    pub local_id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub global_id: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub object_type: Option<String>,
    /// Property sets in the order the index reports them.
    #[serde(default)]
    pub property_sets: Vec<PropertySet>,
}

// =============================================================================
// MEASUREMENTS
// =============================================================================

/// Semantic measurement kinds recognized by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasurementKind {
    Volume,
    Area,
    Length,
    /// Shorthand requesting every kind at once.
    All,
}

/// One classified measurement with provenance.
///
/// The unit is inferred from the property name, not stated in the source
/// data; see `measure::infer_unit`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Raw classified value (numeric or textual, as found).
    pub value: PropValue,
    /// Inferred unit (m³, m², m, kg, or "units").
    pub unit: String,
    /// Name of the property set the value came from.
    pub source: String,
    /// Name of the matched property.
    pub property: String,
}

/// Classified measurements for one element.
///
/// One slot per recognized kind plus a custom map for properties recognized
/// by heuristic. Constructed during classification and discarded after
/// aggregation/serialization, never persisted.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ElementMeasurements {
    pub volume: Option<Measurement>,
    pub area: Option<Measurement>,
    pub length: Option<Measurement>,
    /// Custom measurement name → classified shape.
    #[serde(default)]
    pub custom: BTreeMap<String, Measurement>,
}

impl ElementMeasurements {
    /// Whether any slot (standard or custom) is filled.
    #[must_use]
    pub fn has_any(&self) -> bool {
        self.volume.is_some()
            || self.area.is_some()
            || self.length.is_some()
            || !self.custom.is_empty()
    }
}

/// A measured element as carried in the measurements result payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasuredElement {
    pub local_id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub global_id: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub object_type: Option<String>,
    pub measurements: ElementMeasurements,
}

// =============================================================================
// TESTS
// =============================================================================
