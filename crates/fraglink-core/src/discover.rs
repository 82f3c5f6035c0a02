//! # Discovery Mode
//!
//! Samples a few elements per category and reports which property-set
//! properties look like measurements, so a caller can see what a model
//! actually exposes before asking for a full extraction.
//!
//! Discovery uses wider catalogs than extraction: names that are too
//! ambiguous to classify silently (surface areas, thickness) are still
//! worth surfacing to a human.

use crate::index::ElementIndex;
use crate::measure::{self, MEASUREMENT_KEYWORDS};
use crate::pattern::Matcher;
use crate::types::PropValue;
use serde::{Deserialize, Serialize};

/// Default number of elements sampled per category.
pub const DEFAULT_SAMPLE_SIZE: usize = 3;

// =============================================================================
// EXTENDED CATALOGS
// =============================================================================

const DISCOVERY_AREA_EXTRAS: &[&str] = &["OuterSurfaceArea", "CrossSectionArea"];
const DISCOVERY_LENGTH_EXTRAS: &[&str] = &["Thickness"];

fn discovery_kind(property_name: &str) -> Option<&'static str> {
    if measure::VOLUME_PROPERTIES.contains(&property_name) {
        Some("volume")
    } else if measure::AREA_PROPERTIES.contains(&property_name)
        || DISCOVERY_AREA_EXTRAS.contains(&property_name)
    {
        Some("area")
    } else if measure::LENGTH_PROPERTIES.contains(&property_name)
        || DISCOVERY_LENGTH_EXTRAS.contains(&property_name)
    {
        Some("length")
    } else {
        None
    }
}

// =============================================================================
// RESULT PAYLOAD
// =============================================================================

/// One measurement-like property found during sampling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDiscovery {
    pub property: String,
    /// volume | area | length | custom
    pub measurement_type: String,
    /// First value seen across the sample, rendered as text.
    pub sample_value: String,
    /// How many sampled elements carried this property.
    pub frequency: usize,
    /// "high" for catalog names, "medium" for keyword matches.
    pub confidence: String,
}

/// Measurement-like properties of one property set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertySetDiscovery {
    pub name: String,
    pub measurement_properties: Vec<PropertyDiscovery>,
}

/// Discovery findings for one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDiscovery {
    pub category: String,
    pub elements_analyzed: usize,
    pub property_sets: Vec<PropertySetDiscovery>,
}

/// Payload of a `discoveryResult` envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryPayload {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub model_id: String,
    pub categories: Vec<CategoryDiscovery>,
}

impl DiscoveryPayload {
    /// Failure payload, used when the model is not loaded.
    #[must_use]
    pub fn failure(model_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            model_id: model_id.into(),
            categories: Vec::new(),
        }
    }
}

// =============================================================================
// SAMPLING
// =============================================================================

/// Sample elements per category and report measurement-like properties.
///
/// A missing model is reported inside the payload (`success: false`), not as
/// an error, so the caller always has something to relay.
#[must_use]
pub fn discover_measurement_properties(
    index: &dyn ElementIndex,
    model_id: &str,
    categories: Option<&[String]>,
    sample_size: usize,
) -> DiscoveryPayload {
    if !index.model_ids().iter().any(|m| m == model_id) {
        return DiscoveryPayload::failure(
            model_id,
            format!("Model '{model_id}' is not loaded"),
        );
    }

    let sample_size = sample_size.max(1);
    let categories: Vec<String> = match categories {
        Some(cats) if !cats.is_empty() => cats.to_vec(),
        _ => index.categories_of(model_id),
    };

    let mut findings = Vec::new();
    for category in &categories {
        let matcher = Matcher::Literal(category.clone());
        let mut ids = index.items_of_categories(model_id, std::slice::from_ref(&matcher));
        ids.truncate(sample_size);
        if ids.is_empty() {
            continue;
        }

        let rows = match index.items_data(model_id, &ids) {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(model = %model_id, category = %category, error = %e,
                    "skipping category, sample fetch failed");
                continue;
            }
        };
        let elements: Vec<_> = rows.into_iter().flatten().collect();
        if elements.is_empty() {
            continue;
        }

        // (pset name, property name) -> accumulated discovery row, kept in
        // first-seen order.
        let mut psets: Vec<PropertySetDiscovery> = Vec::new();
        for element in &elements {
            for pset in &element.property_sets {
                for prop in &pset.properties {
                    let (kind, confidence) = match discovery_kind(&prop.name) {
                        Some(kind) => (kind.to_string(), "high"),
                        None => {
                            let lower = prop.name.to_lowercase();
                            let keyworded = prop.value.is_numeric()
                                && MEASUREMENT_KEYWORDS.iter().any(|k| lower.contains(k));
                            if !keyworded {
                                continue;
                            }
                            ("custom".to_string(), "medium")
                        }
                    };

                    let pos = match psets.iter().position(|p| p.name == pset.name) {
                        Some(pos) => pos,
                        None => {
                            psets.push(PropertySetDiscovery {
                                name: pset.name.clone(),
                                measurement_properties: Vec::new(),
                            });
                            psets.len() - 1
                        }
                    };
                    let slot = &mut psets[pos];
                    if let Some(existing) = slot
                        .measurement_properties
                        .iter_mut()
                        .find(|p| p.property == prop.name)
                    {
                        existing.frequency += 1;
                    } else {
                        slot.measurement_properties.push(PropertyDiscovery {
                            property: prop.name.clone(),
                            measurement_type: kind,
                            sample_value: sample_text(&prop.value),
                            frequency: 1,
                            confidence: confidence.to_string(),
                        });
                    }
                }
            }
        }

        findings.push(CategoryDiscovery {
            category: category.clone(),
            elements_analyzed: elements.len(),
            property_sets: psets,
        });
    }

    DiscoveryPayload {
        success: true,
        message: None,
        model_id: model_id.to_string(),
        categories: findings,
    }
}

fn sample_text(value: &PropValue) -> String {
    match value {
        PropValue::Null => "N/A".to_string(),
        other => other.display_text(),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::index::MemoryIndex;
    use crate::types::{ElementData, Property, PropertySet};

    fn element(local_id: u64, category: &str, props: &[(&str, PropValue)]) -> ElementData {
        ElementData {
            local_id,
            name: None,
            global_id: None,
            category: Some(category.to_string()),
            object_type: None,
            property_sets: vec![PropertySet {
                name: "BaseQuantities".to_string(),
                properties: props
                    .iter()
                    .map(|(n, v)| Property {
                        name: (*n).to_string(),
                        value: v.clone(),
                    })
                    .collect(),
            }],
        }
    }

    fn sample_index() -> MemoryIndex {
        let mut index = MemoryIndex::new();
        index.load_model(
            "mcp",
            vec![
                element(
                    1,
                    "IFCWALL",
                    &[
                        ("GrossVolume", PropValue::Number(10.0)),
                        ("Thickness", PropValue::Number(0.3)),
                        ("FireRating", PropValue::Text("EI60".into())),
                    ],
                ),
                element(2, "IFCWALL", &[("GrossVolume", PropValue::Number(8.0))]),
                element(3, "IFCPIPE", &[("PipeDiameter", PropValue::Number(0.2))]),
            ],
        );
        index
    }

    #[test]
    fn discovery_classifies_with_extended_catalogs() {
        let index = sample_index();
        let payload = discover_measurement_properties(&index, "mcp", None, 3);
        assert!(payload.success);

        let wall = payload
            .categories
            .iter()
            .find(|c| c.category == "IFCWALL")
            .unwrap();
        assert_eq!(wall.elements_analyzed, 2);
        let props = &wall.property_sets[0].measurement_properties;

        let volume = props.iter().find(|p| p.property == "GrossVolume").unwrap();
        assert_eq!(volume.measurement_type, "volume");
        assert_eq!(volume.confidence, "high");
        assert_eq!(volume.frequency, 2);
        assert_eq!(volume.sample_value, "10");

        // Thickness is only in the discovery catalog, not the extraction one.
        let thickness = props.iter().find(|p| p.property == "Thickness").unwrap();
        assert_eq!(thickness.measurement_type, "length");

        // Non-measurement text properties do not show up.
        assert!(props.iter().all(|p| p.property != "FireRating"));
    }

    #[test]
    fn keyword_matches_report_medium_confidence() {
        let index = sample_index();
        let payload = discover_measurement_properties(&index, "mcp", None, 3);
        let pipe = payload
            .categories
            .iter()
            .find(|c| c.category == "IFCPIPE")
            .unwrap();
        let diameter = &pipe.property_sets[0].measurement_properties[0];
        assert_eq!(diameter.measurement_type, "custom");
        assert_eq!(diameter.confidence, "medium");
    }

    #[test]
    fn explicit_category_filter() {
        let index = sample_index();
        let cats = vec!["IFCPIPE".to_string()];
        let payload = discover_measurement_properties(&index, "mcp", Some(&cats), 3);
        assert_eq!(payload.categories.len(), 1);
        assert_eq!(payload.categories[0].category, "IFCPIPE");
    }

    #[test]
    fn sample_size_bounds_the_scan() {
        let index = sample_index();
        let payload = discover_measurement_properties(&index, "mcp", None, 1);
        let wall = payload
            .categories
            .iter()
            .find(|c| c.category == "IFCWALL")
            .unwrap();
        assert_eq!(wall.elements_analyzed, 1);
    }

    #[test]
    fn missing_model_is_a_payload_failure() {
        let index = sample_index();
        let payload = discover_measurement_properties(&index, "ghost", None, 3);
        assert!(!payload.success);
        assert!(payload.message.unwrap().contains("ghost"));
        assert!(payload.categories.is_empty());
    }
}
