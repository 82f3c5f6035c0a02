//! # Element Info
//!
//! Raw per-element data retrieval for the `getElementsInfo` and
//! `getSelectedElements` commands. No classification happens here; property
//! sets are either passed through verbatim or flattened into a
//! name-to-value map for readability.

use crate::index::ElementIndex;
use crate::types::{ElementData, ModelIdMap, PropValue, PropertySet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// PAYLOAD SHAPES
// =============================================================================

/// Property sets, either formatted (`pset name -> property name -> value`)
/// or raw as the index reports them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PsetView {
    Formatted(BTreeMap<String, BTreeMap<String, PropValue>>),
    Raw(Vec<PropertySet>),
}

/// One element in an info result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementInfo {
    pub local_id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub global_id: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub object_type: Option<String>,
    pub property_sets: PsetView,
}

/// Elements of one model in an info result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelElements {
    pub model_id: String,
    pub elements: Vec<ElementInfo>,
}

/// Payload of an `elementsInfoResult` envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementsInfoPayload {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub total_elements: usize,
    pub elements: Vec<ModelElements>,
}

/// Payload of a `selectedElementsResult` envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedElementsPayload {
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub model_id_map: ModelIdMap,
    pub total_elements: usize,
}

fn default_success() -> bool {
    true
}

impl SelectedElementsPayload {
    /// Build from a selection map.
    #[must_use]
    pub fn from_map(model_id_map: ModelIdMap) -> Self {
        let total_elements = crate::types::total_ids(&model_id_map);
        Self {
            success: true,
            message: None,
            model_id_map,
            total_elements,
        }
    }
}

// =============================================================================
// COLLECTION
// =============================================================================

/// Flatten property sets into a `pset -> property -> value` map.
#[must_use]
pub fn format_property_sets(
    property_sets: &[PropertySet],
) -> BTreeMap<String, BTreeMap<String, PropValue>> {
    property_sets
        .iter()
        .map(|pset| {
            let props = pset
                .properties
                .iter()
                .map(|p| (p.name.clone(), p.value.clone()))
                .collect();
            (pset.name.clone(), props)
        })
        .collect()
}

fn info_of(data: ElementData, format_psets: bool) -> ElementInfo {
    let property_sets = if format_psets {
        PsetView::Formatted(format_property_sets(&data.property_sets))
    } else {
        PsetView::Raw(data.property_sets)
    };
    ElementInfo {
        local_id: data.local_id,
        name: data.name,
        global_id: data.global_id,
        category: data.category,
        object_type: data.object_type,
        property_sets,
    }
}

/// Fetch raw data for every referenced element.
///
/// Failing models are logged and skipped; unresolved ids are skipped. The
/// run reports failure only when a non-empty request produced zero elements.
#[must_use]
pub fn collect_elements_info(
    index: &dyn ElementIndex,
    model_id_map: &ModelIdMap,
    format_psets: bool,
) -> ElementsInfoPayload {
    let requested = crate::types::total_ids(model_id_map);
    let mut models = Vec::new();
    let mut total_elements = 0usize;

    for (model, ids) in model_id_map {
        if ids.is_empty() {
            continue;
        }
        let rows = match index.items_data(model, ids) {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(model = %model, error = %e, "skipping model, data fetch failed");
                continue;
            }
        };
        let elements: Vec<ElementInfo> = rows
            .into_iter()
            .flatten()
            .map(|data| info_of(data, format_psets))
            .collect();
        if !elements.is_empty() {
            total_elements += elements.len();
            models.push(ModelElements {
                model_id: model.clone(),
                elements,
            });
        }
    }

    if requested > 0 && total_elements == 0 {
        return ElementsInfoPayload {
            success: false,
            message: Some("No element data could be retrieved".to_string()),
            total_elements: 0,
            elements: Vec::new(),
        };
    }

    ElementsInfoPayload {
        success: true,
        message: None,
        total_elements,
        elements: models,
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
    use crate::types::Property;

    fn loaded_index() -> MemoryIndex {
        let mut index = MemoryIndex::new();
        index.load_model(
            "mcp",
            vec![ElementData {
                local_id: 1,
                name: Some("Wall A".into()),
                global_id: Some("GUID-1".into()),
                category: Some("IFCWALL".into()),
                object_type: None,
                property_sets: vec![PropertySet {
                    name: "Pset_WallCommon".to_string(),
                    properties: vec![Property {
                        name: "FireRating".to_string(),
                        value: PropValue::Text("EI60".into()),
                    }],
                }],
            }],
        );
        index
    }

    #[test]
    fn formatted_psets_flatten_to_maps() {
        let index = loaded_index();
        let mut map = ModelIdMap::new();
        map.insert("mcp".to_string(), vec![1]);

        let payload = collect_elements_info(&index, &map, true);
        assert!(payload.success);
        assert_eq!(payload.total_elements, 1);
        match &payload.elements[0].elements[0].property_sets {
            PsetView::Formatted(psets) => {
                assert_eq!(
                    psets["Pset_WallCommon"]["FireRating"],
                    PropValue::Text("EI60".into())
                );
            }
            PsetView::Raw(_) => panic!("expected formatted psets"),
        }
    }

    #[test]
    fn raw_psets_pass_through() {
        let index = loaded_index();
        let mut map = ModelIdMap::new();
        map.insert("mcp".to_string(), vec![1]);

        let payload = collect_elements_info(&index, &map, false);
        match &payload.elements[0].elements[0].property_sets {
            PsetView::Raw(psets) => assert_eq!(psets[0].name, "Pset_WallCommon"),
            PsetView::Formatted(_) => panic!("expected raw psets"),
        }
    }

    #[test]
    fn zero_of_nonempty_is_failure() {
        let index = loaded_index();
        let mut map = ModelIdMap::new();
        map.insert("ghost".to_string(), vec![1]);

        let payload = collect_elements_info(&index, &map, true);
        assert!(!payload.success);
    }

    #[test]
    fn selection_payload_counts_elements() {
        let mut map = ModelIdMap::new();
        map.insert("a".to_string(), vec![1, 2]);
        map.insert("b".to_string(), vec![3]);
        let payload = SelectedElementsPayload::from_map(map);
        assert_eq!(payload.total_elements, 3);
    }
}
