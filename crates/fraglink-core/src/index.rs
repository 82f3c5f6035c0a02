//! # Element Index
//!
//! The query translator and measurement pipeline run against an abstract
//! element index. The in-memory backend here mirrors how a loaded model
//! exposes its elements: every element carries a category, a handful of
//! top-level attributes and a list of property sets, and the relation
//! graph is walked on demand during query evaluation.
//!
//! Relation evaluation treats property sets and their properties as virtual
//! items so that one recursive matcher covers the whole chain:
//! element → `IsDefinedBy` → property set → `HasProperties` → property.

use crate::error::FraglinkError;
use crate::pattern::Matcher;
use crate::query::DecodedQuery;
use crate::types::{ElementData, ModelIdMap, PropValue, PropertySet};
use std::collections::BTreeMap;

// =============================================================================
// TRAIT BOUNDARY
// =============================================================================

/// Read access to loaded models and their elements.
///
/// The viewer agent implements this over its live model store; tests
/// implement it over fixtures (including fault-injecting variants).
pub trait ElementIndex {
    /// Identifiers of every loaded model.
    fn model_ids(&self) -> Vec<String>;

    /// Distinct categories present in one model.
    fn categories_of(&self, model: &str) -> Vec<String>;

    /// Local ids of elements whose category matches any of the matchers.
    fn items_of_categories(&self, model: &str, categories: &[Matcher]) -> Vec<u64>;

    /// Evaluate a decoded query against every loaded model.
    fn find(&self, query: &DecodedQuery) -> ModelIdMap;

    /// Fetch raw element data for a batch of local ids in one model.
    ///
    /// The result is positional: ids that do not resolve yield `None`
    /// rather than failing the whole batch.
    fn items_data(
        &self,
        model: &str,
        local_ids: &[u64],
    ) -> Result<Vec<Option<ElementData>>, FraglinkError>;
}

// =============================================================================
// IN-MEMORY BACKEND
// =============================================================================

/// In-memory element index backed by parsed model payloads.
#[derive(Debug, Clone, Default)]
pub struct MemoryIndex {
    models: BTreeMap<String, Vec<ElementData>>,
}

/// Shape of a model payload as received on the binary channel.
#[derive(Debug, serde::Deserialize)]
struct ModelPayload {
    #[serde(default)]
    elements: Vec<ElementData>,
}

impl MemoryIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model with its elements, replacing any previous content.
    pub fn load_model(&mut self, model: impl Into<String>, elements: Vec<ElementData>) {
        self.models.insert(model.into(), elements);
    }

    /// Parse a JSON model payload (`{ "elements": [...] }`) and register it.
    pub fn load_model_json(
        &mut self,
        model: impl Into<String>,
        payload: &[u8],
    ) -> Result<usize, FraglinkError> {
        let parsed: ModelPayload = serde_json::from_slice(payload)?;
        let count = parsed.elements.len();
        self.load_model(model, parsed.elements);
        Ok(count)
    }

    /// Drop a model. Returns false when it was not loaded.
    pub fn remove_model(&mut self, model: &str) -> bool {
        self.models.remove(model).is_some()
    }

    /// Whether a model is loaded.
    #[must_use]
    pub fn has_model(&self, model: &str) -> bool {
        self.models.contains_key(model)
    }

    fn element(&self, model: &str, local_id: u64) -> Option<&ElementData> {
        self.models
            .get(model)?
            .iter()
            .find(|e| e.local_id == local_id)
    }

    fn element_matches(&self, element: &ElementData, query: &DecodedQuery) -> bool {
        let item = VirtualItem::from_element(element);
        item.matches(query)
    }
}

impl ElementIndex for MemoryIndex {
    fn model_ids(&self) -> Vec<String> {
        self.models.keys().cloned().collect()
    }

    fn categories_of(&self, model: &str) -> Vec<String> {
        let Some(elements) = self.models.get(model) else {
            return Vec::new();
        };
        let mut categories: Vec<String> = elements
            .iter()
            .filter_map(|e| e.category.clone())
            .collect();
        categories.sort_unstable();
        categories.dedup();
        categories
    }

    fn items_of_categories(&self, model: &str, categories: &[Matcher]) -> Vec<u64> {
        let Some(elements) = self.models.get(model) else {
            return Vec::new();
        };
        elements
            .iter()
            .filter(|e| {
                e.category
                    .as_deref()
                    .is_some_and(|cat| categories.iter().any(|m| m.is_match(cat)))
            })
            .map(|e| e.local_id)
            .collect()
    }

    fn find(&self, query: &DecodedQuery) -> ModelIdMap {
        let mut results = ModelIdMap::new();
        for (model, elements) in &self.models {
            let ids: Vec<u64> = elements
                .iter()
                .filter(|e| self.element_matches(e, query))
                .map(|e| e.local_id)
                .collect();
            if !ids.is_empty() {
                results.insert(model.clone(), ids);
            }
        }
        results
    }

    fn items_data(
        &self,
        model: &str,
        local_ids: &[u64],
    ) -> Result<Vec<Option<ElementData>>, FraglinkError> {
        if !self.models.contains_key(model) {
            return Err(FraglinkError::NotFound(format!("model '{model}'")));
        }
        Ok(local_ids
            .iter()
            .map(|id| self.element(model, *id).cloned())
            .collect())
    }
}

// =============================================================================
// VIRTUAL ITEMS — relation traversal during query evaluation
// =============================================================================

/// A queryable item: a real element, or one of its property sets / properties
/// presented as an item so relation queries can recurse uniformly.
struct VirtualItem<'a> {
    category: Option<&'a str>,
    attributes: Vec<(&'static str, PropValue)>,
    relations: Vec<(&'static str, Vec<VirtualItem<'a>>)>,
}

const PSET_CATEGORY: &str = "IFCPROPERTYSET";
const PROPERTY_CATEGORY: &str = "IFCPROPERTYSINGLEVALUE";

impl<'a> VirtualItem<'a> {
    fn from_element(element: &'a ElementData) -> Self {
        let mut attributes = Vec::new();
        if let Some(name) = &element.name {
            attributes.push(("Name", PropValue::Text(name.clone())));
        }
        if let Some(gid) = &element.global_id {
            attributes.push(("GlobalId", PropValue::Text(gid.clone())));
        }
        if let Some(ot) = &element.object_type {
            attributes.push(("ObjectType", PropValue::Text(ot.clone())));
        }

        let psets: Vec<VirtualItem<'a>> = element
            .property_sets
            .iter()
            .map(Self::from_property_set)
            .collect();

        Self {
            category: element.category.as_deref(),
            attributes,
            relations: vec![("IsDefinedBy", psets)],
        }
    }

    fn from_property_set(pset: &'a PropertySet) -> Self {
        let properties: Vec<VirtualItem<'a>> = pset
            .properties
            .iter()
            .map(|prop| VirtualItem {
                category: Some(PROPERTY_CATEGORY),
                attributes: vec![
                    ("Name", PropValue::Text(prop.name.clone())),
                    ("NominalValue", prop.value.clone()),
                ],
                relations: Vec::new(),
            })
            .collect();

        Self {
            category: Some(PSET_CATEGORY),
            attributes: vec![("Name", PropValue::Text(pset.name.clone()))],
            relations: vec![("HasProperties", properties)],
        }
    }

    fn matches(&self, query: &DecodedQuery) -> bool {
        if !query.categories.is_empty() {
            let ok = self
                .category
                .is_some_and(|cat| query.categories.iter().any(|m| m.is_match(cat)));
            if !ok {
                return false;
            }
        }

        // Every attribute criterion must be satisfied by some attribute.
        for criterion in &query.attributes {
            let satisfied = self.attributes.iter().any(|(name, value)| {
                if !criterion.name.is_match(name) {
                    return false;
                }
                match &criterion.value {
                    None => true,
                    Some(vm) => vm.matches(&value.to_json()),
                }
            });
            if !satisfied {
                return false;
            }
        }

        // A relation criterion needs at least one related item matching the
        // nested query.
        if let Some(rel) = &query.relation {
            return self
                .relations
                .iter()
                .filter(|(name, _)| *name == rel.name)
                .flat_map(|(_, items)| items.iter())
                .any(|item| item.matches(&rel.query));
        }

        true
    }
}

// =============================================================================
// TESTS
// =============================================================================
