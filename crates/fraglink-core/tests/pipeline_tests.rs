//! # Pipeline Integration Tests
//!
//! End-to-end scenarios across the query, measurement and correlation
//! layers, including partial-failure behavior with a fault-injecting index.

#![allow(clippy::unwrap_used, clippy::panic)]

use fraglink_core::index::{ElementIndex, MemoryIndex};
use fraglink_core::pattern::Matcher;
use fraglink_core::query::{AttributeSpec, DecodedQuery, QuerySpec, RelationSpec, build_query};
use fraglink_core::types::{
    ElementData, MeasurementKind, ModelIdMap, PropValue, Property, PropertySet,
};
use fraglink_core::{Correlator, Envelope, FraglinkError, QueryRegistry};
use serde_json::json;
use std::time::Duration;

// =============================================================================
// FIXTURES
// =============================================================================

fn wall(local_id: u64, volume: f64) -> ElementData {
    ElementData {
        local_id,
        name: Some(format!("Wall {local_id}")),
        global_id: Some(format!("GUID-{local_id}")),
        category: Some("IFCWALLSTANDARDCASE".to_string()),
        object_type: Some("Basic Wall".to_string()),
        property_sets: vec![PropertySet {
            name: "BaseQuantities".to_string(),
            properties: vec![
                Property {
                    name: "GrossVolume".to_string(),
                    value: PropValue::Number(volume),
                },
                Property {
                    name: "NetArea".to_string(),
                    value: PropValue::Number(volume * 2.0),
                },
            ],
        }],
    }
}

fn loaded_index() -> MemoryIndex {
    let mut index = MemoryIndex::new();
    index.load_model("mcp", vec![wall(1, 10.0), wall(2, 5.0), wall(3, 2.5)]);
    index
}

/// Index wrapper that fails `items_data` whenever the batch touches one of
/// the poisoned ids. Everything else delegates.
struct FlakyIndex {
    inner: MemoryIndex,
    poisoned: Vec<u64>,
}

impl ElementIndex for FlakyIndex {
    fn model_ids(&self) -> Vec<String> {
        self.inner.model_ids()
    }
    fn categories_of(&self, model: &str) -> Vec<String> {
        self.inner.categories_of(model)
    }
    fn items_of_categories(&self, model: &str, categories: &[Matcher]) -> Vec<u64> {
        self.inner.items_of_categories(model, categories)
    }
    fn find(&self, query: &DecodedQuery) -> ModelIdMap {
        self.inner.find(query)
    }
    fn items_data(
        &self,
        model: &str,
        local_ids: &[u64],
    ) -> Result<Vec<Option<ElementData>>, FraglinkError> {
        if local_ids.iter().any(|id| self.poisoned.contains(id)) {
            return Err(FraglinkError::Io("simulated fetch failure".to_string()));
        }
        self.inner.items_data(model, local_ids)
    }
}

// =============================================================================
// PARTIAL FAILURE
// =============================================================================

#[test]
fn failed_batch_is_skipped_and_the_rest_survives() {
    let index = FlakyIndex {
        inner: loaded_index(),
        poisoned: vec![1],
    };
    let mut map = ModelIdMap::new();
    map.insert("mcp".to_string(), vec![1, 2, 3]);

    // Batch size 2: [1, 2] fails as a unit, [3] succeeds alone.
    let payload = fraglink_core::extract_measurements(
        &index,
        &map,
        &[MeasurementKind::All],
        true,
        2,
    );
    assert!(payload.success);
    assert_eq!(payload.total_elements, 1);
    assert_eq!(payload.elements[0].elements[0].local_id, 3);
    assert_eq!(payload.summary.total_volume, "2.50");
}

#[test]
fn all_batches_failing_yields_failure_payload() {
    let index = FlakyIndex {
        inner: loaded_index(),
        poisoned: vec![1, 2, 3],
    };
    let mut map = ModelIdMap::new();
    map.insert("mcp".to_string(), vec![1, 2, 3]);

    let payload = fraglink_core::extract_measurements(
        &index,
        &map,
        &[MeasurementKind::All],
        true,
        1,
    );
    assert!(!payload.success);
    assert_eq!(payload.total_elements, 0);
}

// =============================================================================
// QUERY TO REPORT
// =============================================================================

#[test]
fn query_find_measure_report_chain() {
    let index = loaded_index();

    let mut registry = QueryRegistry::new();
    registry.create(
        "big walls",
        build_query(&QuerySpec {
            categories: Some(vec!["wall".to_string()]),
            attributes: Some(vec![AttributeSpec {
                name: "ObjectType".to_string(),
                value: Some(json!("Basic Wall")),
            }]),
            relation: None,
        }),
    );

    let outcome = registry.execute("big walls", &index).unwrap();
    assert_eq!(outcome.total_elements, 3);

    let payload = fraglink_core::extract_measurements(
        &index,
        &outcome.results,
        &[MeasurementKind::Volume, MeasurementKind::Area],
        false,
        100,
    );
    assert!(payload.success);
    assert_eq!(payload.summary.total_volume, "17.50");
    assert_eq!(payload.summary.total_area, "35.00");
    // Length was not requested.
    assert_eq!(payload.summary.total_length, "0.00");

    let csv = fraglink_core::measurements_csv(&payload);
    assert_eq!(csv.lines().count(), 4);
}

#[test]
fn relation_query_through_registry() {
    let index = loaded_index();
    let mut registry = QueryRegistry::new();
    registry.create(
        "has gross volume",
        build_query(&QuerySpec {
            relation: Some(RelationSpec {
                name: "IsDefinedBy".to_string(),
                query: Box::new(QuerySpec {
                    relation: Some(RelationSpec {
                        name: "HasProperties".to_string(),
                        query: Box::new(QuerySpec {
                            categories: None,
                            attributes: Some(vec![AttributeSpec {
                                name: "Name".to_string(),
                                value: Some(json!("GrossVolume")),
                            }]),
                            relation: None,
                        }),
                    }),
                    ..Default::default()
                }),
            }),
            ..Default::default()
        }),
    );
    let outcome = registry.execute("has gross volume", &index).unwrap();
    assert_eq!(outcome.results.get("mcp"), Some(&vec![1, 2, 3]));

    assert!(matches!(
        registry.execute("missing", &index),
        Err(FraglinkError::NotFound(_))
    ));
}

// =============================================================================
// CORRELATED EXCHANGE
// =============================================================================

/// Simulates the full controller-side exchange: claim the slot, have a
/// "viewer" task compute and send back a result envelope, settle.
#[tokio::test]
async fn correlated_measurement_exchange() {
    let correlator = std::sync::Arc::new(Correlator::new());
    let rx = correlator.begin().unwrap();

    let viewer = correlator.clone();
    let handle = tokio::spawn(async move {
        let index = loaded_index();
        let mut map = ModelIdMap::new();
        map.insert("mcp".to_string(), vec![1, 2, 3]);
        let payload = fraglink_core::extract_measurements(
            &index,
            &map,
            &[MeasurementKind::All],
            true,
            100,
        );
        let envelope = Envelope::new("elementsMeasurementsResult", &payload).unwrap();
        // Round-trip through the wire form, like the real channel.
        let parsed = Envelope::parse(&envelope.to_text().unwrap()).unwrap();
        assert!(viewer.resolve(&parsed));
    });

    let payload = correlator.wait(rx, Duration::from_secs(5)).await.unwrap();
    handle.await.unwrap();

    assert_eq!(payload["success"], true);
    assert_eq!(payload["totalElements"], 3);
    assert_eq!(payload["summary"]["totalVolume"], "17.50");
}
