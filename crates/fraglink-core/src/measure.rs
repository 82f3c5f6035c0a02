//! # Measurement Classifier
//!
//! Turns raw property sets into semantically classified measurements.
//! Classification is two-tier: a fixed catalog of well-known quantity
//! property names per kind, then a keyword heuristic that catches custom
//! numeric properties the catalog misses.
//!
//! Classification is first-match-wins per kind per element: once a slot is
//! filled, later candidates for the same kind are ignored. The catalog is
//! consulted only for the kinds actually requested, so a catalog property
//! of an unrequested kind can still surface through the custom heuristic.

use crate::index::ElementIndex;
use crate::types::{
    ElementMeasurements, MeasuredElement, Measurement, MeasurementKind, ModelIdMap, PropValue,
    PropertySet,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Default number of elements fetched per index batch.
pub const DEFAULT_BATCH_SIZE: usize = 100;

// =============================================================================
// CATALOGS AND KEYWORDS
// =============================================================================

/// Well-known volume quantity property names.
pub const VOLUME_PROPERTIES: &[&str] =
    &["Volume", "GrossVolume", "NetVolume", "NominalVolume"];

/// Well-known area quantity property names.
pub const AREA_PROPERTIES: &[&str] = &[
    "Area",
    "GrossArea",
    "NetArea",
    "GrossFloorArea",
    "NetFloorArea",
    "GrossSideArea",
    "NetSideArea",
];

/// Well-known length quantity property names.
pub const LENGTH_PROPERTIES: &[&str] = &[
    "Length",
    "Width",
    "Height",
    "Depth",
    "OverallHeight",
    "OverallWidth",
    "NominalLength",
    "Perimeter",
];

/// Substrings that mark a numeric property as measurement-like.
pub const MEASUREMENT_KEYWORDS: &[&str] = &[
    "area", "volume", "length", "width", "height", "depth", "perimeter", "thickness",
    "diameter", "radius", "weight", "mass", "density", "capacity", "flow", "size",
];

/// Infer a display unit from a property name.
///
/// The source data does not state units, so this is a name heuristic.
#[must_use]
pub fn infer_unit(property_name: &str) -> &'static str {
    let lower = property_name.to_lowercase();
    if lower.contains("volume") {
        "m³"
    } else if lower.contains("area") {
        "m²"
    } else if ["length", "width", "height", "depth", "perimeter"]
        .iter()
        .any(|k| lower.contains(k))
    {
        "m"
    } else if lower.contains("weight") || lower.contains("mass") {
        "kg"
    } else {
        "units"
    }
}

fn catalog_for(kind: MeasurementKind) -> &'static [&'static str] {
    match kind {
        MeasurementKind::Volume => VOLUME_PROPERTIES,
        MeasurementKind::Area => AREA_PROPERTIES,
        MeasurementKind::Length => LENGTH_PROPERTIES,
        MeasurementKind::All => &[],
    }
}

fn unit_for(kind: MeasurementKind) -> &'static str {
    match kind {
        MeasurementKind::Volume => "m³",
        MeasurementKind::Area => "m²",
        MeasurementKind::Length => "m",
        MeasurementKind::All => "units",
    }
}

/// Expand the requested kinds, resolving the `all` shorthand.
#[must_use]
pub fn expand_kinds(kinds: &[MeasurementKind]) -> Vec<MeasurementKind> {
    if kinds.is_empty() || kinds.contains(&MeasurementKind::All) {
        vec![
            MeasurementKind::Volume,
            MeasurementKind::Area,
            MeasurementKind::Length,
        ]
    } else {
        let mut out = Vec::new();
        for k in kinds {
            if !out.contains(k) {
                out.push(*k);
            }
        }
        out
    }
}

/// Whether a property qualifies for the custom heuristic: numeric value and
/// a measurement keyword somewhere in the lowercased name.
#[must_use]
pub fn is_custom_measurement(name: &str, value: &PropValue) -> bool {
    if !value.is_numeric() {
        return false;
    }
    let lower = name.to_lowercase();
    MEASUREMENT_KEYWORDS.iter().any(|k| lower.contains(k))
}

// =============================================================================
// PER-ELEMENT CLASSIFICATION
// =============================================================================

/// Classify one element's property sets into measurement slots.
#[must_use]
pub fn classify_element(
    property_sets: &[PropertySet],
    kinds: &[MeasurementKind],
    include_custom: bool,
) -> ElementMeasurements {
    let kinds = expand_kinds(kinds);
    let mut out = ElementMeasurements::default();

    for pset in property_sets {
        for prop in &pset.properties {
            let mut classified = false;
            for kind in &kinds {
                let slot = match kind {
                    MeasurementKind::Volume => &mut out.volume,
                    MeasurementKind::Area => &mut out.area,
                    MeasurementKind::Length => &mut out.length,
                    MeasurementKind::All => continue,
                };
                if slot.is_none() && catalog_for(*kind).contains(&prop.name.as_str()) {
                    *slot = Some(Measurement {
                        value: prop.value.clone(),
                        unit: unit_for(*kind).to_string(),
                        source: pset.name.clone(),
                        property: prop.name.clone(),
                    });
                    classified = true;
                    break;
                }
            }

            if !classified
                && include_custom
                && !out.custom.contains_key(&prop.name)
                && is_custom_measurement(&prop.name, &prop.value)
            {
                out.custom.insert(
                    prop.name.clone(),
                    Measurement {
                        value: prop.value.clone(),
                        unit: infer_unit(&prop.name).to_string(),
                        source: pset.name.clone(),
                        property: prop.name.clone(),
                    },
                );
            }
        }
    }
    out
}

// =============================================================================
// AGGREGATION
// =============================================================================

/// Parse the leading float out of a rendered value, the lenient way:
/// `"12.5 m³"` is 12.5, unparsable input is 0.
#[must_use]
pub fn leading_float(text: &str) -> f64 {
    let trimmed = text.trim_start();
    let mut end = 0;
    let bytes = trimmed.as_bytes();
    let mut seen_digit = false;
    let mut seen_dot = false;
    if end < bytes.len() && (bytes[end] == b'-' || bytes[end] == b'+') {
        end += 1;
    }
    while end < bytes.len() {
        match bytes[end] {
            b'0'..=b'9' => {
                seen_digit = true;
                end += 1;
            }
            b'.' if !seen_dot => {
                seen_dot = true;
                end += 1;
            }
            _ => break,
        }
    }
    if !seen_digit {
        return 0.0;
    }
    trimmed[..end].parse().unwrap_or(0.0)
}

fn numeric_of(measurement: &Measurement) -> f64 {
    match &measurement.value {
        PropValue::Number(n) => *n,
        PropValue::Text(s) => leading_float(s),
        _ => 0.0,
    }
}

/// Aggregated totals across one extraction run. Totals are formatted to two
/// decimals at the edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementSummary {
    pub total_volume: String,
    pub volume_unit: String,
    pub total_area: String,
    pub area_unit: String,
    pub total_length: String,
    pub length_unit: String,
    pub elements_with_measurements: usize,
}

// =============================================================================
// RESULT PAYLOAD
// =============================================================================

/// Elements of one model in the measurements result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelMeasurements {
    pub model_id: String,
    pub elements: Vec<MeasuredElement>,
}

/// Payload of an `elementsMeasurementsResult` envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementsPayload {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub total_elements: usize,
    pub elements: Vec<ModelMeasurements>,
    pub summary: MeasurementSummary,
    pub processing_time_ms: u64,
}

impl MeasurementsPayload {
    /// Failure payload with empty results.
    #[must_use]
    pub fn failure(message: impl Into<String>, processing_time_ms: u64) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            total_elements: 0,
            elements: Vec::new(),
            summary: MeasurementSummary {
                total_volume: "0.00".to_string(),
                volume_unit: "m³".to_string(),
                total_area: "0.00".to_string(),
                area_unit: "m²".to_string(),
                total_length: "0.00".to_string(),
                length_unit: "m".to_string(),
                elements_with_measurements: 0,
            },
            processing_time_ms,
        }
    }
}

// =============================================================================
// EXTRACTION PIPELINE
// =============================================================================

/// Extract and classify measurements for every referenced element.
///
/// Elements are fetched in batches of `batch_size` per model. A failing
/// batch is logged and skipped; its elements are simply absent from the
/// result. The run reports failure only when a non-empty request produced
/// zero elements.
#[must_use]
pub fn extract_measurements(
    index: &dyn ElementIndex,
    model_id_map: &ModelIdMap,
    kinds: &[MeasurementKind],
    include_custom: bool,
    batch_size: usize,
) -> MeasurementsPayload {
    let started = Instant::now();
    let batch_size = batch_size.max(1);
    let requested = crate::types::total_ids(model_id_map);

    let mut models = Vec::new();
    let mut total_elements = 0usize;

    for (model, ids) in model_id_map {
        if ids.is_empty() {
            continue;
        }
        let mut elements = Vec::new();
        for batch in ids.chunks(batch_size) {
            let rows = match index.items_data(model, batch) {
                Ok(rows) => rows,
                Err(e) => {
                    tracing::warn!(model = %model, batch_len = batch.len(), error = %e,
                        "skipping failed measurement batch");
                    continue;
                }
            };
            for (id, row) in batch.iter().zip(rows) {
                let Some(data) = row else {
                    tracing::debug!(model = %model, local_id = id, "element not found, skipping");
                    continue;
                };
                let measurements =
                    classify_element(&data.property_sets, kinds, include_custom);
                elements.push(MeasuredElement {
                    local_id: data.local_id,
                    name: data.name,
                    global_id: data.global_id,
                    category: data.category,
                    object_type: data.object_type,
                    measurements,
                });
            }
        }
        if !elements.is_empty() {
            total_elements += elements.len();
            models.push(ModelMeasurements {
                model_id: model.clone(),
                elements,
            });
        }
    }

    let elapsed = started.elapsed().as_millis() as u64;

    if requested > 0 && total_elements == 0 {
        return MeasurementsPayload::failure(
            "No elements could be processed for measurements",
            elapsed,
        );
    }

    let mut total_volume = 0.0f64;
    let mut total_area = 0.0f64;
    let mut total_length = 0.0f64;
    let mut with_measurements = 0usize;
    for model in &models {
        for element in &model.elements {
            let m = &element.measurements;
            if m.has_any() {
                with_measurements += 1;
            }
            if let Some(v) = &m.volume {
                total_volume += numeric_of(v);
            }
            if let Some(a) = &m.area {
                total_area += numeric_of(a);
            }
            if let Some(l) = &m.length {
                total_length += numeric_of(l);
            }
        }
    }

    MeasurementsPayload {
        success: true,
        message: None,
        total_elements,
        elements: models,
        summary: MeasurementSummary {
            total_volume: format!("{total_volume:.2}"),
            volume_unit: "m³".to_string(),
            total_area: format!("{total_area:.2}"),
            area_unit: "m²".to_string(),
            total_length: format!("{total_length:.2}"),
            length_unit: "m".to_string(),
            elements_with_measurements: with_measurements,
        },
        processing_time_ms: elapsed,
    }
}

// =============================================================================
// TESTS
// =============================================================================
