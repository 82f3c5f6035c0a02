//! # Report Serializer
//!
//! Renders result payloads as CSV for export. All the quoting and number
//! normalization quirks live here so the payload shapes stay clean:
//! element names and embedded JSON are always quoted, and numbers written
//! with European separators ("1.234,56") are normalized to dot-decimal so
//! the comma never collides with the field separator.

use crate::discover::DiscoveryPayload;
use crate::info::{ElementInfo, ElementsInfoPayload, PsetView};
use crate::measure::MeasurementsPayload;
use crate::types::{Measurement, PropValue};
use regex::Regex;
use std::sync::LazyLock;

// =============================================================================
// CELL ENCODING
// =============================================================================

/// European-formatted number: optional thousands dots, comma decimal.
static EUROPEAN_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^-?\d{1,3}(?:\.\d{3})*(?:,\d+)?$|^-?\d+,\d+$").expect("valid constant pattern")
});

/// Normalize a numeric string to dot-decimal form.
///
/// "1.234,56" becomes "1234.56"; a lone decimal comma ("12,5") is also
/// converted. Anything else passes through untouched.
#[must_use]
pub fn normalize_number(text: &str) -> String {
    let trimmed = text.trim();
    if EUROPEAN_NUMBER.is_match(trimmed) {
        return trimmed.replace('.', "").replace(',', ".");
    }
    // One comma, no dots, digits on both sides: treat as decimal comma.
    if trimmed.matches(',').count() == 1 && !trimmed.contains('.') {
        let converted = trimmed.replace(',', ".");
        if converted.parse::<f64>().is_ok() {
            return converted;
        }
    }
    trimmed.to_string()
}

/// Quote a cell only when its content requires it.
#[must_use]
pub fn csv_escape(text: &str) -> String {
    if text.contains(',') || text.contains('"') || text.contains('\n') || text.contains('\r') {
        format!("\"{}\"", text.replace('"', "\"\""))
    } else {
        text.to_string()
    }
}

/// Quote a cell unconditionally. Used for free-text names and embedded JSON.
#[must_use]
pub fn csv_quote(text: &str) -> String {
    format!("\"{}\"", text.replace('"', "\"\""))
}

fn value_cell(value: &PropValue) -> String {
    match value {
        PropValue::Null => String::new(),
        PropValue::Text(s) => csv_escape(&normalize_number(s)),
        other => other.display_text(),
    }
}

// =============================================================================
// MEASUREMENTS REPORT
// =============================================================================

const MEASUREMENTS_HEADER: &str = "ModelId,LocalId,Name,Category,\
Volume_Value,Volume_Unit,Volume_Source,Volume_Property,\
Area_Value,Area_Unit,Area_Source,Area_Property,\
Length_Value,Length_Unit,Length_Source,Length_Property,\
Custom_Measurements";

fn measurement_cells(m: Option<&Measurement>) -> [String; 4] {
    match m {
        Some(m) => [
            value_cell(&m.value),
            m.unit.clone(),
            csv_escape(&m.source),
            csv_escape(&m.property),
        ],
        None => Default::default(),
    }
}

/// Render a measurements payload as CSV.
#[must_use]
pub fn measurements_csv(payload: &MeasurementsPayload) -> String {
    let mut out = String::from(MEASUREMENTS_HEADER);
    out.push('\n');

    for model in &payload.elements {
        for element in &model.elements {
            let m = &element.measurements;
            let custom_json = if m.custom.is_empty() {
                String::new()
            } else {
                serde_json::to_string(&m.custom).unwrap_or_default()
            };

            let mut cells: Vec<String> = vec![
                csv_escape(&model.model_id),
                element.local_id.to_string(),
                csv_quote(element.name.as_deref().unwrap_or("")),
                csv_escape(element.category.as_deref().unwrap_or("")),
            ];
            cells.extend(measurement_cells(m.volume.as_ref()));
            cells.extend(measurement_cells(m.area.as_ref()));
            cells.extend(measurement_cells(m.length.as_ref()));
            cells.push(csv_quote(&custom_json));

            out.push_str(&cells.join(","));
            out.push('\n');
        }
    }
    out
}

// =============================================================================
// DISCOVERY REPORT
// =============================================================================

const DISCOVERY_HEADER: &str = "Category,Elements_Analyzed,PropertySet_Count,\
PropertySet_Name,Measurement_Type,Property_Name,Sample_Value,Frequency,Confidence";

/// Render a discovery payload as CSV. Categories where sampling found no
/// measurement-like properties still get one filler row so they remain
/// visible in the report.
#[must_use]
pub fn discovery_csv(payload: &DiscoveryPayload) -> String {
    let mut out = String::from(DISCOVERY_HEADER);
    out.push('\n');

    for category in &payload.categories {
        let prefix = format!(
            "{},{},{}",
            csv_escape(&category.category),
            category.elements_analyzed,
            category.property_sets.len()
        );

        if category.property_sets.is_empty() {
            out.push_str(&format!("{prefix},none,N/A,N/A,N/A,0,N/A\n"));
            continue;
        }
        for pset in &category.property_sets {
            for prop in &pset.measurement_properties {
                out.push_str(&format!(
                    "{},{},{},{},{},{},{}\n",
                    prefix,
                    csv_escape(&pset.name),
                    prop.measurement_type,
                    csv_escape(&prop.property),
                    csv_escape(&normalize_number(&prop.sample_value)),
                    prop.frequency,
                    prop.confidence
                ));
            }
        }
    }
    out
}

// =============================================================================
// ELEMENT REPORTS
// =============================================================================

/// Render an info payload as a wide CSV: fixed identity columns plus one
/// `Pset_Property` column per distinct property across the whole payload,
/// sorted by name.
#[must_use]
pub fn elements_csv(payload: &ElementsInfoPayload) -> String {
    // First pass: collect the full column set.
    let mut columns: Vec<String> = Vec::new();
    for model in &payload.elements {
        for element in &model.elements {
            if let PsetView::Formatted(psets) = &element.property_sets {
                for (pset, props) in psets {
                    for prop in props.keys() {
                        let col = format!("{pset}_{prop}");
                        if !columns.contains(&col) {
                            columns.push(col);
                        }
                    }
                }
            }
        }
    }
    columns.sort_unstable();

    let mut out = String::from("ModelId,LocalId,Name,Category");
    for col in &columns {
        out.push(',');
        out.push_str(&csv_escape(col));
    }
    out.push('\n');

    for model in &payload.elements {
        for element in &model.elements {
            let mut cells: Vec<String> = vec![
                csv_escape(&model.model_id),
                element.local_id.to_string(),
                csv_quote(element.name.as_deref().unwrap_or("")),
                csv_escape(element.category.as_deref().unwrap_or("")),
            ];
            for col in &columns {
                let cell = match &element.property_sets {
                    PsetView::Formatted(psets) => psets
                        .iter()
                        .flat_map(|(pset, props)| {
                            props
                                .iter()
                                .map(move |(prop, value)| (format!("{pset}_{prop}"), value))
                        })
                        .find(|(name, _)| name == col)
                        .map(|(_, value)| value_cell(value)),
                    PsetView::Raw(_) => None,
                };
                cells.push(cell.unwrap_or_default());
            }
            out.push_str(&cells.join(","));
            out.push('\n');
        }
    }
    out
}

/// Render a bare selection as CSV.
#[must_use]
pub fn selected_elements_csv(model_id_map: &crate::types::ModelIdMap) -> String {
    let mut out = String::from("ModelId,LocalId\n");
    for (model, ids) in model_id_map {
        for id in ids {
            out.push_str(&format!("{},{id}\n", csv_escape(model)));
        }
    }
    out
}

/// Render a selection enriched with element attributes as CSV.
#[must_use]
pub fn selected_elements_csv_with_info(rows: &[(String, ElementInfo)]) -> String {
    let mut out = String::from("ModelId,LocalId,Name,Category,GlobalId\n");
    for (model, info) in rows {
        out.push_str(&format!(
            "{},{},{},{},{}\n",
            csv_escape(model),
            info.local_id,
            csv_quote(info.name.as_deref().unwrap_or("")),
            csv_escape(info.category.as_deref().unwrap_or("")),
            csv_escape(info.global_id.as_deref().unwrap_or(""))
        ));
    }
    out
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::measure::{MeasurementSummary, ModelMeasurements};
    use crate::types::{ElementMeasurements, MeasuredElement};
    use std::collections::BTreeMap;

    #[test]
    fn number_normalization() {
        assert_eq!(normalize_number("1.234,56"), "1234.56");
        assert_eq!(normalize_number("12,5"), "12.5");
        assert_eq!(normalize_number("-1.000.000,25"), "-1000000.25");
        // Plain dot-decimal stays as-is.
        assert_eq!(normalize_number("12.5"), "12.5");
        // Not a number at all.
        assert_eq!(normalize_number("a,b"), "a,b");
        assert_eq!(normalize_number("EI60"), "EI60");
    }

    #[test]
    fn escaping_rules() {
        assert_eq!(csv_escape("plain"), "plain");
        assert_eq!(csv_escape("a,b"), "\"a,b\"");
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_quote("plain"), "\"plain\"");
    }

    fn sample_measurements_payload() -> MeasurementsPayload {
        let mut custom = BTreeMap::new();
        custom.insert(
            "PipeDiameter".to_string(),
            Measurement {
                value: PropValue::Number(0.2),
                unit: "units".to_string(),
                source: "Dims".to_string(),
                property: "PipeDiameter".to_string(),
            },
        );
        MeasurementsPayload {
            success: true,
            message: None,
            total_elements: 1,
            elements: vec![ModelMeasurements {
                model_id: "mcp".to_string(),
                elements: vec![MeasuredElement {
                    local_id: 1,
                    name: Some("Muro, planta baja".to_string()),
                    global_id: None,
                    category: Some("IFCWALL".to_string()),
                    object_type: None,
                    measurements: ElementMeasurements {
                        volume: Some(Measurement {
                            value: PropValue::Text("1.234,56".to_string()),
                            unit: "m³".to_string(),
                            source: "BaseQuantities".to_string(),
                            property: "GrossVolume".to_string(),
                        }),
                        area: None,
                        length: None,
                        custom,
                    },
                }],
            }],
            summary: MeasurementSummary {
                total_volume: "1234.56".to_string(),
                volume_unit: "m³".to_string(),
                total_area: "0.00".to_string(),
                area_unit: "m²".to_string(),
                total_length: "0.00".to_string(),
                length_unit: "m".to_string(),
                elements_with_measurements: 1,
            },
            processing_time_ms: 1,
        }
    }

    #[test]
    fn measurements_csv_shape() {
        let csv = measurements_csv(&sample_measurements_payload());
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].split(',').count(), 17);
        // Name with a comma is quoted and stays one logical cell.
        assert!(lines[1].contains("\"Muro, planta baja\""));
        // European number normalized so it cannot split the row.
        assert!(lines[1].contains("1234.56"));
        // Custom JSON is quoted with doubled inner quotes.
        assert!(lines[1].contains("\"{\"\"PipeDiameter\"\""));
    }

    #[test]
    fn discovery_csv_includes_filler_rows() {
        use crate::discover::{CategoryDiscovery, DiscoveryPayload};
        let payload = DiscoveryPayload {
            success: true,
            message: None,
            model_id: "mcp".to_string(),
            categories: vec![CategoryDiscovery {
                category: "IFCDOOR".to_string(),
                elements_analyzed: 2,
                property_sets: Vec::new(),
            }],
        };
        let csv = discovery_csv(&payload);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0].split(',').count(), 9);
        assert_eq!(lines[1], "IFCDOOR,2,0,none,N/A,N/A,N/A,0,N/A");
    }

    #[test]
    fn elements_csv_flattens_sorted_columns() {
        use crate::info::{ElementInfo, ElementsInfoPayload, ModelElements, PsetView};
        let mut props = BTreeMap::new();
        props.insert("Width".to_string(), PropValue::Number(0.3));
        let mut psets = BTreeMap::new();
        psets.insert("BaseQuantities".to_string(), props);

        let payload = ElementsInfoPayload {
            success: true,
            message: None,
            total_elements: 1,
            elements: vec![ModelElements {
                model_id: "mcp".to_string(),
                elements: vec![ElementInfo {
                    local_id: 4,
                    name: None,
                    global_id: None,
                    category: Some("IFCWALL".to_string()),
                    object_type: None,
                    property_sets: PsetView::Formatted(psets),
                }],
            }],
        };
        let csv = elements_csv(&payload);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "ModelId,LocalId,Name,Category,BaseQuantities_Width");
        assert_eq!(lines[1], "mcp,4,\"\",IFCWALL,0.3");
    }

    #[test]
    fn selection_csv() {
        let mut map = crate::types::ModelIdMap::new();
        map.insert("mcp".to_string(), vec![1, 2]);
        let csv = selected_elements_csv(&map);
        assert_eq!(csv, "ModelId,LocalId\nmcp,1\nmcp,2\n");
    }
}
