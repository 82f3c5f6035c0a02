//! # Fraglink MCP Server
//!
//! Implements `ServerHandler` with the MCP tools that drive a connected
//! viewer: model loading, query management, element info, measurement
//! extraction, discovery and CSV export.

use crate::bridge::ViewerBridge;
use crate::export::ExportDir;
use fraglink_core::protocol::{Command, WireFrame};
use fraglink_core::query::{AttributeSpec, QuerySpec, RelationSpec, build_query};
use fraglink_core::types::{MeasurementKind, ModelIdMap};
use fraglink_core::{DiscoveryPayload, ElementsInfoPayload, MeasurementsPayload};
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
    schemars, tool, tool_handler, tool_router,
};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

// =============================================================================
// TIMEOUT BOUNDS
// =============================================================================

const SELECTION_TIMEOUT: Duration = Duration::from_secs(5);
const INFO_TIMEOUT: Duration = Duration::from_secs(10);
const EXPORT_TIMEOUT: Duration = Duration::from_secs(15);
const DISCOVERY_TIMEOUT: Duration = Duration::from_secs(20);
const MEASUREMENTS_TIMEOUT: Duration = Duration::from_secs(30);

/// Delay between creating a query and auto-executing it, giving the viewer
/// time to register the definition first.
const EXECUTE_DELAY: Duration = Duration::from_millis(100);

// =============================================================================
// MCP SERVER
// =============================================================================

/// MCP server that bridges tool calls to the connected viewer.
#[derive(Clone)]
pub struct FraglinkMcp {
    bridge: Arc<ViewerBridge>,
    exports: ExportDir,
    #[allow(dead_code)]
    tool_router: ToolRouter<Self>,
}

// =============================================================================
// TOOL PARAMETER STRUCTS
// =============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct LoadFileParams {
    /// Path of the model file to load into the viewer.
    #[schemars(description = "Path of the model file to load into the viewer")]
    pub path: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct HighlightParams {
    /// Elements to highlight, as model id -> local element ids.
    #[schemars(description = "Elements to highlight, as model id -> local element ids")]
    pub model_id_map: ModelIdMap,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct QueryParams {
    /// Category names to match (case-insensitive).
    #[schemars(description = "Category names to match (case-insensitive)")]
    pub categories: Option<Vec<String>>,
    /// Attribute criteria; all must be satisfied.
    #[schemars(description = "Attribute criteria; all must be satisfied")]
    pub attributes: Option<Vec<AttributeParam>>,
    /// Relation to traverse with a nested query.
    #[schemars(description = "Relation to traverse with a nested query")]
    pub relation: Option<RelationParam>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AttributeParam {
    /// Attribute name (case-insensitive).
    #[schemars(description = "Attribute name (case-insensitive)")]
    pub name: String,
    /// Optional value: strings match case-insensitively, other scalars exactly.
    #[schemars(description = "Optional value: strings match case-insensitively, other scalars exactly")]
    pub value: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct RelationParam {
    /// Relation name (e.g. 'IsDefinedBy', 'HasProperties').
    #[schemars(description = "Relation name (e.g. 'IsDefinedBy', 'HasProperties')")]
    pub name: String,
    /// Query applied to the related items.
    #[schemars(description = "Query applied to the related items")]
    pub query: Box<QueryParams>,
}

impl From<QueryParams> for QuerySpec {
    fn from(p: QueryParams) -> Self {
        Self {
            categories: p.categories,
            attributes: p.attributes.map(|attrs| {
                attrs
                    .into_iter()
                    .map(|a| AttributeSpec {
                        name: a.name,
                        value: a.value,
                    })
                    .collect()
            }),
            relation: p.relation.map(|r| RelationSpec {
                name: r.name,
                query: Box::new((*r.query).into()),
            }),
        }
    }
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct FastFindParams {
    /// Name to register the query under.
    #[schemars(description = "Name to register the query under")]
    pub name: String,
    /// The query definition.
    #[schemars(description = "The query definition")]
    pub query: QueryParams,
    /// Execute (and highlight) right after creating (default: true).
    #[schemars(description = "Execute (and highlight) right after creating (default: true)")]
    pub execute: Option<bool>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ExecuteQueryParams {
    /// Name of the query to execute.
    #[schemars(description = "Name of the query to execute")]
    pub name: String,
    /// Highlight the results in the viewer (default: true).
    #[schemars(description = "Highlight the results in the viewer (default: true)")]
    pub highlight_results: Option<bool>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct DeleteQueryParams {
    /// Name of the query to delete.
    #[schemars(description = "Name of the query to delete")]
    pub name: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ImportQueriesParams {
    /// A query export, as produced by export_queries.
    #[schemars(description = "A query export, as produced by export_queries")]
    pub queries: serde_json::Value,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SelectedElementsParams {
    /// Write the selection to this CSV file (relative paths land in the export directory).
    #[schemars(description = "Write the selection to this CSV file (relative paths land in the export directory)")]
    pub save_csv: Option<String>,
    /// Include element name/category/global id columns in the CSV (default: false).
    #[schemars(description = "Include element name/category/global id columns in the CSV (default: false)")]
    pub include_attributes: Option<bool>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ElementsInfoParams {
    /// Elements to fetch, as model id -> local element ids.
    #[schemars(description = "Elements to fetch, as model id -> local element ids")]
    pub model_id_map: ModelIdMap,
    /// Flatten property sets into name -> value maps (default: true).
    #[schemars(description = "Flatten property sets into name -> value maps (default: true)")]
    pub format_psets: Option<bool>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ExportElementsParams {
    /// Elements to export, as model id -> local element ids.
    #[schemars(description = "Elements to export, as model id -> local element ids")]
    pub model_id_map: ModelIdMap,
    /// Target CSV filename.
    #[schemars(description = "Target CSV filename")]
    pub filename: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct MeasurementsParams {
    /// Elements to measure, as model id -> local element ids.
    #[schemars(description = "Elements to measure, as model id -> local element ids")]
    pub model_id_map: ModelIdMap,
    /// Measurement kinds: volume, area, length or all (default: all).
    #[schemars(description = "Measurement kinds: volume, area, length or all (default: all)")]
    pub types: Option<Vec<String>>,
    /// Include keyword-detected custom measurements (default: true).
    #[schemars(description = "Include keyword-detected custom measurements (default: true)")]
    pub include_custom: Option<bool>,
    /// Elements fetched per batch (default: 100).
    #[schemars(description = "Elements fetched per batch (default: 100)")]
    pub batch_size: Option<usize>,
    /// Output format: summary, detailed or csv (default: summary).
    #[schemars(description = "Output format: summary, detailed or csv (default: summary)")]
    pub format: Option<String>,
    /// With format csv, also write the report to this file.
    #[schemars(description = "With format csv, also write the report to this file")]
    pub save_csv: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct DiscoveryParams {
    /// Model to sample (default: 'mcp').
    #[schemars(description = "Model to sample (default: 'mcp')")]
    pub model_id: Option<String>,
    /// Restrict sampling to these categories.
    #[schemars(description = "Restrict sampling to these categories")]
    pub categories: Option<Vec<String>>,
    /// Elements sampled per category (default: 3).
    #[schemars(description = "Elements sampled per category (default: 3)")]
    pub sample_size: Option<usize>,
    /// Write the findings to this CSV file.
    #[schemars(description = "Write the findings to this CSV file")]
    pub save_csv: Option<String>,
}

// =============================================================================
// TOOL IMPLEMENTATIONS
// =============================================================================

#[tool_router]
impl FraglinkMcp {
    pub fn new(bridge: Arc<ViewerBridge>, exports: ExportDir) -> Self {
        Self {
            bridge,
            exports,
            tool_router: Self::tool_router(),
        }
    }

    #[tool(description = "Load a fragments model file into the viewer")]
    async fn load_fragments(
        &self,
        params: Parameters<LoadFileParams>,
    ) -> Result<CallToolResult, McpError> {
        let path = params.0.path;
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| McpError::internal_error(format!("cannot read '{path}': {e}"), None))?;
        let size = bytes.len();
        self.bridge
            .broadcast(WireFrame::Binary(bytes))
            .await
            .map_err(to_mcp_error)?;
        Ok(CallToolResult::success(vec![Content::text(format!(
            "Sent {size} bytes from '{path}' to the viewer"
        ))]))
    }

    #[tool(description = "Convert and load an IFC file into the viewer")]
    async fn load_ifc(
        &self,
        params: Parameters<LoadFileParams>,
    ) -> Result<CallToolResult, McpError> {
        let path = params.0.path;
        let name = Path::new(&path)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("model")
            .to_string();
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| McpError::internal_error(format!("cannot read '{path}': {e}"), None))?;

        let size = bytes.len();
        let file_name = Path::new(&path)
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or(&path)
            .to_string();

        // Announce first so the viewer knows what the next binary frame is.
        self.bridge
            .send(&Command::LoadIfc {
                model_id: name.clone(),
                file_name,
                file_size: size as u64,
            })
            .await
            .map_err(to_mcp_error)?;
        self.bridge
            .broadcast(WireFrame::Binary(bytes))
            .await
            .map_err(to_mcp_error)?;
        Ok(CallToolResult::success(vec![Content::text(format!(
            "Sent IFC '{name}' ({size} bytes) to the viewer"
        ))]))
    }

    #[tool(description = "Highlight elements in the viewer")]
    async fn highlight_elements(
        &self,
        params: Parameters<HighlightParams>,
    ) -> Result<CallToolResult, McpError> {
        let map = params.0.model_id_map;
        let total = fraglink_core::types::total_ids(&map);
        self.bridge
            .send(&Command::Highlight { model_id_map: map })
            .await
            .map_err(to_mcp_error)?;
        Ok(CallToolResult::success(vec![Content::text(format!(
            "Highlighted {total} elements"
        ))]))
    }

    #[tool(
        description = "Create a named element query (categories, attributes, relations) and optionally execute it"
    )]
    async fn fast_find_elements(
        &self,
        params: Parameters<FastFindParams>,
    ) -> Result<CallToolResult, McpError> {
        let FastFindParams {
            name,
            query,
            execute,
        } = params.0;
        let spec: QuerySpec = query.into();
        let queries = build_query(&spec);

        self.bridge
            .send(&Command::CreateQuery {
                query_name: name.clone(),
                query_params: queries,
            })
            .await
            .map_err(to_mcp_error)?;

        if execute.unwrap_or(true) {
            tokio::time::sleep(EXECUTE_DELAY).await;
            self.bridge
                .send(&Command::ExecuteQuery {
                    query_name: name.clone(),
                    highlight_results: true,
                })
                .await
                .map_err(to_mcp_error)?;
            Ok(CallToolResult::success(vec![Content::text(format!(
                "Query '{name}' created and executed"
            ))]))
        } else {
            Ok(CallToolResult::success(vec![Content::text(format!(
                "Query '{name}' created"
            ))]))
        }
    }

    #[tool(description = "Execute a previously created query")]
    async fn execute_query(
        &self,
        params: Parameters<ExecuteQueryParams>,
    ) -> Result<CallToolResult, McpError> {
        let ExecuteQueryParams {
            name,
            highlight_results,
        } = params.0;
        self.bridge
            .send(&Command::ExecuteQuery {
                query_name: name.clone(),
                highlight_results: highlight_results.unwrap_or(true),
            })
            .await
            .map_err(to_mcp_error)?;
        Ok(CallToolResult::success(vec![Content::text(format!(
            "Execution of '{name}' requested"
        ))]))
    }

    #[tool(description = "List the names of all registered queries in the viewer")]
    async fn list_queries(&self) -> Result<CallToolResult, McpError> {
        self.bridge
            .send(&Command::ListQueries {})
            .await
            .map_err(to_mcp_error)?;
        Ok(CallToolResult::success(vec![Content::text(
            "Query listing requested; the viewer logs the names",
        )]))
    }

    #[tool(description = "Delete a registered query")]
    async fn delete_query(
        &self,
        params: Parameters<DeleteQueryParams>,
    ) -> Result<CallToolResult, McpError> {
        let name = params.0.name;
        self.bridge
            .send(&Command::DeleteQuery {
                query_name: name.clone(),
            })
            .await
            .map_err(to_mcp_error)?;
        Ok(CallToolResult::success(vec![Content::text(format!(
            "Deletion of '{name}' requested"
        ))]))
    }

    #[tool(description = "Export all registered queries from the viewer")]
    async fn export_queries(&self) -> Result<CallToolResult, McpError> {
        self.bridge
            .send(&Command::ExportQueries {})
            .await
            .map_err(to_mcp_error)?;
        Ok(CallToolResult::success(vec![Content::text(
            "Query export requested; the viewer logs the dump",
        )]))
    }

    #[tool(description = "Import a query export into the viewer registry")]
    async fn import_queries(
        &self,
        params: Parameters<ImportQueriesParams>,
    ) -> Result<CallToolResult, McpError> {
        self.bridge
            .send(&Command::ImportQueries {
                data: params.0.queries,
            })
            .await
            .map_err(to_mcp_error)?;
        Ok(CallToolResult::success(vec![Content::text(
            "Query import requested",
        )]))
    }

    #[tool(description = "Get the elements currently selected in the viewer")]
    async fn get_selected_elements(
        &self,
        params: Parameters<SelectedElementsParams>,
    ) -> Result<CallToolResult, McpError> {
        let SelectedElementsParams {
            save_csv,
            include_attributes,
        } = params.0;

        let result = self
            .bridge
            .request(&Command::GetSelectedElements {}, SELECTION_TIMEOUT)
            .await
            .map_err(to_mcp_error)?;
        let selection: fraglink_core::SelectedElementsPayload =
            serde_json::from_value(result)
                .map_err(|e| McpError::internal_error(format!("bad result payload: {e}"), None))?;

        let mut text = format!(
            "{} elements selected across {} models:\n{}",
            selection.total_elements,
            selection.model_id_map.len(),
            serde_json::to_string_pretty(&selection.model_id_map).unwrap_or_default()
        );

        if let Some(filename) = save_csv {
            let csv = if include_attributes.unwrap_or(false) {
                let info = self
                    .bridge
                    .request(
                        &Command::GetElementsInfo {
                            model_id_map: selection.model_id_map.clone(),
                            format_psets: true,
                        },
                        INFO_TIMEOUT,
                    )
                    .await
                    .map_err(to_mcp_error)?;
                let payload: ElementsInfoPayload = serde_json::from_value(info).map_err(|e| {
                    McpError::internal_error(format!("bad result payload: {e}"), None)
                })?;
                let rows: Vec<_> = payload
                    .elements
                    .into_iter()
                    .flat_map(|model| {
                        let model_id = model.model_id;
                        model
                            .elements
                            .into_iter()
                            .map(move |e| (model_id.clone(), e))
                    })
                    .collect();
                fraglink_core::report::selected_elements_csv_with_info(&rows)
            } else {
                fraglink_core::selected_elements_csv(&selection.model_id_map)
            };
            let path = self
                .exports
                .write(&filename, &csv)
                .map_err(|e| McpError::internal_error(format!("cannot write CSV: {e}"), None))?;
            text.push_str(&format!("\nCSV written to {}", path.display()));
        }

        Ok(CallToolResult::success(vec![Content::text(text)]))
    }

    #[tool(description = "Get raw data (attributes and property sets) for specific elements")]
    async fn get_elements_info(
        &self,
        params: Parameters<ElementsInfoParams>,
    ) -> Result<CallToolResult, McpError> {
        let ElementsInfoParams {
            model_id_map,
            format_psets,
        } = params.0;
        let result = self
            .bridge
            .request(
                &Command::GetElementsInfo {
                    model_id_map,
                    format_psets: format_psets.unwrap_or(true),
                },
                INFO_TIMEOUT,
            )
            .await
            .map_err(to_mcp_error)?;
        Ok(CallToolResult::success(vec![Content::text(
            serde_json::to_string_pretty(&result).unwrap_or_default(),
        )]))
    }

    #[tool(description = "Export element data to a CSV file with one column per property")]
    async fn export_elements_csv(
        &self,
        params: Parameters<ExportElementsParams>,
    ) -> Result<CallToolResult, McpError> {
        let ExportElementsParams {
            model_id_map,
            filename,
        } = params.0;
        let result = self
            .bridge
            .request(
                &Command::GetElementsInfo {
                    model_id_map,
                    format_psets: true,
                },
                EXPORT_TIMEOUT,
            )
            .await
            .map_err(to_mcp_error)?;
        let payload: ElementsInfoPayload = serde_json::from_value(result)
            .map_err(|e| McpError::internal_error(format!("bad result payload: {e}"), None))?;
        if !payload.success {
            return Err(McpError::internal_error(
                payload
                    .message
                    .unwrap_or_else(|| "element data retrieval failed".to_string()),
                None,
            ));
        }
        let csv = fraglink_core::elements_csv(&payload);
        let path = self
            .exports
            .write(&filename, &csv)
            .map_err(|e| McpError::internal_error(format!("cannot write CSV: {e}"), None))?;
        Ok(CallToolResult::success(vec![Content::text(format!(
            "Exported {} elements to {}",
            payload.total_elements,
            path.display()
        ))]))
    }

    #[tool(
        description = "Get classified measurements (volume, area, length, custom) for elements"
    )]
    async fn get_elements_measurements(
        &self,
        params: Parameters<MeasurementsParams>,
    ) -> Result<CallToolResult, McpError> {
        let MeasurementsParams {
            model_id_map,
            types,
            include_custom,
            batch_size,
            format,
            save_csv,
        } = params.0;
        let kinds = parse_kinds(types.as_deref())?;

        let result = self
            .bridge
            .request(
                &Command::GetElementsMeasurements {
                    model_id_map,
                    measurement_types: kinds,
                    include_custom: include_custom.unwrap_or(true),
                    batch_size: batch_size.unwrap_or(fraglink_core::measure::DEFAULT_BATCH_SIZE),
                },
                MEASUREMENTS_TIMEOUT,
            )
            .await
            .map_err(to_mcp_error)?;
        let payload: MeasurementsPayload = serde_json::from_value(result)
            .map_err(|e| McpError::internal_error(format!("bad result payload: {e}"), None))?;

        let text = match format.as_deref().unwrap_or("summary") {
            "detailed" => serde_json::to_string_pretty(&payload).unwrap_or_default(),
            "csv" => {
                let csv = fraglink_core::measurements_csv(&payload);
                match save_csv {
                    Some(filename) => {
                        let path = self.exports.write(&filename, &csv).map_err(|e| {
                            McpError::internal_error(format!("cannot write CSV: {e}"), None)
                        })?;
                        format!(
                            "Measurements for {} elements written to {}",
                            payload.total_elements,
                            path.display()
                        )
                    }
                    None => csv,
                }
            }
            "summary" => format_measurement_summary(&payload),
            other => {
                return Err(McpError::invalid_params(
                    format!("unknown format '{other}', expected summary, detailed or csv"),
                    None,
                ));
            }
        };
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }

    #[tool(
        description = "Sample elements per category and discover which properties look like measurements"
    )]
    async fn discover_measurement_properties(
        &self,
        params: Parameters<DiscoveryParams>,
    ) -> Result<CallToolResult, McpError> {
        let DiscoveryParams {
            model_id,
            categories,
            sample_size,
            save_csv,
        } = params.0;
        let result = self
            .bridge
            .request(
                &Command::DiscoverMeasurementProperties {
                    model_id: model_id.unwrap_or_else(|| "mcp".to_string()),
                    categories,
                    sample_size: sample_size.unwrap_or(fraglink_core::discover::DEFAULT_SAMPLE_SIZE),
                },
                DISCOVERY_TIMEOUT,
            )
            .await
            .map_err(to_mcp_error)?;
        let payload: DiscoveryPayload = serde_json::from_value(result)
            .map_err(|e| McpError::internal_error(format!("bad result payload: {e}"), None))?;

        let mut text = format_discovery(&payload);
        if let Some(filename) = save_csv {
            let csv = fraglink_core::discovery_csv(&payload);
            let path = self
                .exports
                .write(&filename, &csv)
                .map_err(|e| McpError::internal_error(format!("cannot write CSV: {e}"), None))?;
            text.push_str(&format!("\nCSV written to {}", path.display()));
        }
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }
}

// =============================================================================
// SERVER HANDLER
// =============================================================================

#[tool_handler]
impl ServerHandler for FraglinkMcp {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Fraglink building-model bridge. Use tools to load models into the \
                 connected viewer, find and highlight elements, extract classified \
                 measurements and export CSV reports."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

// =============================================================================
// FORMATTING HELPERS
// =============================================================================

fn to_mcp_error(e: fraglink_core::FraglinkError) -> McpError {
    McpError::internal_error(format!("{e}"), None)
}

fn parse_kinds(types: Option<&[String]>) -> Result<Vec<MeasurementKind>, McpError> {
    let Some(types) = types else {
        return Ok(vec![MeasurementKind::All]);
    };
    types
        .iter()
        .map(|t| match t.to_lowercase().as_str() {
            "volume" => Ok(MeasurementKind::Volume),
            "area" => Ok(MeasurementKind::Area),
            "length" => Ok(MeasurementKind::Length),
            "all" => Ok(MeasurementKind::All),
            other => Err(McpError::invalid_params(
                format!("unknown measurement type '{other}'"),
                None,
            )),
        })
        .collect()
}

fn format_measurement_summary(payload: &MeasurementsPayload) -> String {
    if !payload.success {
        return format!(
            "Measurement extraction failed: {}",
            payload.message.as_deref().unwrap_or("unknown reason")
        );
    }
    let s = &payload.summary;
    format!(
        "Measurements for {} elements ({} with measurements, {} ms):\n  \
         Total volume: {} {}\n  Total area: {} {}\n  Total length: {} {}",
        payload.total_elements,
        s.elements_with_measurements,
        payload.processing_time_ms,
        s.total_volume,
        s.volume_unit,
        s.total_area,
        s.area_unit,
        s.total_length,
        s.length_unit,
    )
}

fn format_discovery(payload: &DiscoveryPayload) -> String {
    if !payload.success {
        return format!(
            "Discovery failed: {}",
            payload.message.as_deref().unwrap_or("unknown reason")
        );
    }
    let mut parts = vec![format!(
        "Discovery for model '{}' ({} categories):",
        payload.model_id,
        payload.categories.len()
    )];
    for category in &payload.categories {
        parts.push(format!(
            "  {} ({} elements sampled):",
            category.category, category.elements_analyzed
        ));
        if category.property_sets.is_empty() {
            parts.push("    no measurement-like properties".to_string());
        }
        for pset in &category.property_sets {
            for prop in &pset.measurement_properties {
                parts.push(format!(
                    "    {} / {} -> {} (sample: {}, seen {}x, {} confidence)",
                    pset.name,
                    prop.property,
                    prop.measurement_type,
                    prop.sample_value,
                    prop.frequency,
                    prop.confidence
                ));
            }
        }
    }
    parts.join("\n")
}

// =============================================================================
// TESTS
// =============================================================================
