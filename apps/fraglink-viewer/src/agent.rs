//! # Viewer Agent
//!
//! The viewer-side command handler: owns the loaded models, the query
//! registry and the current selection, and turns inbound wire frames into
//! zero or more reply frames.
//!
//! Query management commands are fire-and-forget: they mutate local state
//! and log, but never reply. Only the `get*` and discovery commands produce
//! result envelopes.

use fraglink_core::protocol::{Command, Envelope, WireFrame};
use fraglink_core::types::ModelIdMap;
use fraglink_core::{MemoryIndex, QueryRegistry, SelectedElementsPayload};

/// Per-session viewer state.
#[derive(Default)]
pub struct ViewerAgent {
    index: MemoryIndex,
    registry: QueryRegistry,
    selection: ModelIdMap,
    /// Name announced by a `loadIfc` command, claimed by the next binary frame.
    pending_ifc: Option<String>,
}

impl ViewerAgent {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Preload a model from parsed JSON, for startup fixtures.
    pub fn preload_model(
        &mut self,
        name: &str,
        payload: &[u8],
    ) -> Result<usize, fraglink_core::FraglinkError> {
        self.index.load_model_json(name, payload)
    }

    /// Handle one inbound frame, returning any reply frames.
    pub fn handle_frame(&mut self, frame: WireFrame) -> Vec<WireFrame> {
        match frame {
            WireFrame::Binary(bytes) => {
                self.load_binary(&bytes);
                Vec::new()
            }
            WireFrame::Text(text) => {
                let envelope = match Envelope::parse(&text) {
                    Ok(envelope) => envelope,
                    Err(e) => {
                        tracing::warn!(error = %e, "dropping malformed frame");
                        return Vec::new();
                    }
                };
                let command = match Command::from_envelope(&envelope) {
                    Ok(command) => command,
                    Err(e) => {
                        tracing::warn!(error = %e, "dropping unhandled command");
                        return Vec::new();
                    }
                };
                self.dispatch(command)
                    .into_iter()
                    .filter_map(|reply| match reply.to_text() {
                        Ok(text) => Some(WireFrame::Text(text)),
                        Err(e) => {
                            tracing::error!(error = %e, "cannot serialize reply");
                            None
                        }
                    })
                    .collect()
            }
        }
    }

    fn load_binary(&mut self, bytes: &[u8]) {
        // An announced IFC load claims the frame; otherwise it replaces the
        // default model.
        let name = self.pending_ifc.take().unwrap_or_else(|| "mcp".to_string());
        match self.index.load_model_json(&name, bytes) {
            Ok(count) => {
                tracing::info!(model = %name, elements = count, "model loaded");
            }
            Err(e) => {
                tracing::warn!(model = %name, error = %e, "model payload rejected");
            }
        }
    }

    fn dispatch(&mut self, command: Command) -> Vec<Envelope> {
        match command {
            Command::Highlight { model_id_map } => {
                let total = fraglink_core::types::total_ids(&model_id_map);
                tracing::info!(elements = total, "selection replaced");
                self.selection = model_id_map;
                Vec::new()
            }
            Command::LoadIfc {
                model_id,
                file_name,
                file_size,
            } => {
                tracing::info!(
                    model = %model_id,
                    file = %file_name,
                    bytes = file_size,
                    "awaiting IFC payload"
                );
                self.pending_ifc = Some(model_id);
                Vec::new()
            }
            Command::CreateQuery {
                query_name,
                query_params,
            } => {
                tracing::info!(query = %query_name, roots = query_params.len(), "query registered");
                self.registry.create(query_name, query_params);
                Vec::new()
            }
            Command::ExecuteQuery {
                query_name,
                highlight_results,
            } => {
                match self.registry.execute(&query_name, &self.index) {
                    Ok(outcome) => {
                        tracing::info!(
                            query = %query_name,
                            elements = outcome.total_elements,
                            "query executed"
                        );
                        if highlight_results {
                            self.selection = outcome.results;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(query = %query_name, error = %e, "query execution failed");
                    }
                }
                Vec::new()
            }
            Command::ListQueries {} => {
                tracing::info!(queries = ?self.registry.names(), "registered queries");
                Vec::new()
            }
            Command::DeleteQuery { query_name } => {
                let removed = self.registry.remove(&query_name);
                tracing::info!(query = %query_name, removed, "query deletion");
                Vec::new()
            }
            Command::ExportQueries {} => {
                match serde_json::to_string(&self.registry.export()) {
                    Ok(dump) => tracing::info!(export = %dump, "query export"),
                    Err(e) => tracing::error!(error = %e, "query export failed"),
                }
                Vec::new()
            }
            Command::ImportQueries { data } => {
                match self.registry.import(&data) {
                    Ok(count) => tracing::info!(imported = count, "queries imported"),
                    Err(e) => tracing::warn!(error = %e, "query import rejected"),
                }
                Vec::new()
            }
            Command::GetSelectedElements {} => self.reply(
                "selectedElementsResult",
                &SelectedElementsPayload::from_map(self.selection.clone()),
            ),
            Command::GetElementsInfo {
                model_id_map,
                format_psets,
            } => {
                let payload = fraglink_core::collect_elements_info(
                    &self.index,
                    &model_id_map,
                    format_psets,
                );
                self.reply("elementsInfoResult", &payload)
            }
            Command::GetElementsMeasurements {
                model_id_map,
                measurement_types,
                include_custom,
                batch_size,
            } => {
                let payload = fraglink_core::extract_measurements(
                    &self.index,
                    &model_id_map,
                    &measurement_types,
                    include_custom,
                    batch_size,
                );
                self.reply("elementsMeasurementsResult", &payload)
            }
            Command::DiscoverMeasurementProperties {
                model_id,
                categories,
                sample_size,
            } => {
                let payload = fraglink_core::discover_measurement_properties(
                    &self.index,
                    &model_id,
                    categories.as_deref(),
                    sample_size,
                );
                self.reply("discoveryResult", &payload)
            }
        }
    }

    fn reply(&self, command: &str, payload: &impl serde::Serialize) -> Vec<Envelope> {
        match Envelope::new(command, payload) {
            Ok(envelope) => vec![envelope],
            Err(e) => {
                tracing::error!(command = %command, error = %e, "cannot build result");
                Vec::new()
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use serde_json::json;

    fn model_payload() -> Vec<u8> {
        json!({
            "elements": [
                {
                    "localId": 1,
                    "name": "Wall A",
                    "category": "IFCWALL",
                    "propertySets": [{
                        "name": "BaseQuantities",
                        "properties": [{ "name": "GrossVolume", "value": 12.5 }]
                    }]
                },
                { "localId": 2, "name": "Door", "category": "IFCDOOR" }
            ]
        })
        .to_string()
        .into_bytes()
    }

    fn text(value: serde_json::Value) -> WireFrame {
        WireFrame::Text(value.to_string())
    }

    fn reply_envelope(replies: &[WireFrame]) -> Envelope {
        assert_eq!(replies.len(), 1);
        match &replies[0] {
            WireFrame::Text(t) => Envelope::parse(t).unwrap(),
            WireFrame::Binary(_) => panic!("expected a text reply"),
        }
    }

    #[test]
    fn binary_frame_loads_the_default_model() {
        let mut agent = ViewerAgent::new();
        let replies = agent.handle_frame(WireFrame::Binary(model_payload()));
        assert!(replies.is_empty());
        assert!(agent.index.has_model("mcp"));
    }

    #[test]
    fn load_ifc_names_the_next_binary_frame() {
        let mut agent = ViewerAgent::new();
        agent.handle_frame(text(json!({
            "command": "loadIfc",
            "payload": { "modelId": "office", "fileName": "office.ifc", "fileSize": 128 }
        })));
        agent.handle_frame(WireFrame::Binary(model_payload()));
        assert!(agent.index.has_model("office"));
        assert!(!agent.index.has_model("mcp"));
    }

    #[test]
    fn create_and_execute_updates_the_selection() {
        let mut agent = ViewerAgent::new();
        agent.handle_frame(WireFrame::Binary(model_payload()));

        let replies = agent.handle_frame(text(json!({
            "command": "createQuery",
            "payload": {
                "queryName": "walls",
                "queryParams": [{ "categories": ["/wall/i"] }]
            }
        })));
        assert!(replies.is_empty());

        let replies = agent.handle_frame(text(json!({
            "command": "executeQuery",
            "payload": { "queryName": "walls" }
        })));
        // Fire-and-forget: no reply, but the selection moved.
        assert!(replies.is_empty());

        let replies = agent.handle_frame(text(json!({
            "command": "getSelectedElements",
            "payload": {}
        })));
        let envelope = reply_envelope(&replies);
        assert_eq!(envelope.command, "selectedElementsResult");
        assert_eq!(envelope.payload["totalElements"], 1);
        assert_eq!(envelope.payload["modelIdMap"]["mcp"], json!([1]));
    }

    #[test]
    fn measurements_request_gets_a_result() {
        let mut agent = ViewerAgent::new();
        agent.handle_frame(WireFrame::Binary(model_payload()));

        let replies = agent.handle_frame(text(json!({
            "command": "getElementsMeasurements",
            "payload": { "modelIdMap": { "mcp": [1, 2] } }
        })));
        let envelope = reply_envelope(&replies);
        assert_eq!(envelope.command, "elementsMeasurementsResult");
        assert_eq!(envelope.payload["success"], true);
        assert_eq!(envelope.payload["summary"]["totalVolume"], "12.50");
    }

    #[test]
    fn malformed_and_unknown_frames_are_dropped() {
        let mut agent = ViewerAgent::new();
        assert!(agent.handle_frame(WireFrame::Text("garbage".into())).is_empty());
        assert!(
            agent
                .handle_frame(text(json!({ "command": "teleport", "payload": {} })))
                .is_empty()
        );
    }

    #[test]
    fn discovery_reports_missing_model_in_payload() {
        let mut agent = ViewerAgent::new();
        let replies = agent.handle_frame(text(json!({
            "command": "discoverMeasurementProperties",
            "payload": { "modelId": "ghost" }
        })));
        let envelope = reply_envelope(&replies);
        assert_eq!(envelope.command, "discoveryResult");
        assert_eq!(envelope.payload["success"], false);
    }
}
