//! # Wire Protocol
//!
//! Message envelope and typed command set exchanged between the controller
//! and the viewer over one duplex channel.
//!
//! Text frames carry `{ "command": ..., "payload": ... }` envelopes in both
//! directions; binary frames carry raw model payloads and are never
//! envelope-encoded. Result payload shapes live next to the code that
//! produces them (`measure`, `discover`, `info`).

use crate::error::FraglinkError;
use crate::query::QueryNode;
use crate::types::ModelIdMap;
use serde::{Deserialize, Serialize};

// =============================================================================
// FRAMES AND ENVELOPES
// =============================================================================

/// One frame on the duplex channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireFrame {
    /// A JSON envelope, serialized.
    Text(String),
    /// A raw model payload.
    Binary(Vec<u8>),
}

/// Untyped message envelope: command tag plus free-form payload.
///
/// The correlator operates at this level; typed dispatch happens via
/// [`Command`] on the viewer side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub command: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl Envelope {
    /// Build an envelope from a command tag and a serializable payload.
    pub fn new(
        command: impl Into<String>,
        payload: impl Serialize,
    ) -> Result<Self, FraglinkError> {
        Ok(Self {
            command: command.into(),
            payload: serde_json::to_value(payload)?,
        })
    }

    /// Parse a text frame. Anything that is not a JSON object with a string
    /// `command` field is malformed.
    pub fn parse(text: &str) -> Result<Self, FraglinkError> {
        let envelope: Self = serde_json::from_str(text)
            .map_err(|e| FraglinkError::Malformed(format!("bad envelope: {e}")))?;
        if envelope.command.is_empty() {
            return Err(FraglinkError::Malformed("empty command".into()));
        }
        Ok(envelope)
    }

    /// Serialize to a text frame.
    pub fn to_text(&self) -> Result<String, FraglinkError> {
        Ok(serde_json::to_string(self)?)
    }
}

// =============================================================================
// RESULT COMMANDS
// =============================================================================

/// Command tags the correlator accepts as replies. Any other inbound
/// command never settles a pending request.
pub const RESULT_COMMANDS: &[&str] = &[
    "selectedElementsResult",
    "elementsInfoResult",
    "elementsMeasurementsResult",
    "discoveryResult",
];

/// Whether a command tag names a correlated result.
#[must_use]
pub fn is_result_command(command: &str) -> bool {
    RESULT_COMMANDS.contains(&command)
}

// =============================================================================
// TYPED COMMANDS (controller -> viewer)
// =============================================================================

/// Typed view of the controller-to-viewer command set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "command",
    content = "payload",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum Command {
    /// Replace the viewer selection with the given elements.
    Highlight { model_id_map: ModelIdMap },
    /// Announce a raw source-model buffer on the next binary frame.
    LoadIfc {
        model_id: String,
        #[serde(default)]
        file_name: String,
        #[serde(default)]
        file_size: u64,
    },
    /// Register a named query.
    CreateQuery {
        query_name: String,
        query_params: Vec<QueryNode>,
    },
    /// Run a named query.
    ExecuteQuery {
        query_name: String,
        #[serde(default = "default_true")]
        highlight_results: bool,
    },
    /// List registered query names.
    ListQueries {},
    /// Remove a named query.
    DeleteQuery { query_name: String },
    /// Dump the full registry.
    ExportQueries {},
    /// Restore a registry dump.
    ImportQueries { data: serde_json::Value },
    /// Ask for the current selection.
    GetSelectedElements {},
    /// Ask for raw element data.
    GetElementsInfo {
        model_id_map: ModelIdMap,
        #[serde(default = "default_true")]
        format_psets: bool,
    },
    /// Ask for classified measurements.
    GetElementsMeasurements {
        model_id_map: ModelIdMap,
        #[serde(default = "default_kinds")]
        measurement_types: Vec<crate::types::MeasurementKind>,
        #[serde(default = "default_true")]
        include_custom: bool,
        #[serde(default = "default_batch_size")]
        batch_size: usize,
    },
    /// Sample property sets and report measurement-like properties.
    DiscoverMeasurementProperties {
        #[serde(default = "default_model_id")]
        model_id: String,
        #[serde(default)]
        categories: Option<Vec<String>>,
        #[serde(default = "default_sample_size")]
        sample_size: usize,
    },
}

fn default_true() -> bool {
    true
}

fn default_kinds() -> Vec<crate::types::MeasurementKind> {
    vec![crate::types::MeasurementKind::All]
}

fn default_batch_size() -> usize {
    crate::measure::DEFAULT_BATCH_SIZE
}

fn default_model_id() -> String {
    "mcp".to_string()
}

fn default_sample_size() -> usize {
    crate::discover::DEFAULT_SAMPLE_SIZE
}

impl Command {
    /// Parse a typed command out of an envelope.
    pub fn from_envelope(envelope: &Envelope) -> Result<Self, FraglinkError> {
        let raw = serde_json::json!({
            "command": envelope.command,
            "payload": envelope.payload,
        });
        serde_json::from_value(raw).map_err(|e| {
            FraglinkError::Malformed(format!("unknown command '{}': {e}", envelope.command))
        })
    }

    /// Serialize to a text frame.
    pub fn to_text(&self) -> Result<String, FraglinkError> {
        Ok(serde_json::to_string(self)?)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::types::MeasurementKind;
    use serde_json::json;

    #[test]
    fn envelope_roundtrip() {
        let env = Envelope::new("highlight", json!({ "modelIdMap": { "mcp": [1, 2] } })).unwrap();
        let text = env.to_text().unwrap();
        assert_eq!(Envelope::parse(&text).unwrap(), env);
    }

    #[test]
    fn malformed_envelopes_are_rejected() {
        assert!(Envelope::parse("not json").is_err());
        assert!(Envelope::parse("[1,2]").is_err());
        assert!(Envelope::parse(r#"{"payload":{}}"#).is_err());
        assert!(Envelope::parse(r#"{"command":"","payload":{}}"#).is_err());
    }

    #[test]
    fn result_allow_list() {
        assert!(is_result_command("elementsMeasurementsResult"));
        assert!(is_result_command("discoveryResult"));
        assert!(!is_result_command("highlight"));
        assert!(!is_result_command("fragmentsLoaded"));
    }

    #[test]
    fn command_tags_are_camel_case() {
        let cmd = Command::ExecuteQuery {
            query_name: "walls".to_string(),
            highlight_results: true,
        };
        let value = serde_json::to_value(&cmd).unwrap();
        assert_eq!(value["command"], "executeQuery");
        assert_eq!(value["payload"]["queryName"], "walls");
        assert_eq!(value["payload"]["highlightResults"], true);
    }

    #[test]
    fn measurement_command_defaults() {
        let env = Envelope::parse(
            r#"{"command":"getElementsMeasurements","payload":{"modelIdMap":{"mcp":[1]}}}"#,
        )
        .unwrap();
        let cmd = Command::from_envelope(&env).unwrap();
        match cmd {
            Command::GetElementsMeasurements {
                measurement_types,
                include_custom,
                batch_size,
                ..
            } => {
                assert_eq!(measurement_types, vec![MeasurementKind::All]);
                assert!(include_custom);
                assert_eq!(batch_size, 100);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn discovery_command_defaults() {
        let env = Envelope::parse(
            r#"{"command":"discoverMeasurementProperties","payload":{}}"#,
        )
        .unwrap();
        match Command::from_envelope(&env).unwrap() {
            Command::DiscoverMeasurementProperties {
                model_id,
                categories,
                sample_size,
            } => {
                assert_eq!(model_id, "mcp");
                assert!(categories.is_none());
                assert_eq!(sample_size, 3);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn unknown_command_is_malformed() {
        let env = Envelope::parse(r#"{"command":"teleport","payload":{}}"#).unwrap();
        assert!(Command::from_envelope(&env).is_err());
    }
}
