//! # fraglink-core
//!
//! The protocol and classification engine for Fraglink - THE LOGIC.
//!
//! This crate implements everything that sits between a controller and a
//! remote 3D building-model viewer connected by one duplex message channel:
//! query translation, request/response correlation, measurement
//! classification, discovery sampling and report serialization.
//!
//! ## Architectural Constraints
//!
//! The core:
//! - Does no network I/O; the WebSocket transport lives in the apps
//! - Reaches model data only through the [`index::ElementIndex`] trait
//! - Holds no persistent state; registries and selections die with the session

// =============================================================================
// MODULES
// =============================================================================

pub mod correlator;
pub mod discover;
pub mod error;
pub mod index;
pub mod info;
pub mod measure;
pub mod pattern;
pub mod protocol;
pub mod query;
pub mod report;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types
// =============================================================================

pub use error::FraglinkError;
pub use types::{
    ElementData, ElementMeasurements, ElementRef, MeasuredElement, Measurement, MeasurementKind,
    ModelIdMap, PropValue, Property, PropertySet,
};

// =============================================================================
// RE-EXPORTS: Protocol Plumbing
// =============================================================================

pub use correlator::Correlator;
pub use pattern::{Matcher, Pattern};
pub use protocol::{Command, Envelope, RESULT_COMMANDS, WireFrame, is_result_command};

// =============================================================================
// RE-EXPORTS: Queries and the Index
// =============================================================================

pub use index::{ElementIndex, MemoryIndex};
pub use query::{
    AttributeSpec, ExecutionOutcome, QueryNode, QueryRegistry, QuerySpec, RelationSpec,
    build_query, decode_patterns,
};

// =============================================================================
// RE-EXPORTS: Pipelines and Reports
// =============================================================================

pub use discover::{DiscoveryPayload, discover_measurement_properties};
pub use info::{ElementsInfoPayload, SelectedElementsPayload, collect_elements_info};
pub use measure::{MeasurementsPayload, classify_element, extract_measurements};
pub use report::{discovery_csv, elements_csv, measurements_csv, selected_elements_csv};
