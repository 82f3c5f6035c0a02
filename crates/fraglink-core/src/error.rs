//! # Error Types
//!
//! The error taxonomy shared by every Fraglink operation.
//!
//! Per-element and per-batch failures are NOT represented here: they are
//! logged, skipped, and surfaced as counts inside the structured result
//! payloads (partial failure is a policy, not an error variant).

use thiserror::Error;

/// Errors that can occur across the Fraglink core and apps.
///
/// - No silent failures
/// - Use `Result<T, FraglinkError>` for fallible operations
/// - The core should never panic; all errors must be recoverable
#[derive(Debug, Error)]
pub enum FraglinkError {
    /// A named query, model, or element does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// No correlated reply arrived within the timeout bound.
    #[error("Timeout waiting for viewer response")]
    Timeout,

    /// A request was issued while another was still pending on the channel.
    #[error("A request is already in flight on this channel")]
    RequestInFlight,

    /// There is no active channel to send to.
    #[error("No viewer connected")]
    NoPeerConnected,

    /// Input does not satisfy a required structural contract.
    #[error("Malformed input: {0}")]
    Malformed(String),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<serde_json::Error> for FraglinkError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

impl From<std::io::Error> for FraglinkError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

// =============================================================================
// TESTS
// =============================================================================
