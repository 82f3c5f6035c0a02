//! # Request Correlator
//!
//! Pairs outbound requests with inbound result envelopes over one duplex
//! channel. The channel has no message ids, so correlation is positional:
//! at most one request is pending at a time, and the next inbound envelope
//! whose command is on the result allow-list settles it.
//!
//! Inbound traffic that is not a result (notifications, echoes) passes
//! through untouched; a result arriving with no pending request is stale
//! and gets logged and dropped.

use crate::error::FraglinkError;
use crate::protocol::{is_result_command, Envelope};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::oneshot;

/// Single-slot request/response correlator.
///
/// `begin` claims the slot, `resolve` settles it from inbound traffic, and
/// `wait` bounds the whole exchange with a timeout. Shared behind an `Arc`
/// between the sender task and the receive loop.
#[derive(Debug, Default)]
pub struct Correlator {
    pending: Mutex<Option<oneshot::Sender<serde_json::Value>>>,
}

impl Correlator {
    /// Create an idle correlator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<oneshot::Sender<serde_json::Value>>> {
        // A poisoned lock only means another thread panicked mid-store;
        // the Option inside is still coherent.
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Claim the pending slot for a new request.
    ///
    /// Fails with `RequestInFlight` while a previous request is unsettled.
    pub fn begin(&self) -> Result<oneshot::Receiver<serde_json::Value>, FraglinkError> {
        let mut slot = self.slot();
        if slot.is_some() {
            return Err(FraglinkError::RequestInFlight);
        }
        let (tx, rx) = oneshot::channel();
        *slot = Some(tx);
        Ok(rx)
    }

    /// Release the pending slot without settling it.
    pub fn cancel(&self) {
        self.slot().take();
    }

    /// Whether a request is currently pending.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.slot().is_some()
    }

    /// Offer an inbound envelope as a potential result.
    ///
    /// Returns true when the envelope settled the pending request. Non-result
    /// commands and stale results return false so the caller can route or
    /// drop them.
    pub fn resolve(&self, envelope: &Envelope) -> bool {
        if !is_result_command(&envelope.command) {
            return false;
        }
        let Some(tx) = self.slot().take() else {
            tracing::warn!(command = %envelope.command, "dropping stale result, no request pending");
            return false;
        };
        // Send fails only if the waiter already gave up (timeout).
        tx.send(envelope.payload.clone()).is_ok()
    }

    /// Await the settlement of a claimed request, bounded by `timeout`.
    ///
    /// On timeout the slot is released so the channel is usable again; a
    /// result for the timed-out request arriving later is treated as stale.
    pub async fn wait(
        &self,
        rx: oneshot::Receiver<serde_json::Value>,
        timeout: Duration,
    ) -> Result<serde_json::Value, FraglinkError> {
        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(payload)) => Ok(payload),
            Ok(Err(_)) => {
                // Sender dropped without settling: the channel went away.
                self.cancel();
                Err(FraglinkError::NoPeerConnected)
            }
            Err(_) => {
                self.cancel();
                Err(FraglinkError::Timeout)
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

    fn result_envelope(payload: serde_json::Value) -> Envelope {
        Envelope {
            command: "elementsInfoResult".to_string(),
            payload,
        }
    }

    #[tokio::test]
    async fn request_settles_on_result() {
        let correlator = Correlator::new();
        let rx = correlator.begin().unwrap();

        assert!(correlator.resolve(&result_envelope(json!({ "success": true }))));
        let payload = correlator.wait(rx, Duration::from_secs(5)).await.unwrap();
        assert_eq!(payload["success"], true);
        assert!(!correlator.is_pending());
    }

    #[tokio::test]
    async fn second_request_is_rejected_while_pending() {
        let correlator = Correlator::new();
        let _rx = correlator.begin().unwrap();
        assert!(matches!(
            correlator.begin(),
            Err(FraglinkError::RequestInFlight)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_releases_the_slot() {
        let correlator = Correlator::new();
        let rx = correlator.begin().unwrap();

        let err = correlator.wait(rx, Duration::from_secs(5)).await;
        assert!(matches!(err, Err(FraglinkError::Timeout)));
        assert!(!correlator.is_pending());

        // The channel is usable again immediately.
        assert!(correlator.begin().is_ok());
    }

    #[tokio::test]
    async fn stale_result_is_dropped() {
        let correlator = Correlator::new();
        assert!(!correlator.resolve(&result_envelope(json!({}))));
    }

    #[tokio::test]
    async fn non_result_commands_pass_through() {
        let correlator = Correlator::new();
        let rx = correlator.begin().unwrap();

        let notification = Envelope {
            command: "fragmentsLoaded".to_string(),
            payload: json!({}),
        };
        assert!(!correlator.resolve(&notification));
        // The request is still pending afterwards.
        assert!(correlator.is_pending());

        assert!(correlator.resolve(&result_envelope(json!({ "ok": 1 }))));
        let payload = correlator.wait(rx, Duration::from_secs(1)).await.unwrap();
        assert_eq!(payload["ok"], 1);
    }

    #[tokio::test]
    async fn late_result_after_timeout_is_stale() {
        let correlator = Correlator::new();
        let rx = correlator.begin().unwrap();
        drop(rx); // waiter gave up

        // resolve takes the slot but the send fails.
        assert!(!correlator.resolve(&result_envelope(json!({}))));
        assert!(!correlator.is_pending());
    }
}
