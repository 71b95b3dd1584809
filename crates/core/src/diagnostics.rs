//! Injected diagnostics sink for scheduling decisions
//!
//! The dispatcher never prints or holds global debug state; everything it
//! wants to say about suppression and window lifecycle goes through a
//! sink the owner passes in.

use crate::dispatcher::PolicyKind;
use std::time::Duration;

/// Receiver for the dispatcher's scheduling diagnostics
///
/// Callbacks are invoked outside the dispatcher's lock, so a sink may read
/// the dispatcher's accessors. They run on whichever thread made the
/// scheduling call (or on the timer task for `fired`), so implementations
/// must be cheap and non-blocking.
pub trait DiagnosticsSink: Send + Sync {
    /// A coalescing window opened with the given interval
    fn window_opened(&self, kind: PolicyKind, interval: Duration) {
        let _ = (kind, interval);
    }

    /// A call was received without an immediate fire; `suppressed` is the
    /// running count for the current window
    fn call_suppressed(&self, kind: PolicyKind, suppressed: u64) {
        let _ = (kind, suppressed);
    }

    /// The timer fired and the coalesced action is about to run;
    /// `coalesced` is how many calls the window absorbed
    fn fired(&self, kind: PolicyKind, coalesced: u64) {
        let _ = (kind, coalesced);
    }

    /// The dispatcher was disposed; `cancelled_pending` is true if a
    /// pending timer was cancelled by the disposal
    fn disposed(&self, cancelled_pending: bool) {
        let _ = cancelled_pending;
    }
}

/// Default sink: reports through `tracing`
pub struct TracingSink;

impl DiagnosticsSink for TracingSink {
    fn window_opened(&self, kind: PolicyKind, interval: Duration) {
        tracing::trace!(?kind, ?interval, "coalescing window opened");
    }

    fn call_suppressed(&self, kind: PolicyKind, suppressed: u64) {
        tracing::trace!(?kind, suppressed, "call coalesced into pending window");
    }

    fn fired(&self, kind: PolicyKind, coalesced: u64) {
        tracing::debug!(?kind, coalesced, "coalesced action firing");
    }

    fn disposed(&self, cancelled_pending: bool) {
        if cancelled_pending {
            tracing::debug!("dispatcher disposed with a pending timer; cancelled");
        } else {
            tracing::trace!("dispatcher disposed");
        }
    }
}
