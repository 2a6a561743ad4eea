// ABOUTME: Request supersession for a single logical view: newer requests make older results stale.
// ABOUTME: ViewRequests hands out monotonically numbered tickets and cancels the previous ticket's fetch.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio_util::sync::CancellationToken;

#[derive(Debug, Default)]
struct Inner {
    latest: AtomicU64,
    in_flight: Mutex<Option<CancellationToken>>,
}

/// Tracks the latest request for one view.
///
/// Cloning shares the same sequence, so a handle can be moved into each
/// spawned request.
#[derive(Debug, Clone, Default)]
pub struct ViewRequests {
    inner: Arc<Inner>,
}

/// Identifies one request issued by [`ViewRequests::begin`].
#[derive(Debug, Clone)]
pub struct RequestTicket {
    seq: u64,
    cancel: CancellationToken,
}

impl RequestTicket {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Fires when a newer request for the same view begins.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }
}

impl ViewRequests {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new request, superseding and cancelling the previous one.
    pub fn begin(&self) -> RequestTicket {
        let cancel = CancellationToken::new();
        let mut in_flight = self
            .inner
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let seq = self.inner.latest.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(previous) = in_flight.replace(cancel.clone()) {
            previous.cancel();
        }
        tracing::debug!(seq, "view request started");
        RequestTicket { seq, cancel }
    }

    /// Returns true if no newer request has begun since `ticket`.
    pub fn is_current(&self, ticket: &RequestTicket) -> bool {
        self.inner.latest.load(Ordering::SeqCst) == ticket.seq
    }

    /// Pass `value` through only if `ticket` is still the latest request.
    pub fn accept<T>(&self, ticket: &RequestTicket, value: T) -> Option<T> {
        if self.is_current(ticket) {
            Some(value)
        } else {
            tracing::debug!(seq = ticket.seq, "discarding superseded result");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_is_monotonic() {
        let view = ViewRequests::new();
        let a = view.begin();
        let b = view.begin();
        let c = view.begin();
        assert!(a.seq() < b.seq() && b.seq() < c.seq());
    }

    #[test]
    fn only_latest_is_accepted() {
        let view = ViewRequests::new();
        let first = view.begin();
        assert_eq!(view.accept(&first, 1), Some(1));

        let second = view.begin();
        assert!(!view.is_current(&first));
        assert_eq!(view.accept(&first, 1), None);
        assert_eq!(view.accept(&second, 2), Some(2));
    }

    #[test]
    fn new_ticket_cancels_previous() {
        let view = ViewRequests::new();
        let first = view.begin();
        assert!(!first.cancel_token().is_cancelled());

        let second = view.begin();
        assert!(first.cancel_token().is_cancelled());
        assert!(!second.cancel_token().is_cancelled());
    }

    #[test]
    fn clones_share_sequence() {
        let view = ViewRequests::new();
        let handle = view.clone();
        let first = view.begin();
        let _second = handle.begin();
        assert!(!view.is_current(&first));
    }
}
