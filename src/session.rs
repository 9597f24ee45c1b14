//! Last-query-wins coordination for interactive callers.
//!
//! A user may issue a new query before the previous one finishes. Only the
//! most recently issued query's result may be surfaced; anything produced
//! for an abandoned query is discarded wholesale, never shown as if
//! complete.
//!
//! The bundled CLIs run one query at a time on a blocking loop and do not
//! need this gate. It exists for interactive front-ends that dispatch each
//! query to a worker while the user keeps typing.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Monotonic identifier for one issued query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct QueryTicket(u64);

/// Issues tickets and remembers which query is the latest.
#[derive(Debug, Default)]
pub struct QuerySession {
    latest: AtomicU64,
}

impl QuerySession {
    /// Creates a session with no queries issued yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new query, superseding all earlier tickets.
    pub fn begin(&self) -> QueryTicket {
        QueryTicket(self.latest.fetch_add(1, Ordering::AcqRel) + 1)
    }

    /// Whether the ticket still belongs to the most recently issued query.
    pub fn is_current(&self, ticket: QueryTicket) -> bool {
        self.latest.load(Ordering::Acquire) == ticket.0
    }
}

/// Holds the single result surfaced to the user.
///
/// Publishing is rejected for any ticket that is not the session's latest,
/// and for any ticket older than the slot's current occupant, so a slow
/// abandoned query can never overwrite a newer result.
#[derive(Debug, Default)]
pub struct ResultSlot<T> {
    inner: Mutex<Option<(u64, T)>>,
}

impl<T> ResultSlot<T> {
    /// Creates an empty slot.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(None),
        }
    }

    /// Offers a finished result. Returns `true` if it became the surfaced
    /// result, `false` if it was stale and discarded.
    pub fn publish(&self, session: &QuerySession, ticket: QueryTicket, value: T) -> bool {
        if !session.is_current(ticket) {
            return false;
        }
        let Ok(mut guard) = self.inner.lock() else {
            return false;
        };
        if let Some((held, _)) = guard.as_ref() {
            if *held > ticket.0 {
                return false;
            }
        }
        *guard = Some((ticket.0, value));
        true
    }

    /// Removes and returns the surfaced result, if any.
    pub fn take(&self) -> Option<T> {
        let mut guard = self.inner.lock().ok()?;
        guard.take().map(|(_, value)| value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_ticket_publishes() {
        let session = QuerySession::new();
        let slot = ResultSlot::new();
        let ticket = session.begin();
        assert!(slot.publish(&session, ticket, "answer"));
        assert_eq!(slot.take(), Some("answer"));
        assert_eq!(slot.take(), None);
    }

    #[test]
    fn abandoned_query_result_is_discarded() {
        let session = QuerySession::new();
        let slot = ResultSlot::new();
        let stale = session.begin();
        let fresh = session.begin();
        // The slow first query finishes after the second was issued.
        assert!(!slot.publish(&session, stale, "old"));
        assert!(slot.publish(&session, fresh, "new"));
        assert_eq!(slot.take(), Some("new"));
    }

    #[test]
    fn stale_publish_never_overwrites_a_newer_result() {
        let session = QuerySession::new();
        let slot = ResultSlot::new();
        let first = session.begin();
        let second = session.begin();
        assert!(slot.publish(&session, second, "new"));
        assert!(!slot.publish(&session, first, "old"));
        assert_eq!(slot.take(), Some("new"));
    }
}
