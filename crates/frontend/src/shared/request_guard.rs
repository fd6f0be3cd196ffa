use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Номер запроса, выданный [`RequestSequencer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RequestTicket(u64);

/// Monotonic request ids. A response is applied only while its ticket is the
/// latest issued one, so the last issued request wins regardless of the
/// order in which responses resolve.
#[derive(Debug, Clone, Default)]
pub struct RequestSequencer {
    latest: Arc<AtomicU64>,
}

impl RequestSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self) -> RequestTicket {
        RequestTicket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: RequestTicket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stale_ticket_is_rejected() {
        let sequencer = RequestSequencer::new();
        let first = sequencer.issue();
        let second = sequencer.issue();

        assert!(second > first);
        assert!(!sequencer.is_current(first));
        assert!(sequencer.is_current(second));
    }

    #[test]
    fn test_clones_share_sequence() {
        let sequencer = RequestSequencer::new();
        let handle = sequencer.clone();

        let ticket = sequencer.issue();
        handle.issue();

        assert!(!sequencer.is_current(ticket));
    }
}
