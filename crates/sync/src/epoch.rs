//! Stale-response guard.
//!
//! Every time the open document changes the [`Epoch`] advances. Work started
//! for the previous document holds a [`Ticket`] from the old epoch, and checks
//! it before applying any result; a stale ticket means the result belongs to
//! a document that is no longer open and must be dropped on the floor.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Clone, Debug, Default)]
pub struct Epoch(Arc<AtomicU64>);

impl Epoch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invalidate every outstanding ticket and hand out a fresh one.
    pub fn advance(&self) -> Ticket {
        let value = self.0.fetch_add(1, Ordering::SeqCst) + 1;
        Ticket { epoch: Arc::clone(&self.0), value }
    }

    /// A ticket for the current epoch, without advancing it.
    pub fn current(&self) -> Ticket {
        Ticket {
            epoch: Arc::clone(&self.0),
            value: self.0.load(Ordering::SeqCst),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Ticket {
    epoch: Arc<AtomicU64>,
    value: u64,
}

impl Ticket {
    pub fn is_current(&self) -> bool {
        self.epoch.load(Ordering::SeqCst) == self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_invalidates_older_tickets() {
        let epoch = Epoch::new();
        let first = epoch.advance();
        assert!(first.is_current());
        let second = epoch.advance();
        assert!(!first.is_current());
        assert!(second.is_current());
        assert!(epoch.current().is_current());
    }

    #[test]
    fn test_clones_share_the_epoch() {
        let epoch = Epoch::new();
        let ticket = epoch.current();
        epoch.clone().advance();
        assert!(!ticket.is_current());
    }
}
