//! Stale-request guard.
//!
//! Every request for a resource takes a ticket; only the holder of the most recently issued
//! ticket may apply its result.

use std::sync::atomic::{AtomicU64, Ordering};

/// Resources whose updates are sequenced independently.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Resource {
    /// Login and the persisted token it writes.
    Session,
    /// Calculation submissions and the result panel.
    Calculation,
    /// History fetches and the record cache.
    History,
}

impl Resource {
    const fn slot(self) -> usize {
        match self {
            Self::Session => 0,
            Self::Calculation => 1,
            Self::History => 2,
        }
    }

    /// Stable name for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Session => "session",
            Self::Calculation => "calculation",
            Self::History => "history",
        }
    }
}

/// Proof that a request was issued; compare against the sequencer before applying results.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ticket {
    resource: Resource,
    sequence: u64,
}

impl Ticket {
    /// Resource the ticket belongs to.
    #[must_use]
    pub const fn resource(&self) -> Resource {
        self.resource
    }

    /// Sequence number within the resource (starts at 1).
    #[must_use]
    pub const fn sequence(&self) -> u64 {
        self.sequence
    }
}

/// Monotonic per-resource counters.
#[derive(Debug, Default)]
pub struct RequestSequencer {
    latest: [AtomicU64; 3],
}

impl RequestSequencer {
    /// Fresh sequencer with no tickets issued.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue the next ticket for `resource`, superseding all earlier ones.
    pub fn issue(&self, resource: Resource) -> Ticket {
        let sequence = self.latest[resource.slot()].fetch_add(1, Ordering::SeqCst) + 1;
        Ticket { resource, sequence }
    }

    /// Whether `ticket` is still the latest issued for its resource.
    #[must_use]
    pub fn is_current(&self, ticket: &Ticket) -> bool {
        self.latest[ticket.resource.slot()].load(Ordering::SeqCst) == ticket.sequence
    }
}
