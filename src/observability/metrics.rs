use std::sync::atomic::{AtomicU64, Ordering};

use crate::core::SenderId;

/// Ingestion counters for one sender
pub struct SenderMetrics {
    sender_id: SenderId,
    messages_recorded: AtomicU64,
    messages_seen: AtomicU64,
    identities_created: AtomicU64,
    last_reception_ns: AtomicU64,
}

impl SenderMetrics {
    pub fn new(sender_id: SenderId) -> Self {
        Self {
            sender_id,
            messages_recorded: AtomicU64::new(0),
            messages_seen: AtomicU64::new(0),
            identities_created: AtomicU64::new(0),
            last_reception_ns: AtomicU64::new(0),
        }
    }

    pub fn sender_id(&self) -> SenderId {
        self.sender_id
    }

    /// Messages stored in a history
    pub fn messages_recorded(&self) -> u64 {
        self.messages_recorded.load(Ordering::Relaxed)
    }

    /// Messages observed by the discovery subscription
    pub fn messages_seen(&self) -> u64 {
        self.messages_seen.load(Ordering::Relaxed)
    }

    pub fn identities_created(&self) -> u64 {
        self.identities_created.load(Ordering::Relaxed)
    }

    /// Reception time of the last recorded message (ns since epoch, 0 if none)
    pub fn last_reception_ns(&self) -> u64 {
        self.last_reception_ns.load(Ordering::Relaxed)
    }

    pub fn record_message(&self, timestamp: u64, new_identity: bool) {
        self.messages_recorded.fetch_add(1, Ordering::Relaxed);
        if new_identity {
            self.identities_created.fetch_add(1, Ordering::Relaxed);
        }
        self.last_reception_ns.fetch_max(timestamp, Ordering::Relaxed);
    }

    pub fn record_seen(&self) {
        self.messages_seen.fetch_add(1, Ordering::Relaxed);
    }
}
