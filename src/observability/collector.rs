use std::collections::BTreeMap;
use std::sync::Arc;

use super::SenderMetrics;
use crate::core::SenderId;

#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSnapshot {
    pub sender_id: SenderId,
    pub messages_recorded: u64,
    pub messages_seen: u64,
    pub identities_created: u64,
    pub last_reception_ns: u64,
}

pub struct MetricsCollector {
    metrics: BTreeMap<SenderId, Arc<SenderMetrics>>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            metrics: BTreeMap::new(),
        }
    }

    /// Metrics of a sender, registered on first use
    pub fn sender(&mut self, sender_id: SenderId) -> Arc<SenderMetrics> {
        self.metrics
            .entry(sender_id)
            .or_insert_with(|| Arc::new(SenderMetrics::new(sender_id)))
            .clone()
    }

    pub fn get_sender_metrics(&self, sender_id: SenderId) -> Option<Arc<SenderMetrics>> {
        self.metrics.get(&sender_id).cloned()
    }

    pub fn snapshot(&self) -> BTreeMap<SenderId, MetricsSnapshot> {
        self.metrics
            .iter()
            .map(|(id, metrics)| {
                (
                    *id,
                    MetricsSnapshot {
                        sender_id: metrics.sender_id(),
                        messages_recorded: metrics.messages_recorded(),
                        messages_seen: metrics.messages_seen(),
                        identities_created: metrics.identities_created(),
                        last_reception_ns: metrics.last_reception_ns(),
                    },
                )
            })
            .collect()
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for MetricsCollector {
    fn clone(&self) -> Self {
        Self {
            metrics: self.metrics.clone(),
        }
    }
}
