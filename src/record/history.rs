use std::collections::VecDeque;

use crate::core::{ClassId, MessageField, MessageId, MessageSnapshot};
use super::errors::{RecordError, RecordResult};

pub const DEFAULT_CAPACITY: usize = 10;

/// Bounded, newest-first log of the snapshots received for one
/// (sender, class, message) identity, with a smoothed inter-arrival period
#[derive(Debug, Clone)]
pub struct MessageHistory {
    queue: VecDeque<MessageSnapshot>,
    capacity: usize,
    /// Smoothed inter-arrival period in nanoseconds
    period: Option<f64>,
    /// Timestamp of the last snapshot pushed to the front, kept even when
    /// the capacity is zero
    front_timestamp: Option<u64>,
}

impl MessageHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: VecDeque::with_capacity(capacity),
            capacity,
            period: None,
            front_timestamp: None,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn period(&self) -> Option<f64> {
        self.period
    }

    /// Insert a snapshot in the most recent slot, evicting the oldest one
    /// when full
    pub fn append(&mut self, snapshot: MessageSnapshot) {
        let ts = snapshot.timestamp();
        if let Some(previous) = self.front_timestamp {
            let delta = ts as f64 - previous as f64;
            self.period = Some(match self.period {
                None => delta,
                Some(period) => (delta + period) / 2.0,
            });
        }

        self.push_front(snapshot);
    }

    /// Insert several snapshots at once.
    ///
    /// The batch is sorted by timestamp and its average spacing
    /// `(last - first) / count` is averaged once with the existing period.
    /// This does not give the same result as appending the snapshots one by
    /// one.
    pub fn append_batch(&mut self, snapshots: impl IntoIterator<Item = MessageSnapshot>) {
        let mut sorted: Vec<MessageSnapshot> = snapshots.into_iter().collect();
        if sorted.is_empty() {
            return;
        }

        sorted.sort_by_key(|s| s.timestamp());

        let first = sorted[0].timestamp() as f64;
        let last = sorted[sorted.len() - 1].timestamp() as f64;
        let candidate = (last - first) / sorted.len() as f64;

        self.period = Some(match self.period {
            None => candidate,
            Some(period) => (candidate + period) / 2.0,
        });

        for snapshot in sorted {
            self.push_front(snapshot);
        }
    }

    fn push_front(&mut self, snapshot: MessageSnapshot) {
        self.front_timestamp = Some(snapshot.timestamp());
        self.queue.push_front(snapshot);
        self.queue.truncate(self.capacity);
    }

    pub fn newest(&self) -> RecordResult<&MessageSnapshot> {
        self.queue.front().ok_or(RecordError::NoMessage)
    }

    /// Mean reception frequency in Hz
    pub fn mean_frequency(&self) -> RecordResult<f64> {
        self.period
            .map(|period| 1e9 / period)
            .ok_or(RecordError::NoMessage)
    }

    pub fn sample_count(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Snapshots from newest to oldest
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &MessageSnapshot> {
        self.queue.iter()
    }

    pub fn field_value(&self, name: &str) -> RecordResult<&MessageField> {
        let newest = self.newest()?;
        newest.field(name).ok_or_else(|| RecordError::FieldNotFound {
            message: newest.name().to_string(),
            field: name.to_string(),
        })
    }

    pub fn message_name(&self) -> RecordResult<&str> {
        Ok(self.newest()?.name())
    }

    pub fn class_name(&self) -> RecordResult<&str> {
        Ok(self.newest()?.class_name())
    }

    pub fn class_id(&self) -> RecordResult<ClassId> {
        Ok(self.newest()?.class_id())
    }

    pub fn message_id(&self) -> RecordResult<MessageId> {
        Ok(self.newest()?.message_id())
    }
}

impl Default for MessageHistory {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
