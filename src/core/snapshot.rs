use std::cmp::Ordering;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use super::message::{ClassId, DecodedMessage, MessageField, MessageId};

/// Current wall-clock time in nanoseconds since the epoch
pub fn now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

/// One received instance of a message, stamped at reception
#[derive(Debug, Clone)]
pub struct MessageSnapshot {
    message: Arc<DecodedMessage>,
    /// Reception time, nanoseconds since epoch
    timestamp: u64,
}

impl MessageSnapshot {
    /// Wrap a message received now
    pub fn new(message: Arc<DecodedMessage>) -> Self {
        Self::at(message, now_ns())
    }

    pub fn at(message: Arc<DecodedMessage>, timestamp: u64) -> Self {
        Self { message, timestamp }
    }

    pub fn message(&self) -> &DecodedMessage {
        &self.message
    }

    pub fn shared_message(&self) -> Arc<DecodedMessage> {
        self.message.clone()
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Set the timestamp to now and return it
    pub fn retime(&mut self) -> u64 {
        self.timestamp = now_ns();
        self.timestamp
    }

    pub fn name(&self) -> &str {
        &self.message.name
    }

    pub fn class_name(&self) -> &str {
        &self.message.class_name
    }

    pub fn class_id(&self) -> ClassId {
        self.message.class_id
    }

    pub fn message_id(&self) -> MessageId {
        self.message.message_id
    }

    pub fn field(&self, name: &str) -> Option<&MessageField> {
        self.message.field(name)
    }
}

impl PartialEq for MessageSnapshot {
    fn eq(&self, other: &Self) -> bool {
        self.timestamp == other.timestamp && self.name() == other.name()
    }
}

impl PartialOrd for MessageSnapshot {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match self.timestamp.cmp(&other.timestamp) {
            Ordering::Equal if self.name() != other.name() => None,
            ord => Some(ord),
        }
    }
}
