use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::{Deserialize, Serialize};

use crate::core::{ClassId, MessageId, SenderId};

/// Notifications emitted by the recorder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecorderEvent {
    SenderDiscovered {
        sender_id: SenderId,
    },
    MessageUpdated {
        sender_id: SenderId,
        class_id: ClassId,
        message_id: MessageId,
        /// True only the first time this identity is seen
        is_new: bool,
    },
}

/// Fan-out of recorder events to any number of channel listeners
#[derive(Debug, Default)]
pub struct EventHub {
    listeners: Vec<Sender<RecorderEvent>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> Receiver<RecorderEvent> {
        let (tx, rx) = unbounded();
        self.listeners.push(tx);
        rx
    }

    /// Deliver to every listener, dropping those whose receiver is gone
    pub fn emit(&mut self, event: RecorderEvent) {
        let before = self.listeners.len();
        self.listeners.retain(|tx| tx.send(event).is_ok());
        let dropped = before - self.listeners.len();
        if dropped > 0 {
            log::debug!("Dropped {} disconnected event listener(s)", dropped);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn clear(&mut self) {
        self.listeners.clear();
    }
}
