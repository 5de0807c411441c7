use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::{ClassId, MessageId, SenderId};
use super::history::MessageHistory;

/// (sender, class, message) key of a recorded message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageIdentity {
    pub sender_id: SenderId,
    pub class_id: ClassId,
    pub message_id: MessageId,
}

impl MessageIdentity {
    pub fn new(sender_id: SenderId, class_id: ClassId, message_id: MessageId) -> Self {
        Self {
            sender_id,
            class_id,
            message_id,
        }
    }
}

/// Stable handle to a history slot; slots are never removed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HistoryId(usize);

#[derive(Debug, Default, Clone)]
struct ClassEntry {
    name: String,
    messages: BTreeMap<MessageId, HistoryId>,
    /// message name -> message id
    by_name: BTreeMap<String, MessageId>,
}

#[derive(Debug, Default, Clone)]
struct SenderEntry {
    classes: BTreeMap<ClassId, ClassEntry>,
    /// class name -> class id
    by_name: BTreeMap<String, ClassId>,
}

/// sender -> class -> message -> history, backed by an arena of histories.
///
/// Grows monotonically; every lookup returns an `Option` because readers may
/// query identities that have not been seen yet.
#[derive(Debug, Clone)]
pub struct IdentityIndex {
    histories: Vec<MessageHistory>,
    identities: Vec<MessageIdentity>,
    senders: BTreeMap<SenderId, SenderEntry>,
    capacity: usize,
}

impl IdentityIndex {
    pub fn new(capacity: usize) -> Self {
        Self {
            histories: Vec::new(),
            identities: Vec::new(),
            senders: BTreeMap::new(),
            capacity,
        }
    }

    pub fn history_capacity(&self) -> usize {
        self.capacity
    }

    /// Register a sender with no messages yet. Returns true if it was unseen.
    pub fn insert_sender(&mut self, sender_id: SenderId) -> bool {
        if self.senders.contains_key(&sender_id) {
            return false;
        }
        self.senders.insert(sender_id, SenderEntry::default());
        true
    }

    pub fn contains_sender(&self, sender_id: SenderId) -> bool {
        self.senders.contains_key(&sender_id)
    }

    /// Look up the history of an identity, creating it (and its sender and
    /// class levels) on first use. The flag is true when the slot was created.
    pub fn get_or_insert(
        &mut self,
        identity: MessageIdentity,
        class_name: &str,
        message_name: &str,
    ) -> (HistoryId, bool) {
        let sender = self.senders.entry(identity.sender_id).or_default();

        if !sender.classes.contains_key(&identity.class_id) {
            sender.by_name.insert(class_name.to_string(), identity.class_id);
        }
        let class = sender.classes.entry(identity.class_id).or_insert_with(|| ClassEntry {
            name: class_name.to_string(),
            ..ClassEntry::default()
        });

        if let Some(id) = class.messages.get(&identity.message_id) {
            return (*id, false);
        }

        let id = HistoryId(self.histories.len());
        self.histories.push(MessageHistory::new(self.capacity));
        self.identities.push(identity);
        class.messages.insert(identity.message_id, id);
        class.by_name.insert(message_name.to_string(), identity.message_id);
        (id, true)
    }

    pub fn lookup(&self, identity: MessageIdentity) -> Option<HistoryId> {
        self.senders
            .get(&identity.sender_id)?
            .classes
            .get(&identity.class_id)?
            .messages
            .get(&identity.message_id)
            .copied()
    }

    /// Resolve class and message names (as used by field references) to an
    /// identity
    pub fn resolve(
        &self,
        sender_id: SenderId,
        class_name: &str,
        message_name: &str,
    ) -> Option<MessageIdentity> {
        let sender = self.senders.get(&sender_id)?;
        let class_id = *sender.by_name.get(class_name)?;
        let message_id = *sender.classes.get(&class_id)?.by_name.get(message_name)?;
        Some(MessageIdentity::new(sender_id, class_id, message_id))
    }

    pub fn get(&self, identity: MessageIdentity) -> Option<&MessageHistory> {
        self.lookup(identity).and_then(|id| self.history(id))
    }

    pub fn history(&self, id: HistoryId) -> Option<&MessageHistory> {
        self.histories.get(id.0)
    }

    pub fn history_mut(&mut self, id: HistoryId) -> Option<&mut MessageHistory> {
        self.histories.get_mut(id.0)
    }

    pub fn identity(&self, id: HistoryId) -> Option<MessageIdentity> {
        self.identities.get(id.0).copied()
    }

    pub fn senders(&self) -> impl Iterator<Item = SenderId> + '_ {
        self.senders.keys().copied()
    }

    pub fn classes(&self, sender_id: SenderId) -> impl Iterator<Item = ClassId> + '_ {
        self.senders
            .get(&sender_id)
            .into_iter()
            .flat_map(|s| s.classes.keys().copied())
    }

    pub fn class_name(&self, sender_id: SenderId, class_id: ClassId) -> Option<&str> {
        self.senders
            .get(&sender_id)?
            .classes
            .get(&class_id)
            .map(|c| c.name.as_str())
    }

    /// Histories of one class, ordered by message id
    pub fn messages(
        &self,
        sender_id: SenderId,
        class_id: ClassId,
    ) -> impl Iterator<Item = (MessageId, &MessageHistory)> + '_ {
        self.senders
            .get(&sender_id)
            .and_then(|s| s.classes.get(&class_id))
            .into_iter()
            .flat_map(move |c| {
                c.messages
                    .iter()
                    .filter_map(move |(msg_id, id)| self.history(*id).map(|h| (*msg_id, h)))
            })
    }

    /// Every recorded identity with its history, in (sender, class, message) order
    pub fn iter(&self) -> impl Iterator<Item = (MessageIdentity, &MessageHistory)> + '_ {
        self.senders.iter().flat_map(move |(sender_id, sender)| {
            sender.classes.iter().flat_map(move |(class_id, class)| {
                class.messages.iter().filter_map(move |(message_id, id)| {
                    self.history(*id)
                        .map(|h| (MessageIdentity::new(*sender_id, *class_id, *message_id), h))
                })
            })
        })
    }

    pub fn sender_count(&self) -> usize {
        self.senders.len()
    }

    pub fn identity_count(&self) -> usize {
        self.histories.len()
    }
}

impl Default for IdentityIndex {
    fn default() -> Self {
        Self::new(super::history::DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_insert_creates_once() {
        let mut index = IdentityIndex::new(5);
        let identity = MessageIdentity::new(7, 1, 12);

        let (first, created) = index.get_or_insert(identity, "telemetry", "GPS");
        assert!(created);
        let (second, created) = index.get_or_insert(identity, "telemetry", "GPS");
        assert!(!created);
        assert_eq!(first, second);

        assert_eq!(index.identity_count(), 1);
        assert_eq!(index.history(first).unwrap().capacity(), 5);
        assert_eq!(index.identity(first), Some(identity));
    }

    #[test]
    fn test_missing_keys_are_none() {
        let mut index = IdentityIndex::new(5);
        index.insert_sender(3);

        assert!(index.get(MessageIdentity::new(3, 1, 1)).is_none());
        assert!(index.get(MessageIdentity::new(4, 1, 1)).is_none());
        assert_eq!(index.classes(9).count(), 0);
        assert_eq!(index.messages(3, 1).count(), 0);
    }

    #[test]
    fn test_resolve_by_names() {
        let mut index = IdentityIndex::new(5);
        index.get_or_insert(MessageIdentity::new(5, 1, 8), "telemetry", "ALIVE");
        index.get_or_insert(MessageIdentity::new(5, 2, 8), "datalink", "SETTING");

        assert_eq!(
            index.resolve(5, "datalink", "SETTING"),
            Some(MessageIdentity::new(5, 2, 8))
        );
        assert!(index.resolve(5, "telemetry", "SETTING").is_none());
        assert!(index.resolve(6, "telemetry", "ALIVE").is_none());
    }

    #[test]
    fn test_iteration_order() {
        let mut index = IdentityIndex::new(1);
        index.get_or_insert(MessageIdentity::new(2, 1, 3), "telemetry", "C");
        index.get_or_insert(MessageIdentity::new(1, 1, 9), "telemetry", "B");
        index.get_or_insert(MessageIdentity::new(1, 1, 2), "telemetry", "A");

        let ids: Vec<MessageIdentity> = index.iter().map(|(id, _)| id).collect();
        assert_eq!(
            ids,
            vec![
                MessageIdentity::new(1, 1, 2),
                MessageIdentity::new(1, 1, 9),
                MessageIdentity::new(2, 1, 3),
            ]
        );
        assert_eq!(index.senders().collect::<Vec<_>>(), vec![1, 2]);
    }
}
