use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::core::SenderId;
use crate::record::{IdentityIndex, MessageIdentity};

/// A pinned field of one message identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PinKey {
    pub identity: MessageIdentity,
    pub field: String,
}

impl PinKey {
    pub fn new(identity: MessageIdentity, field: impl Into<String>) -> Self {
        Self {
            identity,
            field: field.into(),
        }
    }
}

/// Pin state of a message, derived from its fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PinState {
    Unpinned,
    Partial,
    Pinned,
}

#[derive(Debug, Clone, Default)]
pub struct PinSet {
    pins: BTreeSet<PinKey>,
    across_senders: bool,
}

impl PinSet {
    pub fn new(across_senders: bool) -> Self {
        Self {
            pins: BTreeSet::new(),
            across_senders,
        }
    }

    pub fn across_senders(&self) -> bool {
        self.across_senders
    }

    pub fn set_across_senders(&mut self, enabled: bool) {
        self.across_senders = enabled;
    }

    pub fn is_pinned(&self, key: &PinKey) -> bool {
        self.pins.contains(key)
    }

    pub fn len(&self) -> usize {
        self.pins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PinKey> {
        self.pins.iter()
    }

    pub fn for_sender(&self, sender_id: SenderId) -> impl Iterator<Item = &PinKey> {
        self.pins.iter().filter(move |k| k.identity.sender_id == sender_id)
    }

    /// Every identity sharing class and message ids with `identity`,
    /// including itself when pinning across senders is enabled
    fn targets(&self, identity: MessageIdentity, index: &IdentityIndex) -> Vec<MessageIdentity> {
        if !self.across_senders {
            return vec![identity];
        }

        let mut targets: Vec<MessageIdentity> = index
            .senders()
            .map(|sender_id| MessageIdentity::new(sender_id, identity.class_id, identity.message_id))
            .filter(|candidate| index.lookup(*candidate).is_some())
            .collect();
        if !targets.contains(&identity) {
            targets.push(identity);
        }
        targets
    }

    /// Pin or unpin a field. Returns the number of entries that changed.
    pub fn set_field(&mut self, key: &PinKey, pinned: bool, index: &IdentityIndex) -> usize {
        let mut changed = 0;
        for identity in self.targets(key.identity, index) {
            let target = PinKey::new(identity, key.field.clone());
            let did_change = if pinned {
                self.pins.insert(target)
            } else {
                self.pins.remove(&target)
            };
            if did_change {
                changed += 1;
            }
        }
        changed
    }

    pub fn toggle_field(&mut self, key: &PinKey, index: &IdentityIndex) -> bool {
        let pinned = !self.is_pinned(key);
        self.set_field(key, pinned, index);
        pinned
    }

    /// Pin or unpin every field of a message, using the field set of its
    /// newest snapshot
    pub fn set_message(&mut self, identity: MessageIdentity, pinned: bool, index: &IdentityIndex) -> usize {
        let fields: Vec<String> = match index.get(identity).and_then(|h| h.newest().ok()) {
            Some(newest) => newest.message().field_names().map(str::to_string).collect(),
            None => return 0,
        };

        fields
            .iter()
            .map(|field| self.set_field(&PinKey::new(identity, field.clone()), pinned, index))
            .sum()
    }

    pub fn message_state<'a>(
        &self,
        identity: MessageIdentity,
        fields: impl IntoIterator<Item = &'a str>,
    ) -> PinState {
        let mut pinned = 0;
        let mut total = 0;
        for field in fields {
            total += 1;
            if self.pins.contains(&PinKey::new(identity, field)) {
                pinned += 1;
            }
        }

        match pinned {
            0 => PinState::Unpinned,
            n if n == total => PinState::Pinned,
            _ => PinState::Partial,
        }
    }
}
