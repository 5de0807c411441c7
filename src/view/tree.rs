use std::collections::HashMap;

use serde::Serialize;

use crate::addressing::{encode, encode_range, FieldIndex};
use crate::core::{ClassId, FieldValue, MessageField, MessageId, SenderId};
use crate::record::{IdentityIndex, MessageHistory, MessageIdentity, RecorderEvent};

use super::errors::ViewError;
use super::format::{alt_value, alt_value_text, value_text};
use super::liveness::{frequency_sort_key, reception_text, Liveness, DEFAULT_EXTINCTION_SECS};
use super::pins::{PinKey, PinSet, PinState};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldNode {
    pub name: String,
    pub type_str: String,
    pub value: FieldValue,
    pub value_text: String,
    pub alt_value: Option<f64>,
    pub alt_value_text: String,
    pub scale: f64,
    pub is_array: bool,
    pub pinned: bool,
}

impl FieldNode {
    fn from_field(field: &MessageField) -> Self {
        let mut node = Self {
            name: field.name.clone(),
            type_str: field.type_str.clone(),
            value: field.value.clone(),
            value_text: String::new(),
            alt_value: None,
            alt_value_text: String::new(),
            scale: 1.0,
            is_array: false,
            pinned: false,
        };
        node.update(field);
        node
    }

    fn update(&mut self, field: &MessageField) {
        self.value = field.value.clone();
        self.value_text = value_text(field);
        self.alt_value = alt_value(field);
        self.alt_value_text = alt_value_text(field);
        self.scale = field.scale();
        self.is_array = field.is_array();
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageNode {
    pub identity: MessageIdentity,
    pub name: String,
    pub age_secs: f64,
    pub frequency_hz: f64,
    pub reception: String,
    pub sort_key: i64,
    pub liveness: Liveness,
    pub pin_state: PinState,
    pub fields: Vec<FieldNode>,
}

impl MessageNode {
    fn new(identity: MessageIdentity, name: impl Into<String>) -> Self {
        Self {
            identity,
            name: name.into(),
            age_secs: 0.0,
            frequency_hz: 0.0,
            reception: String::new(),
            sort_key: 0,
            liveness: Liveness::from_age(0.0, DEFAULT_EXTINCTION_SECS),
            pin_state: PinState::Unpinned,
            fields: Vec::new(),
        }
    }

    pub fn message_id(&self) -> MessageId {
        self.identity.message_id
    }

    pub fn field(&self, name: &str) -> Option<&FieldNode> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    fn update_fields(&mut self, history: &MessageHistory) {
        let Ok(newest) = history.newest() else {
            return;
        };

        for field in &newest.message().fields {
            match self.fields.iter_mut().find(|f| f.name == field.name) {
                Some(node) => node.update(field),
                None => self.fields.push(FieldNode::from_field(field)),
            }
        }
    }

    fn update_times(&mut self, history: &MessageHistory, now: u64, extinction_secs: f64) {
        let Ok(newest) = history.newest() else {
            return;
        };

        self.age_secs = now.saturating_sub(newest.timestamp()) as f64 / 1e9;
        self.frequency_hz = history.mean_frequency().unwrap_or(0.0);
        self.reception = reception_text(self.age_secs, self.frequency_hz);
        self.sort_key = frequency_sort_key(self.frequency_hz);
        self.liveness = Liveness::from_age(self.age_secs, extinction_secs);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassNode {
    pub class_id: ClassId,
    pub name: String,
    pub messages: Vec<MessageNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SenderNode {
    pub sender_id: SenderId,
    pub classes: Vec<ClassNode>,
}

impl SenderNode {
    pub fn class(&self, class_id: ClassId) -> Option<&ClassNode> {
        self.classes.iter().find(|c| c.class_id == class_id)
    }

    pub fn message_count(&self) -> usize {
        self.classes.iter().map(|c| c.messages.len()).sum()
    }
}

/// One row of the tree, borrowed
#[derive(Debug, Clone, Copy)]
pub enum ViewNode<'a> {
    Sender(&'a SenderNode),
    Class(&'a ClassNode),
    Message(&'a MessageNode),
    Field(&'a FieldNode),
}

impl ViewNode<'_> {
    pub fn label(&self) -> String {
        match self {
            ViewNode::Sender(s) => s.sender_id.to_string(),
            ViewNode::Class(c) => c.name.clone(),
            ViewNode::Message(m) => m.name.clone(),
            ViewNode::Field(f) => f.name.clone(),
        }
    }
}

/// Presentation tree of everything recorded: sender / class / message /
/// field rows. Rows are only ever appended, so row positions stay valid.
#[derive(Debug, Clone)]
pub struct MessageTree {
    senders: Vec<SenderNode>,
    sender_rows: HashMap<SenderId, usize>,
    class_rows: HashMap<(SenderId, ClassId), usize>,
    message_rows: HashMap<MessageIdentity, usize>,
    extinction_secs: f64,
}

impl Default for MessageTree {
    fn default() -> Self {
        Self::new(DEFAULT_EXTINCTION_SECS)
    }
}

impl MessageTree {
    pub fn new(extinction_secs: f64) -> Self {
        Self {
            senders: Vec::new(),
            sender_rows: HashMap::new(),
            class_rows: HashMap::new(),
            message_rows: HashMap::new(),
            extinction_secs,
        }
    }

    pub fn extinction_secs(&self) -> f64 {
        self.extinction_secs
    }

    pub fn senders(&self) -> &[SenderNode] {
        &self.senders
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }

    pub fn sender(&self, sender_id: SenderId) -> Option<&SenderNode> {
        self.sender_rows.get(&sender_id).map(|row| &self.senders[*row])
    }

    pub fn class(&self, sender_id: SenderId, class_id: ClassId) -> Option<&ClassNode> {
        let sender = self.sender(sender_id)?;
        let row = self.class_rows.get(&(sender_id, class_id))?;
        sender.classes.get(*row)
    }

    pub fn message(&self, identity: MessageIdentity) -> Option<&MessageNode> {
        let class = self.class(identity.sender_id, identity.class_id)?;
        let row = self.message_rows.get(&identity)?;
        class.messages.get(*row)
    }

    pub fn message_count(&self, sender_id: SenderId) -> usize {
        self.sender(sender_id).map_or(0, SenderNode::message_count)
    }

    /// Add a sender row if missing. Returns true when a row was created.
    pub fn ensure_sender(&mut self, sender_id: SenderId) -> bool {
        if self.sender_rows.contains_key(&sender_id) {
            return false;
        }
        self.sender_rows.insert(sender_id, self.senders.len());
        self.senders.push(SenderNode {
            sender_id,
            classes: Vec::new(),
        });
        true
    }

    pub fn create_class(
        &mut self,
        sender_id: SenderId,
        class_id: ClassId,
        name: impl Into<String>,
    ) -> Result<(), ViewError> {
        let name = name.into();
        self.ensure_sender(sender_id);
        let sender_row = self.sender_rows[&sender_id];

        if let Some(row) = self.class_rows.get(&(sender_id, class_id)) {
            return Err(ViewError::ClassAlreadyExists {
                sender_id,
                class_id,
                new_name: name,
                existing_name: self.senders[sender_row].classes[*row].name.clone(),
            });
        }

        let classes = &mut self.senders[sender_row].classes;
        self.class_rows.insert((sender_id, class_id), classes.len());
        classes.push(ClassNode {
            class_id,
            name,
            messages: Vec::new(),
        });
        Ok(())
    }

    /// Create or update the row of one identity from its history.
    /// Returns true when a message row was created.
    fn upsert_message(
        &mut self,
        identity: MessageIdentity,
        index: &IdentityIndex,
        now: u64,
    ) -> Result<bool, ViewError> {
        let Some(history) = index.get(identity) else {
            return Ok(false);
        };
        let Ok(newest) = history.newest() else {
            return Ok(false);
        };

        let sender_id = identity.sender_id;
        if !self.class_rows.contains_key(&(sender_id, identity.class_id)) {
            let class_name = index
                .class_name(sender_id, identity.class_id)
                .unwrap_or_else(|| newest.class_name());
            self.create_class(sender_id, identity.class_id, class_name)?;
        }

        let sender_row = self.sender_rows[&sender_id];
        let class_row = self.class_rows[&(sender_id, identity.class_id)];
        let messages = &mut self.senders[sender_row].classes[class_row].messages;

        let created = !self.message_rows.contains_key(&identity);
        if created {
            self.message_rows.insert(identity, messages.len());
            messages.push(MessageNode::new(identity, newest.name()));
        }

        let node = &mut messages[self.message_rows[&identity]];
        node.update_fields(history);
        node.update_times(history, now, self.extinction_secs);
        Ok(created)
    }

    /// Bring the tree up to date with one recorder event
    pub fn apply_event(
        &mut self,
        event: &RecorderEvent,
        index: &IdentityIndex,
        now: u64,
    ) -> Result<bool, ViewError> {
        match *event {
            RecorderEvent::SenderDiscovered { sender_id } => Ok(self.ensure_sender(sender_id)),
            RecorderEvent::MessageUpdated {
                sender_id,
                class_id,
                message_id,
                ..
            } => self.upsert_message(MessageIdentity::new(sender_id, class_id, message_id), index, now),
        }
    }

    /// Refresh every row from the index, creating rows missed by events.
    /// Returns the number of message rows created.
    pub fn refresh(&mut self, index: &IdentityIndex, now: u64) -> Result<usize, ViewError> {
        for sender_id in index.senders() {
            self.ensure_sender(sender_id);
        }

        let mut created = 0;
        for (identity, _) in index.iter() {
            if self.upsert_message(identity, index, now)? {
                created += 1;
            }
        }
        Ok(created)
    }

    /// Copy pin marks onto field rows and derive message pin states
    pub fn sync_pins(&mut self, pins: &PinSet) {
        for message in self
            .senders
            .iter_mut()
            .flat_map(|s| s.classes.iter_mut())
            .flat_map(|c| c.messages.iter_mut())
        {
            let identity = message.identity;
            for field in &mut message.fields {
                field.pinned = pins.is_pinned(&PinKey::new(identity, field.name.as_str()));
            }
            message.pin_state = pins.message_state(identity, message.fields.iter().map(|f| f.name.as_str()));
        }
    }

    /// Reference text for dragging a field row into a plot. Array fields
    /// default to their full range.
    pub fn field_reference(
        &self,
        identity: MessageIdentity,
        field: &str,
        range: Option<(usize, usize)>,
    ) -> Option<String> {
        let class = self.class(identity.sender_id, identity.class_id)?;
        let message = self.message(identity)?;
        let node = message.field(field)?;
        let index = FieldIndex::new(
            identity.sender_id,
            class.name.clone(),
            message.name.clone(),
            field,
            None,
        );

        if node.is_array {
            let (lo, hi) = match range {
                Some(range) => range,
                None => (0, node.value.len().checked_sub(1)?),
            };
            Some(encode_range(&index, lo, hi, node.scale))
        } else {
            Some(encode(&index, node.scale))
        }
    }

    /// Depth-first rows with their depth (sender = 0)
    pub fn walk(&self) -> Vec<(usize, ViewNode<'_>)> {
        let mut rows = Vec::new();
        for sender in &self.senders {
            rows.push((0, ViewNode::Sender(sender)));
            for class in &sender.classes {
                rows.push((1, ViewNode::Class(class)));
                for message in &class.messages {
                    rows.push((2, ViewNode::Message(message)));
                    rows.extend(message.fields.iter().map(|f| (3, ViewNode::Field(f))));
                }
            }
        }
        rows
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::core::{DecodedMessage, MessageSnapshot};

    const SECOND: u64 = 1_000_000_000;

    fn attitude(phi: f64) -> DecodedMessage {
        DecodedMessage::new(1, "telemetry", 6, "ATTITUDE")
            .with_field(
                MessageField::new("phi", "float", FieldValue::Float(phi))
                    .with_unit("rad")
                    .with_alt_unit("deg", 57.29578),
            )
            .with_field(MessageField::new(
                "values",
                "int16[]",
                FieldValue::Array(vec![FieldValue::Int(1), FieldValue::Int(2), FieldValue::Int(3)]),
            ))
    }

    fn record(index: &mut IdentityIndex, sender_id: SenderId, message: DecodedMessage, ts: u64) -> MessageIdentity {
        let identity = MessageIdentity::new(sender_id, message.class_id, message.message_id);
        let (id, _) = index.get_or_insert(identity, &message.class_name, &message.name);
        index
            .history_mut(id)
            .unwrap()
            .append(MessageSnapshot::at(Arc::new(message), ts));
        identity
    }

    #[test]
    fn test_create_class_twice_fails() {
        let mut tree = MessageTree::default();
        tree.create_class(1, 1, "telemetry").unwrap();

        let err = tree.create_class(1, 1, "datalink").unwrap_err();
        assert_eq!(
            err,
            ViewError::ClassAlreadyExists {
                sender_id: 1,
                class_id: 1,
                new_name: "datalink".to_string(),
                existing_name: "telemetry".to_string(),
            }
        );
        assert_eq!(tree.sender(1).unwrap().classes.len(), 1);
    }

    #[test]
    fn test_apply_event_builds_rows() {
        let mut index = IdentityIndex::new(10);
        let identity = record(&mut index, 7, attitude(1.0), SECOND);
        let mut tree = MessageTree::default();

        let event = RecorderEvent::MessageUpdated {
            sender_id: 7,
            class_id: 1,
            message_id: 6,
            is_new: true,
        };
        assert!(tree.apply_event(&event, &index, SECOND).unwrap());
        assert!(!tree.apply_event(&event, &index, SECOND).unwrap());

        let message = tree.message(identity).unwrap();
        assert_eq!(message.name, "ATTITUDE");
        assert_eq!(message.fields.len(), 2);

        let phi = message.field("phi").unwrap();
        assert_eq!(phi.value_text, "1.0 rad");
        assert_eq!(phi.alt_value_text, "57.296 deg");
        assert_eq!(phi.scale, 57.29578);
        assert!(message.field("values").unwrap().is_array);
    }

    #[test]
    fn test_event_for_unknown_identity_is_ignored() {
        let index = IdentityIndex::new(10);
        let mut tree = MessageTree::default();
        let event = RecorderEvent::MessageUpdated {
            sender_id: 1,
            class_id: 1,
            message_id: 1,
            is_new: true,
        };

        assert!(!tree.apply_event(&event, &index, 0).unwrap());
        assert!(tree.is_empty());
    }

    #[test]
    fn test_refresh_updates_times() {
        let mut index = IdentityIndex::new(10);
        record(&mut index, 3, attitude(0.1), SECOND);
        let identity = record(&mut index, 3, attitude(0.2), 2 * SECOND);
        let mut tree = MessageTree::default();

        assert_eq!(tree.refresh(&index, 2 * SECOND).unwrap(), 1);
        let fresh = tree.message(identity).unwrap();
        assert_eq!(fresh.frequency_hz, 1.0);
        assert_eq!(fresh.reception, " 0s (1.0 Hz) ");
        assert_eq!(fresh.liveness.background.g, 255);

        assert_eq!(tree.refresh(&index, 12 * SECOND).unwrap(), 0);
        let stale = tree.message(identity).unwrap();
        assert_eq!(stale.age_secs, 10.0);
        assert_eq!(stale.liveness.background.g, 0);
        assert_eq!(stale.field("phi").unwrap().value, FieldValue::Float(0.2));
    }

    #[test]
    fn test_field_reference() {
        let mut index = IdentityIndex::new(10);
        let identity = record(&mut index, 5, attitude(1.0), SECOND);
        let mut tree = MessageTree::default();
        tree.refresh(&index, SECOND).unwrap();

        assert_eq!(
            tree.field_reference(identity, "phi", None).unwrap(),
            "5:telemetry:ATTITUDE:phi:57.29578"
        );
        assert_eq!(
            tree.field_reference(identity, "values", None).unwrap(),
            "5:telemetry:ATTITUDE:values[0-2]:1.0"
        );
        assert_eq!(
            tree.field_reference(identity, "values", Some((1, 1))).unwrap(),
            "5:telemetry:ATTITUDE:values[1]:1.0"
        );
        assert!(tree.field_reference(identity, "missing", None).is_none());
    }

    #[test]
    fn test_sync_pins_and_walk() {
        let mut index = IdentityIndex::new(10);
        let identity = record(&mut index, 2, attitude(1.0), SECOND);
        let mut tree = MessageTree::default();
        tree.refresh(&index, SECOND).unwrap();

        let mut pins = PinSet::new(false);
        pins.set_field(&PinKey::new(identity, "phi"), true, &index);
        tree.sync_pins(&pins);

        let message = tree.message(identity).unwrap();
        assert_eq!(message.pin_state, PinState::Partial);
        assert!(message.field("phi").unwrap().pinned);

        let labels: Vec<(usize, String)> = tree.walk().iter().map(|(d, n)| (*d, n.label())).collect();
        assert_eq!(
            labels,
            vec![
                (0, "2".to_string()),
                (1, "telemetry".to_string()),
                (2, "ATTITUDE".to_string()),
                (3, "phi".to_string()),
                (3, "values".to_string()),
            ]
        );
    }
}
