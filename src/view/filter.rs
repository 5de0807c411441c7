use regex::{Regex, RegexBuilder};

use crate::core::SenderId;

use super::errors::ViewError;
use super::pins::PinState;
use super::tree::{ClassNode, FieldNode, MessageNode, MessageTree, SenderNode};

/// Row filter of the message tree: a case-insensitive pattern and a
/// "pinned only" switch. Sender and class rows are never matched themselves.
#[derive(Debug, Clone, Default)]
pub struct RowFilter {
    regex: Option<Regex>,
    pinned_only: bool,
}

impl RowFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty pattern clears the text filter
    pub fn set_pattern(&mut self, pattern: &str) -> Result<(), ViewError> {
        if pattern.is_empty() {
            self.regex = None;
            return Ok(());
        }

        let regex = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| ViewError::InvalidPattern(e.to_string()))?;
        self.regex = Some(regex);
        Ok(())
    }

    pub fn pattern(&self) -> Option<&str> {
        self.regex.as_ref().map(Regex::as_str)
    }

    pub fn set_pinned_only(&mut self, pinned_only: bool) {
        self.pinned_only = pinned_only;
    }

    pub fn pinned_only(&self) -> bool {
        self.pinned_only
    }

    pub fn is_active(&self) -> bool {
        self.regex.is_some() || self.pinned_only
    }

    fn message_matches(&self, message: &MessageNode) -> bool {
        match &self.regex {
            Some(regex) => regex.is_match(&message.name) || regex.is_match(&message.message_id().to_string()),
            None => true,
        }
    }

    pub fn accepts_field(&self, message: &MessageNode, field: &FieldNode) -> bool {
        if self.pinned_only && !field.pinned {
            return false;
        }
        match &self.regex {
            Some(regex) => regex.is_match(&field.name) || self.message_matches(message),
            None => true,
        }
    }

    pub fn accepts_message(&self, message: &MessageNode) -> bool {
        if self.pinned_only && message.pin_state == PinState::Unpinned {
            return false;
        }
        self.message_matches(message) || message.fields.iter().any(|f| self.accepts_field(message, f))
    }

    fn filter_message(&self, message: &MessageNode) -> Option<MessageNode> {
        if !self.accepts_message(message) {
            return None;
        }
        let fields = message
            .fields
            .iter()
            .filter(|f| self.accepts_field(message, f))
            .cloned()
            .collect();
        Some(MessageNode {
            fields,
            ..message.clone()
        })
    }

    fn filter_sender(&self, sender: &SenderNode) -> SenderNode {
        let classes = sender
            .classes
            .iter()
            .map(|class| ClassNode {
                class_id: class.class_id,
                name: class.name.clone(),
                messages: class.messages.iter().filter_map(|m| self.filter_message(m)).collect(),
            })
            .filter(|class| !self.is_active() || !class.messages.is_empty())
            .collect();

        SenderNode {
            sender_id: sender.sender_id,
            classes,
        }
    }

    /// Visible copy of the tree. Sender rows are always kept; class rows
    /// left without messages are dropped while a filter is active.
    pub fn apply(&self, tree: &MessageTree) -> Vec<SenderNode> {
        tree.senders().iter().map(|s| self.filter_sender(s)).collect()
    }

    /// Number of visible message rows under a sender
    pub fn message_count(&self, tree: &MessageTree, sender_id: SenderId) -> usize {
        tree.sender(sender_id)
            .map_or(0, |sender| {
                sender
                    .classes
                    .iter()
                    .flat_map(|c| c.messages.iter())
                    .filter(|m| self.accepts_message(m))
                    .count()
            })
    }

    /// Whether a sender is small enough to be fully expanded
    pub fn should_expand(&self, tree: &MessageTree, sender_id: SenderId, threshold: usize) -> bool {
        self.message_count(tree, sender_id) < threshold
    }
}
