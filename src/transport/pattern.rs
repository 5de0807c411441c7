use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::SenderId;

/// Subscription filters understood by the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubscriptionPattern {
    /// Every message, whatever its sender
    All,
    /// Messages from one numeric sender
    Sender(SenderId),
    /// Messages whose sender token is alphabetic (ground agents)
    AlphaPrefixed,
}

impl SubscriptionPattern {
    /// Pattern used to record a sender. Id 0 stands for every
    /// alphabetic-prefixed sender.
    pub fn for_sender(sender_id: SenderId) -> Self {
        if sender_id == 0 {
            SubscriptionPattern::AlphaPrefixed
        } else {
            SubscriptionPattern::Sender(sender_id)
        }
    }

    pub fn as_regex_str(&self) -> String {
        match self {
            SubscriptionPattern::All => r"^(\S+ .*)".to_string(),
            SubscriptionPattern::Sender(id) => format!("^({} .*)", id),
            SubscriptionPattern::AlphaPrefixed => "^([a-zA-Z]+ .*)".to_string(),
        }
    }

    pub fn to_regex(&self) -> Result<Regex, regex::Error> {
        Regex::new(&self.as_regex_str())
    }
}

impl std::fmt::Display for SubscriptionPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.as_regex_str())
    }
}
