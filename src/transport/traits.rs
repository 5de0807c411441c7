use std::sync::Arc;

use anyhow::Result;
use crossbeam_channel::Sender;
use serde::{Deserialize, Serialize};

use crate::core::{DecodedMessage, SenderId};
use super::pattern::SubscriptionPattern;

/// Handle of an installed subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BindId(pub u64);

/// One message handed over by the transport, tagged with the subscription
/// it matched
#[derive(Debug, Clone)]
pub struct Delivery {
    pub bind: BindId,
    pub sender_id: SenderId,
    pub message: Arc<DecodedMessage>,
}

/// Publish/subscribe bus collaborator.
///
/// Transports may deliver from their own threads; deliveries go through the
/// sink channel so the recorder consumes them on its own thread.
pub trait Transport: Send {
    /// Unique transport identifier (e.g., "ivy", "simulated")
    fn transport_id(&self) -> &str;

    fn start(&mut self) -> Result<()>;

    fn stop(&mut self) -> Result<()>;

    fn is_running(&self) -> bool;

    fn subscribe(&mut self, pattern: &SubscriptionPattern, sink: Sender<Delivery>) -> Result<BindId>;

    fn unsubscribe(&mut self, bind: BindId) -> Result<()>;
}
