use std::collections::BTreeMap;
use std::sync::Arc;

use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::{Deserialize, Serialize};

use crate::config::RecorderConfig;
use crate::core::{now_ns, DecodedMessage, MessageSnapshot, SenderId};
use crate::observability::MetricsCollector;
use crate::transport::{BindId, Delivery, SubscriptionPattern, Transport};
use super::errors::{RecordError, RecordResult};
use super::events::{EventHub, RecorderEvent};
use super::history::MessageHistory;
use super::index::{IdentityIndex, MessageIdentity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecorderStatus {
    Running,
    Stopped,
}

/// Recording state of a sender that has been seen on the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenderState {
    Discovered,
    Recording(BindId),
}

/// Subscribes to the bus, discovers senders and routes their messages into
/// the identity index.
///
/// The recorder is driven from a single thread: the transport pushes
/// deliveries into a channel and `pump` drains it.
pub struct Recorder {
    name: String,
    transport: Box<dyn Transport>,
    index: IdentityIndex,
    /// sender id -> recording subscription (None when only discovered)
    known_senders: BTreeMap<SenderId, Option<BindId>>,
    events: EventHub,
    metrics: MetricsCollector,
    delivery_tx: Sender<Delivery>,
    delivery_rx: Receiver<Delivery>,
    discovery_bind: Option<BindId>,
    status: RecorderStatus,
}

impl Recorder {
    /// Subscribe to every message for sender discovery and start the transport
    pub fn new(
        name: impl Into<String>,
        transport: impl Transport + 'static,
        buffer_size: usize,
    ) -> RecordResult<Self> {
        let (delivery_tx, delivery_rx) = unbounded();
        let mut transport: Box<dyn Transport> = Box::new(transport);

        let discovery_bind = transport.subscribe(&SubscriptionPattern::All, delivery_tx.clone())?;
        transport.start()?;

        let name = name.into();
        log::info!(
            "Recorder '{}' started on {} transport (buffer size {})",
            name,
            transport.transport_id(),
            buffer_size
        );

        Ok(Self {
            name,
            transport,
            index: IdentityIndex::new(buffer_size),
            known_senders: BTreeMap::new(),
            events: EventHub::new(),
            metrics: MetricsCollector::new(),
            delivery_tx,
            delivery_rx,
            discovery_bind: Some(discovery_bind),
            status: RecorderStatus::Running,
        })
    }

    pub fn from_config(config: &RecorderConfig, transport: impl Transport + 'static) -> RecordResult<Self> {
        Self::new(config.name.clone(), transport, config.buffer_size)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> RecorderStatus {
        self.status
    }

    pub fn buffer_size(&self) -> usize {
        self.index.history_capacity()
    }

    pub fn subscribe_events(&mut self) -> Receiver<RecorderEvent> {
        self.events.subscribe()
    }

    pub fn index(&self) -> &IdentityIndex {
        &self.index
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    pub fn known_senders(&self) -> Vec<SenderId> {
        self.known_senders.keys().copied().collect()
    }

    pub fn sender_state(&self, sender_id: SenderId) -> Option<SenderState> {
        self.known_senders.get(&sender_id).map(|bind| match bind {
            Some(bind) => SenderState::Recording(*bind),
            None => SenderState::Discovered,
        })
    }

    pub fn is_recording(&self, sender_id: SenderId) -> bool {
        matches!(self.sender_state(sender_id), Some(SenderState::Recording(_)))
    }

    pub fn history(&self, identity: MessageIdentity) -> Option<&MessageHistory> {
        self.index.get(identity)
    }

    pub fn history_by_name(
        &self,
        sender_id: SenderId,
        class_name: &str,
        message_name: &str,
    ) -> Option<&MessageHistory> {
        self.index
            .resolve(sender_id, class_name, message_name)
            .and_then(|identity| self.index.get(identity))
    }

    fn ensure_running(&self) -> RecordResult<()> {
        match self.status {
            RecorderStatus::Running => Ok(()),
            RecorderStatus::Stopped => Err(RecordError::Stopped),
        }
    }

    /// Register a sender the first time it shows up. Returns true if it was new.
    fn detect_sender(&mut self, sender_id: SenderId) -> bool {
        if self.known_senders.contains_key(&sender_id) {
            return false;
        }

        self.known_senders.insert(sender_id, None);
        self.index.insert_sender(sender_id);
        self.metrics.sender(sender_id);
        log::info!("Discovered sender {}", sender_id);
        self.events.emit(RecorderEvent::SenderDiscovered { sender_id });
        true
    }

    /// Ingest a message received now
    pub fn on_message(
        &mut self,
        sender_id: SenderId,
        message: impl Into<Arc<DecodedMessage>>,
    ) -> RecordResult<(MessageIdentity, bool)> {
        self.on_message_at(sender_id, message, now_ns())
    }

    /// Ingest a message with an explicit reception timestamp (ns)
    pub fn on_message_at(
        &mut self,
        sender_id: SenderId,
        message: impl Into<Arc<DecodedMessage>>,
        timestamp: u64,
    ) -> RecordResult<(MessageIdentity, bool)> {
        self.record_snapshot(sender_id, MessageSnapshot::at(message.into(), timestamp))
    }

    /// Re-inject a previously received snapshot, stamped with the current time
    pub fn replay(
        &mut self,
        sender_id: SenderId,
        mut snapshot: MessageSnapshot,
    ) -> RecordResult<(MessageIdentity, bool)> {
        snapshot.retime();
        self.record_snapshot(sender_id, snapshot)
    }

    fn record_snapshot(
        &mut self,
        sender_id: SenderId,
        snapshot: MessageSnapshot,
    ) -> RecordResult<(MessageIdentity, bool)> {
        self.ensure_running()?;

        let identity = MessageIdentity::new(sender_id, snapshot.class_id(), snapshot.message_id());
        self.detect_sender(sender_id);

        let (slot, is_new) =
            self.index
                .get_or_insert(identity, snapshot.class_name(), snapshot.name());
        if is_new {
            log::debug!(
                "New message {}:{}:{} ({:?})",
                sender_id,
                snapshot.class_name(),
                snapshot.name(),
                identity
            );
        }

        let timestamp = snapshot.timestamp();
        if let Some(history) = self.index.history_mut(slot) {
            history.append(snapshot);
        }
        self.metrics.sender(sender_id).record_message(timestamp, is_new);

        self.events.emit(RecorderEvent::MessageUpdated {
            sender_id,
            class_id: identity.class_id,
            message_id: identity.message_id,
            is_new,
        });

        Ok((identity, is_new))
    }

    /// Drain deliveries handed over by the transport. Returns how many were
    /// processed.
    pub fn pump(&mut self) -> usize {
        if self.status == RecorderStatus::Stopped {
            return 0;
        }

        let deliveries: Vec<Delivery> = self.delivery_rx.try_iter().collect();
        let mut processed = 0;

        for delivery in deliveries {
            if Some(delivery.bind) == self.discovery_bind {
                self.detect_sender(delivery.sender_id);
                self.metrics.sender(delivery.sender_id).record_seen();
                processed += 1;
                continue;
            }

            let recording = self
                .known_senders
                .get(&delivery.sender_id)
                .map_or(false, |bind| *bind == Some(delivery.bind));
            if !recording {
                log::debug!(
                    "Ignoring delivery for sender {} from stale subscription {:?}",
                    delivery.sender_id,
                    delivery.bind
                );
                continue;
            }

            if self.on_message(delivery.sender_id, delivery.message).is_ok() {
                processed += 1;
            }
        }

        processed
    }

    fn unknown_sender(&self, sender_id: SenderId) -> RecordError {
        RecordError::UnknownSender {
            sender_id,
            known: self.known_senders(),
        }
    }

    /// Start recording a discovered sender. Sender 0 subscribes to every
    /// alphabetic-prefixed sender.
    pub fn record_sender(&mut self, sender_id: SenderId) -> RecordResult<()> {
        self.ensure_running()?;

        let bind = *self
            .known_senders
            .get(&sender_id)
            .ok_or_else(|| self.unknown_sender(sender_id))?;
        if bind.is_some() {
            return Ok(());
        }

        let pattern = SubscriptionPattern::for_sender(sender_id);
        let bind = self.transport.subscribe(&pattern, self.delivery_tx.clone())?;
        self.known_senders.insert(sender_id, Some(bind));
        log::info!("Recording sender {} with pattern {}", sender_id, pattern);
        Ok(())
    }

    /// Stop requesting a sender's traffic. Its history is kept.
    pub fn stop_recording_sender(&mut self, sender_id: SenderId) -> RecordResult<()> {
        self.ensure_running()?;

        let bind = *self
            .known_senders
            .get(&sender_id)
            .ok_or_else(|| self.unknown_sender(sender_id))?;

        if let Some(bind) = bind {
            self.transport.unsubscribe(bind)?;
            self.known_senders.insert(sender_id, None);
            log::info!("Stopped recording sender {}", sender_id);
        }
        Ok(())
    }

    /// Release the transport. Terminal: no further events are emitted.
    pub fn stop(&mut self) -> RecordResult<()> {
        if self.status == RecorderStatus::Stopped {
            return Ok(());
        }

        self.transport.stop()?;
        self.status = RecorderStatus::Stopped;
        self.discovery_bind = None;
        for bind in self.known_senders.values_mut() {
            *bind = None;
        }
        self.events.clear();
        log::info!("Recorder '{}' stopped", self.name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{FieldValue, MessageField};
    use crate::transport::SimulatedBus;

    fn gps(alt: i64) -> DecodedMessage {
        DecodedMessage::new(1, "telemetry", 8, "GPS")
            .with_field(MessageField::new("alt", "int32", FieldValue::Int(alt)).with_unit("cm"))
    }

    fn recorder() -> (Recorder, SimulatedBus) {
        let bus = SimulatedBus::new();
        let recorder = Recorder::new("test", bus.clone(), 10).unwrap();
        (recorder, bus)
    }

    #[test]
    fn test_new_installs_discovery_subscription() {
        let (recorder, bus) = recorder();

        assert_eq!(recorder.status(), RecorderStatus::Running);
        assert_eq!(bus.subscription_patterns(), vec![SubscriptionPattern::All.as_regex_str()]);
    }

    #[test]
    fn test_on_message_creates_identity_once() {
        let (mut recorder, _bus) = recorder();

        let (identity, is_new) = recorder.on_message_at(5, gps(1), 100).unwrap();
        assert!(is_new);
        let (again, is_new) = recorder.on_message_at(5, gps(2), 200).unwrap();
        assert!(!is_new);
        assert_eq!(identity, again);

        let history = recorder.history(identity).unwrap();
        assert_eq!(history.sample_count(), 2);
        assert_eq!(history.period(), Some(100.0));
        assert_eq!(recorder.index().identity_count(), 1);
    }

    #[test]
    fn test_events_emitted_in_order() {
        let (mut recorder, _bus) = recorder();
        let events = recorder.subscribe_events();

        recorder.on_message_at(5, gps(1), 100).unwrap();
        recorder.on_message_at(5, gps(1), 110).unwrap();

        let received: Vec<RecorderEvent> = events.try_iter().collect();
        assert_eq!(
            received,
            vec![
                RecorderEvent::SenderDiscovered { sender_id: 5 },
                RecorderEvent::MessageUpdated { sender_id: 5, class_id: 1, message_id: 8, is_new: true },
                RecorderEvent::MessageUpdated { sender_id: 5, class_id: 1, message_id: 8, is_new: false },
            ]
        );
    }

    #[test]
    fn test_record_unknown_sender_fails() {
        let (mut recorder, _bus) = recorder();

        match recorder.record_sender(9) {
            Err(RecordError::UnknownSender { sender_id, known }) => {
                assert_eq!(sender_id, 9);
                assert!(known.is_empty());
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(matches!(
            recorder.stop_recording_sender(9),
            Err(RecordError::UnknownSender { .. })
        ));
    }

    #[test]
    fn test_record_sender_is_idempotent() {
        let (mut recorder, bus) = recorder();
        recorder.on_message_at(42, gps(1), 1).unwrap();

        recorder.record_sender(42).unwrap();
        recorder.record_sender(42).unwrap();

        assert!(recorder.is_recording(42));
        assert_eq!(bus.subscription_count(), 2);
    }

    #[test]
    fn test_wildcard_and_specific_patterns() {
        let (mut recorder, bus) = recorder();
        recorder.on_message_at(0, gps(1), 1).unwrap();
        recorder.on_message_at(42, gps(1), 1).unwrap();

        recorder.record_sender(0).unwrap();
        recorder.record_sender(42).unwrap();

        let patterns = bus.subscription_patterns();
        assert!(patterns.contains(&"^([a-zA-Z]+ .*)".to_string()));
        assert!(patterns.contains(&"^(42 .*)".to_string()));
    }

    #[test]
    fn test_pump_discovers_then_records() {
        let (mut recorder, bus) = recorder();

        bus.publish(3, gps(10));
        assert_eq!(recorder.pump(), 1);
        assert_eq!(recorder.known_senders(), vec![3]);
        assert_eq!(recorder.index().identity_count(), 0);

        recorder.record_sender(3).unwrap();
        bus.publish(3, gps(11));
        recorder.pump();

        let history = recorder.history_by_name(3, "telemetry", "GPS").unwrap();
        assert_eq!(history.sample_count(), 1);
        assert_eq!(history.field_value("alt").unwrap().value, FieldValue::Int(11));
    }

    #[test]
    fn test_stop_recording_keeps_history() {
        let (mut recorder, bus) = recorder();
        bus.publish(3, gps(1));
        recorder.pump();
        recorder.record_sender(3).unwrap();
        bus.publish(3, gps(2));
        recorder.pump();

        recorder.stop_recording_sender(3).unwrap();
        bus.publish(3, gps(3));
        recorder.pump();

        assert!(!recorder.is_recording(3));
        assert_eq!(recorder.sender_state(3), Some(SenderState::Discovered));
        let history = recorder.history_by_name(3, "telemetry", "GPS").unwrap();
        assert_eq!(history.sample_count(), 1);
    }

    #[test]
    fn test_stop_is_terminal() {
        let (mut recorder, bus) = recorder();
        let events = recorder.subscribe_events();
        recorder.on_message_at(1, gps(1), 1).unwrap();
        let _ = events.try_iter().count();

        recorder.stop().unwrap();
        recorder.stop().unwrap();

        assert!(!bus.is_running());
        assert!(matches!(recorder.on_message(1, gps(2)), Err(RecordError::Stopped)));
        assert!(matches!(recorder.record_sender(1), Err(RecordError::Stopped)));
        assert_eq!(recorder.pump(), 0);
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_replay_retimes_snapshot() {
        let (mut recorder, _bus) = recorder();
        let (identity, _) = recorder.on_message_at(2, gps(1), 10).unwrap();
        let snapshot = recorder.history(identity).unwrap().newest().unwrap().clone();

        recorder.replay(2, snapshot).unwrap();

        let history = recorder.history(identity).unwrap();
        assert_eq!(history.sample_count(), 2);
        assert!(history.newest().unwrap().timestamp() > 10);
    }

    #[test]
    fn test_metrics_follow_ingestion() {
        let (mut recorder, _bus) = recorder();
        recorder.on_message_at(4, gps(1), 50).unwrap();
        recorder.on_message_at(4, gps(2), 60).unwrap();

        let metrics = recorder.metrics().get_sender_metrics(4).unwrap();
        assert_eq!(metrics.messages_recorded(), 2);
        assert_eq!(metrics.identities_created(), 1);
        assert_eq!(metrics.last_reception_ns(), 60);
    }
}
