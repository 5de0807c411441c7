use std::time::Duration;

use anyhow::{anyhow, Result};
use crossbeam_channel::Receiver;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::time::{interval, MissedTickBehavior};

use crate::config::RecorderConfig;
use crate::core::{now_ns, SenderId};
use crate::record::{Recorder, RecorderEvent};
use crate::view::{MessageTree, PinKey, PinSet, PinnedRows, RowFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventLoopStatus {
    Idle,
    Running,
    Stopped,
}

/// Drives a recorder and keeps the message tree in sync with it.
///
/// Deliveries are pumped on a short interval; the tree is fully refreshed on
/// a slower one. Discovered senders are recorded automatically unless
/// disabled.
pub struct EventLoop {
    recorder: Recorder,
    events: Receiver<RecorderEvent>,
    tree: MessageTree,
    pins: PinSet,
    pinned: PinnedRows,
    config: RecorderConfig,
    auto_record: bool,
    status: EventLoopStatus,
}

impl EventLoop {
    pub fn new(mut recorder: Recorder, config: RecorderConfig) -> Self {
        let events = recorder.subscribe_events();
        Self {
            recorder,
            events,
            tree: MessageTree::new(config.extinction_secs),
            pins: PinSet::new(config.pin_across_senders),
            pinned: PinnedRows::default(),
            config,
            auto_record: true,
            status: EventLoopStatus::Idle,
        }
    }

    pub fn status(&self) -> EventLoopStatus {
        self.status
    }

    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    pub fn recorder_mut(&mut self) -> &mut Recorder {
        &mut self.recorder
    }

    pub fn tree(&self) -> &MessageTree {
        &self.tree
    }

    pub fn pins(&self) -> &PinSet {
        &self.pins
    }

    pub fn pins_mut(&mut self) -> &mut PinSet {
        &mut self.pins
    }

    /// Pin or unpin one field, following the pin-across-senders setting.
    /// Returns the number of pins that changed.
    pub fn pin_field(&mut self, key: &PinKey, pinned: bool) -> usize {
        self.pins.set_field(key, pinned, self.recorder.index())
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    pub fn set_auto_record(&mut self, enabled: bool) {
        self.auto_record = enabled;
    }

    /// Pump pending deliveries and apply the resulting events to the tree.
    /// Returns the number of deliveries processed.
    pub fn tick(&mut self, now: u64) -> Result<usize> {
        let processed = self.recorder.pump();

        while let Ok(event) = self.events.try_recv() {
            if let RecorderEvent::SenderDiscovered { sender_id } = event {
                if self.auto_record {
                    self.recorder.record_sender(sender_id)?;
                }
            }
            self.tree.apply_event(&event, self.recorder.index(), now)?;
        }

        Ok(processed)
    }

    /// Recompute ages, frequencies and pin marks of every row.
    /// Returns the number of rows that were missing.
    pub fn refresh(&mut self, now: u64) -> Result<usize> {
        let created = self.tree.refresh(self.recorder.index(), now)?;
        self.tree.sync_pins(&self.pins);
        Ok(created)
    }

    /// Rebuild the pinned-fields view. Returns the number of rows.
    pub fn refresh_pinned(&mut self, now: u64) -> usize {
        self.pinned = PinnedRows::collect(&self.pins, self.recorder.index(), now, self.config.extinction_secs);
        self.pinned.len()
    }

    pub fn pinned(&self) -> &PinnedRows {
        &self.pinned
    }

    /// Whether a sender's rows may all be expanded under `filter`
    pub fn should_expand(&self, sender_id: SenderId, filter: &RowFilter) -> bool {
        filter.should_expand(&self.tree, sender_id, self.config.expand_threshold)
    }

    /// Run until a shutdown signal arrives, then stop the recorder
    pub async fn run(&mut self, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
        if self.status != EventLoopStatus::Idle {
            return Err(anyhow!("Event loop cannot run from state {:?}", self.status));
        }
        self.status = EventLoopStatus::Running;
        log::info!("Event loop started for recorder '{}'", self.recorder.name());

        let mut pump = interval(Duration::from_millis(self.config.pump_interval_ms.max(1)));
        let mut refresh = interval(Duration::from_millis(self.config.refresh_interval_ms.max(1)));
        let mut refresh_pinned =
            interval(Duration::from_millis(self.config.pinned_refresh_interval_ms.max(1)));
        pump.set_missed_tick_behavior(MissedTickBehavior::Skip);
        refresh.set_missed_tick_behavior(MissedTickBehavior::Skip);
        refresh_pinned.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let outcome = loop {
            tokio::select! {
                _ = shutdown.recv() => break Ok(()),
                _ = pump.tick() => {
                    if let Err(e) = self.tick(now_ns()) {
                        break Err(e);
                    }
                }
                _ = refresh.tick() => {
                    if let Err(e) = self.refresh(now_ns()) {
                        break Err(e);
                    }
                }
                _ = refresh_pinned.tick() => {
                    self.refresh_pinned(now_ns());
                }
            }
        };

        // Drain what arrived before the signal
        let last = self.tick(now_ns()).and_then(|_| self.refresh(now_ns()));
        self.refresh_pinned(now_ns());

        self.recorder.stop()?;
        self.status = EventLoopStatus::Stopped;
        log::info!("Event loop stopped");

        outcome.and(last.map(|_| ()))
    }
}
