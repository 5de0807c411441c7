use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use crossbeam_channel::Sender;
use regex::Regex;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration};

use crate::config::RecorderConfig;
use crate::core::{DecodedMessage, FieldValue, MessageField, SenderId};
use super::pattern::SubscriptionPattern;
use super::traits::{BindId, Delivery, Transport};

struct Binding {
    regex: Regex,
    sink: Sender<Delivery>,
}

#[derive(Default)]
struct BusState {
    running: bool,
    next_bind: u64,
    bindings: BTreeMap<BindId, Binding>,
}

/// In-memory bus. Clones share the same subscriptions, so one clone can be
/// handed to the recorder while others publish.
#[derive(Clone, Default)]
pub struct SimulatedBus {
    state: Arc<Mutex<BusState>>,
    address: Option<String>,
}

impl SimulatedBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bus bound to an address (`ip:port` style); None means the default bus
    pub fn with_address(address: Option<String>) -> Self {
        Self {
            address,
            ..Self::default()
        }
    }

    pub fn from_config(config: &RecorderConfig) -> Self {
        Self::with_address(config.bus.clone())
    }

    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BusState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Publish a message from a numeric sender. Returns the number of
    /// subscriptions it was delivered to.
    pub fn publish(&self, sender_id: SenderId, message: DecodedMessage) -> usize {
        self.publish_as(&sender_id.to_string(), message)
    }

    /// Publish with a raw sender token; non-numeric tokens (ground agents)
    /// are reported as sender 0
    pub fn publish_as(&self, sender: &str, message: DecodedMessage) -> usize {
        let mut state = self.lock();
        if !state.running {
            log::debug!("Bus not running, dropping {} from {}", message.name, sender);
            return 0;
        }

        let sender_id: SenderId = sender.parse().unwrap_or(0);
        let line = message.bus_line(sender);
        let message = Arc::new(message);

        let mut delivered = 0;
        state.bindings.retain(|bind, binding| {
            if !binding.regex.is_match(&line) {
                return true;
            }
            let delivery = Delivery {
                bind: *bind,
                sender_id,
                message: message.clone(),
            };
            match binding.sink.send(delivery) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(_) => {
                    log::warn!("Dropping subscription {:?}: receiver disconnected", bind);
                    false
                }
            }
        });
        delivered
    }

    pub fn subscription_patterns(&self) -> Vec<String> {
        self.lock()
            .bindings
            .values()
            .map(|b| b.regex.as_str().to_string())
            .collect()
    }

    pub fn subscription_count(&self) -> usize {
        self.lock().bindings.len()
    }
}

impl Transport for SimulatedBus {
    fn transport_id(&self) -> &str {
        "simulated"
    }

    fn start(&mut self) -> Result<()> {
        self.lock().running = true;
        log::info!(
            "Simulated bus started on {}",
            self.address.as_deref().unwrap_or("default bus")
        );
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        let mut state = self.lock();
        state.running = false;
        state.bindings.clear();
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.lock().running
    }

    fn subscribe(&mut self, pattern: &SubscriptionPattern, sink: Sender<Delivery>) -> Result<BindId> {
        let regex = pattern
            .to_regex()
            .with_context(|| format!("Invalid subscription pattern {}", pattern))?;

        let mut state = self.lock();
        let bind = BindId(state.next_bind);
        state.next_bind += 1;
        state.bindings.insert(bind, Binding { regex, sink });
        Ok(bind)
    }

    fn unsubscribe(&mut self, bind: BindId) -> Result<()> {
        self.lock()
            .bindings
            .remove(&bind)
            .map(|_| ())
            .ok_or_else(|| anyhow!("Unknown subscription {:?}", bind))
    }
}

/// Periodic publisher of a small telemetry set for one sender
pub struct SimulatedSender {
    sender_id: SenderId,
    period: Duration,
    counter: u64,
}

impl SimulatedSender {
    pub fn new(sender_id: SenderId, period: Duration) -> Self {
        Self {
            sender_id,
            period,
            counter: 0,
        }
    }

    /// Messages for the next tick
    pub fn next_messages(&mut self) -> Vec<DecodedMessage> {
        self.counter += 1;
        let t = self.counter as f64 * self.period.as_secs_f64();

        let alive = DecodedMessage::new(1, "telemetry", 2, "ALIVE").with_field(MessageField::new(
            "md5sum",
            "uint8[]",
            FieldValue::Array((0..4).map(|i| FieldValue::Int(i * 16)).collect()),
        ));

        let attitude = DecodedMessage::new(1, "telemetry", 6, "ATTITUDE")
            .with_field(
                MessageField::new("phi", "float", FieldValue::Float((t * 0.5).sin() * 0.3))
                    .with_unit("rad")
                    .with_alt_unit("deg", 57.29578),
            )
            .with_field(
                MessageField::new("psi", "float", FieldValue::Float((t * 0.1).cos()))
                    .with_unit("rad")
                    .with_alt_unit("deg", 57.29578),
            )
            .with_field(
                MessageField::new("theta", "float", FieldValue::Float((t * 0.7).sin() * 0.1))
                    .with_unit("rad")
                    .with_alt_unit("deg", 57.29578)
                    .with_format("%.4f"),
            );

        let mode = DecodedMessage::new(1, "telemetry", 11, "PPRZ_MODE")
            .with_field(
                MessageField::new("ap_mode", "uint8", FieldValue::Int(2)).with_enum_label("AUTO2"),
            )
            .with_field(MessageField::new("kill_mode", "uint8", FieldValue::Int(0)));

        let actuators = DecodedMessage::new(1, "telemetry", 105, "ACTUATORS").with_field(
            MessageField::new(
                "values",
                "int16[]",
                FieldValue::Array(
                    (0..4)
                        .map(|i| FieldValue::Int(((t + i as f64).sin() * 9600.0) as i64))
                        .collect(),
                ),
            ),
        );

        vec![alive, attitude, mode, actuators]
    }

    /// Publish on the bus every period until shutdown
    pub fn spawn(mut self, bus: SimulatedBus, mut shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(self.period);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        for message in self.next_messages() {
                            bus.publish(self.sender_id, message);
                        }
                    }
                    _ = shutdown.recv() => break,
                }
            }
            log::debug!("Simulated sender {} stopped", self.sender_id);
        })
    }
}
