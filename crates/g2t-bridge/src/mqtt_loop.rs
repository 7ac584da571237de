//! MQTT event loop driver.
//!
//! Polls the rumqttc event loop, feeds charger status publishes to the
//! watcher, re-subscribes on every `ConnAck` (sessions are clean) and backs
//! off exponentially while the broker is unreachable.
//!
//! Nothing in here may wait for space in the client's request queue: only
//! `poll()` drains it, and `poll()` runs on this task.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use rumqttc::{ConnectReturnCode, Event, EventLoop, Packet, QoS};
use serde::Deserialize;

use g2t_mqtt_channel::{Channel, IncomingMessage, MqttError, classify};

use crate::notifier::Notifier;
use crate::shutdown::{Shutdown, ShutdownReason};
use crate::watcher::{ChargeStateWatcher, WatchOutcome};

/// Broker connectivity as last seen by the event loop.
#[derive(Debug, Default)]
pub struct BusState {
    connected: AtomicBool,
}

impl BusState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Release);
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReconnectConfig {
    #[serde(default = "default_initial_backoff_secs")]
    pub initial_backoff_secs: u64,
    #[serde(default = "default_max_backoff_secs")]
    pub max_backoff_secs: u64,
    /// Consecutive failed polls tolerated before shutting down.
    /// `None` retries forever.
    #[serde(default)]
    pub max_attempts: Option<u32>,
}

fn default_initial_backoff_secs() -> u64 {
    1
}
fn default_max_backoff_secs() -> u64 {
    60
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_backoff_secs: default_initial_backoff_secs(),
            max_backoff_secs: default_max_backoff_secs(),
            max_attempts: None,
        }
    }
}

impl ReconnectConfig {
    /// Delay before retry number `attempt` (1-based): doubles from the
    /// initial value, capped at the maximum.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u64::MAX);
        let secs = self
            .initial_backoff_secs
            .saturating_mul(factor)
            .min(self.max_backoff_secs);
        Duration::from_secs(secs)
    }
}

pub struct MqttLoop<C: Channel> {
    channel: C,
    status_topic: String,
    watcher: ChargeStateWatcher,
    bus: Arc<BusState>,
    reconnect: ReconnectConfig,
    shutdown: Shutdown,
    notifier: Option<Arc<dyn Notifier>>,
    failures: u32,
    subscribed: bool,
    subscribe_attempts: u32,
}

impl<C: Channel> MqttLoop<C> {
    pub fn new(
        channel: C,
        status_topic: impl Into<String>,
        watcher: ChargeStateWatcher,
        bus: Arc<BusState>,
        reconnect: ReconnectConfig,
        shutdown: Shutdown,
    ) -> Self {
        Self {
            channel,
            status_topic: status_topic.into(),
            watcher,
            bus,
            reconnect,
            shutdown,
            notifier: None,
            failures: 0,
            subscribed: false,
            subscribe_attempts: 0,
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn watcher(&self) -> &ChargeStateWatcher {
        &self.watcher
    }

    /// Drive the event loop until the reconnect budget runs out.
    pub async fn run(mut self, mut eventloop: EventLoop) {
        loop {
            match eventloop.poll().await {
                Ok(event) => self.handle_event(event).await,
                Err(e) => {
                    let Some(delay) = self.on_connection_error(MqttError::Connection(e.to_string()))
                    else {
                        return;
                    };
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    pub async fn handle_event(&mut self, event: Event) {
        match event {
            Event::Incoming(Packet::ConnAck(ack)) if ack.code == ConnectReturnCode::Success => {
                self.on_connected();
            }
            Event::Incoming(Packet::Publish(publish)) => {
                let msg = classify(&publish, &self.status_topic);
                self.handle_message(msg).await;
            }
            _ => {}
        }

        // Every poll frees queue slots, so a refused subscribe is retried
        // on the next event.
        if self.bus.is_connected() && !self.subscribed {
            self.subscribe_status();
        }
    }

    fn on_connected(&mut self) {
        if self.failures > 0 {
            tracing::info!(after_failures = self.failures, "reconnected to MQTT broker");
        } else {
            tracing::info!("connected to MQTT broker");
        }
        self.failures = 0;
        self.subscribed = false;
        self.subscribe_attempts = 0;
        self.bus.set_connected(true);
    }

    fn subscribe_status(&mut self) {
        self.subscribe_attempts = self.subscribe_attempts.saturating_add(1);
        match self.channel.try_subscribe(&self.status_topic, QoS::AtMostOnce) {
            Ok(()) => {
                self.subscribed = true;
                tracing::info!(topic = %self.status_topic, "subscribed to charger status");
            }
            Err(e) if self.subscribe_attempts == 1 => {
                tracing::warn!(error = %e, topic = %self.status_topic, "subscribe deferred");
            }
            Err(e) => tracing::debug!(
                error = %e,
                attempt = self.subscribe_attempts,
                "subscribe still deferred"
            ),
        }
    }

    async fn handle_message(&mut self, msg: IncomingMessage) {
        match msg {
            IncomingMessage::ChargerStatus(status) => {
                tracing::debug!(alw = %status.alw, car = ?status.car, "charger status");
                match self.watcher.on_status(status).await {
                    // The wake sequence runs detached; the gate tracks it.
                    WatchOutcome::Triggered(_) => tracing::debug!("wake-up dispatched"),
                    WatchOutcome::Dropped => tracing::debug!("status dropped"),
                    WatchOutcome::Primed | WatchOutcome::Unchanged => {}
                }
            }
            IncomingMessage::Malformed { topic, error } => {
                tracing::warn!(topic = %topic, error = %error, "ignoring malformed charger status");
            }
            IncomingMessage::Unknown { topic, .. } => {
                tracing::debug!(topic = %topic, "ignoring unrecognized message");
            }
        }
    }

    /// Record a failed poll. Returns the delay before polling again, or
    /// `None` once the reconnect budget is spent and shutdown has fired.
    pub fn on_connection_error(&mut self, error: MqttError) -> Option<Duration> {
        if self.bus.is_connected() {
            tracing::warn!(error = %error, "lost connection to MQTT broker");
            self.notify("Lost connection to MQTT broker, reconnecting");
        }
        self.bus.set_connected(false);
        self.subscribed = false;
        self.failures = self.failures.saturating_add(1);

        if let Some(max) = self.reconnect.max_attempts {
            if self.failures > max {
                tracing::error!(attempts = self.failures, "giving up on MQTT broker");
                self.notify("MQTT broker unreachable, shutting down");
                self.shutdown.trigger(ShutdownReason::BusDisconnected);
                return None;
            }
        }

        let delay = self.reconnect.backoff(self.failures);
        tracing::warn!(
            error = %error,
            attempt = self.failures,
            retry_in_secs = delay.as_secs(),
            "MQTT event loop error"
        );
        Some(delay)
    }

    fn notify(&self, message: &str) {
        if let Some(notifier) = &self.notifier {
            notifier.notify(message);
        }
    }
}
