//! Daily pre-wakeup timer.
//!
//! Fires at a fixed local time of day and wakes the vehicle if the last
//! charger status shows it plugged in and not yet done charging.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Days, Local, NaiveTime, TimeZone};
use serde::Deserialize;

use crate::controller::{WakeHandler, WakeOutcome};
use crate::gate::{WakeGate, run_guarded};
use crate::mqtt_loop::BusState;
use crate::notifier::Notifier;
use crate::shutdown::Shutdown;
use crate::watcher::SharedChargerStatus;

#[derive(Debug, Clone, Deserialize)]
pub struct PreWakeupConfig {
    /// Local time of day, `HH:MM`.
    pub time: String,
}

impl PreWakeupConfig {
    pub fn at(&self) -> Result<NaiveTime, chrono::ParseError> {
        NaiveTime::parse_from_str(&self.time, "%H:%M")
    }
}

/// Time from `now` until the next `at` strictly after it, in `now`'s zone.
///
/// A time skipped by a DST jump falls through to the following day.
pub fn delay_until_next<Tz: TimeZone>(now: &DateTime<Tz>, at: NaiveTime) -> Duration {
    let zone = now.timezone();
    let today = now.date_naive();

    for offset in 0..=2 {
        let Some(date) = today.checked_add_days(Days::new(offset)) else {
            break;
        };
        let Some(candidate) = zone.from_local_datetime(&date.and_time(at)).earliest() else {
            continue;
        };
        if candidate > *now {
            return candidate
                .signed_duration_since(now)
                .to_std()
                .unwrap_or_default();
        }
    }
    Duration::from_secs(24 * 60 * 60)
}

/// Result of one scheduled fire.
#[derive(Debug, PartialEq, Eq)]
pub enum FireOutcome {
    /// No charger status received yet.
    NoStatus,
    /// No vehicle plugged in, or charging already finished.
    NotNeeded,
    /// Another wake sequence holds the gate.
    Busy,
    Ran(WakeOutcome),
}

pub struct PreWakeupScheduler {
    at: NaiveTime,
    gate: Arc<WakeGate>,
    handler: Arc<dyn WakeHandler>,
    latest: SharedChargerStatus,
    bus: Arc<BusState>,
    shutdown: Shutdown,
    notifier: Option<Arc<dyn Notifier>>,
}

impl PreWakeupScheduler {
    pub fn new(
        at: NaiveTime,
        gate: Arc<WakeGate>,
        handler: Arc<dyn WakeHandler>,
        latest: SharedChargerStatus,
        bus: Arc<BusState>,
        shutdown: Shutdown,
    ) -> Self {
        Self {
            at,
            gate,
            handler,
            latest,
            bus,
            shutdown,
            notifier: None,
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Sleep until the next fire time, fire, repeat. Never returns.
    pub async fn run(&self) {
        loop {
            let delay = delay_until_next(&Local::now(), self.at);
            tracing::info!(at = %self.at, in_secs = delay.as_secs(), "next pre-wakeup scheduled");
            tokio::time::sleep(delay).await;

            let outcome = self.fire().await;
            tracing::info!(outcome = ?outcome, "pre-wakeup finished");
        }
    }

    pub async fn fire(&self) -> FireOutcome {
        let needs_charge = match self.latest.read().await.as_ref() {
            None => {
                tracing::info!("pre-wakeup skipped, no charger status seen yet");
                return FireOutcome::NoStatus;
            }
            Some(status) => status.vehicle_needs_charge(),
        };
        if !needs_charge {
            tracing::info!("pre-wakeup skipped, no vehicle waiting to charge");
            return FireOutcome::NotNeeded;
        }

        let Some(guard) = self.gate.try_acquire() else {
            tracing::info!("pre-wakeup skipped, wake-up already in flight");
            return FireOutcome::Busy;
        };

        if !self.bus.is_connected() {
            tracing::warn!("pre-wakeup with MQTT broker disconnected");
            if let Some(notifier) = &self.notifier {
                notifier.notify("Pre-wakeup firing while MQTT broker is disconnected");
            }
        }

        tracing::info!("pre-wakeup, waking up vehicle");
        FireOutcome::Ran(run_guarded(self.handler.as_ref(), guard, &self.shutdown).await)
    }
}
