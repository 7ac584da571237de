//! Shared test harness for E2E integration tests.
//!
//! Runs the real `OwnerClient` and `FileTokenStore` against a `wiremock`
//! owner API, with the wake-up controller, watcher and scheduler wired
//! the way `main` wires them.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use rumqttc::{Publish, QoS};
use serde_json::{Value, json};
use tokio::sync::RwLock;
use wiremock::MockServer;

use g2t_bridge::controller::{WakeConfig, WakeUpController};
use g2t_bridge::gate::WakeGate;
use g2t_bridge::mqtt_loop::BusState;
use g2t_bridge::notifier::RecordingNotifier;
use g2t_bridge::scheduler::PreWakeupScheduler;
use g2t_bridge::shutdown::Shutdown;
use g2t_bridge::watcher::{ChargeStateWatcher, SharedChargerStatus, WatchOutcome};
use g2t_mqtt_channel::{IncomingMessage, classify};
use g2t_owner_api::{FileTokenStore, OwnerApiConfig, OwnerClient};

pub const VIN: &str = "5YJ3E1EA0KF000001";
pub const VEHICLE_ID: u64 = 4711;
pub const STATUS_TOPIC: &str = "go-eCharger/012345/status";
pub const EMAIL: &str = "owner@example.com";

static COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Wake config with no real-time waits.
pub fn fast_wake(max_wake_attempts: u32, max_auth_retries: u32) -> WakeConfig {
    WakeConfig {
        max_wake_attempts,
        settle_secs: 0,
        auth_cooldown_secs: 0,
        max_auth_retries,
    }
}

pub fn token_json(access: &str, refresh: &str, created_at: i64, expires_in: i64) -> Value {
    json!({
        "access_token": access,
        "refresh_token": refresh,
        "created_at": created_at,
        "expires_in": expires_in,
        "token_type": "bearer",
    })
}

/// Token issued now with the usual 45-day lifetime.
pub fn fresh_token(access: &str, refresh: &str) -> Value {
    token_json(access, refresh, chrono::Utc::now().timestamp(), 3_888_000)
}

pub fn vehicles_json(state: &str) -> Value {
    json!({
        "response": [
            { "id": 99, "vin": "5YJ3E1EA0KF999999", "state": "online", "display_name": "Other" },
            { "id": VEHICLE_ID, "vin": VIN, "state": state, "display_name": "Model 3" },
        ],
        "count": 2,
    })
}

pub fn wake_path() -> String {
    format!("/api/1/vehicles/{VEHICLE_ID}/wake_up")
}

/// A charger status publish as it arrives from the broker.
pub fn status_publish(alw: &str, car: &str) -> Publish {
    let payload = json!({ "alw": alw, "car": car, "amp": "16" }).to_string();
    Publish::new(STATUS_TOPIC, QoS::AtMostOnce, payload.into_bytes())
}

/// Classify a publish and hand it to the watcher, like the MQTT loop does.
pub async fn feed(watcher: &mut ChargeStateWatcher, publish: &Publish) -> WatchOutcome {
    match classify(publish, STATUS_TOPIC) {
        IncomingMessage::ChargerStatus(status) => watcher.on_status(status).await,
        other => panic!("unexpected message: {other:?}"),
    }
}

/// End-to-end harness: mock owner API + real client + real token file.
pub struct TestHarness {
    pub server: MockServer,
    pub token_path: PathBuf,
    pub notifier: Arc<RecordingNotifier>,
    pub shutdown: Shutdown,
    pub gate: Arc<WakeGate>,
    pub bus: Arc<BusState>,
    pub latest: SharedChargerStatus,
    pub controller: Arc<WakeUpController>,
}

impl TestHarness {
    pub async fn start(wake: WakeConfig) -> Self {
        let server = MockServer::start().await;

        let n = COUNTER.fetch_add(1, Ordering::SeqCst);
        let token_path = std::env::temp_dir()
            .join(format!("g2t-e2e-{}-{n}", std::process::id()))
            .join("token.json");

        let config = OwnerApiConfig {
            base_url: server.uri(),
            client_id: "test-client".into(),
            client_secret: "test-secret".into(),
            email: EMAIL.into(),
            password: "hunter2".into(),
            timeout_secs: 5,
        };
        let store = Arc::new(FileTokenStore::new(&token_path));
        let api = Arc::new(OwnerClient::new(config, store).unwrap());

        let notifier = Arc::new(RecordingNotifier::new());
        let controller =
            Arc::new(WakeUpController::new(api, VIN, wake).with_notifier(notifier.clone()));

        let bus = BusState::new();
        bus.set_connected(true);

        Self {
            server,
            token_path,
            notifier,
            shutdown: Shutdown::new(),
            gate: WakeGate::new(),
            bus,
            latest: Arc::new(RwLock::new(None)),
            controller,
        }
    }

    pub fn watcher(&self) -> ChargeStateWatcher {
        ChargeStateWatcher::new(
            self.gate.clone(),
            self.controller.clone(),
            self.latest.clone(),
            self.shutdown.clone(),
        )
    }

    pub fn scheduler(&self) -> PreWakeupScheduler {
        PreWakeupScheduler::new(
            chrono::NaiveTime::from_hms_opt(6, 30, 0).unwrap(),
            self.gate.clone(),
            self.controller.clone(),
            self.latest.clone(),
            self.bus.clone(),
            self.shutdown.clone(),
        )
    }

    /// Seed the token file as a previous run would have left it.
    pub fn write_token(&self, token: &Value) {
        std::fs::create_dir_all(self.token_path.parent().unwrap()).unwrap();
        std::fs::write(&self.token_path, token.to_string()).unwrap();
    }

    pub fn stored_token(&self) -> Option<Value> {
        let raw = std::fs::read_to_string(&self.token_path).ok()?;
        Some(serde_json::from_str(&raw).unwrap())
    }
}
