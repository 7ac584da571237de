//! goe2tesla: wakes the car when the go-e charger starts allowing charge.
//!
//! Wires the MQTT status feed, the owner API session and the optional
//! daily pre-wakeup into a single binary.

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::RwLock;
use tracing_subscriber::EnvFilter;

use g2t_bridge::config::BridgeConfig;
use g2t_bridge::controller::{WakeHandler, WakeUpController};
use g2t_bridge::gate::WakeGate;
use g2t_bridge::mqtt_loop::{BusState, MqttLoop};
use g2t_bridge::notifier::{MqttNotifier, MultiNotifier, Notifier, WebhookNotifier};
use g2t_bridge::scheduler::PreWakeupScheduler;
use g2t_bridge::shutdown::Shutdown;
use g2t_bridge::watcher::{ChargeStateWatcher, SharedChargerStatus};
use g2t_mqtt_channel::MqttChannel;
use g2t_owner_api::{FileTokenStore, OwnerClient};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")) {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn build_notifier(
    config: &BridgeConfig,
    channel: &Arc<MqttChannel>,
) -> anyhow::Result<Option<Arc<dyn Notifier>>> {
    let Some(notifier) = &config.notifier else {
        return Ok(None);
    };

    let mut sinks: Vec<Arc<dyn Notifier>> = Vec::new();
    if let Some(topic) = &notifier.mqtt_topic {
        tracing::info!(topic = %topic, "MQTT notifications enabled");
        sinks.push(Arc::new(MqttNotifier::new(Arc::clone(channel), topic.clone())));
    }
    if let Some(url) = &notifier.webhook_url {
        tracing::info!("webhook notifications enabled");
        let http = reqwest::Client::builder()
            .timeout(config.tesla.timeout())
            .build()
            .context("building webhook client")?;
        sinks.push(Arc::new(WebhookNotifier::new(http, url.clone())));
    }

    let multi = MultiNotifier::new(sinks);
    if multi.is_empty() {
        return Ok(None);
    }
    Ok(Some(Arc::new(multi)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "goe2tesla starting");

    // ── Load config ─────────────────────────────────────────────
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "/etc/goe2tesla/bridge.toml".to_string());

    let config = BridgeConfig::from_file(&config_path)
        .with_context(|| format!("loading config from {config_path}"))?;
    tracing::info!(
        vin = %config.vin,
        topic = %config.charger.topic,
        broker = %config.mqtt.broker_host,
        "config loaded"
    );

    let shutdown = Shutdown::new();
    let gate = WakeGate::new();
    let bus = BusState::new();
    let latest: SharedChargerStatus = Arc::new(RwLock::new(None));

    // ── MQTT channel ────────────────────────────────────────────
    if !config.mqtt.use_tls {
        tracing::info!("MQTT plaintext mode (no TLS)");
    }
    let (channel, eventloop) = MqttChannel::new(&config.mqtt)?;
    let channel = Arc::new(channel);

    let notifier = build_notifier(&config, &channel)?;

    // ── Owner API session ───────────────────────────────────────
    let store = Arc::new(FileTokenStore::new(&config.token_file));
    tracing::info!(path = %store.path().display(), "token file");
    let api = Arc::new(OwnerClient::new(config.tesla.clone(), store)?);

    let mut controller = WakeUpController::new(api, config.vin.clone(), config.wake.clone());
    if let Some(notifier) = &notifier {
        controller = controller.with_notifier(Arc::clone(notifier));
    }
    let controller: Arc<dyn WakeHandler> = Arc::new(controller);

    // ── Status watcher + event loop ─────────────────────────────
    let watcher = ChargeStateWatcher::new(
        gate.clone(),
        controller.clone(),
        latest.clone(),
        shutdown.clone(),
    );
    let mut mqtt_loop = MqttLoop::new(
        channel.clone(),
        config.charger.topic.clone(),
        watcher,
        bus.clone(),
        config.reconnect.clone(),
        shutdown.clone(),
    );
    if let Some(notifier) = &notifier {
        mqtt_loop = mqtt_loop.with_notifier(Arc::clone(notifier));
    }

    // ── Pre-wakeup scheduler ────────────────────────────────────
    let scheduler = match &config.pre_wakeup {
        Some(pre) => {
            let at = pre.at().context("parsing pre_wakeup.time")?;
            tracing::info!(at = %at, "daily pre-wakeup enabled");
            let mut scheduler = PreWakeupScheduler::new(
                at,
                gate.clone(),
                controller.clone(),
                latest.clone(),
                bus.clone(),
                shutdown.clone(),
            );
            if let Some(notifier) = &notifier {
                scheduler = scheduler.with_notifier(Arc::clone(notifier));
            }
            Some(scheduler)
        }
        None => None,
    };

    // ── Start background tasks ──────────────────────────────────
    let mqtt_task = tokio::spawn(mqtt_loop.run(eventloop));
    let scheduler_task = scheduler.map(|s| tokio::spawn(async move { s.run().await }));

    tracing::info!("goe2tesla ready");

    let result = tokio::select! {
        reason = shutdown.wait() => {
            tracing::error!(reason = %reason, "shutting down");
            Err(anyhow::anyhow!("stopped: {reason}"))
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
            Ok(())
        }
    };

    mqtt_task.abort();
    if let Some(task) = scheduler_task {
        task.abort();
    }

    tracing::info!("goe2tesla stopped");
    result
}
