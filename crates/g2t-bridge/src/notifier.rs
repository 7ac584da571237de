//! Best-effort text notifications.
//!
//! `notify` never blocks or fails the caller: delivery runs in a spawned
//! task and transport errors are only logged. Must be called from within
//! a tokio runtime.

use std::sync::{Arc, Mutex};

use g2t_mqtt_channel::Channel;

pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

/// Publishes notifications to an MQTT topic.
pub struct MqttNotifier<C: Channel + 'static> {
    channel: Arc<C>,
    topic: String,
}

impl<C: Channel + 'static> MqttNotifier<C> {
    pub fn new(channel: Arc<C>, topic: impl Into<String>) -> Self {
        Self {
            channel,
            topic: topic.into(),
        }
    }
}

impl<C: Channel + 'static> Notifier for MqttNotifier<C> {
    fn notify(&self, message: &str) {
        let channel = Arc::clone(&self.channel);
        let topic = self.topic.clone();
        let message = message.to_string();
        tokio::spawn(async move {
            if let Err(e) = channel.publish_text(&topic, &message).await {
                tracing::warn!(error = %e, topic = %topic, "failed to publish notification");
            }
        });
    }
}

/// POSTs notifications as `text/plain` to a webhook URL.
pub struct WebhookNotifier {
    http: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }
}

impl Notifier for WebhookNotifier {
    fn notify(&self, message: &str) {
        let request = self
            .http
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(message.to_string());
        tokio::spawn(async move {
            match request.send().await {
                Ok(resp) if !resp.status().is_success() => {
                    tracing::warn!(status = %resp.status(), "notification webhook rejected message");
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "notification webhook unreachable"),
            }
        });
    }
}

/// Fans a notification out to several sinks.
#[derive(Default)]
pub struct MultiNotifier {
    sinks: Vec<Arc<dyn Notifier>>,
}

impl MultiNotifier {
    pub fn new(sinks: Vec<Arc<dyn Notifier>>) -> Self {
        Self { sinks }
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl Notifier for MultiNotifier {
    fn notify(&self, message: &str) {
        for sink in &self.sinks {
            sink.notify(message);
        }
    }
}

/// Keeps every message in memory. Used by tests.
#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .any(|m| m.contains(needle))
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}
