//! In-memory channel standing in for the broker in bridge tests.
//!
//! Notifications are kept as text per topic and every subscription
//! request is logged in order, so a test can count how often the bridge
//! re-subscribed after reconnects. A full request queue can be simulated
//! to exercise the non-blocking paths.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use rumqttc::QoS;

use crate::channel::Channel;
use crate::error::{MqttError, MqttResult};

#[derive(Default)]
pub struct MockChannel {
    notices: Mutex<Vec<(String, String)>>,
    subscribe_log: Mutex<Vec<String>>,
    queue_full: AtomicBool,
}

impl MockChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text payloads published to `topic`, oldest first.
    pub fn notifications(&self, topic: &str) -> Vec<String> {
        self.notices
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, text)| text.clone())
            .collect()
    }

    pub fn total_notifications(&self) -> usize {
        self.notices.lock().unwrap().len()
    }

    /// Number of accepted subscription requests for `filter`.
    pub fn subscribe_count(&self, filter: &str) -> usize {
        self.subscribe_log
            .lock()
            .unwrap()
            .iter()
            .filter(|f| *f == filter)
            .count()
    }

    /// While set, every request is rejected as if the client's request
    /// queue had no free slot.
    pub fn set_queue_full(&self, full: bool) {
        self.queue_full.store(full, Ordering::SeqCst);
    }

    fn check_queue(&self) -> Result<(), &'static str> {
        if self.queue_full.load(Ordering::SeqCst) {
            Err("request queue full")
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Channel for MockChannel {
    async fn publish(&self, topic: &str, payload: &[u8], _qos: QoS) -> MqttResult<()> {
        self.check_queue()
            .map_err(|e| MqttError::Publish(e.into()))?;
        self.notices.lock().unwrap().push((
            topic.to_string(),
            String::from_utf8_lossy(payload).into_owned(),
        ));
        Ok(())
    }

    fn try_subscribe(&self, filter: &str, _qos: QoS) -> MqttResult<()> {
        self.check_queue()
            .map_err(|e| MqttError::Subscribe(e.into()))?;
        self.subscribe_log.lock().unwrap().push(filter.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn notifications_are_kept_per_topic() {
        let mock = MockChannel::new();
        mock.publish_text("goe2tesla/notify", "Woke up car").await.unwrap();
        mock.publish_text("goe2tesla/other", "ignored").await.unwrap();

        assert_eq!(mock.notifications("goe2tesla/notify"), vec!["Woke up car"]);
        assert_eq!(mock.total_notifications(), 2);
    }

    #[test]
    fn subscriptions_are_counted_per_filter() {
        let mock = MockChannel::new();
        mock.try_subscribe("go-eCharger/1/status", QoS::AtMostOnce).unwrap();
        mock.try_subscribe("go-eCharger/1/status", QoS::AtMostOnce).unwrap();

        assert_eq!(mock.subscribe_count("go-eCharger/1/status"), 2);
        assert_eq!(mock.subscribe_count("go-eCharger/2/status"), 0);
    }

    #[tokio::test]
    async fn full_queue_rejects_everything() {
        let mock = MockChannel::new();
        mock.set_queue_full(true);
        assert!(mock.publish_text("t", "x").await.is_err());
        assert!(matches!(
            mock.try_subscribe("t", QoS::AtMostOnce),
            Err(MqttError::Subscribe(_))
        ));

        mock.set_queue_full(false);
        mock.try_subscribe("t", QoS::AtMostOnce).unwrap();
        assert_eq!(mock.subscribe_count("t"), 1);
        assert_eq!(mock.total_notifications(), 0);
    }
}
