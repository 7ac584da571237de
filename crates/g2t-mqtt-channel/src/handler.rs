//! Incoming message classification for the MQTT event loop.
//!
//! Parses raw MQTT publishes into typed `IncomingMessage` variants so the
//! bridge can dispatch them without poking at JSON by hand.

use rumqttc::Publish;

use g2t_protocol::charger::ChargerStatus;

/// A classified incoming MQTT message.
#[derive(Debug)]
pub enum IncomingMessage {
    /// Charger status on the configured topic.
    ChargerStatus(ChargerStatus),
    /// Payload on the status topic that is not a valid status record.
    Malformed { topic: String, error: String },
    /// Any other topic.
    Unknown { topic: String, payload: Vec<u8> },
}

/// Classify a raw MQTT publish against the configured status topic.
pub fn classify(publish: &Publish, status_topic: &str) -> IncomingMessage {
    let topic = &publish.topic;

    if topic != status_topic {
        return IncomingMessage::Unknown {
            topic: topic.clone(),
            payload: publish.payload.to_vec(),
        };
    }

    match ChargerStatus::from_slice(&publish.payload) {
        Ok(status) => IncomingMessage::ChargerStatus(status),
        Err(e) => IncomingMessage::Malformed {
            topic: topic.clone(),
            error: e.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rumqttc::QoS;

    const STATUS_TOPIC: &str = "go-eCharger/000001/status";

    fn make_publish(topic: &str, payload: &[u8]) -> Publish {
        let mut publish = Publish::new(topic, QoS::AtMostOnce, payload);
        publish.pkid = 1;
        publish
    }

    #[test]
    fn classify_charger_status() {
        let publish = make_publish(STATUS_TOPIC, br#"{"alw":"1","car":"2"}"#);
        let msg = classify(&publish, STATUS_TOPIC);
        assert!(matches!(msg, IncomingMessage::ChargerStatus(ref s) if s.charging_allowed()));
    }

    #[test]
    fn classify_bad_payload() {
        let publish = make_publish(STATUS_TOPIC, b"not-json");
        let msg = classify(&publish, STATUS_TOPIC);
        assert!(matches!(msg, IncomingMessage::Malformed { ref topic, .. } if topic == STATUS_TOPIC));
    }

    #[test]
    fn classify_missing_field() {
        let publish = make_publish(STATUS_TOPIC, br#"{"car":"2"}"#);
        let msg = classify(&publish, STATUS_TOPIC);
        assert!(matches!(msg, IncomingMessage::Malformed { ref error, .. } if error.contains("alw")));
    }

    #[test]
    fn classify_other_topic_is_unknown() {
        let publish = make_publish("go-eCharger/000002/status", br#"{"alw":"1"}"#);
        let msg = classify(&publish, STATUS_TOPIC);
        assert!(matches!(msg, IncomingMessage::Unknown { .. }));
    }
}
