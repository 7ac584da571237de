//! MQTT channel for the charger bridge.
//!
//! Provides a typed MQTT abstraction for the bridge:
//! - `Channel` trait for publish/subscribe (mockable in tests)
//! - `MqttChannel` with optional TLS and broker credentials
//! - `MockChannel` for testing without a broker
//! - `IncomingMessage` classification for charger status payloads

pub mod channel;
pub mod config;
pub mod error;
pub mod handler;
pub mod mock;
pub mod tls;

// Re-exports for convenience.
pub use channel::{Channel, MqttChannel};
pub use config::MqttConfig;
pub use error::{MqttError, MqttResult};
pub use handler::{IncomingMessage, classify};
pub use mock::MockChannel;
