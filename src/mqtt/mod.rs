//! MQTT publish capability
//!
//! The bridge consumes a single `publish(topic, payload) -> success`
//! capability; the rumqttc-backed implementation lives here.

mod publisher;

pub use publisher::{MqttPublisher, Publish};
