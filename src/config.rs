//! Configuration types for the CoAP-to-MQTT bridge
//!
//! Provides JSON-serializable configuration for the MQTT session, the CoAP
//! listener, topic construction, and the device location table.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Bridge configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct BridgeConfig {
    /// MQTT broker session settings
    pub mqtt: MqttConfig,

    /// CoAP listener settings
    pub coap: CoapConfig,

    /// Topic construction settings
    pub topic: TopicConfig,

    /// Raw (device identifier, location label) entries. Identifiers are
    /// normalized when the location directory is built at startup.
    #[serde(default = "default_locations")]
    pub locations: BTreeMap<String, String>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            mqtt: MqttConfig::default(),
            coap: CoapConfig::default(),
            topic: TopicConfig::default(),
            locations: default_locations(),
        }
    }
}

// ============================================================================
// MQTT Configuration
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct MqttConfig {
    /// Broker hostname or address
    pub host: String,

    /// Broker port
    pub port: u16,

    /// Username for broker authentication (empty = anonymous)
    pub username: String,

    /// Password for broker authentication
    pub password: String,

    /// Keep-alive interval in seconds
    pub keep_alive_secs: u64,

    /// Client identifier presented to the broker
    pub client_id: String,

    /// QoS level for publications (0, 1, or 2)
    pub qos: u8,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: default_mqtt_host(),
            port: default_mqtt_port(),
            username: default_mqtt_username(),
            password: default_mqtt_password(),
            keep_alive_secs: default_keep_alive(),
            client_id: default_client_id(),
            qos: 0,
        }
    }
}

// ============================================================================
// CoAP Configuration
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct CoapConfig {
    /// Address to bind the CoAP listener to
    pub bind_addr: String,

    /// Port for the CoAP listener (5683 is standard for unencrypted CoAP)
    pub bind_port: u16,
}

impl Default for CoapConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_coap_addr(),
            bind_port: default_coap_port(),
        }
    }
}

// ============================================================================
// Topic Configuration
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct TopicConfig {
    /// Topic base used when the request path is empty or degenerate
    pub default_base: String,
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            default_base: default_topic_base(),
        }
    }
}

// ============================================================================
// Default value functions
// ============================================================================

fn default_mqtt_host() -> String {
    "mosquitto".to_string()
}

fn default_mqtt_port() -> u16 {
    1883
}

fn default_mqtt_username() -> String {
    "admin".to_string()
}

fn default_mqtt_password() -> String {
    "123456789".to_string()
}

fn default_keep_alive() -> u64 {
    60
}

fn default_client_id() -> String {
    "coap2mqtt".to_string()
}

fn default_coap_addr() -> String {
    "localhost".to_string()
}

fn default_coap_port() -> u16 {
    5683
}

fn default_topic_base() -> String {
    "sensor/default".to_string()
}

fn default_locations() -> BTreeMap<String, String> {
    [
        ("3a:4f:ec:85:c0:65:36:19", "raum_1_08"),
        ("8e:d0:82:0b:a8:e5:c8:93", "roboterlabor"),
        ("52:9d:cd:3b:8a:73:dd:58", "besprechungsraum"),
        ("9a:d6:18:d1:e5:e5:7d:4b", "uic"),
        ("be:73:09:12:a3:31:2e:52", "erste_etage_flur"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}
