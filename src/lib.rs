//! CoAP-to-MQTT bridge for constrained-device sensor telemetry
//!
//! Sensor nodes in a constrained-device network report JSON telemetry over
//! CoAP; this crate forwards each report to an MQTT broker:
//!
//! - **Topic derivation**: the MQTT topic base comes from the CoAP request
//!   path, with a configured fallback for empty or degenerate paths
//! - **Location enrichment**: the reporting device and every neighbor in
//!   its `neighbor_rssi` list are resolved against a static MAC-to-location
//!   directory; resolved labels are attached to the payload before
//!   forwarding
//! - **Outcome mapping**: publish success and the various failure classes
//!   map deterministically onto CoAP response codes, so a client always
//!   gets an answer
//!
//! # Architecture
//!
//! The bridge resource is stateless per request and consumes two injected
//! collaborators: the read-only [`LocationDirectory`](directory::LocationDirectory)
//! and a [`Publish`](mqtt::Publish) capability (rumqttc-backed in
//! production, a recording double in tests). A small UDP CoAP server hosts
//! the bridge at `/sensor` next to CoRE discovery and a few informational
//! resources.
//!
//! # Example Configuration
//!
//! ```json
//! {
//!   "mqtt": {
//!     "host": "mosquitto",
//!     "port": 1883,
//!     "username": "admin",
//!     "password": "123456789"
//!   },
//!   "coap": { "bind-addr": "localhost", "bind-port": 5683 },
//!   "topic": { "default-base": "sensor/default" },
//!   "locations": {
//!     "3a:4f:ec:85:c0:65:36:19": "raum_1_08"
//!   }
//! }
//! ```

pub mod bridge;
pub mod coap;
pub mod config;
pub mod directory;
pub mod mqtt;
pub mod payload;
pub mod topic;

// Re-export main types
pub use bridge::{BridgeReply, BridgeResource, BridgeStatus};
pub use config::BridgeConfig;
pub use directory::LocationDirectory;
pub use mqtt::{MqttPublisher, Publish};
