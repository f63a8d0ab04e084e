//! The CoAP-to-MQTT bridge resource
//!
//! Translates one inbound sensor request into at most one MQTT
//! publication: derive the topic base from the request path, decode the
//! JSON payload, resolve the reporting device and its neighbors against
//! the location directory, build the final topic, publish, and map the
//! outcome to a response. Stateless per request; a response is always
//! produced, whatever goes wrong in between.

use crate::coap::{CoapResource, RequestContext, ResourceReply};
use crate::directory::LocationDirectory;
use crate::mqtt::Publish;
use crate::payload::SensorPayload;
use crate::topic;
use anyhow::Result;
use async_trait::async_trait;
use coap_lite::{RequestType, ResponseType};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Terminal outcome of one bridged request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeOutcome {
    /// Payload enriched and accepted by the broker capability.
    Published { topic: String, bytes: usize },
    /// The broker capability refused the message.
    PublishFailed,
    /// The client sent an unusable payload.
    PayloadInvalid(String),
    /// Anything else that went wrong between decode and publish.
    InternalError(String),
}

/// Response status classification; the CoAP layer maps it to a code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeStatus {
    Success,
    ClientError,
    ServerError,
}

/// Response to a bridged request.
#[derive(Debug, Clone)]
pub struct BridgeReply {
    pub status: BridgeStatus,
    pub body: Vec<u8>,
}

/// The bridge resource.
///
/// Holds only read-only shared state, so any number of requests can run
/// through it concurrently; the publish capability serializes broker
/// access internally.
pub struct BridgeResource {
    default_base: String,
    directory: Arc<LocationDirectory>,
    publisher: Arc<dyn Publish>,
}

impl BridgeResource {
    pub fn new(
        default_base: impl Into<String>,
        directory: Arc<LocationDirectory>,
        publisher: Arc<dyn Publish>,
    ) -> Self {
        Self {
            default_base: default_base.into(),
            directory,
            publisher,
        }
    }

    /// Handle one request. Always returns a reply.
    pub async fn handle(&self, path: &[String], body: &[u8]) -> BridgeReply {
        let base = topic::base_from_segments(path, &self.default_base);
        debug!(base = %base, bytes = body.len(), "bridging sensor request");

        let outcome = match self.forward(&base, body).await {
            Ok(outcome) => outcome,
            Err(e) => BridgeOutcome::InternalError(e.to_string()),
        };
        Self::reply(outcome)
    }

    /// Decode, enrich, finalize the topic, and publish once.
    ///
    /// Client-fault conditions come back as `Ok(PayloadInvalid)`; an `Err`
    /// here means an unexpected fault and becomes `InternalError` at the
    /// boundary above.
    async fn forward(&self, base: &str, body: &[u8]) -> Result<BridgeOutcome> {
        let mut payload = match SensorPayload::decode(body) {
            Ok(payload) => payload,
            Err(e) => return Ok(BridgeOutcome::PayloadInvalid(e.to_string())),
        };
        let device_id = match payload.device_id() {
            Ok(id) => id,
            Err(e) => return Ok(BridgeOutcome::PayloadInvalid(e.to_string())),
        };

        if let Some(label) = self.directory.resolve(&device_id) {
            payload.set_location(label);
        }
        for mut neighbor in payload.neighbors_mut() {
            let Some(mac) = neighbor.mac() else {
                continue;
            };
            neighbor.set_location(self.directory.resolve(&mac));
        }

        let suffix = match payload.location() {
            Some(label) => label.to_string(),
            None => device_id,
        };
        let topic = topic::finalize(base, &suffix);
        let message = payload.to_bytes()?;

        if self.publisher.publish(&topic, &message).await {
            Ok(BridgeOutcome::Published {
                topic,
                bytes: body.len(),
            })
        } else {
            Ok(BridgeOutcome::PublishFailed)
        }
    }

    fn reply(outcome: BridgeOutcome) -> BridgeReply {
        match outcome {
            BridgeOutcome::Published { topic, bytes } => {
                info!(topic = %topic, bytes, "published sensor message");
                BridgeReply {
                    status: BridgeStatus::Success,
                    body: format!("Successfully published {} bytes", bytes).into_bytes(),
                }
            }
            BridgeOutcome::PublishFailed => {
                error!("failed to publish to MQTT broker");
                BridgeReply {
                    status: BridgeStatus::ServerError,
                    body: b"Failed to publish message".to_vec(),
                }
            }
            BridgeOutcome::PayloadInvalid(detail) => {
                error!(detail = %detail, "rejecting unusable payload");
                BridgeReply {
                    status: BridgeStatus::ClientError,
                    body: detail.into_bytes(),
                }
            }
            BridgeOutcome::InternalError(detail) => {
                error!(detail = %detail, "error while bridging request");
                BridgeReply {
                    status: BridgeStatus::ServerError,
                    body: detail.into_bytes(),
                }
            }
        }
    }
}

#[async_trait]
impl CoapResource for BridgeResource {
    async fn handle(&self, request: &RequestContext) -> ResourceReply {
        match request.method {
            RequestType::Put | RequestType::Post => {}
            _ => return ResourceReply::method_not_allowed(),
        }

        let reply = BridgeResource::handle(self, &request.path, &request.payload).await;
        let status = match reply.status {
            BridgeStatus::Success => ResponseType::Content,
            BridgeStatus::ClientError => ResponseType::BadRequest,
            BridgeStatus::ServerError => ResponseType::InternalServerError,
        };
        ResourceReply::with_status(status, reply.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct StubPublisher {
        accept: bool,
        published: Mutex<Vec<(String, Vec<u8>)>>,
    }

    impl StubPublisher {
        fn accepting() -> Arc<Self> {
            Arc::new(Self {
                accept: true,
                published: Mutex::new(Vec::new()),
            })
        }

        fn refusing() -> Arc<Self> {
            Arc::new(Self {
                accept: false,
                published: Mutex::new(Vec::new()),
            })
        }

        fn topics(&self) -> Vec<String> {
            self.published.lock().iter().map(|(t, _)| t.clone()).collect()
        }
    }

    #[async_trait]
    impl Publish for StubPublisher {
        async fn publish(&self, topic: &str, payload: &[u8]) -> bool {
            if self.accept {
                self.published
                    .lock()
                    .push((topic.to_string(), payload.to_vec()));
            }
            self.accept
        }
    }

    fn directory() -> Arc<LocationDirectory> {
        Arc::new(
            LocationDirectory::build([
                ("3a:4f:ec:85:c0:65:36:19", "raum_1_08"),
                ("8e:d0:82:0b:a8:e5:c8:93", "roboterlabor"),
            ])
            .unwrap(),
        )
    }

    fn bridge(publisher: Arc<StubPublisher>) -> BridgeResource {
        BridgeResource::new("sensor/default", directory(), publisher)
    }

    fn path(segments: &[&str]) -> Vec<String> {
        segments.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_known_device_publishes_under_location() {
        let publisher = StubPublisher::accepting();
        let bridge = bridge(Arc::clone(&publisher));

        let body = br#"{"device":"3a:4f:ec:85:c0:65:36:19","temperature":25.5}"#;
        let reply = bridge.handle(&path(&["sensor"]), body).await;

        assert_eq!(reply.status, BridgeStatus::Success);
        assert_eq!(publisher.topics(), vec!["sensor/raum_1_08".to_string()]);
        assert_eq!(
            String::from_utf8(reply.body).unwrap(),
            format!("Successfully published {} bytes", body.len())
        );
    }

    #[tokio::test]
    async fn test_unknown_device_publishes_under_identifier() {
        let publisher = StubPublisher::accepting();
        let bridge = bridge(Arc::clone(&publisher));

        let body = br#"{"device":"unknown:mac","temperature":1}"#;
        let reply = bridge.handle(&path(&["sensor"]), body).await;

        assert_eq!(reply.status, BridgeStatus::Success);
        assert_eq!(publisher.topics(), vec!["sensor/unknown:mac".to_string()]);
    }

    #[tokio::test]
    async fn test_malformed_body_is_client_error_without_publish() {
        let publisher = StubPublisher::accepting();
        let bridge = bridge(Arc::clone(&publisher));

        let reply = bridge.handle(&path(&["sensor"]), b"not json").await;

        assert_eq!(reply.status, BridgeStatus::ClientError);
        assert!(publisher.topics().is_empty());
    }

    #[tokio::test]
    async fn test_publish_failure_is_server_error() {
        let publisher = StubPublisher::refusing();
        let bridge = bridge(Arc::clone(&publisher));

        let body = br#"{"device":"3a:4f:ec:85:c0:65:36:19","temperature":1}"#;
        let reply = bridge.handle(&path(&["sensor"]), body).await;

        assert_eq!(reply.status, BridgeStatus::ServerError);
        assert_eq!(
            String::from_utf8(reply.body).unwrap(),
            "Failed to publish message"
        );
    }

    #[tokio::test]
    async fn test_neighbor_enrichment() {
        let publisher = StubPublisher::accepting();
        let bridge = bridge(Arc::clone(&publisher));

        let body = br#"{"device":"3a:4f:ec:85:c0:65:36:19","neighbor_rssi":[{"MAC":"8e:d0:82:0b:a8:e5:c8:93","RSSI":-70},{"MAC":"no:such:mac","RSSI":-90}]}"#;
        let reply = bridge.handle(&path(&["sensor"]), body).await;
        assert_eq!(reply.status, BridgeStatus::Success);

        let published = publisher.published.lock();
        let (_, message) = &published[0];
        let value: serde_json::Value = serde_json::from_slice(message).unwrap();
        let neighbors = value["neighbor_rssi"].as_array().unwrap();
        assert_eq!(neighbors[0]["neighbor_location"], "roboterlabor");
        // Unresolved neighbors get an explicit null
        assert!(neighbors[1]["neighbor_location"].is_null());
        assert_eq!(value["location"], "raum_1_08");
    }

    #[tokio::test]
    async fn test_empty_path_uses_default_base() {
        let publisher = StubPublisher::accepting();
        let bridge = bridge(Arc::clone(&publisher));

        let body = br#"{"device":"unknown:mac"}"#;
        let reply = bridge.handle(&[], body).await;

        assert_eq!(reply.status, BridgeStatus::Success);
        assert_eq!(
            publisher.topics(),
            vec!["sensor/default/unknown:mac".to_string()]
        );
    }

    #[tokio::test]
    async fn test_coap_adapter_maps_statuses_and_methods() {
        let publisher = StubPublisher::accepting();
        let bridge = bridge(Arc::clone(&publisher));

        let request = RequestContext {
            method: RequestType::Get,
            path: path(&["sensor"]),
            payload: Vec::new(),
            source: "127.0.0.1:40000".parse().unwrap(),
        };
        let reply = CoapResource::handle(&bridge, &request).await;
        assert_eq!(reply.status, ResponseType::MethodNotAllowed);

        let request = RequestContext {
            method: RequestType::Post,
            path: path(&["sensor"]),
            payload: b"not json".to_vec(),
            source: "127.0.0.1:40000".parse().unwrap(),
        };
        let reply = CoapResource::handle(&bridge, &request).await;
        assert_eq!(reply.status, ResponseType::BadRequest);
    }
}
