//! UDP CoAP server
//!
//! Decodes datagrams with coap-lite, routes requests by Uri-Path to the
//! registered resources, and encodes the replies. Each request is handled
//! on its own task so a slow handler (the bridge waiting on the broker)
//! never blocks the receive loop.

use crate::coap::resource::{CoapResource, RequestContext, ResourceReply};
use anyhow::{Context as _, Result};
use coap_lite::{CoapOption, ContentFormat, MessageClass, MessageType, Packet, RequestType};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{ToSocketAddrs, UdpSocket};
use tracing::{debug, info, warn};

const WELL_KNOWN_CORE: &str = ".well-known/core";

/// Maximum datagram size accepted by the listener.
const MAX_DATAGRAM: usize = 1500;

struct Registration {
    resource: Arc<dyn CoapResource>,
    link_attributes: Option<String>,
}

/// CoAP server hosting a set of resources.
pub struct CoapServer {
    resources: BTreeMap<String, Registration>,
}

impl CoapServer {
    pub fn new() -> Self {
        Self {
            resources: BTreeMap::new(),
        }
    }

    /// Register a resource under a path ("" is the root resource).
    pub fn add_resource(&mut self, path: &str, resource: Arc<dyn CoapResource>) {
        self.resources.insert(
            path.to_string(),
            Registration {
                resource,
                link_attributes: None,
            },
        );
    }

    /// Register a resource with CoRE link attributes for discovery.
    pub fn add_resource_with_link(
        &mut self,
        path: &str,
        resource: Arc<dyn CoapResource>,
        attributes: &str,
    ) {
        self.resources.insert(
            path.to_string(),
            Registration {
                resource,
                link_attributes: Some(attributes.to_string()),
            },
        );
    }

    /// CoRE link-format listing of the registered resources.
    fn link_format(&self) -> String {
        self.resources
            .iter()
            .map(|(path, registration)| match &registration.link_attributes {
                Some(attributes) => format!("</{}>;{}", path, attributes),
                None => format!("</{}>", path),
            })
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Bind the listener and serve requests until the process exits.
    pub async fn run(self, bind: impl ToSocketAddrs) -> Result<()> {
        let socket = Arc::new(
            UdpSocket::bind(bind)
                .await
                .context("failed to bind CoAP listener")?,
        );
        info!(addr = %socket.local_addr()?, "CoAP server listening");

        let server = Arc::new(self);
        let mut buf = vec![0u8; MAX_DATAGRAM];
        loop {
            let (len, source) = socket
                .recv_from(&mut buf)
                .await
                .context("CoAP listener receive failed")?;
            let datagram = buf[..len].to_vec();
            let socket = Arc::clone(&socket);
            let server = Arc::clone(&server);
            tokio::spawn(async move {
                if let Some(response) = server.dispatch(&datagram, source).await {
                    if let Err(e) = socket.send_to(&response, source).await {
                        warn!(peer = %source, error = %e, "failed to send CoAP response");
                    }
                }
            });
        }
    }

    /// Decode one datagram, route it, and encode the reply.
    ///
    /// Returns `None` when no reply should be sent: undecodable datagrams
    /// and non-request messages are dropped.
    async fn dispatch(&self, datagram: &[u8], source: SocketAddr) -> Option<Vec<u8>> {
        let packet = match Packet::from_bytes(datagram) {
            Ok(packet) => packet,
            Err(e) => {
                warn!(peer = %source, error = ?e, "dropping undecodable datagram");
                return None;
            }
        };

        let method = match packet.header.code {
            MessageClass::Request(method) => method,
            _ => {
                debug!(peer = %source, "ignoring non-request message");
                return None;
            }
        };

        let segments: Vec<String> = packet
            .get_option(CoapOption::UriPath)
            .map(|values| {
                values
                    .iter()
                    .map(|segment| String::from_utf8_lossy(segment).into_owned())
                    .collect()
            })
            .unwrap_or_default();

        debug!(peer = %source, method = ?method, path = %segments.join("/"), "CoAP request");

        let reply = self
            .route(method, segments, packet.payload.clone(), source)
            .await;

        encode_reply(&packet, reply)
    }

    async fn route(
        &self,
        method: RequestType,
        segments: Vec<String>,
        payload: Vec<u8>,
        source: SocketAddr,
    ) -> ResourceReply {
        let key = segments.join("/");

        if key == WELL_KNOWN_CORE {
            if method != RequestType::Get {
                return ResourceReply::method_not_allowed();
            }
            return ResourceReply::content(self.link_format().into_bytes())
                .with_content_format(ContentFormat::ApplicationLinkFormat);
        }

        match self.resources.get(&key) {
            Some(registration) => {
                let context = RequestContext {
                    method,
                    path: segments,
                    payload,
                    source,
                };
                registration.resource.handle(&context).await
            }
            None => ResourceReply::not_found(),
        }
    }
}

impl Default for CoapServer {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the response datagram: echo message id and token, ACK for
/// confirmable requests.
fn encode_reply(request: &Packet, reply: ResourceReply) -> Option<Vec<u8>> {
    let mut response = Packet::new();
    response.header.message_id = request.header.message_id;
    response.set_token(request.get_token().to_vec());
    response.header.code = MessageClass::Response(reply.status);
    response.header.set_type(match request.header.get_type() {
        MessageType::Confirmable => MessageType::Acknowledgement,
        _ => MessageType::NonConfirmable,
    });
    response.payload = reply.body;
    if let Some(content_format) = reply.content_format {
        response.set_content_format(content_format);
    }
    response.to_bytes().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coap::resource::{TimeResource, Welcome};
    use coap_lite::ResponseType;

    fn test_server() -> CoapServer {
        let mut server = CoapServer::new();
        server.add_resource("", Arc::new(Welcome));
        server.add_resource_with_link("time", Arc::new(TimeResource), "title=\"Current time\"");
        server
    }

    #[test]
    fn test_link_format_lists_resources() {
        let server = test_server();
        let links = server.link_format();
        assert_eq!(links, "</>,</time>;title=\"Current time\"");
    }

    #[tokio::test]
    async fn test_route_unknown_path() {
        let server = test_server();
        let reply = server
            .route(
                RequestType::Get,
                vec!["missing".to_string()],
                Vec::new(),
                "127.0.0.1:40000".parse().unwrap(),
            )
            .await;
        assert_eq!(reply.status, ResponseType::NotFound);
    }

    #[tokio::test]
    async fn test_route_well_known_core() {
        let server = test_server();
        let reply = server
            .route(
                RequestType::Get,
                vec![".well-known".to_string(), "core".to_string()],
                Vec::new(),
                "127.0.0.1:40000".parse().unwrap(),
            )
            .await;
        assert_eq!(reply.status, ResponseType::Content);
        assert_eq!(reply.content_format, Some(ContentFormat::ApplicationLinkFormat));
        let links = String::from_utf8(reply.body).unwrap();
        assert!(links.contains("</time>"));
    }

    #[tokio::test]
    async fn test_dispatch_round_trip() {
        let server = test_server();

        let mut packet = Packet::new();
        packet.header.message_id = 42;
        packet.header.code = MessageClass::Request(RequestType::Get);
        packet.set_token(vec![0xAB]);
        packet.add_option(coap_lite::CoapOption::UriPath, b"time".to_vec());
        let datagram = packet.to_bytes().unwrap();

        let response = server
            .dispatch(&datagram, "127.0.0.1:40000".parse().unwrap())
            .await
            .expect("expected a response");
        let decoded = Packet::from_bytes(&response).unwrap();
        assert_eq!(decoded.header.message_id, 42);
        assert_eq!(decoded.get_token(), [0xAB].as_slice());
        assert_eq!(
            decoded.header.code,
            MessageClass::Response(ResponseType::Content)
        );
        assert!(!decoded.payload.is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_drops_garbage() {
        let server = test_server();
        let response = server
            .dispatch(&[0xFF, 0x00], "127.0.0.1:40000".parse().unwrap())
            .await;
        assert!(response.is_none());
    }
}
