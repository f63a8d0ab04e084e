//! CoAP resource trait and the demo resources
//!
//! A resource receives the decoded request (method, path, payload, peer)
//! and returns a status plus payload; the server takes care of datagram
//! framing, routing, and reply encoding.

use async_trait::async_trait;
use coap_lite::{ContentFormat, RequestType, ResponseType};
use std::net::SocketAddr;

/// One decoded inbound request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Request method (GET, PUT, POST, ...)
    pub method: RequestType,
    /// Uri-Path segments, empty for the root resource
    pub path: Vec<String>,
    /// Request body
    pub payload: Vec<u8>,
    /// Address the request came from
    pub source: SocketAddr,
}

/// Reply from a resource, mapped onto the CoAP response by the server.
#[derive(Debug, Clone)]
pub struct ResourceReply {
    pub status: ResponseType,
    pub body: Vec<u8>,
    pub content_format: Option<ContentFormat>,
}

impl ResourceReply {
    /// 2.05 Content with the given body.
    pub fn content(body: Vec<u8>) -> Self {
        Self {
            status: ResponseType::Content,
            body,
            content_format: None,
        }
    }

    pub fn with_status(status: ResponseType, body: Vec<u8>) -> Self {
        Self {
            status,
            body,
            content_format: None,
        }
    }

    pub fn with_content_format(mut self, content_format: ContentFormat) -> Self {
        self.content_format = Some(content_format);
        self
    }

    pub fn not_found() -> Self {
        Self::with_status(ResponseType::NotFound, b"Resource not found".to_vec())
    }

    pub fn method_not_allowed() -> Self {
        Self::with_status(ResponseType::MethodNotAllowed, b"Method not allowed".to_vec())
    }
}

/// A CoAP resource hosted by the server.
///
/// Handlers run concurrently, one task per inbound request, so
/// implementations hold no mutable state or synchronize it themselves.
#[async_trait]
pub trait CoapResource: Send + Sync {
    async fn handle(&self, request: &RequestContext) -> ResourceReply;
}

/// Welcome text at the root resource.
pub struct Welcome;

#[async_trait]
impl CoapResource for Welcome {
    async fn handle(&self, request: &RequestContext) -> ResourceReply {
        if request.method != RequestType::Get {
            return ResourceReply::method_not_allowed();
        }
        ResourceReply::content(b"Welcome to the coap2mqtt bridge server".to_vec())
    }
}

/// Current server time, as text.
pub struct TimeResource;

#[async_trait]
impl CoapResource for TimeResource {
    async fn handle(&self, request: &RequestContext) -> ResourceReply {
        if request.method != RequestType::Get {
            return ResourceReply::method_not_allowed();
        }
        let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        ResourceReply::content(now.into_bytes())
    }
}

/// Reports the requesting endpoint's network address.
pub struct WhoAmI;

#[async_trait]
impl CoapResource for WhoAmI {
    async fn handle(&self, request: &RequestContext) -> ResourceReply {
        if request.method != RequestType::Get {
            return ResourceReply::method_not_allowed();
        }
        let text = format!(
            "Used protocol: coap.\nRequest came from {}.",
            request.source
        );
        ResourceReply::content(text.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_request(path: &[&str]) -> RequestContext {
        RequestContext {
            method: RequestType::Get,
            path: path.iter().map(|s| s.to_string()).collect(),
            payload: Vec::new(),
            source: "127.0.0.1:40000".parse().unwrap(),
        }
    }

    #[tokio::test]
    async fn test_welcome_get() {
        let reply = Welcome.handle(&get_request(&[])).await;
        assert_eq!(reply.status, ResponseType::Content);
        assert!(!reply.body.is_empty());
    }

    #[tokio::test]
    async fn test_welcome_rejects_put() {
        let mut request = get_request(&[]);
        request.method = RequestType::Put;
        let reply = Welcome.handle(&request).await;
        assert_eq!(reply.status, ResponseType::MethodNotAllowed);
    }

    #[tokio::test]
    async fn test_whoami_reports_peer() {
        let reply = WhoAmI.handle(&get_request(&["whoami"])).await;
        let text = String::from_utf8(reply.body).unwrap();
        assert!(text.contains("127.0.0.1:40000"));
    }
}
