//! CoAP server front end
//!
//! Hosts the resource tree the bridge lives in, plus CoRE discovery at
//! `/.well-known/core` and the small informational resources.

mod resource;
mod server;

pub use resource::{CoapResource, RequestContext, ResourceReply, TimeResource, Welcome, WhoAmI};
pub use server::CoapServer;
