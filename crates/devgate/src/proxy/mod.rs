//! Proxy server module.
//!
//! Requests whose path matches a route rule are forwarded to the API upstream
//! with `Host` rewritten; their outcome is classified and logged once the
//! response body has finished streaming. Everything else goes to the local
//! application untouched.
//!
//! # Module Structure
//!
//! - `server` - ProxyServer struct and main run loop
//! - `handler` - Per-request routing decision
//! - `router` - Path-prefix route matching
//! - `forwarding` - Request retargeting and forwarding
//! - `body` - Completion hook on the streamed response body
//! - `client` - HTTP client creation and configuration
//! - `network` - Listener setup

mod body;
mod client;
mod forwarding;
mod handler;
mod headers;
mod network;
mod router;
mod server;


pub use body::CompletionBody;
pub use client::{create_http_client, HttpClient};
pub use forwarding::{
    error_response, prepare_passthrough_request, prepare_upstream_request, request_url, ProxyBody,
};
pub use headers::HostRewriteExt;
pub use router::{ProxyRouter, RouteDecision};
pub use server::ProxyServer;
