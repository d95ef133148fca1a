//! Per-request dispatch between the API upstream and the local application.

use super::client::HttpClient;
use super::forwarding::{forward_request, pass_through, ProxyBody};
use super::router::{ProxyRouter, RouteDecision};
use crate::config::Origin;
use crate::outcome::OutcomeSink;
use hyper::body::{Body, Bytes};
use hyper::{Request, Response};
use std::convert::Infallible;
use std::sync::Arc;
use tracing::debug;

/// Everything a request needs; borrowed from the server for the request's lifetime.
pub struct RequestHandlerContext<'a> {
    pub http_client: &'a HttpClient,
    pub router: &'a ProxyRouter,
    pub app_origin: &'a Origin,
    pub sink: &'a Arc<dyn OutcomeSink>,
}

pub async fn handle_request<B>(
    ctx: &RequestHandlerContext<'_>,
    req: Request<B>,
) -> Result<Response<ProxyBody>, Infallible>
where
    B: Body<Data = Bytes, Error = hyper::Error> + Send + Sync + 'static,
{
    let response = match ctx.router.route(&req) {
        RouteDecision::Forward(rule) => {
            forward_request(ctx.http_client, ctx.sink, rule, req).await
        }
        RouteDecision::Passthrough => {
            debug!("Passing through: {} {}", req.method(), req.uri());
            pass_through(ctx.http_client, ctx.app_origin, req).await
        }
    };
    Ok(response)
}
