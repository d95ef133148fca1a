//! Request forwarding to the API upstream and the local application.

use super::body::CompletionBody;
use super::client::HttpClient;
use super::headers::HostRewriteExt;
use crate::config::{Origin, RouteRule};
use crate::outcome::{OutcomeSink, ResponseOutcome};
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full};
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderValue, CONTENT_TYPE, UPGRADE};
use hyper::http::response;
use hyper::upgrade::OnUpgrade;
use hyper::{Request, Response, StatusCode, Uri};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{debug, warn};

pub type ProxyBody = BoxBody<Bytes, hyper::Error>;

/// Helper function to create a JSON error response.
pub fn error_response(status: StatusCode, message: &str) -> Response<ProxyBody> {
    let body = serde_json::json!({ "error": message }).to_string();
    let mut response = Response::new(
        Full::new(Bytes::from(body))
            .map_err(|never: Infallible| match never {})
            .boxed(),
    );
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

/// Path and query as the client sent them, `/` when absent.
pub fn request_url(uri: &Uri) -> String {
    uri.path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string())
}

/// Reason phrase as sent by the upstream, falling back to the canonical one.
pub fn status_message(parts: &response::Parts) -> String {
    parts
        .extensions
        .get::<hyper::ext::ReasonPhrase>()
        .map(|reason| String::from_utf8_lossy(reason.as_bytes()).into_owned())
        .or_else(|| parts.status.canonical_reason().map(str::to_string))
        .unwrap_or_default()
}

/// Retarget `req` at the rule's upstream: same method, path, query, headers
/// and body; `Host` rewritten when the rule asks for it.
pub fn prepare_upstream_request<B>(
    rule: &RouteRule,
    req: Request<B>,
) -> Result<Request<B>, hyper::http::Error> {
    let (mut parts, body) = req.into_parts();
    parts.uri = rule.upstream_origin.join(parts.uri.path_and_query())?;
    if rule.rewrite_host {
        parts.rewrite_host(rule.upstream_origin.authority());
    }
    Ok(Request::from_parts(parts, body))
}

/// Retarget `req` at the local application, leaving every header alone.
pub fn prepare_passthrough_request<B>(
    origin: &Origin,
    req: Request<B>,
) -> Result<Request<B>, hyper::http::Error> {
    let (mut parts, body) = req.into_parts();
    parts.uri = origin.join(parts.uri.path_and_query())?;
    Ok(Request::from_parts(parts, body))
}

/// Forward to the rule's upstream, streaming the response back and recording
/// its outcome once the body finishes.
pub async fn forward_request<B>(
    http_client: &HttpClient,
    sink: &Arc<dyn OutcomeSink>,
    rule: &RouteRule,
    req: Request<B>,
) -> Response<ProxyBody>
where
    B: Body<Data = Bytes, Error = hyper::Error> + Send + Sync + 'static,
{
    let method = req.method().clone();
    let url = request_url(req.uri());

    let upstream_req = match prepare_upstream_request(rule, req) {
        Ok(r) => r.map(|b| b.boxed()),
        Err(e) => {
            sink.record(ResponseOutcome::unreachable(method, url, &e));
            return error_response(StatusCode::BAD_GATEWAY, "Bad Gateway");
        }
    };

    debug!("Forwarding {} {} to {}", method, url, upstream_req.uri());

    match http_client.request(upstream_req).await {
        Ok(upstream_response) => {
            let (parts, body) = upstream_response.into_parts();
            let outcome = ResponseOutcome::completed(
                method,
                url,
                Some(parts.status.as_u16()),
                status_message(&parts),
            );
            let body = CompletionBody::new(body, outcome, Arc::clone(sink));
            Response::from_parts(parts, body.boxed())
        }
        Err(e) => {
            sink.record(ResponseOutcome::unreachable(method, url, &e));
            error_response(StatusCode::BAD_GATEWAY, "Bad Gateway")
        }
    }
}

/// Hand the request to the local application unchanged. Nothing is recorded.
///
/// Upgrade requests (the app's hot-reload socket) are bridged: once the app
/// answers `101 Switching Protocols`, both upgraded connections are joined
/// and copied in both directions until either side closes.
pub async fn pass_through<B>(
    http_client: &HttpClient,
    app_origin: &Origin,
    mut req: Request<B>,
) -> Response<ProxyBody>
where
    B: Body<Data = Bytes, Error = hyper::Error> + Send + Sync + 'static,
{
    let url = request_url(req.uri());
    let client_upgrade = req
        .headers()
        .contains_key(UPGRADE)
        .then(|| hyper::upgrade::on(&mut req));

    let app_req = match prepare_passthrough_request(app_origin, req) {
        Ok(r) => r.map(|b| b.boxed()),
        Err(e) => {
            warn!("Failed to build request for {}: {}", url, e);
            return error_response(StatusCode::BAD_GATEWAY, "Bad Gateway");
        }
    };

    match http_client.request(app_req).await {
        Ok(mut response) => {
            if response.status() == StatusCode::SWITCHING_PROTOCOLS {
                if let Some(client_upgrade) = client_upgrade {
                    let app_upgrade = hyper::upgrade::on(&mut response);
                    tokio::spawn(bridge_upgraded(client_upgrade, app_upgrade, url));
                }
            }
            response.map(|b| b.boxed())
        }
        Err(e) => {
            warn!("Application at {} unreachable for {}: {}", app_origin, url, e);
            error_response(StatusCode::BAD_GATEWAY, "Bad Gateway")
        }
    }
}

async fn bridge_upgraded(client: OnUpgrade, app: OnUpgrade, url: String) {
    let (client, app) = match tokio::try_join!(client, app) {
        Ok(pair) => pair,
        Err(e) => {
            warn!("Upgrade of {} failed: {}", url, e);
            return;
        }
    };

    let mut client = TokioIo::new(client);
    let mut app = TokioIo::new(app);
    match tokio::io::copy_bidirectional(&mut client, &mut app).await {
        Ok((sent, received)) => debug!(
            "Upgraded connection for {} closed ({} bytes up, {} bytes down)",
            url, sent, received
        ),
        Err(e) => debug!("Upgraded connection for {} ended: {}", url, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::{ACCEPT, HOST};
    use hyper::Method;

    fn api_rule(rewrite_host: bool) -> RouteRule {
        RouteRule::new(
            "/api",
            Origin::parse("https://crates.io").unwrap(),
            rewrite_host,
        )
        .unwrap()
    }

    fn client_request(method: Method, path: &str) -> Request<()> {
        Request::builder()
            .method(method)
            .uri(path)
            .header(HOST, "localhost:8080")
            .header(ACCEPT, "application/json")
            .body(())
            .unwrap()
    }

    #[test]
    fn test_error_response_502() {
        let response = error_response(StatusCode::BAD_GATEWAY, "Bad Gateway");
        assert_eq!(response.status(), 502);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }

    #[test]
    fn test_request_url_keeps_query() {
        let uri: Uri = "/api/v1/crates?q=serde&page=2".parse().unwrap();
        assert_eq!(request_url(&uri), "/api/v1/crates?q=serde&page=2");
        let uri: Uri = "http://localhost:8080".parse().unwrap();
        assert_eq!(request_url(&uri), "/");
    }

    #[test]
    fn test_prepare_upstream_preserves_method_path_and_query() {
        for method in [Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::PATCH] {
            let req = client_request(method.clone(), "/api/v1/crates/serde/follow?x=1");
            let upstream = prepare_upstream_request(&api_rule(true), req).unwrap();
            assert_eq!(upstream.method(), method);
            assert_eq!(
                upstream.uri().to_string(),
                "https://crates.io/api/v1/crates/serde/follow?x=1"
            );
        }
    }

    #[test]
    fn test_prepare_upstream_only_changes_host() {
        let req = client_request(Method::GET, "/api/v1/crates");
        let before = req.headers().clone();
        let upstream = prepare_upstream_request(&api_rule(true), req).unwrap();

        assert_eq!(upstream.headers().get(HOST).unwrap(), "crates.io");
        for (name, value) in before.iter().filter(|(n, _)| *n != HOST) {
            assert_eq!(upstream.headers().get(name), Some(value));
        }
        assert_eq!(upstream.headers().len(), before.len());
    }

    #[test]
    fn test_prepare_upstream_without_host_rewrite() {
        let req = client_request(Method::GET, "/api/v1/crates");
        let upstream = prepare_upstream_request(&api_rule(false), req).unwrap();
        assert_eq!(upstream.headers().get(HOST).unwrap(), "localhost:8080");
    }

    #[test]
    fn test_prepare_passthrough_leaves_headers() {
        let origin = Origin::parse("http://127.0.0.1:5173").unwrap();
        let req = client_request(Method::GET, "/crates/serde?tab=versions");
        let forwarded = prepare_passthrough_request(&origin, req).unwrap();
        assert_eq!(
            forwarded.uri().to_string(),
            "http://127.0.0.1:5173/crates/serde?tab=versions"
        );
        assert_eq!(forwarded.headers().get(HOST).unwrap(), "localhost:8080");
    }

    #[test]
    fn test_status_message_falls_back_to_canonical_reason() {
        let (parts, _) = Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(())
            .unwrap()
            .into_parts();
        assert_eq!(status_message(&parts), "Not Found");
    }

    #[test]
    fn test_status_message_for_unregistered_code_is_empty() {
        let (parts, _) = Response::builder()
            .status(599)
            .body(())
            .unwrap()
            .into_parts();
        assert_eq!(status_message(&parts), "");
    }
}
