//! HTTP client creation and configuration.
//!
//! One pooled client is shared by every connection task; it talks HTTP/1.1
//! to both the API upstream (usually HTTPS) and the local application.

use crate::config::ConnectionPoolConfig;
use http_body_util::combinators::BoxBody;
use hyper::body::Bytes;
use hyper_rustls::{ConfigBuilderExt, HttpsConnectorBuilder};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Type alias for the HTTP client used by the proxy.
pub type HttpClient = Client<hyper_rustls::HttpsConnector<HttpConnector>, BoxBody<Bytes, hyper::Error>>;

/// Create a shared HTTP client with connection pooling.
///
/// Native root certificates are used for HTTPS upstreams. When the platform
/// store cannot be loaded the client still works for plain HTTP origins and
/// every HTTPS handshake fails instead.
pub fn create_http_client(pool: &ConnectionPoolConfig) -> Result<HttpClient, anyhow::Error> {
    let mut http_connector = HttpConnector::new();
    http_connector.set_keepalive(Some(Duration::from_secs(pool.keepalive_timeout_secs)));
    http_connector.set_connect_timeout(Some(Duration::from_secs(pool.connect_timeout_secs)));
    http_connector.enforce_http(false); // Allow both HTTP and HTTPS

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let tls_config = match rustls::ClientConfig::builder_with_provider(provider.clone())
        .with_safe_default_protocol_versions()?
        .with_native_roots()
    {
        Ok(builder) => builder.with_no_client_auth(),
        Err(e) => {
            warn!("Failed to load native root certificates, HTTPS upstreams will be rejected: {e}");
            rustls::ClientConfig::builder_with_provider(provider)
                .with_safe_default_protocol_versions()?
                .with_root_certificates(rustls::RootCertStore::empty())
                .with_no_client_auth()
        }
    };

    let https_connector = HttpsConnectorBuilder::new()
        .with_tls_config(tls_config)
        .https_or_http()
        .enable_http1()
        .wrap_connector(http_connector);

    let http_client = Client::builder(TokioExecutor::new())
        .pool_idle_timeout(Duration::from_secs(pool.idle_timeout_secs))
        .pool_max_idle_per_host(pool.max_idle_per_host)
        .build(https_connector);

    info!(
        "Connection pool configured (HTTP/1.1): max_idle={}, idle_timeout={}s, keepalive={}s",
        pool.max_idle_per_host, pool.idle_timeout_secs, pool.keepalive_timeout_secs
    );

    Ok(http_client)
}
