//! ProxyServer struct and main run loop.

use super::client::{create_http_client, HttpClient};
use super::handler::{handle_request, RequestHandlerContext};
use super::network::bind_listener;
use super::router::ProxyRouter;
use crate::config::{Config, ListenConfig, Origin};
use crate::features::BaseConfig;
use crate::outcome::{OutcomeSink, TracingSink};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

/// The dev server: owns the router, the shared client and the outcome sink.
pub struct ProxyServer {
    listen: ListenConfig,
    router: ProxyRouter,
    app_origin: Origin,
    http_client: HttpClient,
    sink: Arc<dyn OutcomeSink>,
}

impl ProxyServer {
    /// Create a server logging outcomes through `tracing`.
    pub fn new(config: &Config, base: &BaseConfig) -> Result<Self, anyhow::Error> {
        Self::with_sink(config, base, Arc::new(TracingSink))
    }

    pub fn with_sink(
        config: &Config,
        base: &BaseConfig,
        sink: Arc<dyn OutcomeSink>,
    ) -> Result<Self, anyhow::Error> {
        Ok(Self {
            listen: config.listen.clone(),
            router: ProxyRouter::from_base(base),
            app_origin: config.app_origin.clone(),
            http_client: create_http_client(&config.connection_pool)?,
            sink,
        })
    }

    pub fn router(&self) -> &ProxyRouter {
        &self.router
    }

    /// Bind the configured address and serve until the process exits.
    pub async fn run(self) -> Result<(), anyhow::Error> {
        let listener = bind_listener(&self.listen)?;
        self.serve(listener).await
    }

    /// Serve connections from an already bound listener.
    pub async fn serve(self, listener: TcpListener) -> Result<(), anyhow::Error> {
        let addr = listener.local_addr()?;
        info!("Listening on http://{}", addr);
        info!("Passing through to {}", self.app_origin);
        if self.router.is_enabled() {
            for rule in self.router.rules() {
                info!(
                    "Proxying {} to {} (rewrite host: {})",
                    rule.path_prefix, rule.upstream_origin, rule.rewrite_host
                );
            }
        } else {
            info!("Test harness detected, API proxy disabled");
        }

        let server = Arc::new(self);

        loop {
            let (stream, remote_addr) = listener.accept().await?;
            let server = Arc::clone(&server);

            tokio::spawn(async move {
                let io = TokioIo::new(stream);
                let service = service_fn(move |req| {
                    let server = Arc::clone(&server);
                    async move { server.handle_request_internal(req).await }
                });

                if let Err(err) = http1::Builder::new()
                    .serve_connection(io, service)
                    .with_upgrades()
                    .await
                {
                    error!("Error serving connection from {}: {}", remote_addr, err);
                }
            });
        }
    }

    async fn handle_request_internal(
        &self,
        req: hyper::Request<hyper::body::Incoming>,
    ) -> Result<hyper::Response<super::forwarding::ProxyBody>, std::convert::Infallible> {
        let ctx = RequestHandlerContext {
            http_client: &self.http_client,
            router: &self.router,
            app_origin: &self.app_origin,
            sink: &self.sink,
        };
        handle_request(&ctx, req).await
    }
}
