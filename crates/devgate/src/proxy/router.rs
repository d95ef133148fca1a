//! Decides whether a request is forwarded upstream or passed through.

use crate::config::RouteRule;
use crate::features::BaseConfig;
use hyper::Request;

/// Result of routing a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision<'a> {
    /// Forward to the rule's upstream and log the outcome
    Forward(&'a RouteRule),
    /// Hand the request to the local application untouched
    Passthrough,
}

/// Path-prefix router. First matching rule wins.
#[derive(Debug, Clone, Default)]
pub struct ProxyRouter {
    rules: Vec<RouteRule>,
    enabled: bool,
}

impl ProxyRouter {
    pub fn new(rules: Vec<RouteRule>) -> Self {
        Self {
            rules,
            enabled: true,
        }
    }

    /// A router that never forwards anything.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Installed only when the base configuration carries a proxy table.
    pub fn from_base(base: &BaseConfig) -> Self {
        match &base.proxy {
            Some(rules) => Self::new(rules.clone()),
            None => Self::disabled(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn rules(&self) -> &[RouteRule] {
        &self.rules
    }

    pub fn route<B>(&self, req: &Request<B>) -> RouteDecision<'_> {
        self.route_path(req.uri().path())
    }

    pub fn route_path(&self, path: &str) -> RouteDecision<'_> {
        if !self.enabled {
            return RouteDecision::Passthrough;
        }
        self.rules
            .iter()
            .find(|rule| rule.matches(path))
            .map(RouteDecision::Forward)
            .unwrap_or(RouteDecision::Passthrough)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, EnvFlags, Origin};

    fn rule(prefix: &str, origin: &str) -> RouteRule {
        RouteRule::new(prefix, Origin::parse(origin).unwrap(), true).unwrap()
    }

    fn request(path: &str) -> Request<()> {
        Request::builder()
            .uri(format!("http://localhost:8080{path}"))
            .body(())
            .unwrap()
    }

    #[test]
    fn test_api_prefix_is_forwarded() {
        let router = ProxyRouter::new(vec![rule("/api", "https://crates.io")]);
        match router.route(&request("/api/v1/crates")) {
            RouteDecision::Forward(r) => assert_eq!(r.path_prefix, "/api"),
            RouteDecision::Passthrough => panic!("expected forward"),
        }
    }

    #[test]
    fn test_other_paths_pass_through() {
        let router = ProxyRouter::new(vec![rule("/api", "https://crates.io")]);
        assert_eq!(router.route(&request("/")), RouteDecision::Passthrough);
        assert_eq!(router.route(&request("/crates/serde")), RouteDecision::Passthrough);
        assert_eq!(router.route(&request("/assets/api.js")), RouteDecision::Passthrough);
    }

    #[test]
    fn test_query_does_not_affect_matching() {
        let router = ProxyRouter::new(vec![rule("/api", "https://crates.io")]);
        assert!(matches!(
            router.route(&request("/api/v1/crates?q=serde")),
            RouteDecision::Forward(_)
        ));
        assert_eq!(
            router.route(&request("/search?q=/api")),
            RouteDecision::Passthrough
        );
    }

    #[test]
    fn test_first_match_wins() {
        let router = ProxyRouter::new(vec![
            rule("/api", "https://crates.io"),
            rule("/api/private", "https://staging.crates.io"),
        ]);
        match router.route_path("/api/private/tokens") {
            RouteDecision::Forward(r) => {
                assert_eq!(r.upstream_origin.to_string(), "https://crates.io")
            }
            RouteDecision::Passthrough => panic!("expected forward"),
        }
    }

    #[test]
    fn test_disabled_router_never_forwards() {
        let router = ProxyRouter::disabled();
        assert!(!router.is_enabled());
        for path in ["/api", "/api/ping", "/api/v1/crates", "/"] {
            assert_eq!(router.route_path(path), RouteDecision::Passthrough, "{path}");
        }
    }

    #[test]
    fn test_from_base_under_test_harness_is_disabled() {
        let config = Config {
            flags: EnvFlags {
                test_harness: true,
                ..EnvFlags::default()
            },
            ..Config::default()
        };
        let base = BaseConfig::assemble(&config).unwrap();
        let router = ProxyRouter::from_base(&base);
        assert!(!router.is_enabled());
        assert_eq!(router.route(&request("/api/ping")), RouteDecision::Passthrough);
    }

    #[test]
    fn test_from_base_default_forwards_api() {
        let base = BaseConfig::assemble(&Config::default()).unwrap();
        let router = ProxyRouter::from_base(&base);
        assert!(router.is_enabled());
        assert_eq!(router.rules().len(), 1);
        assert!(matches!(
            router.route(&request("/api/ping")),
            RouteDecision::Forward(_)
        ));
    }
}
