//! Origins and path-prefix route rules.

use super::{ConfigError, Protocol};
use hyper::http::uri::{Authority, PathAndQuery, Scheme};
use hyper::Uri;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Scheme plus authority of a server, without path or query.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct Origin {
    protocol: Protocol,
    authority: Authority,
}

impl Origin {
    /// Parse an origin such as `https://crates.io` or `http://127.0.0.1:5173/`.
    ///
    /// A trailing `/` is accepted; any other path, a query or userinfo is rejected.
    pub fn parse(origin: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidOrigin {
            origin: origin.to_string(),
            reason: reason.to_string(),
        };

        let uri: Uri = origin.trim().parse().map_err(|e| ConfigError::InvalidOrigin {
            origin: origin.to_string(),
            reason: format!("{e}"),
        })?;

        let scheme = uri.scheme_str().ok_or_else(|| invalid("missing scheme"))?;
        let protocol = Protocol::from_scheme(scheme)?;
        let authority = uri
            .authority()
            .cloned()
            .ok_or_else(|| invalid("missing host"))?;
        if authority.as_str().contains('@') {
            return Err(invalid("credentials are not allowed in an origin"));
        }
        if let Some(pq) = uri.path_and_query() {
            if pq.query().is_some() || !matches!(pq.path(), "" | "/") {
                return Err(invalid("an origin must not carry a path or query"));
            }
        }

        Ok(Self {
            protocol,
            authority,
        })
    }

    /// Panics if `authority` is not a valid authority; only for literals.
    pub(crate) fn from_static(protocol: Protocol, authority: &'static str) -> Self {
        Self {
            protocol,
            authority: Authority::from_static(authority),
        }
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    /// Build the absolute URI for `path_and_query` on this origin.
    pub fn join(&self, path_and_query: Option<&PathAndQuery>) -> Result<Uri, hyper::http::Error> {
        let scheme = match self.protocol {
            Protocol::Http => Scheme::HTTP,
            Protocol::Https => Scheme::HTTPS,
        };
        let path_and_query = path_and_query
            .cloned()
            .unwrap_or_else(|| PathAndQuery::from_static("/"));
        Uri::builder()
            .scheme(scheme)
            .authority(self.authority.clone())
            .path_and_query(path_and_query)
            .build()
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.protocol.as_str(), self.authority)
    }
}

impl TryFrom<String> for Origin {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Origin::parse(&value)
    }
}

impl From<Origin> for String {
    fn from(origin: Origin) -> Self {
        origin.to_string()
    }
}

/// Forwards every request whose path starts with `path_prefix` to `upstream_origin`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteRule {
    pub path_prefix: String,
    pub upstream_origin: Origin,
    /// Rewrite `Host` to the upstream authority (`changeOrigin`)
    pub rewrite_host: bool,
}

impl RouteRule {
    pub fn new(
        path_prefix: impl Into<String>,
        upstream_origin: Origin,
        rewrite_host: bool,
    ) -> Result<Self, ConfigError> {
        let path_prefix = path_prefix.into();
        if path_prefix.is_empty() {
            return Err(ConfigError::EmptyPathPrefix);
        }
        Ok(Self {
            path_prefix,
            upstream_origin,
            rewrite_host,
        })
    }

    /// Plain prefix match on the request path, so `/api` also claims `/apiary`.
    pub fn matches(&self, path: &str) -> bool {
        path.starts_with(&self.path_prefix)
    }
}
