//! Header helpers for forwarded requests.
//!
//! `Host` is the only header the proxy touches; everything else the client
//! sent reaches the upstream as-is.

use hyper::header::{HeaderValue, HOST};
use hyper::http::request::Parts;
use hyper::http::uri::Authority;
use hyper::HeaderMap;

/// Extension trait for rewriting the `Host` header of an outgoing request.
pub trait HostRewriteExt {
    /// Point `Host` at `authority`, the way a client talking to the upstream
    /// directly would have set it.
    fn rewrite_host(&mut self, authority: &Authority);
}

impl HostRewriteExt for HeaderMap {
    fn rewrite_host(&mut self, authority: &Authority) {
        match HeaderValue::from_str(authority.as_str()) {
            Ok(value) => {
                self.insert(HOST, value);
            }
            Err(_) => {
                self.remove(HOST);
            }
        }
    }
}

impl HostRewriteExt for Parts {
    fn rewrite_host(&mut self, authority: &Authority) {
        self.headers.rewrite_host(authority);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::{ACCEPT, USER_AGENT};
    use hyper::Request;

    #[test]
    fn test_rewrite_host_replaces_existing() {
        let mut headers = HeaderMap::new();
        headers.insert(HOST, HeaderValue::from_static("localhost:8080"));
        headers.rewrite_host(&Authority::from_static("crates.io"));
        assert_eq!(headers.get(HOST).unwrap(), "crates.io");
        assert_eq!(headers.get_all(HOST).iter().count(), 1);
    }

    #[test]
    fn test_rewrite_host_inserts_when_missing() {
        let mut headers = HeaderMap::new();
        headers.rewrite_host(&Authority::from_static("127.0.0.1:9000"));
        assert_eq!(headers.get(HOST).unwrap(), "127.0.0.1:9000");
    }

    #[test]
    fn test_rewrite_host_leaves_other_headers() {
        let (mut parts, _) = Request::builder()
            .header(HOST, "localhost:8080")
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, "devgate-test")
            .body(())
            .unwrap()
            .into_parts();
        parts.rewrite_host(&Authority::from_static("crates.io"));
        assert_eq!(parts.headers.get(HOST).unwrap(), "crates.io");
        assert_eq!(parts.headers.get(ACCEPT).unwrap(), "application/json");
        assert_eq!(parts.headers.get(USER_AGENT).unwrap(), "devgate-test");
        assert_eq!(parts.headers.len(), 3);
    }
}
