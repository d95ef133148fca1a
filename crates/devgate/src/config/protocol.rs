//! Origin schemes understood by the proxy.

use super::ConfigError;
use serde::{Deserialize, Serialize};

/// Scheme of an upstream or application origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// Plain HTTP
    #[default]
    Http,
    /// HTTP over TLS (client side only, the listener never terminates TLS)
    Https,
}

impl Protocol {
    /// Get protocol name as string
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
        }
    }

    /// Parse protocol from URL scheme
    pub fn from_scheme(scheme: &str) -> Result<Self, ConfigError> {
        match scheme.to_ascii_lowercase().as_str() {
            "http" => Ok(Protocol::Http),
            "https" => Ok(Protocol::Https),
            other => Err(ConfigError::UnsupportedScheme(other.to_string())),
        }
    }
}
