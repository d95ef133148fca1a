//! Configuration types for devgate.
//!
//! Settings come from three layers, lowest precedence first: built-in
//! defaults, an optional YAML file, and the process environment
//! (`API_HOST`, `PLAYWRIGHT`, `VITEST`, `BUNDLE_ANALYSIS`).

pub mod env;
mod listen;
mod protocol;
mod routing;
mod upstream;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub use env::EnvFlags;
pub use listen::ListenConfig;
pub use protocol::Protocol;
pub use routing::{Origin, RouteRule};
pub use upstream::ConnectionPoolConfig;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("route path prefix must not be empty")]
    EmptyPathPrefix,

    #[error("unsupported scheme '{0}', expected http or https")]
    UnsupportedScheme(String),

    #[error("invalid origin '{origin}': {reason}")]
    InvalidOrigin { origin: String, reason: String },

    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// The `/api` proxy entry.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProxyConfig {
    #[serde(default = "default_proxy_prefix")]
    pub prefix: String,
    /// Overridden by `API_HOST` when that variable is set
    #[serde(default = "default_proxy_target")]
    pub target: Origin,
    #[serde(default = "default_change_origin")]
    pub change_origin: bool,
}

impl ProxyConfig {
    pub fn route_rule(&self) -> Result<RouteRule, ConfigError> {
        RouteRule::new(
            self.prefix.clone(),
            self.target.clone(),
            self.change_origin,
        )
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            prefix: default_proxy_prefix(),
            target: default_proxy_target(),
            change_origin: default_change_origin(),
        }
    }
}

fn default_proxy_prefix() -> String {
    "/api".to_string()
}

fn default_proxy_target() -> Origin {
    Origin::from_static(Protocol::Https, "crates.io")
}

fn default_change_origin() -> bool {
    true
}

fn default_app_origin() -> Origin {
    Origin::from_static(Protocol::Http, "127.0.0.1:5173")
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub listen: ListenConfig,

    /// Local web application that receives every request the proxy does not claim
    #[serde(default = "default_app_origin")]
    pub app_origin: Origin,

    #[serde(default)]
    pub proxy: ProxyConfig,

    #[serde(default)]
    pub connection_pool: ConnectionPoolConfig,

    /// Environment switches; never read from the file
    #[serde(skip)]
    pub flags: EnvFlags,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: ListenConfig::default(),
            app_origin: default_app_origin(),
            proxy: ProxyConfig::default(),
            connection_pool: ConnectionPoolConfig::default(),
            flags: EnvFlags::default(),
        }
    }
}

impl Config {
    /// Defaults overlaid with the environment.
    pub fn from_env<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Config::default().with_env(&lookup)
    }

    /// Defaults plus the environment flags only. `API_HOST` is not read, so
    /// commands that never talk to the upstream work with any value of it.
    pub fn from_env_flags<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Config {
            flags: EnvFlags::from_lookup(&lookup),
            ..Config::default()
        }
    }

    /// YAML file overlaid with the environment.
    pub fn from_file<P, F>(path: P, lookup: F) -> Result<Self, ConfigError>
    where
        P: AsRef<Path>,
        F: Fn(&str) -> Option<String>,
    {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&contents)?.with_env(&lookup)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(contents)?)
    }

    fn with_env<F>(mut self, lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(api_host) = lookup(env::API_HOST) {
            self.proxy.target = Origin::parse(&api_host)?;
        }
        self.flags = EnvFlags::from_lookup(lookup);
        self.validate()?;
        Ok(self)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.proxy.route_rule()?;
        Ok(())
    }
}
