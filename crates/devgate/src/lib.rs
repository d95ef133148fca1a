// Library exports for the devgate binary and integration tests

pub mod config;
pub mod dispatch;
pub mod features;
pub mod outcome;
pub mod proxy;

pub use config::{Config, ConfigError, Origin, RouteRule};
pub use dispatch::{Dispatcher, Partition};
pub use features::{BaseConfig, Defines, Feature};
pub use outcome::{OutcomeSink, ResponseOutcome, Severity};
pub use proxy::{ProxyRouter, ProxyServer, RouteDecision};
