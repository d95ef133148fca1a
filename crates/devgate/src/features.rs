//! Base configuration shared by the dev server and both test contexts.
//!
//! Everything here is decided once from [`Config`] and never mutated
//! afterwards. Test contexts hold the same `Arc<BaseConfig>` and only add
//! test-specific fields on top of it.

use crate::config::{Config, ConfigError, RouteRule};
use serde::Serialize;

/// Compile-time constants injected into the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Defines {
    /// `__TEST__`
    #[serde(rename = "__TEST__")]
    pub test: bool,
}

/// How the bundle analyzer emits its report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalyzerMode {
    /// Write a standalone HTML report instead of serving it
    Static,
}

/// Build pipeline modules handed to the framework. The modules themselves
/// live outside this crate; only which ones are enabled is decided here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "name", rename_all = "kebab-case")]
pub enum Feature {
    /// Framework integration (routing, SSR, HMR)
    App,
    /// Inline SVG imports as components
    SvgAssets,
    BundleAnalysis { mode: AnalyzerMode },
}

#[derive(Debug, Clone, Serialize)]
pub struct BaseConfig {
    pub defines: Defines,
    pub features: Vec<Feature>,
    /// `None` under a test harness: the proxy is not installed at all
    pub proxy: Option<Vec<RouteRule>>,
}

impl BaseConfig {
    pub fn assemble(config: &Config) -> Result<Self, ConfigError> {
        let flags = config.flags;

        let mut features = vec![Feature::App, Feature::SvgAssets];
        if flags.bundle_analysis {
            features.push(Feature::BundleAnalysis {
                mode: AnalyzerMode::Static,
            });
        }

        let proxy = if flags.test_harness {
            None
        } else {
            Some(vec![config.proxy.route_rule()?])
        };

        Ok(Self {
            defines: Defines {
                test: flags.test_harness,
            },
            features,
            proxy,
        })
    }

    pub fn is_test(&self) -> bool {
        self.defines.test
    }

    pub fn route_rules(&self) -> &[RouteRule] {
        self.proxy.as_deref().unwrap_or_default()
    }
}
