//! The two fixed test execution contexts.

use super::pattern::{PatternError, PatternSet};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Component tests: `*.svelte.{test,spec}.{js,ts}` anywhere under `src/`.
pub const COMPONENT_TEST_PATTERN: &str = "src/**/*.svelte.{test,spec}.{js,ts}";
/// Every test or spec file under `src/`.
pub const TEST_PATTERN: &str = "src/**/*.{test,spec}.{js,ts}";
/// Code that must never load in a browser.
pub const SERVER_ONLY_SUBTREE: &str = "src/lib/server/**";
pub const BROWSER_SETUP_SCRIPT: &str = "src/test/setup-browser.ts";

pub const CLIENT: &str = "client";
pub const SERVER: &str = "server";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvironmentKind {
    /// Rendered in a real browser
    Browser,
    /// Plain headless process (node)
    Process,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrowserInstance {
    pub browser: String,
    pub headless: bool,
}

/// Rendering sandbox requested from the test engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrowserSandbox {
    pub provider: String,
    pub instances: Vec<BrowserInstance>,
}

impl BrowserSandbox {
    /// One headless Chromium driven by Playwright.
    pub fn headless_chromium() -> Self {
        Self {
            provider: "playwright".to_string(),
            instances: vec![BrowserInstance {
                browser: "chromium".to_string(),
                headless: true,
            }],
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TestContext {
    pub name: String,
    pub environment: EnvironmentKind,
    pub setup_scripts: Vec<PathBuf>,
    pub include: PatternSet,
    pub exclude: PatternSet,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub browser: Option<BrowserSandbox>,
}

impl TestContext {
    /// Browser context for component tests, minus the server-only subtree.
    pub fn client() -> Result<Self, PatternError> {
        Ok(Self {
            name: CLIENT.to_string(),
            environment: EnvironmentKind::Browser,
            setup_scripts: vec![PathBuf::from(BROWSER_SETUP_SCRIPT)],
            include: PatternSet::new([COMPONENT_TEST_PATTERN])?,
            exclude: PatternSet::new([SERVER_ONLY_SUBTREE])?,
            browser: Some(BrowserSandbox::headless_chromium()),
        })
    }

    /// Process context for everything that is not a component test.
    pub fn server() -> Result<Self, PatternError> {
        Ok(Self {
            name: SERVER.to_string(),
            environment: EnvironmentKind::Process,
            setup_scripts: Vec::new(),
            include: PatternSet::new([TEST_PATTERN])?,
            exclude: PatternSet::new([COMPONENT_TEST_PATTERN])?,
            browser: None,
        })
    }

    /// Included and not excluded.
    pub fn claims(&self, path: &Path) -> bool {
        self.include.is_match(path) && !self.exclude.is_match(path)
    }
}
