//! Test context dispatch.
//!
//! Every discovered test file is assigned to exactly one of two contexts:
//! `client` renders component tests in a headless browser, `server` runs
//! everything else as a plain process. Both contexts extend the same
//! [`BaseConfig`] and only add their own setup, patterns and sandbox.

pub mod assertions;
mod context;
mod pattern;

pub use assertions::{
    AssertionCounter, AssertionPolicy, FailureReason, TestReport, TestStatus, Verdict,
};
pub use context::{
    BrowserInstance, BrowserSandbox, EnvironmentKind, TestContext, BROWSER_SETUP_SCRIPT, CLIENT,
    COMPONENT_TEST_PATTERN, SERVER, SERVER_ONLY_SUBTREE, TEST_PATTERN,
};
pub use pattern::{expand_braces, to_slash, PatternError, PatternSet};

use crate::features::BaseConfig;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Pattern(#[from] PatternError),

    #[error("failed to scan {root}: {source}")]
    Discovery {
        root: PathBuf,
        #[source]
        source: glob::GlobError,
    },

    #[error("test files claimed by both contexts: {}", display_paths(.0))]
    Overlapping(Vec<PathBuf>),

    #[error("test files claimed by no context: {}", display_paths(.0))]
    Orphaned(Vec<PathBuf>),
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| to_slash(p))
        .collect::<Vec<_>>()
        .join(", ")
}

/// A context layered on the shared base configuration.
#[derive(Debug, Clone, Serialize)]
pub struct Project {
    #[serde(skip)]
    pub extends: Arc<BaseConfig>,
    #[serde(flatten)]
    pub context: TestContext,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Assignment {
    Client,
    Server,
    /// Claimed by both; the patterns are supposed to make this impossible
    Both,
    /// Claimed by neither; the file never runs
    Neither,
}

/// Files grouped by context, sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Partition {
    pub client: Vec<PathBuf>,
    pub server: Vec<PathBuf>,
    pub orphaned: Vec<PathBuf>,
    pub overlapping: Vec<PathBuf>,
}

impl Partition {
    pub fn total(&self) -> usize {
        self.client.len() + self.server.len() + self.orphaned.len() + self.overlapping.len()
    }

    /// Overlap is checked first; it means a file would run twice.
    pub fn verify(&self) -> Result<(), DispatchError> {
        if !self.overlapping.is_empty() {
            return Err(DispatchError::Overlapping(self.overlapping.clone()));
        }
        if !self.orphaned.is_empty() {
            return Err(DispatchError::Orphaned(self.orphaned.clone()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Dispatcher {
    #[serde(serialize_with = "serialize_base")]
    pub base: Arc<BaseConfig>,
    pub client: Project,
    pub server: Project,
    pub assertions: AssertionPolicy,
}

fn serialize_base<S: serde::Serializer>(base: &Arc<BaseConfig>, s: S) -> Result<S::Ok, S::Error> {
    base.as_ref().serialize(s)
}

impl Dispatcher {
    pub fn new(base: Arc<BaseConfig>) -> Result<Self, DispatchError> {
        Ok(Self {
            client: Project {
                extends: Arc::clone(&base),
                context: TestContext::client()?,
            },
            server: Project {
                extends: Arc::clone(&base),
                context: TestContext::server()?,
            },
            base,
            assertions: AssertionPolicy::default(),
        })
    }

    pub fn projects(&self) -> [&Project; 2] {
        [&self.client, &self.server]
    }

    pub fn assign(&self, path: &Path) -> Assignment {
        match (
            self.client.context.claims(path),
            self.server.context.claims(path),
        ) {
            (true, true) => Assignment::Both,
            (true, false) => Assignment::Client,
            (false, true) => Assignment::Server,
            (false, false) => Assignment::Neither,
        }
    }

    pub fn partition<I, P>(&self, files: I) -> Partition
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let files: BTreeSet<PathBuf> = files.into_iter().map(Into::into).collect();
        let mut partition = Partition::default();
        for file in files {
            let assignment = self.assign(&file);
            debug!("{} -> {:?}", file.display(), assignment);
            match assignment {
                Assignment::Client => partition.client.push(file),
                Assignment::Server => partition.server.push(file),
                Assignment::Both => partition.overlapping.push(file),
                Assignment::Neither => partition.orphaned.push(file),
            }
        }
        partition
    }
}

/// Every `*.{test,spec}.{js,ts}` file under `root/src`, relative to `root`.
/// `node_modules` is never descended into.
pub fn discover(root: &Path) -> Result<Vec<PathBuf>, DispatchError> {
    let escaped_root = glob::Pattern::escape(&root.to_string_lossy());
    let mut found = BTreeSet::new();

    for pattern in expand_braces(TEST_PATTERN)? {
        let full = format!("{escaped_root}/{pattern}");
        let paths = glob::glob_with(&full, pattern::MATCH_OPTIONS).map_err(|source| {
            PatternError::Invalid {
                pattern: full.clone(),
                source,
            }
        })?;

        for entry in paths {
            let path = entry.map_err(|source| DispatchError::Discovery {
                root: root.to_path_buf(),
                source,
            })?;
            if !path.is_file() || path.components().any(|c| c.as_os_str() == "node_modules") {
                continue;
            }
            let relative = path.strip_prefix(root).unwrap_or(&path).to_path_buf();
            found.insert(relative);
        }
    }

    Ok(found.into_iter().collect())
}
