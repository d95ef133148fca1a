//! Classification and logging of forwarded responses.
//!
//! Every request the proxy forwards produces exactly one [`ResponseOutcome`],
//! handed to an [`OutcomeSink`] once the upstream response has finished
//! streaming (or failed to arrive at all).

use chrono::{DateTime, SecondsFormat, Utc};
use hyper::Method;
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use tracing::{error, info, warn};

/// Target used for proxy outcome lines, filterable with `RUST_LOG=devgate::proxy=warn`.
pub const LOG_TARGET: &str = "devgate::proxy";

/// Prefix carried by every outcome line.
pub const LOG_PREFIX: &str = "[proxy]";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warn,
    Error,
}

impl Severity {
    /// `>= 500` is an error, `400..=499` a warning, anything else (including a
    /// missing status) is informational.
    pub fn from_status(status: Option<u16>) -> Self {
        match status.unwrap_or(0) {
            500.. => Severity::Error,
            400..=499 => Severity::Warn,
            _ => Severity::Info,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeKind {
    /// The upstream answered and the body stream has closed
    Completed,
    /// No response was received from the upstream
    Unreachable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponseOutcome {
    #[serde(serialize_with = "serialize_method")]
    pub method: Method,
    /// Path and query exactly as the client sent them
    pub request_url: String,
    pub status_code: Option<u16>,
    pub status_message: String,
    pub kind: OutcomeKind,
    pub completed_at: DateTime<Utc>,
}

fn serialize_method<S: serde::Serializer>(method: &Method, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(method.as_str())
}

impl ResponseOutcome {
    pub fn completed(
        method: Method,
        request_url: impl Into<String>,
        status_code: Option<u16>,
        status_message: impl Into<String>,
    ) -> Self {
        Self {
            method,
            request_url: request_url.into(),
            status_code,
            status_message: status_message.into(),
            kind: OutcomeKind::Completed,
            completed_at: Utc::now(),
        }
    }

    pub fn unreachable(method: Method, request_url: impl Into<String>, cause: impl fmt::Display) -> Self {
        Self {
            method,
            request_url: request_url.into(),
            status_code: None,
            status_message: format!("upstream unreachable: {cause}"),
            kind: OutcomeKind::Unreachable,
            completed_at: Utc::now(),
        }
    }

    /// Restamp the completion time, used when the body stream closes.
    pub(crate) fn finished_at(mut self, at: DateTime<Utc>) -> Self {
        self.completed_at = at;
        self
    }

    pub fn severity(&self) -> Severity {
        match self.kind {
            OutcomeKind::Unreachable => Severity::Error,
            OutcomeKind::Completed => Severity::from_status(self.status_code),
        }
    }

    /// `GET /api/v1/crates → 200 OK`
    pub fn summary(&self) -> String {
        let status = self
            .status_code
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string());
        format!(
            "{} {} → {} {}",
            self.method, self.request_url, status, self.status_message
        )
    }
}

/// Receives finished outcomes. Implementations must write each outcome
/// atomically; calls arrive concurrently from connection tasks.
pub trait OutcomeSink: Send + Sync {
    fn record(&self, outcome: ResponseOutcome);
}

/// Default sink: one `tracing` event per outcome at the outcome's severity.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl OutcomeSink for TracingSink {
    fn record(&self, outcome: ResponseOutcome) {
        let status = outcome.status_code.unwrap_or(0);
        let timestamp = outcome
            .completed_at
            .to_rfc3339_opts(SecondsFormat::Millis, true);
        let summary = outcome.summary();
        let method = outcome.method.as_str();
        let url = outcome.request_url.as_str();
        let status_message = outcome.status_message.as_str();

        match outcome.severity() {
            Severity::Error => error!(
                target: LOG_TARGET,
                method, url, status, status_message, %timestamp,
                "{LOG_PREFIX} {summary}"
            ),
            Severity::Warn => warn!(
                target: LOG_TARGET,
                method, url, status, status_message, %timestamp,
                "{LOG_PREFIX} {summary}"
            ),
            Severity::Info => info!(
                target: LOG_TARGET,
                method, url, status, status_message, %timestamp,
                "{LOG_PREFIX} {summary}"
            ),
        }
    }
}

/// Keeps outcomes in memory, for embedding and tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    outcomes: Mutex<Vec<ResponseOutcome>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn outcomes(&self) -> Vec<ResponseOutcome> {
        self.outcomes.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.outcomes.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.lock().is_empty()
    }
}

impl OutcomeSink for MemorySink {
    fn record(&self, outcome: ResponseOutcome) {
        self.outcomes.lock().push(outcome);
    }
}
