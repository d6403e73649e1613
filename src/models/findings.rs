use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
    Debug,
}

/// One line of the scrolling scan log. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    /// Phase id reference, not ownership.
    #[serde(default)]
    pub phase: Option<String>,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            message: message.into(),
            phase: None,
        }
    }

    pub fn with_phase(mut self, phase: impl Into<String>) -> Self {
        self.phase = Some(phase.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

/// Endpoint discovered by the remote crawler. Appended as received; the
/// server deduplicates upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    pub url: String,
    pub method: String,
    #[serde(default)]
    pub status_code: Option<u16>,
    #[serde(default = "Utc::now")]
    pub discovered_at: DateTime<Utc>,
}

/// Injectable parameter identified on a discovered endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterHit {
    pub endpoint_url: String,
    pub name: String,
    /// Where the parameter lives: query, body, header or cookie.
    pub location: String,
    #[serde(default = "Utc::now")]
    pub discovered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vulnerability {
    pub category: String,
    pub severity: Severity,
    pub endpoint_url: String,
    #[serde(default)]
    pub parameter: Option<String>,
    #[serde(default)]
    pub payload: Option<String>,
    pub description: String,
    #[serde(default = "Utc::now")]
    pub discovered_at: DateTime<Utc>,
}
