//! Scan metadata service client.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;
use uuid::Uuid;

use crate::error::MonitorError;

/// Injection technique categories enabled when the metadata service cannot
/// be reached: everything on, so the scan proceeds rather than blocking.
pub const DEFAULT_CATEGORIES: &[&str] = &[
    "error_based",
    "boolean_blind",
    "time_blind",
    "union_based",
    "stacked_queries",
];

const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Static scan configuration, set once per session and read-only after.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanMetadata {
    pub url: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default = "ScanMetadata::default_categories")]
    pub enabled_categories: Vec<String>,
}

impl ScanMetadata {
    pub fn default_categories() -> Vec<String> {
        DEFAULT_CATEGORIES.iter().map(|s| s.to_string()).collect()
    }

    /// Fallback used when the fetch fails.
    pub fn fallback() -> Self {
        Self {
            url: String::new(),
            alias: None,
            enabled_categories: Self::default_categories(),
        }
    }
}

pub struct MetadataClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl MetadataClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self, MonitorError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            token: token.into(),
        })
    }

    /// `GET /v1/scans/{id}`.
    pub async fn fetch(&self, scan_id: Uuid) -> Result<ScanMetadata, MonitorError> {
        let url = format!("{}/v1/scans/{}", self.base_url.trim_end_matches('/'), scan_id);
        let metadata = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?
            .error_for_status()?
            .json::<ScanMetadata>()
            .await?;
        Ok(metadata)
    }

    /// Fetch, falling back to the default category set on any failure so
    /// the monitor never blocks on metadata.
    pub async fn fetch_or_default(&self, scan_id: Uuid) -> ScanMetadata {
        match self.fetch(scan_id).await {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!(%scan_id, error = %e, "metadata fetch failed, enabling all categories");
                ScanMetadata::fallback()
            }
        }
    }
}
