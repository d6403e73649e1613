//! One-shot launch parameter store.
//!
//! The scan-creation step stashes per-scan launch parameters here; the
//! monitor consumes them exactly once before issuing `start`. The entry is
//! deleted the moment it is read, whether or not the start that follows
//! succeeds.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::MonitorError;

/// Parameters the metadata service does not know about: hints entered on
/// the creation form that only matter for this one launch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LaunchParams {
    #[serde(default)]
    pub database_engine: Option<String>,
    #[serde(default)]
    pub custom_headers: HashMap<String, String>,
}

/// File-backed store: one JSON file per scan id under a configured
/// directory.
pub struct LaunchStore {
    dir: PathBuf,
}

impl LaunchStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, scan_id: Uuid) -> PathBuf {
        self.dir.join(format!("{scan_id}.json"))
    }

    /// Write the stash entry for a scan. Called by the creation step.
    pub fn stash(&self, scan_id: Uuid, params: &LaunchParams) -> Result<(), MonitorError> {
        fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string(params).map_err(std::io::Error::other)?;
        fs::write(self.path_for(scan_id), json)?;
        Ok(())
    }

    /// Read and delete the stash entry in one step. The delete happens
    /// before the parse so a corrupt entry is still consumed.
    pub fn take(&self, scan_id: Uuid) -> Option<LaunchParams> {
        let path = self.path_for(scan_id);
        let raw = fs::read_to_string(&path).ok()?;
        if let Err(e) = fs::remove_file(&path) {
            warn!(%scan_id, error = %e, "failed to delete launch stash entry");
        }
        match serde_json::from_str(&raw) {
            Ok(params) => {
                debug!(%scan_id, "launch parameters consumed");
                Some(params)
            }
            Err(e) => {
                warn!(%scan_id, error = %e, "malformed launch stash entry, discarding");
                None
            }
        }
    }
}
