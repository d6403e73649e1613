use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::findings::{Endpoint, ParameterHit, Vulnerability};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionState {
    Idle,
    Running,
    Paused,
    Completed,
    Errored,
    Stopped,
}

impl ExecutionState {
    /// Terminal states accept no further lifecycle transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Errored | Self::Stopped)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    Pending,
    Running,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subphase {
    pub id: String,
    pub display_name: String,
    pub status: PhaseStatus,
}

impl Subphase {
    pub fn pending(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            status: PhaseStatus::Pending,
        }
    }
}

/// One stage of the remote scan. A phase either has subphases or it does
/// not; the shape is fixed when the phase tree is built and never changes
/// afterward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    pub id: String,
    pub display_name: String,
    pub status: PhaseStatus,
    #[serde(default)]
    pub subphases: Vec<Subphase>,
}

impl Phase {
    pub fn pending(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            status: PhaseStatus::Pending,
            subphases: Vec::new(),
        }
    }

    pub fn with_subphases(mut self, subphases: Vec<Subphase>) -> Self {
        self.subphases = subphases;
        self
    }
}

/// Build the initial phase tree for a session. Flat phases for recon,
/// discovery and reporting; the testing phase carries one subphase per
/// enabled category.
pub fn build_phase_plan(enabled_categories: &[String]) -> Vec<Phase> {
    let subphases = enabled_categories
        .iter()
        .map(|cat| Subphase::pending(cat.clone(), humanize_category(cat)))
        .collect::<Vec<_>>();

    vec![
        Phase::pending("recon", "Reconnaissance"),
        Phase::pending("discovery", "Endpoint Discovery"),
        Phase::pending("testing", "Vulnerability Testing").with_subphases(subphases),
        Phase::pending("reporting", "Reporting"),
    ]
}

fn humanize_category(category: &str) -> String {
    let mut out = String::with_capacity(category.len());
    for (i, part) in category.split('_').enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            if i == 0 {
                out.extend(first.to_uppercase());
            } else {
                out.push(first);
            }
        }
        out.push_str(chars.as_str());
    }
    out
}

/// Running counters shown next to the phase list. Incremented locally as
/// discovery events arrive; overwritten wholesale by the server's totals on
/// a status snapshot and at scan completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStatistics {
    #[serde(default)]
    pub endpoints_discovered: u32,
    #[serde(default)]
    pub parameters_tested: u32,
    #[serde(default)]
    pub vulnerabilities_found: u32,
    #[serde(default)]
    pub requests_sent: u32,
}

/// Root aggregate for one monitoring session. Mutated only by the event
/// dispatcher and the control protocol's confirmation handlers.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanSession {
    pub scan_id: Uuid,
    pub target_url: String,
    pub alias: Option<String>,
    pub enabled_categories: Vec<String>,
    pub connection_state: ConnectionState,
    pub execution_state: ExecutionState,
    /// Derived. Recomputed from the phase tree after every status
    /// mutation, never patched incrementally.
    pub overall_progress: u8,
    pub phases: Vec<Phase>,
    pub current_phase: Option<String>,
    pub endpoints: Vec<Endpoint>,
    pub parameters: Vec<ParameterHit>,
    pub vulnerabilities: Vec<Vulnerability>,
    pub stats: ScanStatistics,
    pub termination_message: Option<String>,
}

impl ScanSession {
    pub fn new(scan_id: Uuid) -> Self {
        Self {
            scan_id,
            target_url: String::new(),
            alias: None,
            enabled_categories: Vec::new(),
            connection_state: ConnectionState::Disconnected,
            execution_state: ExecutionState::Idle,
            overall_progress: 0,
            phases: Vec::new(),
            current_phase: None,
            endpoints: Vec::new(),
            parameters: Vec::new(),
            vulnerabilities: Vec::new(),
            stats: ScanStatistics::default(),
            termination_message: None,
        }
    }

    pub fn phase_mut(&mut self, phase_id: &str) -> Option<&mut Phase> {
        self.phases.iter_mut().find(|p| p.id == phase_id)
    }

    pub fn subphase_mut(&mut self, phase_id: &str, subphase_id: &str) -> Option<&mut Subphase> {
        self.phase_mut(phase_id)?
            .subphases
            .iter_mut()
            .find(|s| s.id == subphase_id)
    }
}
