// ============================================
// Wire types for the real-time event channel
// ============================================
//
// Inbound lifecycle events and outbound control commands are both tagged
// unions with a fixed schema per tag. Payloads are validated here, at the
// channel boundary, so nothing loosely typed travels further into the
// monitor.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::models::{
    Endpoint, LogEntry, ParameterHit, Phase, Question, ScanStatistics, Vulnerability,
};

/// Everything the scan engine can push into a scan room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScanEvent {
    PhaseStarted {
        phase_id: String,
    },
    PhaseCompleted {
        phase_id: String,
    },
    SubphaseStarted {
        phase_id: String,
        subphase_id: String,
    },
    SubphaseCompleted {
        phase_id: String,
        subphase_id: String,
    },
    Log {
        entry: LogEntry,
    },
    EndpointDiscovered {
        endpoint: Endpoint,
    },
    ParameterDiscovered {
        parameter: ParameterHit,
    },
    VulnerabilityFound {
        vulnerability: Vulnerability,
    },
    QuestionAsked {
        question: Question,
    },
    QuestionResult {
        correct: bool,
        #[serde(default)]
        correct_option_index: Option<usize>,
        #[serde(default)]
        points_earned: u32,
        #[serde(default)]
        points_possible: Option<u32>,
    },
    ScanCompleted {
        statistics: ScanStatistics,
    },
    ScanError {
        message: String,
    },
    /// Entire server-side state in one event. Sent to clients that join or
    /// reconnect mid-scan; the single recovery mechanism for missed events.
    StatusSnapshot {
        snapshot: Box<StatusSnapshot>,
    },
    Paused,
    Resumed,
    Stopped,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    #[serde(default)]
    pub phases: Vec<Phase>,
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
    #[serde(default)]
    pub parameters: Vec<ParameterHit>,
    #[serde(default)]
    pub vulnerabilities: Vec<Vulnerability>,
    #[serde(default)]
    pub statistics: ScanStatistics,
    #[serde(default)]
    pub log_entries: Vec<LogEntry>,
    #[serde(default)]
    pub paused: bool,
    #[serde(default)]
    pub current_phase: Option<String>,
}

/// Launch configuration sent with `start`: scan metadata merged with the
/// one-shot parameters stashed by the scan-creation step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StartConfig {
    pub target_url: String,
    pub enabled_categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_engine: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub custom_headers: HashMap<String, String>,
}

/// Outbound control commands. Every command is fire-once; effects arrive
/// later as separate events, never as a direct reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    Join,
    Leave,
    Start { config: StartConfig },
    Pause,
    Resume,
    Stop,
    Answer { selected_option_index: usize },
}

/// Envelope published on the control channel. Carries the bearer token the
/// channel was connected with; the server rejects envelopes it cannot
/// authenticate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandEnvelope {
    pub scan_id: Uuid,
    pub token: String,
    #[serde(flatten)]
    pub command: Command,
}
