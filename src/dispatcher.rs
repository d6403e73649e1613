// ============================================
// Event dispatcher: the single mutation entry point
// ============================================
//
// Every inbound event kind maps to exactly one deterministic mutation of
// the session aggregate. Nothing else writes to it, which is what keeps
// single-task mutation safe without synchronization primitives. There is
// no per-event retry and no deduplication: a reconnecting client is
// brought back in sync by the server's status snapshot, nothing else.

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::events::{ScanEvent, StatusSnapshot};
use crate::logbuf::LogBuffer;
use crate::metadata::ScanMetadata;
use crate::models::{ExecutionState, PhaseStatus, ScanSession, build_phase_plan};
use crate::progress::compute_progress;
use crate::quiz::QuizGate;

/// Aggregate state of one monitored scan, reconstructed purely from the
/// event stream. The embedding UI reads it between events; only
/// [`apply`](Self::apply) and session initialization write to it.
#[derive(Debug)]
pub struct ScanMonitor {
    pub session: ScanSession,
    pub log: LogBuffer,
    pub quiz: QuizGate,
}

impl ScanMonitor {
    pub fn new(scan_id: Uuid) -> Self {
        Self {
            session: ScanSession::new(scan_id),
            log: LogBuffer::default(),
            quiz: QuizGate::new(),
        }
    }

    pub fn with_log_buffer(scan_id: Uuid, log: LogBuffer) -> Self {
        Self {
            session: ScanSession::new(scan_id),
            log,
            quiz: QuizGate::new(),
        }
    }

    /// Seed the read-only session fields from scan metadata and build the
    /// phase tree from the enabled categories. The tree shape is fixed
    /// here; later events only flip statuses.
    pub fn init_metadata(&mut self, metadata: &ScanMetadata) {
        self.session.target_url = metadata.url.clone();
        self.session.alias = metadata.alias.clone();
        self.session.enabled_categories = metadata.enabled_categories.clone();
        if self.session.phases.is_empty() {
            self.session.phases = build_phase_plan(&metadata.enabled_categories);
            self.session.overall_progress = compute_progress(&self.session.phases);
        }
    }

    /// Execution state as presented to the user: an outstanding question
    /// forces a paused presentation regardless of the server's own pause
    /// signal.
    pub fn presented_state(&self) -> ExecutionState {
        if self.quiz.is_gating() && !self.session.execution_state.is_terminal() {
            ExecutionState::Paused
        } else {
            self.session.execution_state
        }
    }

    /// Route one inbound event to its mutation.
    pub fn apply(&mut self, event: ScanEvent) {
        match event {
            ScanEvent::PhaseStarted { phase_id } => {
                self.set_phase_status(&phase_id, PhaseStatus::Running);
                self.session.current_phase = Some(phase_id);
                if self.session.execution_state == ExecutionState::Idle {
                    self.session.execution_state = ExecutionState::Running;
                }
            }
            ScanEvent::PhaseCompleted { phase_id } => {
                self.set_phase_status(&phase_id, PhaseStatus::Completed);
            }
            ScanEvent::SubphaseStarted {
                phase_id,
                subphase_id,
            } => {
                self.set_subphase_status(&phase_id, &subphase_id, PhaseStatus::Running);
            }
            ScanEvent::SubphaseCompleted {
                phase_id,
                subphase_id,
            } => {
                self.set_subphase_status(&phase_id, &subphase_id, PhaseStatus::Completed);
            }
            ScanEvent::Log { entry } => {
                self.log.append(entry);
            }
            ScanEvent::EndpointDiscovered { endpoint } => {
                debug!(url = %endpoint.url, "endpoint discovered");
                self.session.endpoints.push(endpoint);
                self.session.stats.endpoints_discovered += 1;
            }
            ScanEvent::ParameterDiscovered { parameter } => {
                self.session.parameters.push(parameter);
                self.session.stats.parameters_tested += 1;
            }
            ScanEvent::VulnerabilityFound { vulnerability } => {
                info!(
                    category = %vulnerability.category,
                    endpoint = %vulnerability.endpoint_url,
                    "vulnerability found"
                );
                self.session.vulnerabilities.push(vulnerability);
                self.session.stats.vulnerabilities_found += 1;
            }
            ScanEvent::QuestionAsked { question } => {
                self.quiz.on_question(question);
            }
            ScanEvent::QuestionResult {
                correct,
                correct_option_index,
                points_earned,
                points_possible,
            } => {
                self.quiz
                    .on_result(correct, correct_option_index, points_earned, points_possible);
            }
            ScanEvent::ScanCompleted { statistics } => {
                info!(scan_id = %self.session.scan_id, "scan completed");
                self.session.execution_state = ExecutionState::Completed;
                // Server totals are authoritative at completion, not the
                // locally accumulated counters.
                self.session.stats = statistics;
            }
            ScanEvent::ScanError { message } => {
                warn!(scan_id = %self.session.scan_id, %message, "scan error reported");
                self.session.execution_state = ExecutionState::Errored;
                // Partial results stay visible for inspection.
                self.session.termination_message = Some(message);
            }
            ScanEvent::StatusSnapshot { snapshot } => {
                self.apply_snapshot(*snapshot);
            }
            ScanEvent::Paused => {
                self.session.execution_state = ExecutionState::Paused;
            }
            ScanEvent::Resumed => {
                self.session.execution_state = ExecutionState::Running;
            }
            ScanEvent::Stopped => {
                self.session.execution_state = ExecutionState::Stopped;
                self.session.termination_message = Some("Scan stopped at user request".to_string());
            }
        }
    }

    /// Wholesale state replacement from a server snapshot. Also performs
    /// first-time initialization when no phase tree exists yet. Replaying
    /// the same snapshot is idempotent by construction: every field is
    /// overwritten, nothing is merged.
    fn apply_snapshot(&mut self, snapshot: StatusSnapshot) {
        debug!(
            phases = snapshot.phases.len(),
            log_entries = snapshot.log_entries.len(),
            paused = snapshot.paused,
            "applying status snapshot"
        );
        self.session.phases = snapshot.phases;
        self.session.endpoints = snapshot.endpoints;
        self.session.parameters = snapshot.parameters;
        self.session.vulnerabilities = snapshot.vulnerabilities;
        self.session.stats = snapshot.statistics;
        self.session.current_phase = snapshot.current_phase;
        // Backlog replacement never steals the scroll position.
        self.log.replace_all(snapshot.log_entries);
        self.session.execution_state = if snapshot.paused {
            ExecutionState::Paused
        } else {
            ExecutionState::Running
        };
        self.session.overall_progress = compute_progress(&self.session.phases);
    }

    fn set_phase_status(&mut self, phase_id: &str, status: PhaseStatus) {
        match self.session.phase_mut(phase_id) {
            Some(phase) => phase.status = status,
            None => {
                warn!(phase_id, "event for unknown phase, ignoring");
                return;
            }
        }
        self.session.overall_progress = compute_progress(&self.session.phases);
    }

    fn set_subphase_status(&mut self, phase_id: &str, subphase_id: &str, status: PhaseStatus) {
        match self.session.subphase_mut(phase_id, subphase_id) {
            Some(subphase) => subphase.status = status,
            None => {
                warn!(phase_id, subphase_id, "event for unknown subphase, ignoring");
                return;
            }
        }
        self.session.overall_progress = compute_progress(&self.session.phases);
    }
}
