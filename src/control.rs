//! Control protocol: start/pause/resume/stop/answer commands.
//!
//! Commands are fire-once. A command never changes the displayed execution
//! state by itself; it only disables its own trigger until the matching
//! confirmation event arrives, so the UI never shows a state the server
//! has not accepted.

use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::MonitorError;
use crate::events::{Command, ScanEvent, StartConfig};
use crate::launch::LaunchParams;
use crate::metadata::ScanMetadata;
use crate::models::ExecutionState;

/// Merge scan metadata with the one-shot stashed launch parameters.
pub fn build_start_config(metadata: &ScanMetadata, stashed: Option<LaunchParams>) -> StartConfig {
    let stashed = stashed.unwrap_or_default();
    StartConfig {
        target_url: metadata.url.clone(),
        enabled_categories: metadata.enabled_categories.clone(),
        database_engine: stashed.database_engine,
        custom_headers: stashed.custom_headers,
    }
}

pub struct Controller {
    scan_id: Uuid,
    commands: mpsc::Sender<Command>,
    started: bool,
    pause_confirm_pending: bool,
    stop_sent: bool,
}

impl Controller {
    pub fn new(scan_id: Uuid, commands: mpsc::Sender<Command>) -> Self {
        Self {
            scan_id,
            commands,
            started: false,
            pause_confirm_pending: false,
            stop_sent: false,
        }
    }

    async fn send(&self, command: Command) -> Result<(), MonitorError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| MonitorError::ChannelClosed)
    }

    /// Issue `start` exactly once. Callers invoke this after the channel
    /// reports connected and metadata has resolved; later calls are no-ops.
    pub async fn start_once(&mut self, config: StartConfig) -> Result<bool, MonitorError> {
        if self.started {
            debug!(scan_id = %self.scan_id, "start already issued, skipping");
            return Ok(false);
        }
        self.started = true;
        info!(scan_id = %self.scan_id, target = %config.target_url, "starting scan");
        self.send(Command::Start { config }).await?;
        Ok(true)
    }

    /// Whether the pause/resume toggle is currently actionable.
    pub fn can_toggle_pause(&self, state: ExecutionState) -> bool {
        !self.pause_confirm_pending
            && !self.stop_sent
            && matches!(state, ExecutionState::Running | ExecutionState::Paused)
    }

    /// One toggle driven by the current execution state. Disabled while a
    /// confirmation is pending.
    pub async fn toggle_pause(&mut self, state: ExecutionState) -> Result<(), MonitorError> {
        if !self.can_toggle_pause(state) {
            debug!(scan_id = %self.scan_id, ?state, "pause toggle ignored");
            return Ok(());
        }
        let command = match state {
            ExecutionState::Running => Command::Pause,
            ExecutionState::Paused => Command::Resume,
            _ => unreachable!("guarded by can_toggle_pause"),
        };
        self.pause_confirm_pending = true;
        self.send(command).await
    }

    /// Fire-and-forget stop. The caller has already confirmed with the
    /// user and will tear the monitor down after a short delay whether or
    /// not a stop confirmation ever arrives.
    pub async fn stop(&mut self) -> Result<(), MonitorError> {
        if self.stop_sent {
            return Ok(());
        }
        self.stop_sent = true;
        warn!(scan_id = %self.scan_id, "stop requested");
        self.send(Command::Stop).await
    }

    pub fn stop_sent(&self) -> bool {
        self.stop_sent
    }

    /// Forward the submitted quiz option to the server, which alone judges
    /// correctness.
    pub async fn answer(&self, selected_option_index: usize) -> Result<(), MonitorError> {
        self.send(Command::Answer {
            selected_option_index,
        })
        .await
    }

    /// Reconcile with server-confirmed state: confirmation events re-arm
    /// the pause toggle.
    pub fn on_event(&mut self, event: &ScanEvent) {
        match event {
            ScanEvent::Paused | ScanEvent::Resumed => {
                self.pause_confirm_pending = false;
            }
            ScanEvent::Stopped => {
                self.stop_sent = true;
            }
            _ => {}
        }
    }
}
