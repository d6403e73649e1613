//! Monitor runtime: one cooperative loop owning all session mutation.
//!
//! Inbound events, user actions and the stop-exit deadline are interleaved
//! in a single `select!` loop; every handler runs to completion, so no
//! synchronization primitives are needed around the session aggregate.

use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::channel::ChannelClient;
use crate::config::Config;
use crate::control::{Controller, build_start_config};
use crate::dispatcher::ScanMonitor;
use crate::error::MonitorError;
use crate::launch::LaunchStore;
use crate::logbuf::{LogBuffer, ScrollMetrics};
use crate::metadata::MetadataClient;
use crate::models::{ConnectionState, ExecutionState};

/// Delay between sending `stop` and tearing the monitor down, independent
/// of whether a stop confirmation ever arrives.
pub const DEFAULT_STOP_EXIT_DELAY: Duration = Duration::from_millis(1500);

/// User-initiated actions forwarded by the embedding UI. None of them
/// blocks: each fires a command and returns, with the actual state change
/// deferred to the matching confirmation event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UiAction {
    SelectOption(usize),
    SubmitAnswer,
    TogglePause,
    /// `confirmed` must be true; an unconfirmed request is dropped.
    RequestStop { confirmed: bool },
    Scrolled(ScrollMetrics),
    FirstLayout(ScrollMetrics),
}

/// Why the run loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorOutcome {
    Completed,
    Errored,
    Stopped,
    /// The monitor stopped observing (shutdown or lost channel); the
    /// server-side scan keeps running.
    Detached,
}

pub struct MonitorRuntime {
    pub monitor: ScanMonitor,
    channel: ChannelClient,
    actions_rx: mpsc::Receiver<UiAction>,
    stop_exit_delay: Duration,
    exit_at: Option<Instant>,
    torn_down: bool,
}

impl MonitorRuntime {
    pub fn new(
        scan_id: Uuid,
        channel: ChannelClient,
        actions_rx: mpsc::Receiver<UiAction>,
    ) -> Self {
        Self {
            monitor: ScanMonitor::new(scan_id),
            channel,
            actions_rx,
            stop_exit_delay: DEFAULT_STOP_EXIT_DELAY,
            exit_at: None,
            torn_down: false,
        }
    }

    pub fn from_config(
        cfg: &Config,
        scan_id: Uuid,
        channel: ChannelClient,
        actions_rx: mpsc::Receiver<UiAction>,
    ) -> Self {
        let mut runtime = Self::new(scan_id, channel, actions_rx);
        runtime.monitor = ScanMonitor::with_log_buffer(
            scan_id,
            LogBuffer::new(cfg.log_capacity, cfg.scroll_threshold_px),
        );
        runtime.stop_exit_delay = Duration::from_millis(cfg.stop_exit_delay_ms);
        runtime
    }

    /// Connect, start the scan once, then process events and user actions
    /// until a terminal event, the stop-exit deadline, or shutdown.
    pub async fn run(
        &mut self,
        metadata_client: &MetadataClient,
        launch_store: &LaunchStore,
        shutdown: impl Future<Output = ()>,
    ) -> Result<MonitorOutcome, MonitorError> {
        tokio::pin!(shutdown);
        let scan_id = self.monitor.session.scan_id;

        self.monitor.session.connection_state = ConnectionState::Connecting;
        let connected = tokio::select! {
            res = self.channel.connect() => {
                res?;
                true
            }
            _ = &mut shutdown => false,
        };
        if !connected {
            self.teardown().await;
            return Ok(MonitorOutcome::Detached);
        }
        self.monitor.session.connection_state = ConnectionState::Connected;

        let mut events_rx = self
            .channel
            .take_events()
            .ok_or(MonitorError::ChannelClosed)?;
        let commands_tx = self.channel.commands().ok_or(MonitorError::ChannelClosed)?;
        let mut controller = Controller::new(scan_id, commands_tx);
        let mut connection_rx = self.channel.connection();

        // Start needs both a confirmed connection and resolved metadata.
        // If shutdown fires mid-fetch the result is simply ignored.
        let metadata = tokio::select! {
            metadata = metadata_client.fetch_or_default(scan_id) => metadata,
            _ = &mut shutdown => {
                self.teardown().await;
                return Ok(MonitorOutcome::Detached);
            }
        };

        // The stash entry is gone after this read, whatever happens next.
        let stashed = launch_store.take(scan_id);
        self.monitor.init_metadata(&metadata);
        controller
            .start_once(build_start_config(&metadata, stashed))
            .await?;

        let outcome = loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!(%scan_id, "shutdown requested, detaching from scan");
                    break MonitorOutcome::Detached;
                }
                _ = sleep_until_opt(self.exit_at) => {
                    debug!(%scan_id, "stop exit delay elapsed");
                    break MonitorOutcome::Stopped;
                }
                changed = connection_rx.changed() => {
                    if changed.is_ok() {
                        self.monitor.session.connection_state = *connection_rx.borrow();
                    }
                }
                maybe_event = events_rx.recv() => match maybe_event {
                    Some(event) => {
                        controller.on_event(&event);
                        self.monitor.apply(event);
                        match self.monitor.session.execution_state {
                            ExecutionState::Completed => break MonitorOutcome::Completed,
                            ExecutionState::Errored => break MonitorOutcome::Errored,
                            ExecutionState::Stopped => break MonitorOutcome::Stopped,
                            _ => {}
                        }
                    }
                    None => {
                        warn!(%scan_id, "event stream closed");
                        self.monitor.session.connection_state = ConnectionState::Disconnected;
                        break MonitorOutcome::Detached;
                    }
                },
                maybe_action = self.actions_rx.recv() => {
                    if let Some(action) = maybe_action {
                        Self::handle_action(
                            &mut self.monitor,
                            &mut controller,
                            &mut self.exit_at,
                            self.stop_exit_delay,
                            action,
                        )
                        .await?;
                    }
                }
            }
        };

        self.teardown().await;
        Ok(outcome)
    }

    async fn handle_action(
        monitor: &mut ScanMonitor,
        controller: &mut Controller,
        exit_at: &mut Option<Instant>,
        stop_exit_delay: Duration,
        action: UiAction,
    ) -> Result<(), MonitorError> {
        match action {
            UiAction::SelectOption(index) => {
                if let Err(e) = monitor.quiz.select_option(index) {
                    warn!(index, error = %e, "option selection rejected");
                }
            }
            UiAction::SubmitAnswer => match monitor.quiz.submit() {
                Ok(index) => controller.answer(index).await?,
                Err(e) => warn!(error = %e, "answer submission rejected"),
            },
            UiAction::TogglePause => {
                controller
                    .toggle_pause(monitor.session.execution_state)
                    .await?;
            }
            UiAction::RequestStop { confirmed } => {
                if !confirmed {
                    debug!("stop requested without confirmation, ignoring");
                } else {
                    controller.stop().await?;
                    *exit_at = Some(Instant::now() + stop_exit_delay);
                }
            }
            UiAction::Scrolled(metrics) => monitor.log.on_user_scroll(metrics),
            UiAction::FirstLayout(metrics) => monitor.log.on_first_layout(metrics),
        }
        Ok(())
    }

    /// Leave the room and release every subscription, whatever the
    /// execution state. Late async results are ignored afterwards.
    async fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        self.channel.leave().await;
        self.monitor.session.connection_state = ConnectionState::Disconnected;
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
