//! End-to-end dispatcher scenarios driven by synthetic event streams.

use tokio::sync::mpsc;
use uuid::Uuid;

use scanwatch::control::{Controller, build_start_config};
use scanwatch::events::{Command, ScanEvent, StatusSnapshot};
use scanwatch::metadata::ScanMetadata;
use scanwatch::models::{ExecutionState, LogEntry, LogLevel, Phase, Question};
use scanwatch::{LaunchParams, LaunchStore, ScanMonitor};

fn metadata(categories: &[&str]) -> ScanMetadata {
    ScanMetadata {
        url: "http://victim.lab".to_string(),
        alias: Some("training target".to_string()),
        enabled_categories: categories.iter().map(|s| s.to_string()).collect(),
    }
}

#[test]
fn two_flat_phases_progress_in_fifty_percent_steps() {
    let mut monitor = ScanMonitor::new(Uuid::new_v4());
    monitor.session.phases = vec![Phase::pending("a", "Phase A"), Phase::pending("b", "Phase B")];

    let events = [
        ScanEvent::PhaseStarted {
            phase_id: "a".to_string(),
        },
        ScanEvent::PhaseCompleted {
            phase_id: "a".to_string(),
        },
        ScanEvent::PhaseStarted {
            phase_id: "b".to_string(),
        },
        ScanEvent::PhaseCompleted {
            phase_id: "b".to_string(),
        },
    ];

    let mut progress = vec![];
    for event in events {
        monitor.apply(event);
        progress.push(monitor.session.overall_progress);
    }
    assert_eq!(progress, vec![0, 50, 50, 100]);
}

#[tokio::test]
async fn quiz_retry_then_correct_resolution() {
    let mut monitor = ScanMonitor::new(Uuid::new_v4());
    let (commands_tx, mut commands_rx) = mpsc::channel(8);
    let controller = Controller::new(monitor.session.scan_id, commands_tx);
    monitor.session.execution_state = ExecutionState::Running;

    monitor.apply(ScanEvent::QuestionAsked {
        question: Question {
            phase_id: Some("testing".to_string()),
            prompt: "which payload confirms a boolean-based blind?".to_string(),
            options: vec![
                "' AND 1=1--".to_string(),
                "DROP TABLE users".to_string(),
                "<script>alert(1)</script>".to_string(),
                "../../etc/passwd".to_string(),
            ],
            points_value: 20,
        },
    });
    assert_eq!(monitor.presented_state(), ExecutionState::Paused);

    // First attempt: option 2, judged incorrect by the server.
    monitor.quiz.select_option(2).unwrap();
    let submitted = monitor.quiz.submit().unwrap();
    controller.answer(submitted).await.unwrap();
    assert_eq!(
        commands_rx.recv().await,
        Some(Command::Answer {
            selected_option_index: 2
        })
    );
    monitor.apply(ScanEvent::QuestionResult {
        correct: false,
        correct_option_index: None,
        points_earned: 0,
        points_possible: None,
    });
    assert!(monitor.quiz.history().is_empty());
    assert_eq!(monitor.presented_state(), ExecutionState::Paused);

    // Retry with option 0: correct, worth 20 points.
    monitor.quiz.select_option(0).unwrap();
    let submitted = monitor.quiz.submit().unwrap();
    controller.answer(submitted).await.unwrap();
    assert_eq!(
        commands_rx.recv().await,
        Some(Command::Answer {
            selected_option_index: 0
        })
    );
    monitor.apply(ScanEvent::QuestionResult {
        correct: true,
        correct_option_index: Some(0),
        points_earned: 20,
        points_possible: None,
    });

    assert_eq!(monitor.quiz.history().len(), 1);
    let entry = &monitor.quiz.history()[0];
    assert!(entry.was_correct);
    assert_eq!(entry.points_earned, 20);
    assert!(monitor.quiz.question().is_none());
    assert_eq!(monitor.presented_state(), ExecutionState::Running);
    assert_eq!(monitor.quiz.points_earned(), 20);
}

#[test]
fn first_event_snapshot_backlog_never_steals_the_scroll() {
    let mut monitor = ScanMonitor::new(Uuid::new_v4());

    let snapshot = StatusSnapshot {
        log_entries: (0..37)
            .map(|i| LogEntry::new(LogLevel::Info, format!("backlog {i}")))
            .collect(),
        ..Default::default()
    };
    monitor.apply(ScanEvent::StatusSnapshot {
        snapshot: Box::new(snapshot),
    });

    assert_eq!(monitor.log.len(), 37);
    assert!(!monitor.log.is_following());
    assert!(!monitor.log.take_scroll_request());
}

#[tokio::test]
async fn launch_stash_feeds_start_exactly_once() {
    let dir = tempfile::tempdir().unwrap();
    let store = LaunchStore::new(dir.path());
    let scan_id = Uuid::new_v4();
    store
        .stash(
            scan_id,
            &LaunchParams {
                database_engine: Some("mysql".to_string()),
                custom_headers: Default::default(),
            },
        )
        .unwrap();

    let (commands_tx, mut commands_rx) = mpsc::channel(8);
    let mut controller = Controller::new(scan_id, commands_tx);

    let metadata = metadata(&["error_based", "union_based"]);
    let stashed = store.take(scan_id);
    assert!(stashed.is_some());
    // Consumed on read: a second monitor launch sees nothing.
    assert!(store.take(scan_id).is_none());

    controller
        .start_once(build_start_config(&metadata, stashed))
        .await
        .unwrap();

    let Some(Command::Start { config }) = commands_rx.recv().await else {
        panic!("expected start command");
    };
    assert_eq!(config.target_url, "http://victim.lab");
    assert_eq!(config.database_engine.as_deref(), Some("mysql"));
    assert_eq!(config.enabled_categories.len(), 2);
}

#[test]
fn reconnect_snapshot_restores_a_consistent_view() {
    let mut monitor = ScanMonitor::new(Uuid::new_v4());
    monitor.init_metadata(&metadata(&["error_based", "union_based"]));

    // Some live events land before the (simulated) reconnect.
    monitor.apply(ScanEvent::PhaseStarted {
        phase_id: "recon".to_string(),
    });
    monitor.apply(ScanEvent::PhaseCompleted {
        phase_id: "recon".to_string(),
    });
    let progress_before = monitor.session.overall_progress;

    // The server's snapshot is authoritative, even where it disagrees
    // with locally accumulated state.
    let mut phases = monitor.session.phases.clone();
    for phase in &mut phases {
        if phase.id == "recon" || phase.id == "discovery" {
            phase.status = scanwatch::models::PhaseStatus::Completed;
        }
    }
    let snapshot = StatusSnapshot {
        phases,
        paused: false,
        current_phase: Some("testing".to_string()),
        ..Default::default()
    };
    monitor.apply(ScanEvent::StatusSnapshot {
        snapshot: Box::new(snapshot),
    });

    assert!(monitor.session.overall_progress > progress_before);
    assert_eq!(monitor.session.execution_state, ExecutionState::Running);
    assert_eq!(monitor.session.current_phase.as_deref(), Some("testing"));
}
