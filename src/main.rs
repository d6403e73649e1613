use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use scanwatch::{
    ChannelClient, Config, LaunchStore, MetadataClient, MonitorOutcome, MonitorRuntime,
    ScrollMetrics, UiAction,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "scanwatch=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::from_env().unwrap_or_else(|e| {
        tracing::warn!("incomplete environment ({e}), using development defaults");
        Config::default()
    });

    // Scan id from the first argument, falling back to SCAN_ID
    let scan_id = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("SCAN_ID").ok())
        .context("usage: scanwatch <scan-id> (or set SCAN_ID)")?;
    let scan_id: Uuid = scan_id.parse().context("scan id must be a UUID")?;

    let metadata_client = MetadataClient::new(&config.api_base_url, &config.auth_token)?;
    let launch_store = LaunchStore::new(&config.launch_store_dir);
    let channel = ChannelClient::new(&config.redis_url, &config.auth_token, scan_id);

    let (actions_tx, actions_rx) = mpsc::channel(32);
    tokio::spawn(read_stdin_actions(actions_tx));

    let mut runtime = MonitorRuntime::from_config(&config, scan_id, channel, actions_rx);

    tracing::info!(%scan_id, "monitoring scan");
    let outcome = runtime
        .run(&metadata_client, &launch_store, shutdown_signal())
        .await?;

    let session = &runtime.monitor.session;
    match outcome {
        MonitorOutcome::Completed => tracing::info!(
            progress = session.overall_progress,
            vulnerabilities = session.vulnerabilities.len(),
            endpoints = session.endpoints.len(),
            points = runtime.monitor.quiz.points_earned(),
            "scan completed"
        ),
        MonitorOutcome::Errored => tracing::error!(
            message = session.termination_message.as_deref().unwrap_or("unknown"),
            "scan failed; partial results retained"
        ),
        MonitorOutcome::Stopped => tracing::warn!("scan stopped at user request"),
        MonitorOutcome::Detached => tracing::info!("detached; scan continues server-side"),
    }

    Ok(())
}

/// Minimal interactive control surface: one action per stdin line.
///
///   select <n> | answer | pause | stop | scroll <top> <height> <viewport>
async fn read_stdin_actions(actions_tx: mpsc::Sender<UiAction>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let mut parts = line.split_whitespace();
        let action = match (parts.next(), parts.next(), parts.next()) {
            (Some("select"), Some(n), _) => match n.parse() {
                Ok(index) => Some(UiAction::SelectOption(index)),
                Err(_) => None,
            },
            (Some("answer"), _, _) => Some(UiAction::SubmitAnswer),
            (Some("pause"), _, _) | (Some("resume"), _, _) => Some(UiAction::TogglePause),
            // Typing "stop" on the console counts as the explicit
            // confirmation a GUI would collect with a dialog.
            (Some("stop"), _, _) => Some(UiAction::RequestStop { confirmed: true }),
            (Some("scroll"), Some(top), Some(height)) => {
                match (top.parse(), height.parse(), parts.next().and_then(|v| v.parse().ok())) {
                    (Ok(scroll_top), Ok(scroll_height), Some(viewport_height)) => {
                        Some(UiAction::Scrolled(ScrollMetrics {
                            scroll_height,
                            scroll_top,
                            viewport_height,
                        }))
                    }
                    _ => None,
                }
            }
            _ => None,
        };
        match action {
            Some(action) => {
                if actions_tx.send(action).await.is_err() {
                    break;
                }
            }
            None => tracing::warn!(%line, "unrecognized command"),
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
