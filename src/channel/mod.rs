// ============================================
// Connection lifecycle for the real-time event channel
// ============================================
//
// The channel is room-scoped Redis pub/sub: lifecycle events arrive on the
// scan's event channel and control commands go out on its control channel,
// wrapped in an authenticated envelope. A background listener task forwards
// parsed events into an mpsc channel; a publisher task drains outbound
// commands. Connection state is exposed through a watch signal, which is
// the trigger the control protocol waits on before issuing `start`.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use redis::AsyncCommands;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::MonitorError;
use crate::events::{Command, CommandEnvelope, ScanEvent};
use crate::models::ConnectionState;

const EVENT_BUFFER: usize = 256;
const COMMAND_BUFFER: usize = 64;
const LEAVE_FLUSH_TIMEOUT: Duration = Duration::from_secs(1);

/// Pub/sub channel carrying server-emitted lifecycle events for one scan.
pub fn events_channel_key(scan_id: Uuid) -> String {
    format!("scan:{scan_id}:events")
}

/// Pub/sub channel carrying client control commands for one scan.
pub fn control_channel_key(scan_id: Uuid) -> String {
    format!("scan:{scan_id}:control")
}

struct ChannelTasks {
    listener: JoinHandle<()>,
    publisher: JoinHandle<()>,
    commands_tx: mpsc::Sender<Command>,
}

pub struct ChannelClient {
    scan_id: Uuid,
    redis_url: String,
    token: String,
    state_tx: Arc<watch::Sender<ConnectionState>>,
    tasks: Option<ChannelTasks>,
    pending_events: Option<mpsc::Receiver<ScanEvent>>,
}

impl ChannelClient {
    pub fn new(redis_url: impl Into<String>, token: impl Into<String>, scan_id: Uuid) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            scan_id,
            redis_url: redis_url.into(),
            token: token.into(),
            state_tx: Arc::new(state_tx),
            tasks: None,
            pending_events: None,
        }
    }

    /// Observe the connection signal.
    pub fn connection(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        self.tasks.is_some()
    }

    /// Sender for outbound control commands. `None` until connected.
    pub fn commands(&self) -> Option<mpsc::Sender<Command>> {
        self.tasks.as_ref().map(|t| t.commands_tx.clone())
    }

    /// Take the inbound event stream. Yields once per successful connect.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<ScanEvent>> {
        self.pending_events.take()
    }

    /// Establish the channel and join the scan's room. Idempotent: calling
    /// this while already connected is a no-op.
    pub async fn connect(&mut self) -> Result<(), MonitorError> {
        if self.tasks.is_some() {
            debug!(scan_id = %self.scan_id, "channel already connected");
            return Ok(());
        }
        self.state_tx.send_replace(ConnectionState::Connecting);

        match self.establish().await {
            Ok(()) => {
                self.state_tx.send_replace(ConnectionState::Connected);
                info!(scan_id = %self.scan_id, "joined scan room");
                Ok(())
            }
            Err(e) => {
                self.state_tx.send_replace(ConnectionState::Disconnected);
                Err(e)
            }
        }
    }

    async fn establish(&mut self) -> Result<(), MonitorError> {
        let client = redis::Client::open(self.redis_url.as_str())?;

        // Pub/sub needs its own connection; commands publish through a
        // managed connection that survives transient faults.
        let mut pubsub = client.get_async_pubsub().await?;
        pubsub.subscribe(events_channel_key(self.scan_id)).await?;
        let publish_conn = client.get_connection_manager().await?;

        let (events_tx, events_rx) = mpsc::channel::<ScanEvent>(EVENT_BUFFER);
        let (commands_tx, commands_rx) = mpsc::channel::<Command>(COMMAND_BUFFER);

        let listener = tokio::spawn(listen(
            pubsub,
            events_tx,
            Arc::clone(&self.state_tx),
            self.scan_id,
        ));
        let publisher = tokio::spawn(publish(
            publish_conn,
            commands_rx,
            self.scan_id,
            self.token.clone(),
        ));

        // Announce ourselves to the room.
        commands_tx
            .send(Command::Join)
            .await
            .map_err(|_| MonitorError::ChannelClosed)?;

        self.pending_events = Some(events_rx);
        self.tasks = Some(ChannelTasks {
            listener,
            publisher,
            commands_tx,
        });
        Ok(())
    }

    /// Leave the room and release every subscription. Runs on view exit
    /// regardless of execution state: the server-side scan keeps running,
    /// the monitor merely stops observing it.
    pub async fn leave(&mut self) {
        let Some(tasks) = self.tasks.take() else {
            return;
        };
        debug!(scan_id = %self.scan_id, "leaving scan room");

        // Best effort: let the publisher flush the leave command, then
        // tear everything down.
        let _ = tasks.commands_tx.send(Command::Leave).await;
        drop(tasks.commands_tx);
        let mut publisher = tasks.publisher;
        if tokio::time::timeout(LEAVE_FLUSH_TIMEOUT, &mut publisher)
            .await
            .is_err()
        {
            warn!(scan_id = %self.scan_id, "publisher did not flush leave in time");
            publisher.abort();
        }
        tasks.listener.abort();

        self.pending_events = None;
        self.state_tx.send_replace(ConnectionState::Disconnected);
    }
}

#[cfg(test)]
impl ChannelClient {
    /// Install stand-in tasks so the already-connected path can be
    /// exercised without a live transport.
    fn with_stub_tasks(mut self) -> Self {
        let (commands_tx, mut commands_rx) = mpsc::channel(COMMAND_BUFFER);
        let listener = tokio::spawn(std::future::pending::<()>());
        let publisher = tokio::spawn(async move { while commands_rx.recv().await.is_some() {} });
        self.tasks = Some(ChannelTasks {
            listener,
            publisher,
            commands_tx,
        });
        self.state_tx.send_replace(ConnectionState::Connected);
        self
    }
}

impl Drop for ChannelClient {
    fn drop(&mut self) {
        if let Some(tasks) = self.tasks.take() {
            tasks.listener.abort();
            tasks.publisher.abort();
        }
    }
}

/// Forward room events into the monitor's mpsc channel. Payloads that do
/// not parse as a known event kind are dropped here, at the boundary, with
/// a warning.
async fn listen(
    mut pubsub: redis::aio::PubSub,
    events_tx: mpsc::Sender<ScanEvent>,
    state_tx: Arc<watch::Sender<ConnectionState>>,
    scan_id: Uuid,
) {
    let mut stream = pubsub.on_message();
    while let Some(msg) = stream.next().await {
        let payload: String = match msg.get_payload() {
            Ok(p) => p,
            Err(e) => {
                warn!(%scan_id, error = %e, "unreadable channel payload");
                continue;
            }
        };
        let event: ScanEvent = match serde_json::from_str(&payload) {
            Ok(e) => e,
            Err(e) => {
                warn!(%scan_id, error = %e, "malformed event payload, dropping");
                continue;
            }
        };
        if events_tx.send(event).await.is_err() {
            // Monitor gone; nothing left to forward to.
            break;
        }
    }
    debug!(%scan_id, "event listener exiting");
    state_tx.send_replace(ConnectionState::Disconnected);
}

/// Drain outbound commands, wrapping each in an authenticated envelope.
/// Terminates after publishing `leave`.
async fn publish(
    mut conn: redis::aio::ConnectionManager,
    mut commands_rx: mpsc::Receiver<Command>,
    scan_id: Uuid,
    token: String,
) {
    let key = control_channel_key(scan_id);
    while let Some(command) = commands_rx.recv().await {
        let is_leave = matches!(command, Command::Leave);
        let envelope = CommandEnvelope {
            scan_id,
            token: token.clone(),
            command,
        };
        let payload = match serde_json::to_string(&envelope) {
            Ok(p) => p,
            Err(e) => {
                error!(%scan_id, error = %e, "failed to encode command");
                continue;
            }
        };
        if let Err(e) = conn.publish::<_, _, i64>(&key, payload).await {
            error!(%scan_id, error = %e, "failed to publish command");
        }
        if is_leave {
            break;
        }
    }
    debug!(%scan_id, "command publisher exiting");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_keys_are_scoped_by_scan_id() {
        let scan_id = Uuid::nil();
        assert_eq!(
            events_channel_key(scan_id),
            "scan:00000000-0000-0000-0000-000000000000:events"
        );
        assert_eq!(
            control_channel_key(scan_id),
            "scan:00000000-0000-0000-0000-000000000000:control"
        );
    }

    #[test]
    fn fresh_client_is_disconnected() {
        let client = ChannelClient::new("redis://127.0.0.1:6379", "token", Uuid::new_v4());
        assert!(!client.is_connected());
        assert!(client.commands().is_none());
        assert_eq!(*client.connection().borrow(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn connect_while_connected_is_a_no_op() {
        // The URL points nowhere reachable: if the connected guard were
        // skipped, connect() would try to establish and fail.
        let mut client =
            ChannelClient::new("redis://127.0.0.1:1", "token", Uuid::new_v4()).with_stub_tasks();
        let mut connection = client.connection();

        client.connect().await.unwrap();

        assert!(client.is_connected());
        assert_eq!(*client.connection().borrow(), ConnectionState::Connected);
        // No transition through connecting, no fresh event stream.
        assert!(!connection.has_changed().unwrap());
        assert!(client.take_events().is_none());
    }
}
