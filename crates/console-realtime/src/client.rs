//! Realtime client.
//!
//! One transport per client. Inbound `message` events are routed to the
//! handlers registered for their group; unexpected closes are retried with
//! capped exponential backoff until the attempt ceiling is reached.

use crate::{
    realtime_endpoint, realtime_url, ChatMessage, Connector, InboundEvent, OutboundCommand,
    RealtimeConfig, RealtimeResult, Removal, SubscriptionId, SubscriptionRegistry,
    TransportConnection, TransportFrame, WebSocketConnector,
};
use futures_util::{SinkExt, StreamExt};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};
use url::Url;

/// Connection lifecycle callback.
pub type LifecycleCallback = Arc<dyn Fn() + Send + Sync>;

/// Callbacks invoked when the transport opens or closes.
#[derive(Clone, Default)]
pub struct LifecycleCallbacks {
    on_open: Option<LifecycleCallback>,
    on_close: Option<LifecycleCallback>,
}

impl LifecycleCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called after every successful open, including reconnects.
    pub fn on_open(mut self, callback: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_open = Some(Arc::new(callback));
        self
    }

    /// Called after every close, failed attempts included.
    pub fn on_close(mut self, callback: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_close = Some(Arc::new(callback));
        self
    }
}

impl fmt::Debug for LifecycleCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleCallbacks")
            .field("on_open", &self.on_open.is_some())
            .field("on_close", &self.on_close.is_some())
            .finish()
    }
}

/// Where reconnect attempts read the credential from.
///
/// Lets a running client pick up a token refreshed elsewhere (e.g. a new
/// login persisted to disk).
pub trait CredentialSource: Send + Sync {
    fn credential(&self) -> Option<String>;
}

impl<F> CredentialSource for F
where
    F: Fn() -> Option<String> + Send + Sync,
{
    fn credential(&self) -> Option<String> {
        self()
    }
}

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Open,
    ReconnectPending,
}

/// Events emitted by the realtime client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RealtimeEvent {
    /// Transport opened.
    Opened,
    /// Transport closed or failed to open.
    Closed,
    /// A reconnect attempt is scheduled.
    ReconnectScheduled { attempt: u32, delay: Duration },
    /// Reconnect attempts exhausted; the client is idle.
    GaveUp { attempts: u32 },
    /// The caller disconnected the client.
    Disconnected,
}

struct Inner {
    state: ConnectionState,
    /// Bumped for every attempt and by `disconnect`; tasks holding an older
    /// value are stale and must not touch the state.
    generation: u64,
    credential: Option<String>,
    credential_source: Option<Arc<dyn CredentialSource>>,
    callbacks: LifecycleCallbacks,
    registry: SubscriptionRegistry,
    /// Present only while the transport is open.
    outbound: Option<mpsc::Sender<TransportFrame>>,
    connection_task: Option<JoinHandle<()>>,
    reconnect_task: Option<JoinHandle<()>>,
    reconnect_attempts: u32,
}

impl Inner {
    fn open_sender(&self) -> Option<mpsc::Sender<TransportFrame>> {
        match self.state {
            ConnectionState::Open => self.outbound.clone(),
            _ => None,
        }
    }
}

struct Shared {
    config: RealtimeConfig,
    endpoint: Url,
    connector: Arc<dyn Connector>,
    inner: Mutex<Inner>,
    event_tx: broadcast::Sender<RealtimeEvent>,
}

/// Realtime client with automatic reconnection.
///
/// Cloning is cheap and every clone drives the same connection. Call
/// [`RealtimeClient::disconnect`] to stop all background work.
#[derive(Clone)]
pub struct RealtimeClient {
    shared: Arc<Shared>,
}

impl RealtimeClient {
    /// Create a client using the given transport connector.
    ///
    /// Fails only when the configured server origin cannot be turned into a
    /// WebSocket endpoint.
    pub fn new(config: RealtimeConfig, connector: Arc<dyn Connector>) -> RealtimeResult<Self> {
        let endpoint = realtime_endpoint(&config.server_origin)?;
        let (event_tx, _) = broadcast::channel(config.event_buffer.max(1));

        Ok(Self {
            shared: Arc::new(Shared {
                config,
                endpoint,
                connector,
                inner: Mutex::new(Inner {
                    state: ConnectionState::Disconnected,
                    generation: 0,
                    credential: None,
                    credential_source: None,
                    callbacks: LifecycleCallbacks::default(),
                    registry: SubscriptionRegistry::new(),
                    outbound: None,
                    connection_task: None,
                    reconnect_task: None,
                    reconnect_attempts: 0,
                }),
                event_tx,
            }),
        })
    }

    /// Create a client that connects over WebSocket.
    pub fn with_websocket(config: RealtimeConfig) -> RealtimeResult<Self> {
        Self::new(config, Arc::new(WebSocketConnector::new()))
    }

    /// Subscribe to lifecycle events.
    pub fn events(&self) -> broadcast::Receiver<RealtimeEvent> {
        self.shared.event_tx.subscribe()
    }

    /// The WebSocket endpoint (without credential).
    pub fn endpoint(&self) -> &Url {
        &self.shared.endpoint
    }

    pub fn config(&self) -> &RealtimeConfig {
        &self.shared.config
    }

    /// Read the credential from `source` on every reconnect attempt instead
    /// of reusing the one given to `connect`.
    pub async fn set_credential_source(&self, source: Arc<dyn CredentialSource>) {
        self.shared.inner.lock().await.credential_source = Some(source);
    }

    pub async fn clear_credential_source(&self) {
        self.shared.inner.lock().await.credential_source = None;
    }

    /// Get the current connection state.
    pub async fn state(&self) -> ConnectionState {
        self.shared.inner.lock().await.state
    }

    /// Check if the transport is open.
    pub async fn is_connected(&self) -> bool {
        self.state().await == ConnectionState::Open
    }

    /// Reconnect attempts made since the last successful open.
    pub async fn reconnect_attempts(&self) -> u32 {
        self.shared.inner.lock().await.reconnect_attempts
    }

    /// Groups with at least one handler, sorted.
    pub async fn subscribed_groups(&self) -> Vec<String> {
        self.shared.inner.lock().await.registry.groups()
    }

    pub async fn handler_count(&self, group_id: &str) -> usize {
        self.shared.inner.lock().await.registry.handler_count(group_id)
    }

    /// Open the transport.
    ///
    /// Does nothing while a transport is open or an attempt is in flight.
    /// Otherwise replaces the lifecycle callbacks and starts an attempt in
    /// the background; a pending reconnect is superseded. The outcome is
    /// reported through the callbacks and [`RealtimeClient::events`].
    pub async fn connect(&self, credential: &str, callbacks: LifecycleCallbacks) {
        let mut inner = self.shared.inner.lock().await;

        match inner.state {
            ConnectionState::Open | ConnectionState::Connecting => {
                debug!(state = ?inner.state, "Already connecting or connected");
                return;
            }
            ConnectionState::ReconnectPending => {
                if let Some(task) = inner.reconnect_task.take() {
                    task.abort();
                }
            }
            ConnectionState::Disconnected => {}
        }

        inner.callbacks = callbacks;
        inner.credential = Some(credential.to_string());
        Shared::start_attempt(&self.shared, &mut inner, credential);
    }

    /// Close the transport and stop all background work.
    ///
    /// Cancels a pending reconnect, clears every subscription and both
    /// lifecycle callbacks. Safe to call in any state.
    pub async fn disconnect(&self) {
        let mut inner = self.shared.inner.lock().await;
        let previous = inner.state;

        inner.generation += 1;
        if let Some(task) = inner.reconnect_task.take() {
            task.abort();
        }
        let outbound = inner.outbound.take();
        let connection_task = inner.connection_task.take();

        inner.state = ConnectionState::Disconnected;
        inner.reconnect_attempts = 0;
        inner.credential = None;
        inner.callbacks = LifecycleCallbacks::default();
        inner.registry.clear();
        drop(inner);

        // The writer is its own task: it still flushes the close frame after
        // the connection task is aborted.
        if let Some(outbound) = outbound {
            let _ = outbound.try_send(TransportFrame::Close);
        }
        if let Some(task) = connection_task {
            task.abort();
        }

        info!(previous_state = ?previous, "Realtime client disconnected");
        let _ = self.shared.event_tx.send(RealtimeEvent::Disconnected);
    }

    /// Register `handler` for messages posted in `group_id`.
    ///
    /// Sends a `subscribe` command right away when the transport is open.
    /// Registering the same closure twice delivers every message twice.
    pub async fn subscribe_to_group<F>(&self, group_id: &str, handler: F) -> SubscriptionId
    where
        F: Fn(&ChatMessage) + Send + Sync + 'static,
    {
        let (id, outbound) = {
            let mut inner = self.shared.inner.lock().await;
            let id = inner.registry.insert(group_id, Arc::new(handler));
            (id, inner.open_sender())
        };

        debug!(group_id = %group_id, subscription = %id, "Subscribed to group");

        if let Some(outbound) = outbound {
            send_command(&outbound, &OutboundCommand::subscribe(group_id)).await;
        }

        id
    }

    /// Remove one registration.
    ///
    /// When the group's last handler goes, the group is forgotten and an
    /// `unsubscribe` command is sent if the transport is open. Unknown groups
    /// or ids are ignored.
    pub async fn unsubscribe_from_group(&self, group_id: &str, id: SubscriptionId) {
        let (removal, outbound) = {
            let mut inner = self.shared.inner.lock().await;
            let removal = inner.registry.remove(group_id, id);
            (removal, inner.open_sender())
        };

        match removal {
            Removal::NotFound => {
                debug!(group_id = %group_id, subscription = %id, "Unknown subscription");
            }
            Removal::Remaining(remaining) => {
                debug!(group_id = %group_id, remaining, "Removed group handler");
            }
            Removal::GroupEmptied => {
                debug!(group_id = %group_id, "Last handler removed, leaving group");
                if let Some(outbound) = outbound {
                    send_command(&outbound, &OutboundCommand::unsubscribe(group_id)).await;
                }
            }
        }
    }
}

impl Shared {
    /// Spawn a connection attempt. Caller holds the lock.
    fn start_attempt(shared: &Arc<Self>, inner: &mut Inner, credential: &str) {
        inner.generation += 1;
        inner.state = ConnectionState::Connecting;

        let generation = inner.generation;
        let url = realtime_url(&shared.endpoint, credential);
        info!(endpoint = %shared.endpoint, generation, "Connecting to realtime server");

        let task_shared = Arc::clone(shared);
        inner.connection_task = Some(tokio::spawn(async move {
            task_shared.run_connection(generation, url).await;
        }));
    }

    async fn run_connection(self: Arc<Self>, generation: u64, url: Url) {
        let TransportConnection { mut sink, mut stream } =
            match self.connector.connect(&url).await {
                Ok(connection) => connection,
                Err(e) => {
                    warn!(error = %e, "Realtime transport failed to open");
                    self.handle_close(generation).await;
                    return;
                }
            };

        let (msg_tx, mut msg_rx) = mpsc::channel::<TransportFrame>(self.config.outbound_buffer.max(1));

        let opened = {
            let mut inner = self.inner.lock().await;
            if inner.generation != generation {
                None
            } else {
                inner.state = ConnectionState::Open;
                inner.reconnect_attempts = 0;
                inner.outbound = Some(msg_tx.clone());
                let replay = if self.config.resubscribe_on_open {
                    inner.registry.groups()
                } else {
                    Vec::new()
                };
                Some((inner.callbacks.on_open.clone(), replay))
            }
        };

        let Some((on_open, replay)) = opened else {
            debug!(generation, "Discarding transport opened after disconnect");
            let _ = sink.send(TransportFrame::Close).await;
            return;
        };

        // Spawn message sender task
        let sender_handle = tokio::spawn(async move {
            while let Some(frame) = msg_rx.recv().await {
                let closing = frame == TransportFrame::Close;
                if let Err(e) = sink.send(frame).await {
                    debug!(error = %e, "Realtime writer stopped");
                    break;
                }
                if closing {
                    break;
                }
            }
            let _ = sink.close().await;
        });

        info!("Realtime connection open");
        if let Some(on_open) = on_open {
            on_open();
        }
        let _ = self.event_tx.send(RealtimeEvent::Opened);

        for group_id in &replay {
            send_command(&msg_tx, &OutboundCommand::subscribe(group_id)).await;
        }
        if !replay.is_empty() {
            debug!(groups = replay.len(), "Replayed group subscriptions");
        }
        drop(msg_tx);

        // Process incoming frames
        while let Some(frame) = stream.next().await {
            match frame {
                Ok(TransportFrame::Text(text)) => self.dispatch(&text).await,
                Ok(TransportFrame::Close) => {
                    info!("Realtime connection closed by server");
                    break;
                }
                Err(e) => {
                    error!(error = %e, "Realtime transport error");
                    break;
                }
            }
        }

        sender_handle.abort();
        self.handle_close(generation).await;
    }

    /// Route one inbound text frame to its group's handlers.
    async fn dispatch(&self, text: &str) {
        let event = match InboundEvent::from_json(text) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, len = text.len(), "Failed to parse realtime frame");
                return;
            }
        };

        let InboundEvent::Message { group_id, message } = event else {
            trace!("Ignoring non-message frame");
            return;
        };

        let handlers = self.inner.lock().await.registry.handlers(&group_id);
        if handlers.is_empty() {
            trace!(group_id = %group_id, "No handlers for group");
            return;
        }

        for handler in handlers {
            if catch_unwind(AssertUnwindSafe(|| handler(&message))).is_err() {
                error!(group_id = %group_id, "Group message handler panicked");
            }
        }
    }

    /// Transport for `generation` is gone: notify and apply the retry policy.
    async fn handle_close(self: &Arc<Self>, generation: u64) {
        let (on_close, scheduled, attempts) = {
            let mut inner = self.inner.lock().await;
            if inner.generation != generation {
                return;
            }
            inner.outbound = None;
            let scheduled = self.schedule_reconnect(&mut inner, generation);
            (
                inner.callbacks.on_close.clone(),
                scheduled,
                inner.reconnect_attempts,
            )
        };

        if let Some(on_close) = on_close {
            on_close();
        }
        let _ = self.event_tx.send(RealtimeEvent::Closed);

        let event = match scheduled {
            Some(delay) => RealtimeEvent::ReconnectScheduled {
                attempt: attempts,
                delay,
            },
            None => RealtimeEvent::GaveUp { attempts },
        };
        let _ = self.event_tx.send(event);
    }

    /// Schedule the next attempt, or give up at the ceiling. Caller holds
    /// the lock. Returns the delay when an attempt was scheduled.
    fn schedule_reconnect(self: &Arc<Self>, inner: &mut Inner, generation: u64) -> Option<Duration> {
        if inner.reconnect_attempts >= self.config.max_reconnect_attempts {
            error!(
                attempts = inner.reconnect_attempts,
                "Max reconnect attempts reached"
            );
            inner.state = ConnectionState::Disconnected;
            return None;
        }

        inner.reconnect_attempts += 1;
        let attempt = inner.reconnect_attempts;
        let delay = self.config.reconnect_delay(attempt);
        inner.state = ConnectionState::ReconnectPending;

        info!(
            attempt,
            max_attempts = self.config.max_reconnect_attempts,
            delay_ms = delay.as_millis() as u64,
            "Scheduling reconnect"
        );

        let shared = Arc::clone(self);
        inner.reconnect_task = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            shared.reconnect(generation).await;
        }));

        Some(delay)
    }

    async fn reconnect(self: &Arc<Self>, generation: u64) {
        let mut inner = self.inner.lock().await;
        if inner.generation != generation || inner.state != ConnectionState::ReconnectPending {
            debug!(generation, "Skipping stale reconnect");
            return;
        }
        inner.reconnect_task = None;

        let credential = inner
            .credential_source
            .as_ref()
            .and_then(|source| source.credential())
            .or_else(|| inner.credential.clone())
            .unwrap_or_default();

        info!(
            attempt = inner.reconnect_attempts,
            max_attempts = self.config.max_reconnect_attempts,
            "Attempting to reconnect"
        );

        inner.credential = Some(credential.clone());
        Self::start_attempt(self, &mut inner, &credential);
    }
}

async fn send_command(outbound: &mpsc::Sender<TransportFrame>, command: &OutboundCommand) {
    let json = match command.to_json() {
        Ok(json) => json,
        Err(e) => {
            error!(error = %e, "Failed to encode realtime command");
            return;
        }
    };

    if outbound.send(TransportFrame::Text(json)).await.is_err() {
        warn!(group_id = %command.group_id(), "Transport closed before command was sent");
    } else {
        trace!(group_id = %command.group_id(), "Sent realtime command");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_client_initial_state() {
        let client = RealtimeClient::with_websocket(RealtimeConfig::default()).unwrap();
        assert_eq!(client.state().await, ConnectionState::Disconnected);
        assert!(!client.is_connected().await);
        assert!(client.subscribed_groups().await.is_empty());
        assert_eq!(client.endpoint().as_str(), "ws://127.0.0.1:8080/ws");
    }

    #[test]
    fn test_client_rejects_invalid_origin() {
        let config = RealtimeConfig {
            server_origin: "mailto:ops@example.com".to_string(),
            ..Default::default()
        };
        assert!(RealtimeClient::with_websocket(config).is_err());
    }

    #[tokio::test]
    async fn test_disconnect_when_idle() {
        let client = RealtimeClient::with_websocket(RealtimeConfig::default()).unwrap();
        client.disconnect().await;
        client.disconnect().await;
        assert_eq!(client.state().await, ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_subscriptions_are_kept_while_disconnected() {
        let client = RealtimeClient::with_websocket(RealtimeConfig::default()).unwrap();

        let first = client.subscribe_to_group("42", |_| {}).await;
        client.subscribe_to_group("42", |_| {}).await;
        assert_eq!(client.handler_count("42").await, 2);

        client.unsubscribe_from_group("42", first).await;
        assert_eq!(client.subscribed_groups().await, vec!["42".to_string()]);

        client.disconnect().await;
        assert!(client.subscribed_groups().await.is_empty());
    }

    #[test]
    fn test_closure_credential_source() {
        let source: Arc<dyn CredentialSource> = Arc::new(|| Some("fresh".to_string()));
        assert_eq!(source.credential().as_deref(), Some("fresh"));
    }

    #[test]
    fn test_lifecycle_callbacks_debug() {
        let callbacks = LifecycleCallbacks::new().on_open(|| {});
        let debug = format!("{:?}", callbacks);
        assert!(debug.contains("on_open: true"));
        assert!(debug.contains("on_close: false"));
    }
}
