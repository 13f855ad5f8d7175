//! Test harness for realtime client tests.
//!
//! Provides:
//! - FakeConnector: An in-memory `Connector` that records every attempt
//! - FakePeer: The server side of one in-memory transport
//! - Recorder: Handlers that log what they receive
//! - TestHarness: Wires a `RealtimeClient` to a `FakeConnector`

use crate::{
    ChatMessage, Connector, LifecycleCallbacks, OutboundCommand, RealtimeClient, RealtimeConfig,
    RealtimeError, RealtimeEvent, RealtimeResult, TransportConnection, TransportFrame,
};
use async_trait::async_trait;
use futures_util::{sink, stream};
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{timeout, Instant};
use url::Url;

/// How long helpers wait before failing a test. Under a paused clock this
/// is virtual time, so it only bounds genuinely stuck tests.
const WAIT: Duration = Duration::from_secs(120);

/// A connection attempt seen by the fake connector.
#[derive(Debug, Clone)]
pub struct Attempt {
    pub url: Url,
    pub at: Instant,
}

impl Attempt {
    pub fn token(&self) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(key, _)| key == "token")
            .map(|(_, value)| value.into_owned())
    }
}

/// In-memory connector. Accepted transports are handed to the test as
/// `FakePeer`s; refused attempts fail like an unreachable server.
pub struct FakeConnector {
    attempts: Mutex<Vec<Attempt>>,
    refusing: AtomicBool,
    peers: mpsc::UnboundedSender<FakePeer>,
}

impl FakeConnector {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<FakePeer>) {
        let (peers, peer_rx) = mpsc::unbounded_channel();
        let connector = Arc::new(Self {
            attempts: Mutex::new(Vec::new()),
            refusing: AtomicBool::new(false),
            peers,
        });
        (connector, peer_rx)
    }

    pub fn set_refusing(&self, refusing: bool) {
        self.refusing.store(refusing, AtomicOrdering::SeqCst);
    }

    pub fn attempts(&self) -> Vec<Attempt> {
        self.attempts.lock().unwrap().clone()
    }

    pub fn attempt_count(&self) -> usize {
        self.attempts.lock().unwrap().len()
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self, url: &Url) -> RealtimeResult<TransportConnection> {
        self.attempts.lock().unwrap().push(Attempt {
            url: url.clone(),
            at: Instant::now(),
        });

        if self.refusing.load(AtomicOrdering::SeqCst) {
            return Err(RealtimeError::Connection("connection refused".to_string()));
        }

        let (client_tx, client_rx) = mpsc::unbounded_channel::<TransportFrame>();
        let (server_tx, server_rx) = mpsc::unbounded_channel::<RealtimeResult<TransportFrame>>();

        let sink = sink::unfold(client_tx, |tx, frame: TransportFrame| async move {
            tx.send(frame)
                .map_err(|_| RealtimeError::Connection("peer dropped".to_string()))?;
            Ok::<_, RealtimeError>(tx)
        });
        let stream = stream::unfold(server_rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        });

        let _ = self.peers.send(FakePeer {
            url: url.clone(),
            to_client: server_tx,
            from_client: client_rx,
        });

        Ok(TransportConnection {
            sink: Box::pin(sink),
            stream: Box::pin(stream),
        })
    }
}

/// Server side of one accepted transport. Dropping it ends the client's
/// inbound stream.
pub struct FakePeer {
    pub url: Url,
    to_client: mpsc::UnboundedSender<RealtimeResult<TransportFrame>>,
    from_client: mpsc::UnboundedReceiver<TransportFrame>,
}

impl FakePeer {
    pub fn send_text(&self, text: impl Into<String>) {
        let _ = self.to_client.send(Ok(TransportFrame::Text(text.into())));
    }

    /// Push a chat message event for `group_id`.
    pub fn send_message(&self, group_id: &str, content: &str) {
        let frame = json!({
            "type": "message",
            "group_id": group_id,
            "message": {
                "user_id": "10001",
                "nickname": "tester",
                "avatar_url": "",
                "content": content,
                "timestamp": "2024-01-01T00:00:00Z"
            }
        });
        self.send_text(frame.to_string());
    }

    /// Close the transport from the server side.
    pub fn close(&self) {
        let _ = self.to_client.send(Ok(TransportFrame::Close));
    }

    /// Fail the transport with a read error.
    pub fn fail(&self) {
        let _ = self
            .to_client
            .send(Err(RealtimeError::Connection("connection reset".to_string())));
    }

    /// Next frame written by the client, or `None` once the client's sink
    /// is gone.
    pub async fn next_frame(&mut self) -> Option<TransportFrame> {
        timeout(WAIT, self.from_client.recv())
            .await
            .expect("timed out waiting for client frame")
    }

    /// Next frame, decoded as a command.
    pub async fn expect_command(&mut self) -> OutboundCommand {
        match self.next_frame().await {
            Some(TransportFrame::Text(text)) => {
                serde_json::from_str(&text).expect("client sent invalid command")
            }
            other => panic!("expected command, got {:?}", other),
        }
    }

    /// Assert the client wrote nothing after letting its tasks settle.
    pub async fn assert_silent(&mut self) {
        tokio::time::sleep(Duration::from_millis(50)).await;
        if let Ok(frame) = self.from_client.try_recv() {
            panic!("unexpected frame from client: {:?}", frame);
        }
    }
}

/// Handler factory that logs `name:content` for every message received.
#[derive(Clone, Default)]
pub struct Recorder {
    log: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handler(&self, name: &'static str) -> impl Fn(&ChatMessage) + Send + Sync + 'static {
        let log = Arc::clone(&self.log);
        move |msg: &ChatMessage| {
            log.lock().unwrap().push(format!("{}:{}", name, msg.content));
        }
    }

    pub fn entries(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    /// Wait until at least `count` entries were recorded.
    pub async fn wait_for(&self, count: usize) -> Vec<String> {
        let deadline = Instant::now() + WAIT;
        loop {
            let entries = self.entries();
            if entries.len() >= count {
                return entries;
            }
            assert!(
                Instant::now() < deadline,
                "timed out waiting for {} entries, have {:?}",
                count,
                entries
            );
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }
}

/// Realtime client wired to a fake connector.
pub struct TestHarness {
    pub client: RealtimeClient,
    pub connector: Arc<FakeConnector>,
    peers: mpsc::UnboundedReceiver<FakePeer>,
    events: broadcast::Receiver<RealtimeEvent>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_config(RealtimeConfig::default())
    }

    pub fn with_config(config: RealtimeConfig) -> Self {
        let (connector, peers) = FakeConnector::new();
        let client = RealtimeClient::new(config, connector.clone()).unwrap();
        let events = client.events();
        Self {
            client,
            connector,
            peers,
            events,
        }
    }

    /// Wait for the next transport the client opens.
    pub async fn accept(&mut self) -> FakePeer {
        timeout(WAIT, self.peers.recv())
            .await
            .expect("timed out waiting for a connection attempt")
            .expect("connector dropped")
    }

    /// Connect with `token` and wait until the transport is open.
    pub async fn open(&mut self, token: &str) -> FakePeer {
        self.client.connect(token, LifecycleCallbacks::new()).await;
        let peer = self.accept().await;
        self.expect_event(RealtimeEvent::Opened).await;
        peer
    }

    pub async fn next_event(&mut self) -> RealtimeEvent {
        timeout(WAIT, self.events.recv())
            .await
            .expect("timed out waiting for event")
            .expect("event channel closed")
    }

    pub async fn expect_event(&mut self, expected: RealtimeEvent) {
        let event = self.next_event().await;
        assert_eq!(event, expected);
    }

    /// Skip events until one matches.
    pub async fn wait_for_event(
        &mut self,
        matches: impl Fn(&RealtimeEvent) -> bool,
    ) -> RealtimeEvent {
        loop {
            let event = self.next_event().await;
            if matches(&event) {
                return event;
            }
        }
    }

    /// Assert no further event arrives within `window`.
    pub async fn assert_no_event(&mut self, window: Duration) {
        if let Ok(event) = timeout(window, self.events.recv()).await {
            panic!("unexpected event: {:?}", event);
        }
    }
}
