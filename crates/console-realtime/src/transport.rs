//! Transport seam between the realtime client and the network.
//!
//! The client only sees text frames and close notifications. The production
//! connector speaks WebSocket through `tokio-tungstenite`; tests plug in an
//! in-memory connector.

use crate::{RealtimeError, RealtimeResult};
use async_trait::async_trait;
use futures_util::{future, Sink, SinkExt, Stream, StreamExt};
use std::pin::Pin;
use std::time::Duration;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::debug;
use url::Url;

/// A frame crossing the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportFrame {
    Text(String),
    Close,
}

/// Outbound half of an open transport.
pub type FrameSink = Pin<Box<dyn Sink<TransportFrame, Error = RealtimeError> + Send>>;

/// Inbound half of an open transport. The stream ending, yielding
/// `TransportFrame::Close`, or yielding an error all mean the transport is gone.
pub type FrameStream = Pin<Box<dyn Stream<Item = RealtimeResult<TransportFrame>> + Send>>;

/// An open transport, split into its two halves.
pub struct TransportConnection {
    pub sink: FrameSink,
    pub stream: FrameStream,
}

/// Opens transports for the realtime client.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Open a transport to `url`. An error is handled exactly like a close.
    async fn connect(&self, url: &Url) -> RealtimeResult<TransportConnection>;
}

/// WebSocket connector backed by `tokio-tungstenite`.
#[derive(Debug, Clone, Default)]
pub struct WebSocketConnector {
    connect_timeout: Option<Duration>,
}

impl WebSocketConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail an attempt that has not completed its handshake within `timeout`.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self, url: &Url) -> RealtimeResult<TransportConnection> {
        let handshake = connect_async(url.as_str());
        let (ws_stream, _) = match self.connect_timeout {
            Some(timeout) => tokio::time::timeout(timeout, handshake)
                .await
                .map_err(|_| RealtimeError::Timeout)??,
            None => handshake.await?,
        };

        let (write, read) = ws_stream.split();

        let sink = write
            .sink_map_err(RealtimeError::from)
            .with(|frame: TransportFrame| {
                let message = match frame {
                    TransportFrame::Text(text) => Message::Text(text.into()),
                    TransportFrame::Close => Message::Close(None),
                };
                future::ready(Ok::<_, RealtimeError>(message))
            });

        let stream = read.filter_map(|message| {
            future::ready(match message {
                Ok(Message::Text(text)) => {
                    Some(Ok(TransportFrame::Text(text.as_str().to_string())))
                }
                Ok(Message::Binary(data)) => match String::from_utf8(data.to_vec()) {
                    Ok(text) => Some(Ok(TransportFrame::Text(text))),
                    Err(_) => {
                        debug!(len = data.len(), "ignoring non-UTF-8 binary frame");
                        None
                    }
                },
                Ok(Message::Close(_)) => Some(Ok(TransportFrame::Close)),
                // ping/pong are answered by tungstenite itself
                Ok(_) => None,
                Err(e) => Some(Err(RealtimeError::from(e))),
            })
        });

        Ok(TransportConnection {
            sink: Box::pin(sink),
            stream: Box::pin(stream),
        })
    }
}

/// Derive the WebSocket endpoint from the server origin: same host and
/// port, `wss` when the origin is `https`, `ws` otherwise, path `/ws`.
pub fn realtime_endpoint(server_origin: &str) -> RealtimeResult<Url> {
    let origin = Url::parse(server_origin)?;
    let host = origin
        .host_str()
        .ok_or_else(|| RealtimeError::InvalidOrigin(format!("{} has no host", server_origin)))?;

    let scheme = match origin.scheme() {
        "https" | "wss" => "wss",
        "http" | "ws" => "ws",
        other => {
            return Err(RealtimeError::InvalidOrigin(format!(
                "unsupported scheme {}",
                other
            )))
        }
    };

    let authority = match origin.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    };

    Ok(Url::parse(&format!("{}://{}/ws", scheme, authority))?)
}

/// Endpoint with the credential attached as the `token` query parameter.
pub fn realtime_url(endpoint: &Url, credential: &str) -> Url {
    let mut url = endpoint.clone();
    url.query_pairs_mut().clear().append_pair("token", credential);
    url
}
