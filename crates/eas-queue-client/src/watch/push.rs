//! Push transport: one WebSocket connection streaming frames to the client.
//!
//! A connection runs two loops in a single task:
//!
//! - the receive loop decodes each message into a [`Frame`]; decode failures
//!   become diagnostic frames and the loop goes on, read failures produce one
//!   final diagnostic frame and end it;
//! - the keepalive loop pings the server every [`KEEPALIVE_INTERVAL`]; a
//!   failed ping also ends the connection with one final diagnostic frame.
//!
//! Whichever loop finishes first, or the transport's cancellation token,
//! ends both. The socket is then closed and the frame channel dropped.

use crate::error::{ClientError, Result};
use crate::protocol::{CLOSE_TIMEOUT, CONNECT_TIMEOUT, FRAME_CHANNEL_CAPACITY, KEEPALIVE_INTERVAL};
use eas_queue_core::{Frame, FrameCodec};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use reqwest::Url;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{self, Instant};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderMap, HeaderName, HeaderValue};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_util::sync::CancellationToken;

/// Everything needed to open a push connection: target and handshake
/// headers. Each attempt builds a fresh handshake request from it.
#[derive(Clone)]
pub struct PushConnector {
    url: Url,
    headers: HeaderMap,
    codec: Arc<dyn FrameCodec>,
}

impl PushConnector {
    /// `url` must use the `ws` or `wss` scheme.
    pub fn new<I, K, V>(url: Url, headers: I, codec: Arc<dyn FrameCodec>) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(ClientError::InvalidUrl(format!(
                "{url}: push connections need a ws or wss url"
            )));
        }

        let mut map = HeaderMap::new();
        for (name, value) in headers {
            let (name, value) = (name.as_ref(), value.as_ref());
            let header = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                ClientError::InvalidHeader {
                    name: name.to_string(),
                    reason: e.to_string(),
                }
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| ClientError::InvalidHeader {
                name: name.to_string(),
                reason: e.to_string(),
            })?;
            map.insert(header, value);
        }

        Ok(Self {
            url,
            headers: map,
            codec,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    fn request(&self) -> Result<tungstenite::handshake::client::Request> {
        let mut request = self.url.as_str().into_client_request()?;
        request.headers_mut().extend(self.headers.clone());
        Ok(request)
    }
}

/// A live push connection.
pub struct PushTransport {
    frames: mpsc::Receiver<Frame>,
    cancel: CancellationToken,
}

impl PushTransport {
    /// Open a connection. Fails if the handshake fails or takes longer than
    /// [`CONNECT_TIMEOUT`]; once connected, all further failures are
    /// reported in-band and end the frame channel.
    pub async fn connect(connector: &PushConnector, cancel: CancellationToken) -> Result<Self> {
        let request = connector.request()?;
        let connecting = tokio_tungstenite::connect_async(request);
        let (ws, response) = time::timeout(CONNECT_TIMEOUT, connecting)
            .await
            .map_err(|_| ClientError::ConnectTimeout {
                url: connector.url.to_string(),
                timeout: CONNECT_TIMEOUT,
            })??;
        tracing::debug!(
            "push connection to {} established ({})",
            connector.url,
            response.status()
        );

        let (tx, rx) = mpsc::channel(FRAME_CHANNEL_CAPACITY);
        tokio::spawn(run(ws, connector.codec.clone(), tx, cancel.clone()));

        Ok(Self { frames: rx, cancel })
    }

    /// Next frame, or `None` once the connection is gone.
    pub async fn recv(&mut self) -> Option<Frame> {
        self.frames.recv().await
    }

    /// Stop the connection. Safe to call more than once.
    pub fn close(&self) {
        self.cancel.cancel();
    }
}

impl Drop for PushTransport {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run<S>(
    ws: S,
    codec: Arc<dyn FrameCodec>,
    tx: mpsc::Sender<Frame>,
    cancel: CancellationToken,
) where
    S: Stream<Item = std::result::Result<Message, tungstenite::Error>>
        + Sink<Message, Error = tungstenite::Error>
        + Unpin,
{
    let (mut sink, mut stream) = ws.split();

    let ping_failure = tokio::select! {
        _ = cancel.cancelled() => {
            tracing::debug!("push connection cancelled");
            None
        }
        _ = receive_loop(&mut stream, codec.as_ref(), &tx) => None,
        e = keepalive_loop(&mut sink) => Some(e),
    };
    cancel.cancel();

    // The receive loop was cut short, so it never reported the broken socket.
    if let Some(e) = ping_failure {
        let _ = tx
            .send(Frame::diagnostic(format!(
                "error reading message: keepalive ping failed: {e}"
            )))
            .await;
    }

    if time::timeout(CLOSE_TIMEOUT, sink.close()).await.is_err() {
        tracing::debug!("push connection close timed out");
    }
}

async fn receive_loop<S>(stream: &mut S, codec: &dyn FrameCodec, tx: &mpsc::Sender<Frame>)
where
    S: Stream<Item = std::result::Result<Message, tungstenite::Error>> + Unpin,
{
    loop {
        let frame = match stream.next().await {
            Some(Ok(Message::Binary(data))) => decode(codec, &data),
            Some(Ok(Message::Text(text))) => decode(codec, text.as_str().as_bytes()),
            Some(Ok(Message::Close(close))) => {
                let reason = close.map(|c| c.reason.to_string()).unwrap_or_default();
                let _ = tx
                    .send(Frame::diagnostic(format!(
                        "error reading message: connection closed by server {reason}"
                    )))
                    .await;
                return;
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => {
                let _ = tx
                    .send(Frame::diagnostic(format!("error reading message: {e}")))
                    .await;
                return;
            }
            None => {
                let _ = tx
                    .send(Frame::diagnostic("error reading message: end of stream"))
                    .await;
                return;
            }
        };

        if tx.send(frame).await.is_err() {
            return;
        }
    }
}

fn decode(codec: &dyn FrameCodec, bytes: &[u8]) -> Frame {
    codec
        .decode(bytes)
        .unwrap_or_else(|e| Frame::diagnostic(format!("failed to decode message: {e}")))
}

/// Ping until a ping cannot be sent; returns that error.
async fn keepalive_loop<S>(sink: &mut S) -> tungstenite::Error
where
    S: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    let mut ticker = time::interval_at(Instant::now() + KEEPALIVE_INTERVAL, KEEPALIVE_INTERVAL);
    loop {
        ticker.tick().await;
        if let Err(e) = sink.send(Message::Ping(Default::default())).await {
            tracing::debug!("keepalive ping failed: {}", e);
            return e;
        }
    }
}
