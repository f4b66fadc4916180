//! In-process servers for tests.
//!
//! [`WsServer`] is a bare WebSocket endpoint for transport tests: the test
//! drives every accepted connection by hand. [`MockQueue`] is an axum app
//! that speaks enough of the queue protocol for end-to-end client tests.

use crate::watch::push::PushConnector;
use axum::Router;
use axum::body::Body;
use axum::extract::ws::{Message as AxumMessage, WebSocketUpgrade};
use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::ACCEPT;
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use eas_queue_core::{
    AttributeKey, Attributes, CONTENT_TYPE_PROTOBUF, Frame, FrameCodec, JsonCodec, WireFormat,
};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{
    ErrorResponse, Request as WsRequest, Response as WsResponse,
};
use tokio_tungstenite::tungstenite::http;

/// One accepted server-side connection.
pub(crate) struct ServerConn {
    pub ws: WebSocketStream<TcpStream>,
    pub headers: http::HeaderMap,
}

pub(crate) struct WsServer {
    addr: std::net::SocketAddr,
    connections: mpsc::UnboundedReceiver<ServerConn>,
    attempts: Arc<AtomicUsize>,
    accepting: Arc<AtomicBool>,
    stalling: Arc<AtomicBool>,
}

impl WsServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = mpsc::unbounded_channel();
        let attempts = Arc::new(AtomicUsize::new(0));
        let accepting = Arc::new(AtomicBool::new(true));
        let stalling = Arc::new(AtomicBool::new(false));

        let counter = attempts.clone();
        let gate = accepting.clone();
        let stall = stalling.clone();
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                counter.fetch_add(1, Ordering::SeqCst);
                if stall.load(Ordering::SeqCst) {
                    // Hold the socket open and never answer the handshake.
                    tokio::spawn(async move {
                        let _held = stream;
                        std::future::pending::<()>().await;
                    });
                    continue;
                }
                let accept = gate.load(Ordering::SeqCst);
                let tx = tx.clone();
                tokio::spawn(async move {
                    let mut headers = http::HeaderMap::new();
                    let callback = |req: &WsRequest, resp: WsResponse| {
                        if !accept {
                            let reject: ErrorResponse = http::Response::builder()
                                .status(http::StatusCode::SERVICE_UNAVAILABLE)
                                .body(Some("not accepting".to_string()))
                                .unwrap();
                            return Err(reject);
                        }
                        headers = req.headers().clone();
                        Ok(resp)
                    };
                    if let Ok(ws) = tokio_tungstenite::accept_hdr_async(stream, callback).await {
                        let _ = tx.send(ServerConn { ws, headers });
                    }
                });
            }
        });

        Self {
            addr,
            connections: rx,
            attempts,
            accepting,
            stalling,
        }
    }

    pub fn url(&self) -> reqwest::Url {
        reqwest::Url::parse(&format!("ws://{}/api/predict/q", self.addr)).unwrap()
    }

    pub fn connector(&self) -> PushConnector {
        PushConnector::new(self.url(), Vec::<(String, String)>::new(), Arc::new(JsonCodec)).unwrap()
    }

    /// Next successfully upgraded connection.
    pub async fn next_connection(&mut self) -> ServerConn {
        self.connections.recv().await.unwrap()
    }

    /// TCP connections accepted so far, including rejected handshakes.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn set_accepting(&self, accepting: bool) {
        self.accepting.store(accepting, Ordering::SeqCst);
    }

    /// While set, new TCP connections are accepted but their WebSocket
    /// handshake is never answered.
    pub fn set_stalling(&self, stalling: bool) {
        self.stalling.store(stalling, Ordering::SeqCst);
    }
}

pub(crate) fn binary(frame: &Frame) -> Message {
    Message::Binary(FrameCodec::encode(&JsonCodec, frame).unwrap().into())
}

/// Frames encoded the way a pull watch body carries them.
pub(crate) fn length_delimited(frames: &[Frame]) -> Vec<u8> {
    length_delimited_with(&JsonCodec, frames)
}

pub(crate) fn length_delimited_with(codec: &dyn FrameCodec, frames: &[Frame]) -> Vec<u8> {
    let mut body = Vec::new();
    for frame in frames {
        let bytes = codec.encode(frame).unwrap();
        body.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
        body.extend_from_slice(&bytes);
    }
    body
}

pub(crate) const UID_HEADER: &str = "X-Eas-Uid";
pub(crate) const GID_HEADER: &str = "X-Eas-Gid";
pub(crate) const PRIORITY_HEADER: &str = "X-Eas-Priority";

/// A request the mock queue answered, minus attribute fetches and watches.
#[derive(Debug, Clone)]
pub(crate) struct Recorded {
    pub method: Method,
    pub query: HashMap<String, String>,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone)]
pub(crate) struct Reply {
    pub status: StatusCode,
    pub body: Vec<u8>,
    pub headers: Vec<(&'static str, String)>,
}

impl Reply {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: StatusCode::from_u16(status).unwrap(),
            body: body.into(),
            headers: Vec::new(),
        }
    }

    pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }
}

pub(crate) struct MockState {
    pub attributes: Mutex<Attributes>,
    pub attr_status: Mutex<StatusCode>,
    pub attr_fetches: AtomicUsize,
    pub replies: Mutex<VecDeque<Reply>>,
    pub recorded: Mutex<Vec<Recorded>>,
    pub watch_frames: Mutex<Vec<Frame>>,
    pub watch_status: Mutex<StatusCode>,
    pub watch_headers: Mutex<Vec<HeaderMap>>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            attributes: Mutex::new(
                Attributes::new()
                    .with(AttributeKey::UserIdentifyHeader, UID_HEADER)
                    .with(AttributeKey::GroupIdentifyHeader, GID_HEADER)
                    .with(AttributeKey::PriorityHeader, PRIORITY_HEADER),
            ),
            attr_status: Mutex::new(StatusCode::OK),
            attr_fetches: AtomicUsize::new(0),
            replies: Mutex::new(VecDeque::new()),
            recorded: Mutex::new(Vec::new()),
            watch_frames: Mutex::new(Vec::new()),
            watch_status: Mutex::new(StatusCode::OK),
            watch_headers: Mutex::new(Vec::new()),
        }
    }
}

/// Mock queue server on a random local port.
pub(crate) struct MockQueue {
    pub endpoint: String,
    pub state: Arc<MockState>,
}

impl MockQueue {
    pub async fn start() -> Self {
        let state = Arc::new(MockState::default());
        let app = Router::new()
            .route("/api/predict/{queue}", any(handle))
            .with_state(state.clone());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Self {
            endpoint: format!("http://{addr}"),
            state,
        }
    }

    pub fn reply(&self, reply: Reply) {
        self.state.replies.lock().unwrap().push_back(reply);
    }

    pub fn recorded(&self) -> Vec<Recorded> {
        self.state.recorded.lock().unwrap().clone()
    }

    pub fn attr_fetches(&self) -> usize {
        self.state.attr_fetches.load(Ordering::SeqCst)
    }
}

async fn handle(State(state): State<Arc<MockState>>, req: Request) -> Response {
    let query: HashMap<String, String> = req
        .uri()
        .query()
        .map(url_pairs)
        .unwrap_or_default();

    if query.get("_attrs_").map(String::as_str) == Some("true") {
        state.attr_fetches.fetch_add(1, Ordering::SeqCst);
        let status = *state.attr_status.lock().unwrap();
        if status != StatusCode::OK {
            return (status, "attributes unavailable").into_response();
        }
        let attrs = state.attributes.lock().unwrap().clone();
        let body = wire_format(req.headers()).attributes_codec().encode(&attrs).unwrap();
        return (status, body).into_response();
    }

    if query.get("_watch_").map(String::as_str) == Some("true") {
        return watch(state, req).await;
    }

    let method = req.method().clone();
    let headers = req.headers().clone();
    let body = axum::body::to_bytes(req.into_body(), usize::MAX)
        .await
        .map(|b| b.to_vec())
        .unwrap_or_default();
    state.recorded.lock().unwrap().push(Recorded {
        method,
        query,
        headers,
        body,
    });

    let reply = state
        .replies
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| Reply::new(200, ""));
    let mut response = (reply.status, reply.body).into_response();
    for (name, value) in reply.headers {
        response
            .headers_mut()
            .insert(name, value.parse().unwrap());
    }
    response
}

async fn watch(state: Arc<MockState>, req: Request) -> Response {
    state.watch_headers.lock().unwrap().push(req.headers().clone());
    let frames = state.watch_frames.lock().unwrap().clone();
    let codec = wire_format(req.headers()).frame_codec();

    let (mut parts, _body) = req.into_parts();
    if let Ok(upgrade) = WebSocketUpgrade::from_request_parts(&mut parts, &()).await {
        return upgrade.on_upgrade(move |mut socket| async move {
            for frame in &frames {
                let bytes = codec.encode(frame).unwrap();
                if socket.send(AxumMessage::Binary(bytes.into())).await.is_err() {
                    return;
                }
            }
            while let Some(Ok(_)) = socket.recv().await {}
        });
    }

    let status = *state.watch_status.lock().unwrap();
    if status != StatusCode::OK {
        return (status, "watch refused").into_response();
    }
    Response::builder()
        .status(StatusCode::OK)
        .body(Body::from(length_delimited_with(codec.as_ref(), &frames)))
        .unwrap()
}

/// Encoding the client asked for.
fn wire_format(headers: &HeaderMap) -> WireFormat {
    match headers.get(ACCEPT).and_then(|v| v.to_str().ok()) {
        Some(CONTENT_TYPE_PROTOBUF) => WireFormat::Protobuf,
        _ => WireFormat::Json,
    }
}

fn url_pairs(query: &str) -> HashMap<String, String> {
    let url = reqwest::Url::parse(&format!("http://mock/?{query}")).unwrap();
    url.query_pairs().into_owned().collect()
}
