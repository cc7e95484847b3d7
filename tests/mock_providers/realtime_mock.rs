//! Scripted realtime WebSocket server
//!
//! The server accepts a single connection on an ephemeral port, records the
//! upgrade request and every message the client sends, and plays a list of
//! [`ServerStep`]s. Once the script runs out it keeps the connection open
//! without sending anything until the client goes away.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;

/// How long a `WaitFor*` step blocks before moving on regardless.
const STEP_WAIT_LIMIT: Duration = Duration::from_secs(5);

/// One scripted server action.
pub enum ServerStep {
    /// Send a JSON event as a text frame
    Send(Value),
    /// Send arbitrary text, e.g. something that is not JSON
    Raw(String),
    /// Send a ping with the given payload
    Ping(Vec<u8>),
    /// Send a close frame and stop the script
    Close,
    /// Block until the client has sent this many `input_audio_buffer.append` events
    WaitForAppends(usize),
    /// Block until the test signals
    WaitFor(Arc<Notify>),
    Sleep(Duration),
}

/// What the client put on the upgrade request.
#[derive(Debug, Clone, Default)]
pub struct Handshake {
    pub path_and_query: String,
    pub authorization: Option<String>,
    pub beta: Option<String>,
    pub extensions: Option<String>,
}

/// Everything the mock observed.
#[derive(Debug, Default)]
pub struct MockRealtimeState {
    handshake: Mutex<Option<Handshake>>,
    received: Mutex<Vec<Value>>,
    pongs: Mutex<Vec<Vec<u8>>>,
}

impl MockRealtimeState {
    pub fn handshake(&self) -> Option<Handshake> {
        self.handshake.lock().clone()
    }

    /// Every JSON message received, in arrival order.
    pub fn received(&self) -> Vec<Value> {
        self.received.lock().clone()
    }

    pub fn received_of_type(&self, event_type: &str) -> Vec<Value> {
        self.received
            .lock()
            .iter()
            .filter(|msg| msg["type"] == event_type)
            .cloned()
            .collect()
    }

    pub fn append_count(&self) -> usize {
        self.received_of_type("input_audio_buffer.append").len()
    }

    pub fn pongs(&self) -> Vec<Vec<u8>> {
        self.pongs.lock().clone()
    }
}

pub struct MockRealtimeServer {
    pub addr: SocketAddr,
    pub state: Arc<MockRealtimeState>,
    handle: JoinHandle<()>,
}

impl MockRealtimeServer {
    /// Accept one connection and play `script` on it.
    pub async fn start(script: Vec<ServerStep>) -> Self {
        Self::spawn(script, None).await
    }

    /// Answer the upgrade request with `status` instead of switching protocols.
    pub async fn rejecting(status: StatusCode) -> Self {
        Self::spawn(Vec::new(), Some(status)).await
    }

    async fn spawn(script: Vec<ServerStep>, reject: Option<StatusCode>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock realtime listener");
        let addr = listener.local_addr().expect("mock listener address");
        let state = Arc::new(MockRealtimeState::default());

        let server_state = state.clone();
        let handle = tokio::spawn(async move {
            if let Err(e) = serve(listener, script, server_state, reject).await {
                eprintln!("Mock realtime server error: {e}");
            }
        });

        Self {
            addr,
            state,
            handle,
        }
    }

    /// Base URL the client should dial.
    pub fn url(&self) -> String {
        format!("ws://{}/v1/realtime", self.addr)
    }

    /// Wait for the connection handler to finish.
    pub async fn finished(self) {
        let _ = tokio::time::timeout(STEP_WAIT_LIMIT, self.handle).await;
    }
}

async fn serve(
    listener: TcpListener,
    script: Vec<ServerStep>,
    state: Arc<MockRealtimeState>,
    reject: Option<StatusCode>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let (stream, _) = listener.accept().await?;

    let handshake_state = state.clone();
    let callback = move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
        let header = |name: &str| {
            req.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        *handshake_state.handshake.lock() = Some(Handshake {
            path_and_query: req
                .uri()
                .path_and_query()
                .map(|p| p.to_string())
                .unwrap_or_default(),
            authorization: header("authorization"),
            beta: header("openai-beta"),
            extensions: header("sec-websocket-extensions"),
        });

        match reject {
            Some(status) => {
                let mut response = ErrorResponse::new(Some("rejected by mock".to_string()));
                *response.status_mut() = status;
                Err(response)
            }
            None => Ok(resp),
        }
    };

    let ws_stream = match accept_hdr_async(stream, callback).await {
        Ok(ws) => ws,
        Err(_) if reject.is_some() => return Ok(()),
        Err(e) => return Err(e.into()),
    };
    let (mut write, mut read) = ws_stream.split();

    let reader_state = state.clone();
    let reader = tokio::spawn(async move {
        while let Some(Ok(msg)) = read.next().await {
            match msg {
                Message::Text(text) => {
                    if let Ok(value) = serde_json::from_str::<Value>(text.as_str()) {
                        reader_state.received.lock().push(value);
                    }
                }
                Message::Pong(payload) => reader_state.pongs.lock().push(payload.to_vec()),
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    for step in script {
        match step {
            ServerStep::Send(event) => {
                write.send(Message::Text(event.to_string().into())).await?;
            }
            ServerStep::Raw(text) => {
                write.send(Message::Text(text.into())).await?;
            }
            ServerStep::Ping(payload) => {
                write.send(Message::Ping(payload.into())).await?;
            }
            ServerStep::Close => {
                write.send(Message::Close(None)).await?;
                break;
            }
            ServerStep::WaitForAppends(count) => {
                let _ = tokio::time::timeout(STEP_WAIT_LIMIT, async {
                    while state.append_count() < count {
                        tokio::time::sleep(Duration::from_millis(5)).await;
                    }
                })
                .await;
            }
            ServerStep::WaitFor(signal) => {
                let _ = tokio::time::timeout(STEP_WAIT_LIMIT, signal.notified()).await;
            }
            ServerStep::Sleep(duration) => tokio::time::sleep(duration).await,
        }
    }

    // Hold the connection until the client drops it
    let _ = reader.await;
    Ok(())
}
