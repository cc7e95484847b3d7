//! Full-duplex realtime session.
//!
//! A [`DuplexSession`] owns one WebSocket connection and runs two independent
//! tasks over it:
//!
//! - the inbound loop reads server messages, answers pings, enforces the read
//!   deadline, and dispatches decoded events to the [`TurnArbiter`] and the
//!   playback [`RingBuffer`];
//! - the outbound loop forwards captured audio as `input_audio_buffer.append`
//!   events while the assistant is idle and drops it while the assistant speaks.
//!
//! The loops share only the arbiter, the ring buffer, the stats counters, and
//! the connection writer. Nothing is retried: any transport failure ends the
//! session and the caller decides whether to start a new one.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use bytes::Bytes;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::Mutex;
use tokio::task::JoinError;
use tokio::time::{Instant, timeout, timeout_at};
use tokio_tungstenite::tungstenite::Message;
use zeroize::Zeroize;

use super::base::{RealtimeError, RealtimeResult, SessionEnd};
use super::codec::{Event, EventCodec};
use super::config::{DEFAULT_READ_TIMEOUT, REALTIME_URL, RealtimeModel};
use super::session_config::SessionConfigurator;
use super::transport;
use super::turn::TurnArbiter;
use crate::core::audio::{CaptureStream, PlaybackSink, RingBuffer, le_bytes_to_samples};

/// Upper bound on the close handshake during teardown.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

type SharedWriter<W> = Arc<Mutex<W>>;

// =============================================================================
// Settings
// =============================================================================

/// Connection and negotiation settings for one session.
#[derive(Clone)]
pub struct SessionSettings {
    pub api_key: String,
    /// Endpoint without the `model` query parameter
    pub url: String,
    pub model: String,
    /// Inactivity after which the connection is treated as dead
    pub read_timeout: Duration,
    /// Client-initiated keepalive pings; `None` disables them
    pub ping_interval: Option<Duration>,
    pub configurator: SessionConfigurator,
}

impl SessionSettings {
    pub fn new(api_key: impl Into<String>) -> Self {
        let mut settings = Self::default();
        settings.api_key = api_key.into();
        settings
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            url: REALTIME_URL.to_string(),
            model: RealtimeModel::default().as_str().to_string(),
            read_timeout: DEFAULT_READ_TIMEOUT,
            ping_interval: None,
            configurator: SessionConfigurator::default(),
        }
    }
}

impl fmt::Debug for SessionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionSettings")
            .field("api_key", &"[REDACTED]")
            .field("url", &self.url)
            .field("model", &self.model)
            .field("read_timeout", &self.read_timeout)
            .field("ping_interval", &self.ping_interval)
            .field("configurator", &self.configurator)
            .finish()
    }
}

impl Drop for SessionSettings {
    fn drop(&mut self) {
        self.api_key.zeroize();
    }
}

// =============================================================================
// Stats
// =============================================================================

/// Counters collected over a session's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Audio append events written to the connection
    pub chunks_sent: u64,
    /// Captured chunks dropped because the assistant was speaking
    pub chunks_gated: u64,
    pub deltas_received: u64,
    /// PCM samples handed to the playback buffer
    pub samples_written: u64,
    pub decode_errors: u64,
    pub unhandled_events: u64,
    pub pongs_sent: u64,
    pub pings_sent: u64,
}

#[derive(Debug, Default)]
struct SessionCounters {
    chunks_sent: AtomicU64,
    chunks_gated: AtomicU64,
    deltas_received: AtomicU64,
    samples_written: AtomicU64,
    decode_errors: AtomicU64,
    unhandled_events: AtomicU64,
    pongs_sent: AtomicU64,
    pings_sent: AtomicU64,
}

impl SessionCounters {
    fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> SessionStats {
        SessionStats {
            chunks_sent: self.chunks_sent.load(Ordering::Relaxed),
            chunks_gated: self.chunks_gated.load(Ordering::Relaxed),
            deltas_received: self.deltas_received.load(Ordering::Relaxed),
            samples_written: self.samples_written.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            unhandled_events: self.unhandled_events.load(Ordering::Relaxed),
            pongs_sent: self.pongs_sent.load(Ordering::Relaxed),
            pings_sent: self.pings_sent.load(Ordering::Relaxed),
        }
    }
}

// =============================================================================
// Session
// =============================================================================

/// One realtime conversation over one connection.
pub struct DuplexSession {
    settings: SessionSettings,
    capture: Option<CaptureStream>,
    playback: Option<PlaybackSink>,
    arbiter: Arc<TurnArbiter>,
    counters: Arc<SessionCounters>,
}

impl DuplexSession {
    /// Create a session.
    ///
    /// Fails when no API key is configured or when the timing settings cannot
    /// be scheduled.
    pub fn new(settings: SessionSettings) -> RealtimeResult<Self> {
        if settings.api_key.trim().is_empty() {
            return Err(RealtimeError::AuthenticationFailed(
                "API key is required".to_string(),
            ));
        }
        if settings.read_timeout.is_zero() {
            return Err(RealtimeError::InvalidConfiguration(
                "read timeout must be greater than zero".to_string(),
            ));
        }
        deadline_after(Instant::now(), settings.read_timeout)?;
        if let Some(interval) = settings.ping_interval {
            if interval.is_zero() {
                return Err(RealtimeError::InvalidConfiguration(
                    "ping interval must be greater than zero".to_string(),
                ));
            }
            deadline_after(Instant::now(), interval)?;
        }

        Ok(Self {
            settings,
            capture: None,
            playback: None,
            arbiter: Arc::new(TurnArbiter::new()),
            counters: Arc::new(SessionCounters::default()),
        })
    }

    /// Attach the capture queue the outbound loop reads from.
    pub fn attach_capture(&mut self, capture: CaptureStream) -> &mut Self {
        self.capture = Some(capture);
        self
    }

    /// Attach the playback sink the inbound loop writes into.
    pub fn attach_playback(&mut self, playback: PlaybackSink) -> &mut Self {
        self.playback = Some(playback);
        self
    }

    pub fn turn_arbiter(&self) -> Arc<TurnArbiter> {
        self.arbiter.clone()
    }

    pub fn stats(&self) -> SessionStats {
        self.counters.snapshot()
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Connect, negotiate, and stream until the connection ends.
    ///
    /// Both endpoints must be attached; they are consumed by the run, so a
    /// second call needs fresh ones.
    pub async fn start(&mut self) -> RealtimeResult<SessionStats> {
        let (capture, playback) = self.take_endpoints()?;

        let ws = transport::connect(
            &self.settings.url,
            &self.settings.model,
            &self.settings.api_key,
        )
        .await?;

        self.run_with(ws, capture, playback).await
    }

    /// Run the session over an already-open connection.
    pub async fn run_on<S, E>(&mut self, ws: S) -> RealtimeResult<SessionStats>
    where
        S: Stream<Item = Result<Message, E>> + Sink<Message> + Send + 'static,
        <S as Sink<Message>>::Error: fmt::Display + Send,
        E: fmt::Display + Send + 'static,
    {
        let (capture, playback) = self.take_endpoints()?;
        self.run_with(ws, capture, playback).await
    }

    fn take_endpoints(&mut self) -> RealtimeResult<(CaptureStream, PlaybackSink)> {
        if self.capture.is_none() {
            return Err(RealtimeError::InvalidConfiguration(
                "capture source not attached".to_string(),
            ));
        }
        if self.playback.is_none() {
            return Err(RealtimeError::InvalidConfiguration(
                "playback sink not attached".to_string(),
            ));
        }
        match (self.capture.take(), self.playback.take()) {
            (Some(capture), Some(playback)) => Ok((capture, playback)),
            _ => Err(RealtimeError::InternalError(
                "endpoints disappeared while starting".to_string(),
            )),
        }
    }

    async fn run_with<S, E>(
        &mut self,
        ws: S,
        capture: CaptureStream,
        playback: PlaybackSink,
    ) -> RealtimeResult<SessionStats>
    where
        S: Stream<Item = Result<Message, E>> + Sink<Message> + Send + 'static,
        <S as Sink<Message>>::Error: fmt::Display + Send,
        E: fmt::Display + Send + 'static,
    {
        let (mut sink, stream) = ws.split();

        self.settings.configurator.send(&mut sink).await?;

        let writer: SharedWriter<_> = Arc::new(Mutex::new(sink));

        let mut inbound = tokio::spawn(inbound_loop(
            stream,
            writer.clone(),
            self.arbiter.clone(),
            playback.ring().clone(),
            self.counters.clone(),
            self.settings.read_timeout,
        ));
        let mut outbound = tokio::spawn(outbound_loop(
            capture,
            writer.clone(),
            self.arbiter.clone(),
            self.counters.clone(),
        ));
        let mut pinger = self
            .settings
            .ping_interval
            .map(|interval| tokio::spawn(ping_loop(writer.clone(), interval, self.counters.clone())));

        let mut outbound_done = false;
        let result = loop {
            tokio::select! {
                res = &mut inbound => break joined(res).map(|end| {
                    tracing::info!(reason = %end, "Realtime session ended");
                }),
                res = &mut outbound, if !outbound_done => {
                    outbound_done = true;
                    if let Err(e) = joined(res) {
                        break Err(e);
                    }
                    tracing::info!("Capture source exhausted, still receiving");
                }
                res = async {
                    match pinger.as_mut() {
                        Some(handle) => handle.await,
                        None => std::future::pending().await,
                    }
                } => {
                    pinger = None;
                    if let Err(e) = joined(res) {
                        break Err(e);
                    }
                }
            }
        };

        inbound.abort();
        outbound.abort();
        if let Some(handle) = pinger {
            handle.abort();
        }

        match timeout(CLOSE_TIMEOUT, async { writer.lock().await.close().await }).await {
            Ok(Ok(())) => tracing::debug!("Connection closed"),
            Ok(Err(e)) => tracing::debug!(error = %e, "Close after teardown failed"),
            Err(_) => tracing::debug!("Close handshake timed out"),
        }

        let stats = self.counters.snapshot();
        match result {
            Ok(()) => {
                tracing::info!(?stats, "Session stats");
                Ok(stats)
            }
            Err(e) => {
                tracing::error!(error = %e, ?stats, "Realtime session failed");
                Err(e)
            }
        }
    }
}

impl fmt::Debug for DuplexSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DuplexSession")
            .field("settings", &self.settings)
            .field("capture_attached", &self.capture.is_some())
            .field("playback_attached", &self.playback.is_some())
            .field("turn_state", &self.arbiter.state())
            .finish()
    }
}

/// `now + duration`, or an error when that instant is not representable.
fn deadline_after(now: Instant, duration: Duration) -> RealtimeResult<Instant> {
    now.checked_add(duration).ok_or_else(|| {
        RealtimeError::InvalidConfiguration(format!(
            "duration of {}s is too large to schedule",
            duration.as_secs()
        ))
    })
}

fn joined<T>(res: Result<RealtimeResult<T>, JoinError>) -> RealtimeResult<T> {
    res.map_err(|e| RealtimeError::InternalError(format!("Session task failed: {e}")))?
}

// =============================================================================
// Loops
// =============================================================================

async fn inbound_loop<R, E, W>(
    mut stream: R,
    writer: SharedWriter<W>,
    arbiter: Arc<TurnArbiter>,
    ring: Arc<RingBuffer>,
    counters: Arc<SessionCounters>,
    read_timeout: Duration,
) -> RealtimeResult<SessionEnd>
where
    R: Stream<Item = Result<Message, E>> + Unpin,
    E: fmt::Display,
    W: Sink<Message> + Unpin,
    W::Error: fmt::Display,
{
    let mut deadline = deadline_after(Instant::now(), read_timeout)?;

    loop {
        let message = match timeout_at(deadline, stream.next()).await {
            Err(_) => {
                return Err(RealtimeError::Timeout(format!(
                    "no message received for {}s",
                    read_timeout.as_secs_f32()
                )));
            }
            Ok(None) => return Ok(SessionEnd::StreamEnded),
            Ok(Some(Err(e))) => {
                return Err(RealtimeError::WebSocketError(format!("Read failed: {e}")));
            }
            Ok(Some(Ok(message))) => message,
        };

        deadline = deadline_after(Instant::now(), read_timeout)?;

        match message {
            Message::Text(text) => dispatch(text.as_bytes(), &arbiter, &ring, &counters),
            Message::Binary(data) => dispatch(&data, &arbiter, &ring, &counters),
            Message::Ping(payload) => {
                tracing::trace!(len = payload.len(), "Ping received");
                writer
                    .lock()
                    .await
                    .send(Message::Pong(payload))
                    .await
                    .map_err(|e| RealtimeError::WebSocketError(format!("Pong failed: {e}")))?;
                SessionCounters::incr(&counters.pongs_sent);
            }
            Message::Pong(_) => tracing::trace!("Pong received"),
            Message::Close(frame) => {
                tracing::info!(?frame, "Server closed the connection");
                return Ok(SessionEnd::ServerClosed);
            }
            Message::Frame(_) => {}
        }
    }
}

/// Decode one message and apply it to shared state.
fn dispatch(bytes: &[u8], arbiter: &TurnArbiter, ring: &RingBuffer, counters: &SessionCounters) {
    let event = match EventCodec::decode(bytes) {
        Ok(event) => event,
        Err(e) => {
            SessionCounters::incr(&counters.decode_errors);
            tracing::warn!(error = %e, "Dropping undecodable message");
            return;
        }
    };

    arbiter.observe(&event);

    match &event {
        Event::ResponseAudioDelta(delta) => {
            SessionCounters::incr(&counters.deltas_received);
            match le_bytes_to_samples(&delta.audio) {
                Ok(samples) => {
                    let overwritten = ring.write(&samples);
                    counters
                        .samples_written
                        .fetch_add(samples.len() as u64, Ordering::Relaxed);
                    if overwritten > 0 {
                        tracing::debug!(overwritten, "Playback buffer full, dropped oldest samples");
                    }
                }
                Err(e) => {
                    SessionCounters::incr(&counters.decode_errors);
                    tracing::warn!(error = %e, event_id = %delta.event_id, "Dropping audio delta");
                }
            }
        }
        Event::SessionCreated { session_id, .. } => {
            tracing::info!(session_id = session_id.as_deref().unwrap_or("unknown"), "Session created");
        }
        Event::SessionUpdated { .. } => tracing::debug!("Session configuration acknowledged"),
        Event::Error { error, .. } => {
            tracing::error!(
                code = error.code.as_deref().unwrap_or_default(),
                message = %error.message,
                "Server reported an error"
            );
        }
        Event::Unhandled { event_type, .. } => {
            SessionCounters::incr(&counters.unhandled_events);
            tracing::debug!(event_type = %event_type, "Ignoring unhandled event");
        }
        other => tracing::debug!(event_type = other.event_type(), "Lifecycle event"),
    }
}

async fn outbound_loop<W>(
    mut capture: CaptureStream,
    writer: SharedWriter<W>,
    arbiter: Arc<TurnArbiter>,
    counters: Arc<SessionCounters>,
) -> RealtimeResult<()>
where
    W: Sink<Message> + Unpin,
    W::Error: fmt::Display,
{
    while let Some(chunk) = capture.recv().await {
        if arbiter.is_speaking() {
            SessionCounters::incr(&counters.chunks_gated);
            tracing::trace!(samples = chunk.len(), "Assistant speaking, dropping captured chunk");
            continue;
        }

        let event = Event::input_audio_append(chunk.to_le_bytes());
        let json = EventCodec::encode(&event)
            .map_err(|e| RealtimeError::SerializationError(e.to_string()))?;

        writer
            .lock()
            .await
            .send(Message::Text(json.into()))
            .await
            .map_err(|e| RealtimeError::WebSocketError(format!("Audio append failed: {e}")))?;
        SessionCounters::incr(&counters.chunks_sent);
    }

    tracing::debug!("Capture stream closed");
    Ok(())
}

async fn ping_loop<W>(
    writer: SharedWriter<W>,
    interval: Duration,
    counters: Arc<SessionCounters>,
) -> RealtimeResult<()>
where
    W: Sink<Message> + Unpin,
    W::Error: fmt::Display,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.tick().await;
    loop {
        ticker.tick().await;
        writer
            .lock()
            .await
            .send(Message::Ping(Bytes::new()))
            .await
            .map_err(|e| RealtimeError::WebSocketError(format!("Ping failed: {e}")))?;
        SessionCounters::incr(&counters.pings_sent);
    }
}
