//! Realtime duplex protocol engine.
//!
//! # Architecture
//!
//! - `codec`: JSON envelope decode/encode with base64 audio
//! - `turn`: half-duplex gate deciding whether captured audio is forwarded
//! - `session_config`: the one-time `session.update` negotiation
//! - `session`: the connection owner running the inbound and outbound loops
//! - `transport`: authenticated WebSocket dial
//!
//! # Audio Format
//!
//! PCM 16-bit signed little-endian mono at 24kHz in both directions.
//!
//! # Example
//!
//! ```rust,ignore
//! use duplex_voice::core::audio::{capture_channel, PlaybackSink};
//! use duplex_voice::core::realtime::{DuplexSession, SessionSettings};
//!
//! let (producer, capture) = capture_channel(50, 1920);
//! let playback = PlaybackSink::with_capacity(24000 * 30);
//!
//! let mut session = DuplexSession::new(SessionSettings::new("sk-..."))?;
//! session.attach_capture(capture).attach_playback(playback.clone());
//! let stats = session.start().await?;
//! ```

mod base;
pub mod codec;
pub mod config;
pub mod messages;
pub mod session;
pub mod session_config;
pub mod transport;
pub mod turn;

pub use base::{RealtimeError, RealtimeResult, SessionEnd, TurnState};
pub use codec::{AudioDelta, DecodeError, EncodeError, Event, EventCodec, new_event_id};
pub use config::{
    AudioFormat, DEFAULT_CAPTURE_FRAME_SAMPLES, DEFAULT_PLAYBACK_BUFFER_SECONDS,
    DEFAULT_READ_TIMEOUT, Modality, REALTIME_SAMPLE_RATE, REALTIME_URL, RealtimeModel,
    RealtimeVoice,
};
pub use messages::{MaxTokens, SessionConfig, TurnDetection};
pub use session::{DuplexSession, SessionSettings, SessionStats};
pub use session_config::SessionConfigurator;
pub use transport::RealtimeStream;
pub use turn::TurnArbiter;
