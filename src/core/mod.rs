pub mod audio;
pub mod realtime;

// Re-export commonly used types for convenience
pub use audio::{
    AudioChunk, CaptureProducer, CaptureStream, MuteHandle, PlaybackSink, RingBuffer,
    capture_channel,
};

pub use realtime::{
    DuplexSession, Event, EventCodec, RealtimeError, RealtimeResult, SessionConfigurator,
    SessionSettings, SessionStats, TurnArbiter, TurnState,
};
