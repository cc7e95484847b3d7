//! Audio endpoints for the duplex session.
//!
//! - `capture`: bounded, non-blocking queue from the input callback to the session
//! - `playback`: pull-side sink the output callback reads from
//! - `ring_buffer`: drop-oldest circular buffer behind the playback sink
//! - `pcm`: PCM16 chunk type and byte conversions
//! - `wav`: WAV recording and reading for debugging and file-driven runs
//! - `device`: file-backed capture and a steady playback clock standing in for hardware
//!
//! All audio is 16-bit signed mono PCM, little-endian on the wire.

pub mod capture;
pub mod device;
pub mod pcm;
pub mod playback;
pub mod ring_buffer;
pub mod wav;

pub use capture::{
    CaptureProducer, CaptureStats, CaptureStream, DEFAULT_CAPTURE_QUEUE_CAPACITY, MuteHandle,
    PushOutcome, QueueUsage, capture_channel, spawn_usage_monitor,
};
pub use device::{PlaybackClock, frame_duration, spawn_file_capture};
pub use pcm::{AudioChunk, PcmError, le_bytes_to_samples, samples_to_le_bytes};
pub use playback::{DEFAULT_PLAYBACK_FRAME_SAMPLES, PlaybackSink};
pub use ring_buffer::{RingBuffer, RingBufferStats};
pub use wav::{WavClip, WavError, WavRecorder, read_wav};
