//! Pull-side playback endpoint.
//!
//! The audio output device calls [`PlaybackSink::fill`] on its own clock. The
//! call never blocks and always fills the whole block, using silence when the
//! session has not delivered enough audio yet.

use std::sync::Arc;

use super::ring_buffer::{RingBuffer, RingBufferStats};

/// Output block size used by the original device configuration.
pub const DEFAULT_PLAYBACK_FRAME_SAMPLES: usize = 480;

/// Playback endpoint backed by a shared [`RingBuffer`].
///
/// Cloning yields another handle to the same buffer; the session writes into it
/// and exactly one audio callback should read from it.
#[derive(Debug, Clone)]
pub struct PlaybackSink {
    ring: Arc<RingBuffer>,
}

impl PlaybackSink {
    /// Create a sink with its own buffer of `capacity` samples.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            ring: Arc::new(RingBuffer::new(capacity)),
        }
    }

    /// Wrap an existing buffer.
    pub fn from_ring(ring: Arc<RingBuffer>) -> Self {
        Self { ring }
    }

    /// Fill an output block; returns how many samples were real audio.
    #[inline]
    pub fn fill(&self, out: &mut [i16]) -> usize {
        self.ring.read_into(out)
    }

    /// Return exactly `count` samples.
    pub fn pull(&self, count: usize) -> Vec<i16> {
        self.ring.read(count)
    }

    /// Number of buffered samples not yet played.
    pub fn buffered(&self) -> usize {
        self.ring.len()
    }

    /// Drop everything that has not been played yet.
    pub fn flush(&self) {
        self.ring.clear();
    }

    pub(crate) fn ring(&self) -> &Arc<RingBuffer> {
        &self.ring
    }

    pub fn stats(&self) -> RingBufferStats {
        self.ring.stats()
    }
}
