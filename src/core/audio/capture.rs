//! Bounded capture queue between the audio input callback and the session.
//!
//! The device callback owns a [`CaptureProducer`] and pushes fixed-size frames;
//! the session's outbound loop owns the [`CaptureStream`] and receives them in
//! order. Pushing never blocks: a real-time audio callback must not wait on the
//! network, so when the queue is full the newest frame is dropped and counted.
//! Muting discards frames before they reach the queue without closing it.
//! Dropping every producer closes the stream, which ends the outbound loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;

use super::pcm::AudioChunk;

/// Default number of frames the capture queue holds.
pub const DEFAULT_CAPTURE_QUEUE_CAPACITY: usize = 50;

/// Log a warning every this many overrun drops.
const OVERRUN_LOG_EVERY: u64 = 50;

/// Result of pushing one frame into the capture queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Frame queued for the outbound loop
    Queued,
    /// Capture is muted; frame discarded
    Muted,
    /// Queue full; frame discarded
    Dropped,
    /// The stream side has gone away
    Closed,
}

#[derive(Debug, Default)]
struct CaptureCounters {
    queued: AtomicU64,
    muted: AtomicU64,
    dropped: AtomicU64,
}

/// Snapshot of capture queue counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CaptureStats {
    pub frames_queued: u64,
    pub frames_muted: u64,
    pub frames_dropped: u64,
}

/// Current fill level of the capture queue.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueueUsage {
    pub used: usize,
    pub capacity: usize,
}

impl QueueUsage {
    pub fn percent(&self) -> f64 {
        if self.capacity == 0 {
            return 0.0;
        }
        self.used as f64 / self.capacity as f64 * 100.0
    }
}

/// Mute toggle shared with push-to-talk style controllers.
#[derive(Debug, Clone)]
pub struct MuteHandle {
    muted: Arc<AtomicBool>,
}

impl MuteHandle {
    pub fn mute(&self) {
        if !self.muted.swap(true, Ordering::AcqRel) {
            tracing::debug!("Audio input muted");
        }
    }

    pub fn unmute(&self) {
        if self.muted.swap(false, Ordering::AcqRel) {
            tracing::debug!("Audio input unmuted");
        }
    }

    pub fn toggle(&self) -> bool {
        let now_muted = !self.muted.fetch_xor(true, Ordering::AcqRel);
        tracing::debug!(muted = now_muted, "Audio input mute toggled");
        now_muted
    }

    pub fn is_muted(&self) -> bool {
        self.muted.load(Ordering::Acquire)
    }
}

/// Producer half held by the capture callback.
#[derive(Debug, Clone)]
pub struct CaptureProducer {
    tx: mpsc::Sender<AudioChunk>,
    mute: MuteHandle,
    counters: Arc<CaptureCounters>,
    frame_samples: usize,
}

/// Consumer half attached to the duplex session.
#[derive(Debug)]
pub struct CaptureStream {
    rx: mpsc::Receiver<AudioChunk>,
    frame_samples: usize,
}

/// Create a bounded capture queue.
///
/// `capacity` is clamped to at least one frame.
pub fn capture_channel(capacity: usize, frame_samples: usize) -> (CaptureProducer, CaptureStream) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        CaptureProducer {
            tx,
            mute: MuteHandle {
                muted: Arc::new(AtomicBool::new(false)),
            },
            counters: Arc::new(CaptureCounters::default()),
            frame_samples,
        },
        CaptureStream { rx, frame_samples },
    )
}

impl CaptureProducer {
    /// Push one captured frame without blocking.
    pub fn push_frame(&self, samples: &[i16]) -> PushOutcome {
        self.push_chunk(AudioChunk::from_samples(samples))
    }

    /// Push an already-built chunk without blocking.
    pub fn push_chunk(&self, chunk: AudioChunk) -> PushOutcome {
        if self.mute.is_muted() {
            self.counters.muted.fetch_add(1, Ordering::Relaxed);
            return PushOutcome::Muted;
        }

        if chunk.len() != self.frame_samples {
            tracing::trace!(
                expected = self.frame_samples,
                actual = chunk.len(),
                "Capture frame size differs from configured frame size"
            );
        }

        match self.tx.try_send(chunk) {
            Ok(()) => {
                self.counters.queued.fetch_add(1, Ordering::Relaxed);
                PushOutcome::Queued
            }
            Err(TrySendError::Full(_)) => {
                let dropped = self.counters.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                if dropped == 1 || dropped % OVERRUN_LOG_EVERY == 0 {
                    tracing::warn!(
                        dropped,
                        capacity = self.tx.max_capacity(),
                        "Capture queue full, dropping newest frame"
                    );
                }
                PushOutcome::Dropped
            }
            Err(TrySendError::Closed(_)) => PushOutcome::Closed,
        }
    }

    /// Push a chunk, waiting for queue room instead of dropping.
    ///
    /// For sources that are not real time, such as a file being replayed.
    pub async fn push_chunk_wait(&self, chunk: AudioChunk) -> PushOutcome {
        if self.mute.is_muted() {
            self.counters.muted.fetch_add(1, Ordering::Relaxed);
            return PushOutcome::Muted;
        }

        match self.tx.send(chunk).await {
            Ok(()) => {
                self.counters.queued.fetch_add(1, Ordering::Relaxed);
                PushOutcome::Queued
            }
            Err(_) => PushOutcome::Closed,
        }
    }

    /// Handle for muting this capture source from elsewhere.
    pub fn mute_handle(&self) -> MuteHandle {
        self.mute.clone()
    }

    pub fn mute(&self) {
        self.mute.mute();
    }

    pub fn unmute(&self) {
        self.mute.unmute();
    }

    pub fn is_muted(&self) -> bool {
        self.mute.is_muted()
    }

    /// Whether the session side has stopped receiving.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    pub fn frame_samples(&self) -> usize {
        self.frame_samples
    }

    pub fn usage(&self) -> QueueUsage {
        let capacity = self.tx.max_capacity();
        QueueUsage {
            used: capacity - self.tx.capacity(),
            capacity,
        }
    }

    pub fn stats(&self) -> CaptureStats {
        CaptureStats {
            frames_queued: self.counters.queued.load(Ordering::Relaxed),
            frames_muted: self.counters.muted.load(Ordering::Relaxed),
            frames_dropped: self.counters.dropped.load(Ordering::Relaxed),
        }
    }
}

impl CaptureStream {
    /// Wait for the next frame; `None` once every producer is dropped and the
    /// queue is drained.
    pub async fn recv(&mut self) -> Option<AudioChunk> {
        self.rx.recv().await
    }

    pub fn frame_samples(&self) -> usize {
        self.frame_samples
    }

    /// Stop accepting new frames; already-queued frames can still be received.
    pub fn close(&mut self) {
        self.rx.close();
    }
}

/// Periodically log capture queue usage until the stream side closes.
pub fn spawn_usage_monitor(producer: CaptureProducer, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if producer.is_closed() {
                break;
            }
            let usage = producer.usage();
            let percent = usage.percent();
            if percent > 80.0 {
                tracing::warn!(
                    used = usage.used,
                    capacity = usage.capacity,
                    "Capture queue nearly full: {:.1}%",
                    percent
                );
            } else {
                tracing::debug!(
                    used = usage.used,
                    capacity = usage.capacity,
                    "Capture queue usage: {:.1}%",
                    percent
                );
            }
        }
    })
}
