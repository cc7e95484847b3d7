//! Fixed-capacity circular buffer for playback audio.
//!
//! The inbound event loop writes assistant audio in arrival order and the audio
//! sink reads fixed-size blocks on its own clock. Writes never block: when the
//! buffer is full the oldest unread samples are overwritten. Reads never block
//! either: missing samples are padded with silence so the sink always receives a
//! full block.
//!
//! One writer and one reader may use the buffer concurrently. A single
//! `parking_lot::Mutex` guards the cursors and is held only for the index
//! arithmetic and the copy.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

#[derive(Debug)]
struct RingState {
    buffer: Box<[i16]>,
    /// Index of the oldest unread sample
    read: usize,
    /// Number of unread samples
    len: usize,
}

/// Bounded drop-oldest sample buffer.
#[derive(Debug)]
pub struct RingBuffer {
    state: Mutex<RingState>,
    capacity: usize,
    samples_written: AtomicU64,
    samples_read: AtomicU64,
    samples_overwritten: AtomicU64,
    underruns: AtomicU64,
}

/// Counters describing ring buffer activity since creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RingBufferStats {
    pub samples_written: u64,
    pub samples_read: u64,
    pub samples_overwritten: u64,
    /// Reads that had to be padded with silence
    pub underruns: u64,
    pub current_len: usize,
    pub capacity: usize,
}

impl RingBuffer {
    /// Create a buffer holding at most `capacity` samples.
    ///
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            state: Mutex::new(RingState {
                buffer: vec![0i16; capacity].into_boxed_slice(),
                read: 0,
                len: 0,
            }),
            capacity,
            samples_written: AtomicU64::new(0),
            samples_read: AtomicU64::new(0),
            samples_overwritten: AtomicU64::new(0),
            underruns: AtomicU64::new(0),
        }
    }

    /// Append samples, evicting the oldest unread samples on overflow.
    ///
    /// Returns the number of samples that were discarded to make room.
    pub fn write(&self, samples: &[i16]) -> usize {
        if samples.is_empty() {
            return 0;
        }

        let cap = self.capacity;
        let mut dropped = 0;

        // Only the newest `cap` samples can ever be observed by the reader.
        let src = if samples.len() > cap {
            dropped += samples.len() - cap;
            &samples[samples.len() - cap..]
        } else {
            samples
        };

        {
            let mut state = self.state.lock();

            let free = cap - state.len;
            if src.len() > free {
                let evict = src.len() - free;
                state.read = (state.read + evict) % cap;
                state.len -= evict;
                dropped += evict;
            }

            let start = (state.read + state.len) % cap;
            let first = src.len().min(cap - start);
            state.buffer[start..start + first].copy_from_slice(&src[..first]);
            let rest = src.len() - first;
            if rest > 0 {
                state.buffer[..rest].copy_from_slice(&src[first..]);
            }
            state.len += src.len();
        }

        self.samples_written
            .fetch_add(samples.len() as u64, Ordering::Relaxed);
        if dropped > 0 {
            self.samples_overwritten
                .fetch_add(dropped as u64, Ordering::Relaxed);
        }
        dropped
    }

    /// Fill `out` from the read cursor, padding with silence.
    ///
    /// Returns how many real samples were copied; the remainder of `out` is zeroed.
    pub fn read_into(&self, out: &mut [i16]) -> usize {
        let copied = {
            let mut state = self.state.lock();
            let cap = self.capacity;
            let n = out.len().min(state.len);

            let read = state.read;
            let first = n.min(cap - read);
            out[..first].copy_from_slice(&state.buffer[read..read + first]);
            let rest = n - first;
            if rest > 0 {
                out[first..n].copy_from_slice(&state.buffer[..rest]);
            }

            state.read = (read + n) % cap;
            state.len -= n;
            n
        };

        out[copied..].fill(0);

        self.samples_read.fetch_add(copied as u64, Ordering::Relaxed);
        if copied < out.len() {
            self.underruns.fetch_add(1, Ordering::Relaxed);
        }
        copied
    }

    /// Read exactly `count` samples, zero-padded when fewer are buffered.
    pub fn read(&self, count: usize) -> Vec<i16> {
        let mut out = vec![0i16; count];
        self.read_into(&mut out);
        out
    }

    /// Number of unread samples.
    pub fn len(&self) -> usize {
        self.state.lock().len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of samples held.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Discard all unread samples.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.read = 0;
        state.len = 0;
    }

    /// Snapshot the activity counters.
    pub fn stats(&self) -> RingBufferStats {
        RingBufferStats {
            samples_written: self.samples_written.load(Ordering::Relaxed),
            samples_read: self.samples_read.load(Ordering::Relaxed),
            samples_overwritten: self.samples_overwritten.load(Ordering::Relaxed),
            underruns: self.underruns.load(Ordering::Relaxed),
            current_len: self.len(),
            capacity: self.capacity,
        }
    }
}
