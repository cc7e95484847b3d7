//! File-backed stand-ins for the audio devices.
//!
//! [`spawn_file_capture`] feeds a WAV clip into a capture queue frame by frame,
//! optionally at real-time pace like a microphone callback would.
//! [`PlaybackClock`] pulls fixed-size blocks from a [`PlaybackSink`] on a
//! steady tick like a speaker callback would, and can record what it plays.

use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::capture::{CaptureProducer, CaptureStats, PushOutcome};
use super::playback::PlaybackSink;
use super::wav::{WavClip, WavError, WavRecorder};

/// Wall-clock length of `samples` at `sample_rate`.
pub fn frame_duration(samples: usize, sample_rate: u32) -> Duration {
    Duration::from_secs_f64(samples as f64 / sample_rate.max(1) as f64)
}

/// Push every frame of `clip` into `producer`, then drop it to close the queue.
///
/// With `paced` set, frames are pushed at the clip's sample rate; otherwise as
/// fast as the queue accepts them, yielding when it is full instead of
/// dropping.
pub fn spawn_file_capture(clip: WavClip, producer: CaptureProducer, paced: bool) -> JoinHandle<CaptureStats> {
    tokio::spawn(async move {
        let frame_samples = producer.frame_samples();
        let frames = clip.frames(frame_samples);
        let total = frames.len();

        let mut ticker = tokio::time::interval(frame_duration(frame_samples, clip.sample_rate));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);

        for frame in frames {
            if paced {
                ticker.tick().await;
                if producer.push_chunk(frame) == PushOutcome::Closed {
                    break;
                }
                continue;
            }

            if producer.push_chunk_wait(frame).await == PushOutcome::Closed {
                break;
            }
        }

        let stats = producer.stats();
        tracing::info!(
            frames = total,
            queued = stats.frames_queued,
            dropped = stats.frames_dropped,
            "Capture file exhausted"
        );
        stats
    })
}

/// Steady-rate consumer of a [`PlaybackSink`].
pub struct PlaybackClock {
    stop_tx: Option<oneshot::Sender<()>>,
    handle: JoinHandle<Result<u64, WavError>>,
}

impl PlaybackClock {
    /// Start pulling `frame_samples` every frame period.
    ///
    /// Real (non-padding) samples are appended to `recorder` when one is given.
    pub fn spawn(
        sink: PlaybackSink,
        frame_samples: usize,
        sample_rate: u32,
        mut recorder: Option<WavRecorder>,
    ) -> Self {
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let frame_samples = frame_samples.max(1);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(frame_duration(frame_samples, sample_rate));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut block = vec![0i16; frame_samples];
            let mut played: u64 = 0;

            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {
                        let real = sink.fill(&mut block);
                        played += real as u64;
                        if let Some(recorder) = recorder.as_mut()
                            && real > 0
                        {
                            recorder.write_samples(&block[..real])?;
                        }
                    }
                }
            }

            if let Some(recorder) = recorder {
                recorder.finalize()?;
            }
            Ok(played)
        });

        Self {
            stop_tx: Some(stop_tx),
            handle,
        }
    }

    /// Stop the clock, finalize the recording, and return the number of real
    /// samples played.
    pub async fn stop(mut self) -> Result<u64, WavError> {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        match (&mut self.handle).await {
            Ok(result) => result,
            Err(e) => Err(WavError::TaskFailed(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::audio::capture_channel;
    use std::sync::Arc;
    use tempfile::TempDir;

    use crate::core::audio::{RingBuffer, read_wav};

    #[test]
    fn test_frame_duration() {
        assert_eq!(frame_duration(480, 24000), Duration::from_millis(20));
        assert_eq!(frame_duration(1920, 24000), Duration::from_millis(80));
    }

    #[tokio::test]
    async fn test_file_capture_unpaced_delivers_all_frames() {
        let clip = WavClip {
            sample_rate: 24000,
            samples: (1..=10).collect(),
        };
        let (producer, mut stream) = capture_channel(2, 4);
        let handle = spawn_file_capture(clip, producer, false);

        let mut received = Vec::new();
        while let Some(chunk) = stream.recv().await {
            received.extend_from_slice(chunk.samples());
        }
        let stats = handle.await.unwrap();

        assert_eq!(received, vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 0, 0]);
        assert_eq!(stats.frames_queued, 3);
        assert_eq!(stats.frames_dropped, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_file_capture_paced() {
        let clip = WavClip {
            sample_rate: 100,
            samples: vec![7; 30],
        };
        let (producer, mut stream) = capture_channel(8, 10);
        let start = tokio::time::Instant::now();
        let handle = spawn_file_capture(clip, producer, true);

        let mut frames = 0;
        while stream.recv().await.is_some() {
            frames += 1;
        }
        handle.await.unwrap();

        assert_eq!(frames, 3);
        // First tick is immediate, then one per 100ms frame
        assert!(start.elapsed() >= Duration::from_millis(200));
    }

    #[tokio::test]
    async fn test_playback_clock_reports_aborted_task() {
        let clock = PlaybackClock::spawn(PlaybackSink::with_capacity(8), 4, 24000, None);
        clock.handle.abort();

        assert!(matches!(clock.stop().await, Err(WavError::TaskFailed(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_playback_clock_records_real_samples() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("played.wav");

        let ring = Arc::new(RingBuffer::new(64));
        ring.write(&[1, 2, 3, 4, 5]);
        let sink = PlaybackSink::from_ring(ring);

        let recorder = WavRecorder::create(&path, 24000).unwrap();
        let clock = PlaybackClock::spawn(sink, 4, 24000, Some(recorder));

        tokio::time::sleep(Duration::from_millis(10)).await;
        let played = clock.stop().await.unwrap();

        assert_eq!(played, 5);
        assert_eq!(read_wav(&path).unwrap().samples, vec![1, 2, 3, 4, 5]);
    }
}
