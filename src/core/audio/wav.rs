//! WAV file helpers for debug recording and file-driven capture.
//!
//! Only 16-bit integer mono PCM is accepted; no format conversion is done.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use thiserror::Error;

use super::pcm::AudioChunk;

#[derive(Debug, Error)]
pub enum WavError {
    #[error("WAV I/O error: {0}")]
    Hound(#[from] hound::Error),

    #[error("Unsupported WAV format: {0}")]
    UnsupportedFormat(String),

    /// The task writing the recording panicked or was cancelled
    #[error("Recording task failed: {0}")]
    TaskFailed(String),
}

fn pcm16_mono_spec(sample_rate: u32) -> hound::WavSpec {
    hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    }
}

/// Streams PCM16 samples into a WAV file, keeping the header up to date on
/// [`finalize`](WavRecorder::finalize).
pub struct WavRecorder {
    writer: hound::WavWriter<BufWriter<File>>,
    samples_written: u64,
}

impl WavRecorder {
    /// Create (or truncate) a WAV file.
    pub fn create(path: impl AsRef<Path>, sample_rate: u32) -> Result<Self, WavError> {
        let writer = hound::WavWriter::create(path, pcm16_mono_spec(sample_rate))?;
        Ok(Self {
            writer,
            samples_written: 0,
        })
    }

    /// Append to an existing PCM16 mono file, creating it when missing.
    pub fn append_or_create(path: impl AsRef<Path>, sample_rate: u32) -> Result<Self, WavError> {
        let path = path.as_ref();
        if !path.exists() {
            return Self::create(path, sample_rate);
        }

        let writer = hound::WavWriter::append(path)?;
        let spec = writer.spec();
        if spec != pcm16_mono_spec(spec.sample_rate) {
            return Err(WavError::UnsupportedFormat(format!(
                "{} channel(s), {} bits, {:?}",
                spec.channels, spec.bits_per_sample, spec.sample_format
            )));
        }
        if spec.sample_rate != sample_rate {
            tracing::warn!(
                existing = spec.sample_rate,
                requested = sample_rate,
                "Appending to WAV file with a different sample rate"
            );
        }
        Ok(Self {
            writer,
            samples_written: 0,
        })
    }

    pub fn write_samples(&mut self, samples: &[i16]) -> Result<(), WavError> {
        for &sample in samples {
            self.writer.write_sample(sample)?;
        }
        self.samples_written += samples.len() as u64;
        Ok(())
    }

    pub fn samples_written(&self) -> u64 {
        self.samples_written
    }

    /// Flush data and rewrite the header lengths.
    pub fn finalize(self) -> Result<(), WavError> {
        self.writer.finalize()?;
        Ok(())
    }
}

/// A decoded PCM16 mono WAV file.
#[derive(Debug, Clone)]
pub struct WavClip {
    pub sample_rate: u32,
    pub samples: Vec<i16>,
}

impl WavClip {
    /// Split into fixed-size frames; the last frame is zero-padded.
    pub fn frames(&self, frame_samples: usize) -> Vec<AudioChunk> {
        let frame_samples = frame_samples.max(1);
        self.samples
            .chunks(frame_samples)
            .map(|frame| {
                let mut owned = frame.to_vec();
                owned.resize(frame_samples, 0);
                AudioChunk::new(owned)
            })
            .collect()
    }
}

/// Read a PCM16 mono WAV file.
pub fn read_wav(path: impl AsRef<Path>) -> Result<WavClip, WavError> {
    let reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    if spec.channels != 1
        || spec.bits_per_sample != 16
        || spec.sample_format != hound::SampleFormat::Int
    {
        return Err(WavError::UnsupportedFormat(format!(
            "expected 16-bit mono PCM, got {} channel(s), {} bits, {:?}",
            spec.channels, spec.bits_per_sample, spec.sample_format
        )));
    }

    let samples = reader
        .into_samples::<i16>()
        .collect::<Result<Vec<_>, _>>()?;

    Ok(WavClip {
        sample_rate: spec.sample_rate,
        samples,
    })
}
