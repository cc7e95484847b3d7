//! PCM16 sample helpers.
//!
//! All audio handled by this crate is 16-bit signed, mono, little-endian at the
//! wire boundary. [`AudioChunk`] is the immutable unit that moves between the
//! capture queue, the codec and the playback buffer.

use std::sync::Arc;

use thiserror::Error;

/// Number of bytes per PCM16 sample.
pub const BYTES_PER_SAMPLE: usize = 2;

/// Errors raised while interpreting raw PCM16 bytes.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PcmError {
    /// A PCM16 payload must contain an even number of bytes
    #[error("PCM16 payload has odd length {0}")]
    OddLength(usize),
}

/// An immutable, cheaply clonable sequence of PCM16 samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioChunk {
    samples: Arc<[i16]>,
}

impl AudioChunk {
    /// Create a chunk from owned samples.
    pub fn new(samples: Vec<i16>) -> Self {
        Self {
            samples: samples.into(),
        }
    }

    /// Create a chunk by copying a slice of samples.
    pub fn from_samples(samples: &[i16]) -> Self {
        Self {
            samples: Arc::from(samples),
        }
    }

    /// Parse little-endian PCM16 bytes.
    pub fn from_le_bytes(bytes: &[u8]) -> Result<Self, PcmError> {
        Ok(Self::new(le_bytes_to_samples(bytes)?))
    }

    /// Borrow the samples.
    #[inline]
    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    /// Number of samples in the chunk.
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Serialize to little-endian bytes for the wire.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        samples_to_le_bytes(&self.samples)
    }

    /// Duration of the chunk in milliseconds at the given sample rate.
    pub fn duration_ms(&self, sample_rate: u32) -> u64 {
        if sample_rate == 0 {
            return 0;
        }
        (self.samples.len() as u64 * 1000) / sample_rate as u64
    }
}

impl From<Vec<i16>> for AudioChunk {
    fn from(samples: Vec<i16>) -> Self {
        Self::new(samples)
    }
}

/// Convert samples to little-endian bytes.
pub fn samples_to_le_bytes(samples: &[i16]) -> Vec<u8> {
    let mut out = Vec::with_capacity(samples.len() * BYTES_PER_SAMPLE);
    for sample in samples {
        out.extend_from_slice(&sample.to_le_bytes());
    }
    out
}

/// Convert little-endian bytes to samples.
///
/// Fails when the byte count is odd rather than silently truncating the tail.
pub fn le_bytes_to_samples(bytes: &[u8]) -> Result<Vec<i16>, PcmError> {
    if bytes.len() % BYTES_PER_SAMPLE != 0 {
        return Err(PcmError::OddLength(bytes.len()));
    }
    Ok(bytes
        .chunks_exact(BYTES_PER_SAMPLE)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_le_byte_order() {
        let bytes = samples_to_le_bytes(&[0x0102, -1]);
        assert_eq!(bytes, vec![0x02, 0x01, 0xFF, 0xFF]);
        assert_eq!(le_bytes_to_samples(&bytes).unwrap(), vec![0x0102, -1]);
    }

    #[test]
    fn test_odd_length_rejected() {
        assert_eq!(le_bytes_to_samples(&[1, 2, 3]), Err(PcmError::OddLength(3)));
    }

    #[test]
    fn test_chunk_duration() {
        let chunk = AudioChunk::new(vec![0; 1920]);
        assert_eq!(chunk.duration_ms(24000), 80);
        assert_eq!(chunk.duration_ms(0), 0);
    }

    #[test]
    fn test_chunk_from_le_bytes() {
        let chunk = AudioChunk::from_le_bytes(&[0x10, 0x00, 0x00, 0x80]).unwrap();
        assert_eq!(chunk.samples(), &[16, i16::MIN]);
        assert_eq!(chunk.to_le_bytes(), vec![0x10, 0x00, 0x00, 0x80]);
    }
}
