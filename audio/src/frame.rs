//! Audio frame type and PCM sample conversion.

use std::time::Duration;

use crate::error::{AudioError, Result};
use crate::format::Format;

/// Normalization divisor for 16-bit samples.
const SCALE: f32 = 32768.0;

/// A bounded chunk of little-endian 16-bit mono PCM samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFrame {
    format: Format,
    data: Vec<u8>,
}

impl AudioFrame {
    /// Creates a frame from raw little-endian PCM bytes.
    pub fn new(format: Format, data: Vec<u8>) -> Self {
        Self { format, data }
    }

    /// Creates a frame from i16 samples.
    pub fn from_samples(format: Format, samples: &[i16]) -> Self {
        let mut data = Vec::with_capacity(samples.len() * 2);
        for sample in samples {
            data.extend_from_slice(&sample.to_le_bytes());
        }
        Self { format, data }
    }

    /// Creates a frame from normalized f32 samples, clamping to the
    /// 16-bit range. Values at or beyond ±1.0 saturate at ±32767.
    pub fn from_f32(format: Format, samples: &[f32]) -> Self {
        let mut data = Vec::with_capacity(samples.len() * 2);
        for &s in samples {
            let scaled = (s * SCALE).clamp(-32767.0, 32767.0) as i16;
            data.extend_from_slice(&scaled.to_le_bytes());
        }
        Self { format, data }
    }

    /// Returns the format of this frame.
    pub fn format(&self) -> Format {
        self.format
    }

    /// Returns the raw PCM bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consumes the frame and returns the raw PCM bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Returns the length of the PCM data in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the frame carries no samples.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the audio duration of this frame.
    pub fn duration(&self) -> Duration {
        self.format.duration(self.data.len() as u64)
    }

    /// Returns the samples as i16 values.
    pub fn samples(&self) -> Vec<i16> {
        self.data
            .chunks_exact(2)
            .map(|bytes| i16::from_le_bytes([bytes[0], bytes[1]]))
            .collect()
    }

    /// Decodes the PCM bytes into normalized f32 samples in [-1, 1].
    ///
    /// Fails if the byte length is not a whole number of 16-bit samples.
    pub fn to_f32(&self) -> Result<Vec<f32>> {
        if self.data.len() % 2 != 0 {
            return Err(AudioError::MalformedFrame(format!(
                "odd byte length {}",
                self.data.len()
            )));
        }
        Ok(self
            .data
            .chunks_exact(2)
            .map(|bytes| i16::from_le_bytes([bytes[0], bytes[1]]) as f32 / SCALE)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_samples_round_trip() {
        let samples = vec![0i16, 1000, -1000, i16::MAX, i16::MIN];
        let frame = AudioFrame::from_samples(Format::PLAYBACK, &samples);
        assert_eq!(frame.len(), 10);
        assert_eq!(frame.samples(), samples);
    }

    #[test]
    fn test_to_f32_normalization() {
        // Every decoded value must land within 1/32768 of s/32768.
        let samples = vec![0i16, 1, -1, 16384, -16384, 32767, -32768];
        let frame = AudioFrame::from_samples(Format::PLAYBACK, &samples);
        let decoded = frame.to_f32().unwrap();
        for (s, f) in samples.iter().zip(decoded.iter()) {
            let expected = *s as f32 / 32768.0;
            assert!((f - expected).abs() <= 1.0 / 32768.0, "sample {s}: {f}");
        }
    }

    #[test]
    fn test_f32_encode_clamps() {
        let frame = AudioFrame::from_f32(Format::PLAYBACK, &[2.0, -2.0, 0.5]);
        let samples = frame.samples();
        assert_eq!(samples[0], 32767);
        assert_eq!(samples[1], -32767);
        assert_eq!(samples[2], 16384);
    }

    #[test]
    fn test_pcm_round_trip_within_tolerance() {
        // decode(encode(frame)) reproduces sample values exactly,
        // bar saturation at the ±32767 boundary.
        let samples: Vec<i16> = (-32767..=32767).step_by(977).collect();
        let frame = AudioFrame::from_samples(Format::CAPTURE, &samples);
        let floats = frame.to_f32().unwrap();
        let back = AudioFrame::from_f32(Format::CAPTURE, &floats);
        assert_eq!(back.samples(), samples);
    }

    #[test]
    fn test_odd_length_is_malformed() {
        let frame = AudioFrame::new(Format::PLAYBACK, vec![0u8, 1, 2]);
        assert!(matches!(
            frame.to_f32(),
            Err(AudioError::MalformedFrame(_))
        ));
    }

    #[test]
    fn test_duration() {
        let frame = AudioFrame::new(Format::PLAYBACK, vec![0u8; 4800]);
        assert_eq!(frame.duration(), Duration::from_millis(100));
    }
}
