//! PCM audio format definitions.

use std::time::Duration;

/// Describes a linear PCM format: 16-bit signed little-endian, mono.
///
/// The session uses two fixed formats that must not be confused:
/// microphone capture runs at 16 kHz and remote playback at 24 kHz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Format {
    /// Sample rate in Hz.
    pub sample_rate: u32,
}

impl Format {
    /// Creates a mono 16-bit format with the given sample rate.
    pub const fn mono(sample_rate: u32) -> Self {
        Self { sample_rate }
    }

    /// Microphone capture format (16 kHz).
    pub const CAPTURE: Format = Format::mono(16000);
    /// Remote playback format (24 kHz).
    pub const PLAYBACK: Format = Format::mono(24000);

    /// Number of channels. Always mono.
    pub fn channels(&self) -> u32 {
        1
    }

    /// Bytes per sample frame (16-bit mono).
    pub fn sample_bytes(&self) -> usize {
        2
    }

    /// Bytes of PCM data per second.
    pub fn bytes_per_second(&self) -> u64 {
        self.sample_rate as u64 * self.sample_bytes() as u64
    }

    /// Number of bytes covering the given duration.
    pub fn bytes_in_duration(&self, d: Duration) -> u64 {
        self.bytes_per_second() * d.as_millis() as u64 / 1000
    }

    /// Duration covered by the given number of bytes.
    pub fn duration(&self, bytes: u64) -> Duration {
        Duration::from_millis(bytes * 1000 / self.bytes_per_second())
    }

    /// Number of samples in the given number of bytes.
    pub fn samples(&self, bytes: u64) -> u64 {
        bytes / self.sample_bytes() as u64
    }
}
