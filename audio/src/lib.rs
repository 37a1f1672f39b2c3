//! Audio plumbing for the voice session.
//!
//! This crate owns the two fixed PCM paths of a session: microphone
//! capture at 16 kHz and remote playback at 24 kHz, both 16-bit mono.
//!
//! - `format` / `frame`: PCM formats, frames, and sample conversion
//! - `device`: the trait seam a platform audio backend implements
//! - `capture`: the [`Recorder`] controller over a capture device
//! - `playback`: the [`Player`] FIFO queue with gain and mute
//!
//! # Example
//!
//! ```rust
//! use mkedev_audio::{AudioFrame, Format, MemoryPlayback, Player};
//!
//! let device = MemoryPlayback::new();
//! let player = Player::new(Box::new(device.clone()));
//! let frame = AudioFrame::from_samples(Format::PLAYBACK, &[1000, -1000]);
//! player.enqueue(&frame).unwrap();
//! ```

pub mod capture;
pub mod device;
pub mod error;
pub mod format;
pub mod frame;
pub mod playback;

pub use capture::Recorder;
pub use device::{CaptureDevice, MemoryPlayback, NullPlayback, PlaybackDevice, SilenceCapture};
pub use error::{AudioError, Result};
pub use format::Format;
pub use frame::AudioFrame;
pub use playback::Player;
