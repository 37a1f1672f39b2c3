//! Microphone capture controller.

use tokio::sync::mpsc;
use tracing::warn;

use crate::device::CaptureDevice;
use crate::error::{AudioError, Result};
use crate::format::Format;
use crate::frame::AudioFrame;

/// Owns the capture device and its running/stopped state.
///
/// Frames are delivered on the channel passed to [`Recorder::start`] at
/// whatever cadence the device produces them.
pub struct Recorder {
    device: Box<dyn CaptureDevice>,
    format: Format,
    capturing: bool,
    closed: bool,
}

impl Recorder {
    /// Creates a recorder over the given device at the capture format
    /// (16 kHz mono).
    pub fn new(device: Box<dyn CaptureDevice>) -> Self {
        Self {
            device,
            format: Format::CAPTURE,
            capturing: false,
            closed: false,
        }
    }

    /// Starts frame production into `frame_tx`.
    ///
    /// Calling while already capturing is a no-op with a logged warning.
    /// Device acquisition failures propagate to the caller.
    pub fn start(&mut self, frame_tx: mpsc::Sender<AudioFrame>) -> Result<()> {
        if self.closed {
            return Err(AudioError::AlreadyClosed);
        }
        if self.capturing {
            warn!("capture already running, ignoring start");
            return Ok(());
        }
        self.device.start(self.format, frame_tx)?;
        self.capturing = true;
        Ok(())
    }

    /// Halts frame production and releases the device. Safe to call when
    /// not capturing.
    pub fn stop(&mut self) {
        if self.capturing {
            self.device.stop();
            self.capturing = false;
        }
    }

    /// Returns true while frames are being produced.
    pub fn is_capturing(&self) -> bool {
        self.capturing
    }

    /// Returns the capture format.
    pub fn format(&self) -> Format {
        self.format
    }

    /// Releases the device for good. Subsequent `start` calls error.
    pub fn close(&mut self) {
        self.stop();
        self.closed = true;
    }
}
