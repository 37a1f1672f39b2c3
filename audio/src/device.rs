//! Device trait seam between the adapter and platform audio hardware.
//!
//! The controllers in this crate own queueing, ordering, and gain; the
//! traits here are the narrow boundary a platform backend implements.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::format::Format;
use crate::frame::AudioFrame;

/// A microphone-like source of PCM frames.
///
/// `start` begins pushing frames into `frame_tx` at a bounded interval
/// (nominally 100-250 ms of audio per frame) until `stop` is called.
/// Implementations should request echo cancellation and noise
/// suppression where the platform supports them. Acquisition failures
/// surface as `PermissionDenied` or `DeviceUnavailable`.
pub trait CaptureDevice: Send {
    fn start(&mut self, format: Format, frame_tx: mpsc::Sender<AudioFrame>) -> Result<()>;
    fn stop(&mut self);
}

/// A speaker-like sink for decoded PCM samples.
///
/// `render` plays one frame of normalized samples to completion; blocking
/// for the frame duration is the device's business, not the caller's.
pub trait PlaybackDevice: Send {
    fn render(&mut self, samples: &[f32]) -> Result<()>;
}

/// Playback device that discards everything. Used when the host has no
/// audible output (text-mode CLI, headless tests).
#[derive(Debug, Default)]
pub struct NullPlayback;

impl PlaybackDevice for NullPlayback {
    fn render(&mut self, _samples: &[f32]) -> Result<()> {
        Ok(())
    }
}

/// Playback device that records every rendered frame in memory, in order.
#[derive(Debug, Default, Clone)]
pub struct MemoryPlayback {
    rendered: Arc<Mutex<Vec<Vec<f32>>>>,
}

impl MemoryPlayback {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the frames rendered so far, in render order.
    pub fn rendered(&self) -> Vec<Vec<f32>> {
        self.rendered.lock().clone()
    }
}

impl PlaybackDevice for MemoryPlayback {
    fn render(&mut self, samples: &[f32]) -> Result<()> {
        self.rendered.lock().push(samples.to_vec());
        Ok(())
    }
}

/// Capture device that produces silence frames on a timer. Stands in for
/// a real microphone in demos and tests.
#[derive(Debug)]
pub struct SilenceCapture {
    interval: Duration,
    running: Arc<AtomicBool>,
}

impl SilenceCapture {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            running: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl Default for SilenceCapture {
    fn default() -> Self {
        Self::new(Duration::from_millis(100))
    }
}

impl CaptureDevice for SilenceCapture {
    fn start(&mut self, format: Format, frame_tx: mpsc::Sender<AudioFrame>) -> Result<()> {
        self.running.store(true, Ordering::SeqCst);
        let running = self.running.clone();
        let interval = self.interval;
        let bytes = format.bytes_in_duration(interval) as usize;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if !running.load(Ordering::SeqCst) {
                    break;
                }
                let frame = AudioFrame::new(format, vec![0u8; bytes]);
                if frame_tx.send(frame).await.is_err() {
                    break;
                }
            }
        });
        Ok(())
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}
