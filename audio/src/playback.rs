//! Queued playback with gain control.
//!
//! Decoded frames sit in a FIFO queue drained by a dedicated thread; the
//! thread applies the gain current at render time and hands each frame to
//! the device in strict enqueue order. Frames received while muted are
//! decoded and queued, and render silently until unmuted.

use std::collections::VecDeque;
use std::sync::Arc;
use std::thread;

use parking_lot::{Condvar, Mutex};
use tracing::warn;

use crate::device::PlaybackDevice;
use crate::error::{AudioError, Result};
use crate::frame::AudioFrame;

struct PlayerState {
    queue: VecDeque<Vec<f32>>,
    volume: f32,
    muted: bool,
    closed: bool,
}

struct Shared {
    state: Mutex<PlayerState>,
    cond: Condvar,
}

/// Playback controller. Owns the playback device and the pending queue.
pub struct Player {
    shared: Arc<Shared>,
    drain: Mutex<Option<thread::JoinHandle<()>>>,
}

impl Player {
    /// Creates a player over the given device and starts the drain thread.
    pub fn new(mut device: Box<dyn PlaybackDevice>) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(PlayerState {
                queue: VecDeque::new(),
                volume: 1.0,
                muted: false,
                closed: false,
            }),
            cond: Condvar::new(),
        });

        let drain_shared = shared.clone();
        let drain = thread::spawn(move || {
            loop {
                let (samples, gain) = {
                    let mut state = drain_shared.state.lock();
                    loop {
                        if state.closed {
                            return;
                        }
                        if let Some(samples) = state.queue.pop_front() {
                            let gain = if state.muted { 0.0 } else { state.volume };
                            break (samples, gain);
                        }
                        drain_shared.cond.wait(&mut state);
                    }
                };
                let scaled: Vec<f32> = samples.iter().map(|s| s * gain).collect();
                if let Err(e) = device.render(&scaled) {
                    warn!("playback device error, frame dropped: {}", e);
                }
            }
        });

        Self {
            shared,
            drain: Mutex::new(Some(drain)),
        }
    }

    /// Decodes a PCM frame and appends it to the playback queue.
    ///
    /// A corrupt frame is logged and skipped; it never halts the queue.
    pub fn enqueue(&self, frame: &AudioFrame) -> Result<()> {
        if self.shared.state.lock().closed {
            return Err(AudioError::AlreadyClosed);
        }
        let samples = match frame.to_f32() {
            Ok(samples) => samples,
            Err(e) => {
                warn!("skipping undecodable playback frame: {}", e);
                return Ok(());
            }
        };
        let mut state = self.shared.state.lock();
        state.queue.push_back(samples);
        self.shared.cond.notify_one();
        Ok(())
    }

    /// Clears the pending queue and halts scheduling. A frame already
    /// handed to the device finishes rendering; nothing else plays.
    /// Does not affect capture.
    pub fn stop(&self) {
        let mut state = self.shared.state.lock();
        state.queue.clear();
    }

    /// Sets the playback volume. Values outside [0, 1] are clamped.
    pub fn set_volume(&self, volume: f32) {
        let mut state = self.shared.state.lock();
        state.volume = volume.clamp(0.0, 1.0);
    }

    /// Returns the current volume.
    pub fn volume(&self) -> f32 {
        self.shared.state.lock().volume
    }

    /// Mutes or unmutes playback. Queued frames keep draining; while
    /// muted they render with gain zero.
    pub fn set_muted(&self, muted: bool) {
        let mut state = self.shared.state.lock();
        state.muted = muted;
    }

    /// Returns true if playback is muted.
    pub fn is_muted(&self) -> bool {
        self.shared.state.lock().muted
    }

    /// Returns the number of frames waiting to render.
    pub fn pending(&self) -> usize {
        self.shared.state.lock().queue.len()
    }

    /// Releases the device and ends the drain thread. Subsequent calls
    /// to other methods error. Idempotent.
    pub fn close(&self) {
        {
            let mut state = self.shared.state.lock();
            if state.closed {
                return;
            }
            state.closed = true;
            state.queue.clear();
            self.shared.cond.notify_all();
        }
        if let Some(handle) = self.drain.lock().take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::MemoryPlayback;
    use crate::format::Format;
    use std::time::{Duration, Instant};

    fn wait_until(deadline: Duration, mut done: impl FnMut() -> bool) -> bool {
        let start = Instant::now();
        while start.elapsed() < deadline {
            if done() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        done()
    }

    fn frame_of(value: i16, len: usize) -> AudioFrame {
        AudioFrame::from_samples(Format::PLAYBACK, &vec![value; len])
    }

    #[test]
    fn test_fifo_order_no_duplicates() {
        let device = MemoryPlayback::new();
        let player = Player::new(Box::new(device.clone()));

        for value in [100i16, 200, 300, 400] {
            player.enqueue(&frame_of(value, 4)).unwrap();
        }
        assert!(wait_until(Duration::from_secs(2), || {
            device.rendered().len() == 4
        }));

        let rendered = device.rendered();
        let firsts: Vec<i32> = rendered
            .iter()
            .map(|f| (f[0] * 32768.0).round() as i32)
            .collect();
        assert_eq!(firsts, vec![100, 200, 300, 400]);
    }

    #[test]
    fn test_muted_frames_render_silent_and_resume() {
        let device = MemoryPlayback::new();
        let player = Player::new(Box::new(device.clone()));

        player.set_muted(true);
        player.enqueue(&frame_of(1000, 4)).unwrap();
        assert!(wait_until(Duration::from_secs(2), || {
            device.rendered().len() == 1
        }));
        assert!(device.rendered()[0].iter().all(|s| *s == 0.0));

        player.set_muted(false);
        player.enqueue(&frame_of(1000, 4)).unwrap();
        assert!(wait_until(Duration::from_secs(2), || {
            device.rendered().len() == 2
        }));
        assert!(device.rendered()[1].iter().all(|s| *s != 0.0));
    }

    #[test]
    fn test_volume_clamped() {
        let player = Player::new(Box::<MemoryPlayback>::default());
        player.set_volume(3.5);
        assert_eq!(player.volume(), 1.0);
        player.set_volume(-1.0);
        assert_eq!(player.volume(), 0.0);
    }

    #[test]
    fn test_corrupt_frame_skipped() {
        let device = MemoryPlayback::new();
        let player = Player::new(Box::new(device.clone()));

        let corrupt = AudioFrame::new(Format::PLAYBACK, vec![1u8, 2, 3]);
        player.enqueue(&corrupt).unwrap();
        player.enqueue(&frame_of(500, 4)).unwrap();

        assert!(wait_until(Duration::from_secs(2), || {
            device.rendered().len() == 1
        }));
        let rendered = device.rendered();
        assert_eq!(rendered.len(), 1);
        assert_eq!((rendered[0][0] * 32768.0).round() as i32, 500);
    }

    #[test]
    fn test_stop_clears_pending() {
        let device = MemoryPlayback::new();
        let player = Player::new(Box::new(device.clone()));

        player.stop();
        assert_eq!(player.pending(), 0);

        player.enqueue(&frame_of(1, 4)).unwrap();
        assert!(wait_until(Duration::from_secs(2), || player.pending() == 0));
    }

    #[test]
    fn test_enqueue_after_close_errors() {
        let player = Player::new(Box::<MemoryPlayback>::default());
        player.close();
        assert!(matches!(
            player.enqueue(&frame_of(1, 4)),
            Err(AudioError::AlreadyClosed)
        ));
    }
}
