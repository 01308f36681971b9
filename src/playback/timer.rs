use std::time::{Duration, Instant};

/// Slowest playback rate accepted; the frame period never exceeds `1 / MIN_FPS` seconds.
pub const MIN_FPS: f64 = 1e-3;

/// Frames between two [`crate::PlaybackEvent::FpsChanged`] notifications.
pub const FPS_REFRESH_FRAMES: u64 = 10;

/// Paces playback to a desired frame rate and measures the rate actually achieved.
#[derive(Debug)]
pub struct FrameTimer {
    desired_fps: f64,
    last_frame: Option<Instant>,
    window_start: Instant,
    frames: u64,
}

impl FrameTimer {
    pub fn new(desired_fps: f64) -> Self {
        Self {
            desired_fps,
            last_frame: None,
            window_start: Instant::now(),
            frames: 0,
        }
    }

    pub fn desired_fps(&self) -> f64 {
        self.desired_fps
    }

    pub fn set_desired_fps(&mut self, fps: f64) {
        self.desired_fps = fps;
    }

    pub fn frame_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.desired_fps.max(MIN_FPS))
    }

    /// Sleep until one frame period after the previous frame, then count this frame.
    ///
    /// Returns the measured rate every [`FPS_REFRESH_FRAMES`] frames.
    pub fn wait_until_next_frame_is_due(&mut self) -> Option<f64> {
        let now = Instant::now();
        if let Some(last) = self.last_frame {
            let due = last + self.frame_period();
            if due > now {
                std::thread::sleep(due - now);
            }
        }
        let now = Instant::now();
        self.last_frame = Some(now);
        self.frames += 1;
        if !self.frames.is_multiple_of(FPS_REFRESH_FRAMES) {
            return None;
        }
        let elapsed = now.duration_since(self.window_start).as_secs_f64();
        self.window_start = now;
        Some(if elapsed > 0.0 {
            FPS_REFRESH_FRAMES as f64 / elapsed
        } else {
            self.desired_fps
        })
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

#[cfg(test)]
#[path = "../../tests/unit/playback/timer.rs"]
mod tests;
