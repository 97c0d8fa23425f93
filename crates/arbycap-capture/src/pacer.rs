//! Wall-clock pacing for the frame loop.

use std::time::{Duration, Instant};

const ONE_SECOND: Duration = Duration::from_secs(1);

/// Keeps the loop at a fixed number of frames per second.
///
/// Frame `n` of the current second is due at `base + n/fps`; the base moves
/// forward one second every `fps` frames. A frame that finishes after its
/// deadline, or an fps change, restarts the schedule from the current
/// instant instead of trying to catch up.
#[derive(Debug, Clone)]
pub struct FramePacer {
    fps: u32,
    requested_fps: u32,
    base: Instant,
    frames: u32,
}

impl FramePacer {
    pub fn new(fps: u32, now: Instant) -> Self {
        let fps = fps.max(1);
        Self { fps, requested_fps: fps, base: now, frames: 0 }
    }

    /// Takes effect after the next frame.
    pub fn set_fps(&mut self, fps: u32) {
        self.requested_fps = fps.max(1);
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    /// Call once per produced frame. Returns how long to sleep before
    /// producing the next one, or `None` to go straight on.
    pub fn delay_after_frame(&mut self, now: Instant) -> Option<Duration> {
        self.frames += 1;
        if self.frames >= self.fps {
            self.base += ONE_SECOND;
            self.frames = 0;
        }

        let target = self.base + ONE_SECOND * self.frames / self.fps;
        if self.requested_fps == self.fps && now < target {
            Some(target - now)
        } else {
            self.fps = self.requested_fps;
            self.base = now;
            self.frames = 0;
            None
        }
    }
}

// ── FpsCounter ────────────────────────────────────────────────────────────────

/// Rolling ~1 second FPS counter.
pub struct FpsCounter {
    count: u32,
    window_start: Instant,
    last_fps: f32,
}

impl FpsCounter {
    pub fn new() -> Self {
        Self { count: 0, window_start: Instant::now(), last_fps: 0.0 }
    }

    pub fn tick(&mut self) {
        self.count += 1;
    }

    /// Returns the FPS over the last window; resets the counter once at
    /// least half a second has passed.
    pub fn fps(&mut self) -> f32 {
        let elapsed = self.window_start.elapsed().as_secs_f32();
        if elapsed >= 0.5 {
            self.last_fps = self.count as f32 / elapsed;
            self.count = 0;
            self.window_start = Instant::now();
        }
        self.last_fps
    }
}

impl Default for FpsCounter {
    fn default() -> Self {
        Self::new()
    }
}
