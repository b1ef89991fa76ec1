//! Time management utilities

use std::time::Instant;

/// Wall-clock frame timer feeding [`FrameClock`](crate::reactive::FrameClock) ticks
pub struct Timer {
    last_frame: Instant,
    delta_ms: f32,
    total_ms: f64,
    frame_count: u64,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer {
    /// Create a new timer
    pub fn new() -> Self {
        Self {
            last_frame: Instant::now(),
            delta_ms: 0.0,
            total_ms: 0.0,
            frame_count: 0,
        }
    }

    /// Update the timer (should be called once per frame)
    ///
    /// Returns the milliseconds elapsed since the previous update.
    pub fn update(&mut self) -> f32 {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_frame);
        self.delta_ms = elapsed.as_secs_f32() * 1000.0;
        self.total_ms += f64::from(self.delta_ms);
        self.last_frame = now;
        self.frame_count += 1;
        self.delta_ms
    }

    /// Milliseconds between the last two updates
    pub fn delta_ms(&self) -> f32 {
        self.delta_ms
    }

    /// Total elapsed milliseconds across all updates
    pub fn total_ms(&self) -> f64 {
        self.total_ms
    }

    /// Get the current frame count
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}
