//! Fixed timestep tick scheduling.
//!
//! Frame deltas of any size are turned into a whole number of fixed-size
//! simulation ticks, so every participant steps with the same `dt`.

use std::time::{Duration, Instant};

/// Maximum ticks run for a single frame.
const MAX_CATCH_UP: u32 = 10;

/// Largest frame delta accepted, in seconds.
const MAX_FRAME_DT: f32 = 0.25;

/// Accumulator that converts frame time into fixed ticks.
#[derive(Debug)]
pub struct FixedTimestep {
    /// Seconds per tick
    fixed_dt: f32,
    /// Unconsumed frame time
    accumulator: f32,
    /// Time of last frame start
    last_frame: Instant,
}

impl FixedTimestep {
    /// Creates a timestep running `tick_rate` ticks per second.
    #[must_use]
    pub fn new(tick_rate: u32) -> Self {
        Self {
            fixed_dt: 1.0 / tick_rate.max(1) as f32,
            accumulator: 0.0,
            last_frame: Instant::now(),
        }
    }

    /// Seconds per tick.
    #[must_use]
    pub const fn fixed_dt(&self) -> f32 {
        self.fixed_dt
    }

    /// Wall-clock duration of one tick.
    #[must_use]
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f32(self.fixed_dt)
    }

    /// Measures the time since the last frame, clamped to prevent a spiral
    /// of death after a stall.
    pub fn frame_delta(&mut self) -> f32 {
        let now = Instant::now();
        let dt = (now - self.last_frame).as_secs_f32();
        self.last_frame = now;
        dt.min(MAX_FRAME_DT)
    }

    /// Adds frame time and returns how many ticks to run now.
    pub fn accumulate(&mut self, dt: f32) -> u32 {
        self.accumulator += dt.max(0.0);
        let mut count = 0;

        while self.accumulator >= self.fixed_dt && count < MAX_CATCH_UP {
            self.accumulator -= self.fixed_dt;
            count += 1;
        }

        // Still behind after catching up: drop the backlog.
        if self.accumulator > self.fixed_dt * 2.0 {
            self.accumulator = 0.0;
        }

        count
    }

    /// Sleeps until one tick has passed since the last frame started.
    pub fn sleep_remainder(&self) {
        let budget = self.tick_duration();
        let elapsed = self.last_frame.elapsed();
        if elapsed < budget {
            std::thread::sleep(budget - elapsed);
        }
    }

    /// Reset timing (call after a pause).
    pub fn reset(&mut self) {
        self.last_frame = Instant::now();
        self.accumulator = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_ticks_only() {
        let mut timestep = FixedTimestep::new(10);
        assert_eq!(timestep.accumulate(0.05), 0);
        assert_eq!(timestep.accumulate(0.06), 1);
        assert_eq!(timestep.accumulate(0.05), 0);
    }

    #[test]
    fn test_catch_up_is_bounded() {
        let mut timestep = FixedTimestep::new(60);
        assert_eq!(timestep.accumulate(5.0), MAX_CATCH_UP);
        // Backlog was dropped.
        assert_eq!(timestep.accumulate(0.0), 0);
    }

    #[test]
    fn test_negative_delta_is_ignored() {
        let mut timestep = FixedTimestep::new(60);
        assert_eq!(timestep.accumulate(-1.0), 0);
        assert_eq!(timestep.accumulate(0.01), 0);
    }

    #[test]
    fn test_zero_rate_is_clamped() {
        let timestep = FixedTimestep::new(0);
        assert!((timestep.fixed_dt() - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_reset_clears_accumulator() {
        let mut timestep = FixedTimestep::new(10);
        timestep.accumulate(0.05);
        timestep.reset();
        assert_eq!(timestep.accumulate(0.06), 0);
    }
}
