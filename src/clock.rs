//! Monotonic frame clock

use std::time::Instant;

/// Elapsed/delta time for one frame, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSample {
    /// Seconds since the clock was created.
    pub elapsed: f32,
    /// Seconds since the previous `update` call.
    pub delta: f32,
}

/// Monotonic time source, polled once per frame by the frame loop.
pub struct Clock {
    start: Instant,
    prev: Instant,
    elapsed: f32,
    delta: f32,
}

impl Clock {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            prev: now,
            elapsed: 0.0,
            delta: 0.0,
        }
    }

    /// Sample the clock. Call exactly once per frame.
    pub fn update(&mut self) -> TimeSample {
        let now = Instant::now();
        self.elapsed = now.duration_since(self.start).as_secs_f32();
        self.delta = now.duration_since(self.prev).as_secs_f32();
        self.prev = now;
        TimeSample {
            elapsed: self.elapsed,
            delta: self.delta,
        }
    }

    /// Last sampled elapsed time in seconds.
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Last sampled delta time in seconds.
    pub fn delta(&self) -> f32 {
        self.delta
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_zero() {
        let clock = Clock::new();
        assert_eq!(clock.elapsed(), 0.0);
        assert_eq!(clock.delta(), 0.0);
    }

    #[test]
    fn elapsed_is_monotone() {
        let mut clock = Clock::new();
        let a = clock.update();
        let b = clock.update();
        assert!(b.elapsed >= a.elapsed);
    }

    #[test]
    fn delta_is_non_negative() {
        let mut clock = Clock::new();
        for _ in 0..10 {
            let sample = clock.update();
            assert!(sample.delta >= 0.0);
        }
    }

    #[test]
    fn delta_never_exceeds_elapsed() {
        let mut clock = Clock::new();
        let sample = clock.update();
        assert!(sample.delta <= sample.elapsed);
    }
}
