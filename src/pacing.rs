//! Frame-rate measurement
//!
//! Tracks the measured delivery rate as a decayed average of inter-send
//! intervals. The estimator is fed timestamps by the caller, so it reads
//! only the monotonic clock values it is given and behaves the same under
//! test as in production.

use std::time::Instant;

/// Per-sample decay applied to the rolling interval average
const DECAY: f64 = 0.2;

/// Decayed average of intervals between frame sends
///
/// Seeded with the configured rate so the estimate is finite before the
/// first frame; the first real interval replaces the seed outright, after
/// which each sample moves the average by [`DECAY`] of the difference.
/// Converges to the true rate within a few seconds of steady-state
/// sending.
#[derive(Debug)]
pub struct FpsCounter {
    avg_interval: f64,
    prev: Option<Instant>,
    seeded: bool,
}

impl FpsCounter {
    /// Create a counter seeded with an expected rate (frames per second)
    ///
    /// `initial_fps` must be positive; the Camera validates its configured
    /// rate before constructing one.
    pub fn new(initial_fps: f64) -> Self {
        Self {
            avg_interval: 1.0 / initial_fps,
            prev: None,
            seeded: true,
        }
    }

    /// Record one frame send at the given monotonic timestamp
    pub fn tick(&mut self, now: Instant) {
        match self.prev {
            None => self.prev = Some(now),
            Some(prev) => {
                let delta = now.duration_since(prev).as_secs_f64();
                if self.seeded {
                    self.avg_interval = delta;
                    self.seeded = false;
                } else {
                    self.avg_interval += (delta - self.avg_interval) * DECAY;
                }
                self.prev = Some(now);
            }
        }
    }

    /// Current rate estimate in frames per second
    pub fn current_fps(&self) -> f64 {
        if self.avg_interval > 0.0 {
            1.0 / self.avg_interval
        } else {
            0.0
        }
    }
}
