//! Tick and fixed-interval timing

use std::time::{Duration, Instant};

use crate::core::error::Error;

/// Wall-clock gate for fixed-frequency stepping.
///
/// A step is due once at least `interval` has elapsed since the previous
/// step. The reported delta is the *actual* elapsed time, not the nominal
/// interval, so a late step carries the full catch-up time.
#[derive(Debug, Clone)]
pub struct StepClock {
    interval: Duration,
    last_step: Instant,
    steps: u64,
}

impl StepClock {
    /// Create a clock stepping at `hz` steps per second
    pub fn from_hz(hz: f32) -> Result<Self, Error> {
        if !hz.is_finite() || hz <= 0.0 {
            return Err(Error::Config(format!("step frequency must be positive, got {}", hz)));
        }
        let micros = (1_000_000.0 / hz as f64).round().max(1.0) as u64;
        Ok(Self::with_interval(Duration::from_micros(micros)))
    }

    /// Create a clock with an explicit interval
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            last_step: Instant::now(),
            steps: 0,
        }
    }

    /// Check whether a step is due now
    pub fn poll(&mut self) -> Option<Duration> {
        self.poll_at(Instant::now())
    }

    /// Check whether a step is due at `now`.
    ///
    /// Returns the elapsed time since the last step and advances the
    /// reference point when it is, `None` otherwise.
    pub fn poll_at(&mut self, now: Instant) -> Option<Duration> {
        let elapsed = now.saturating_duration_since(self.last_step);
        if elapsed >= self.interval {
            self.last_step = now;
            self.steps += 1;
            Some(elapsed)
        } else {
            None
        }
    }

    /// Nominal step interval
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Number of steps taken so far
    pub fn steps(&self) -> u64 {
        self.steps
    }
}

/// Tracks control-loop ticks and reports a tick rate once per second
pub struct TickTimer {
    last_tick: Instant,
    delta: Duration,
    tick_count: u64,
    rate_timer: Instant,
    rate: f32,
    rate_tick_count: u32,
}

impl TickTimer {
    /// Create a new tick timer
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            last_tick: now,
            delta: Duration::ZERO,
            tick_count: 0,
            rate_timer: now,
            rate: 0.0,
            rate_tick_count: 0,
        }
    }

    /// Call once per tick. Returns `true` when the tick rate was refreshed.
    pub fn tick(&mut self) -> bool {
        let now = Instant::now();
        self.delta = now - self.last_tick;
        self.last_tick = now;
        self.tick_count += 1;
        self.rate_tick_count += 1;

        let rate_elapsed = now - self.rate_timer;
        if rate_elapsed >= Duration::from_secs(1) {
            self.rate = self.rate_tick_count as f32 / rate_elapsed.as_secs_f32();
            self.rate_tick_count = 0;
            self.rate_timer = now;
            return true;
        }
        false
    }

    /// Time between the last two ticks in seconds
    pub fn delta_secs(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    /// Ticks per second, updated every second
    pub fn rate(&self) -> f32 {
        self.rate
    }

    /// Total tick count
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }
}

impl Default for TickTimer {
    fn default() -> Self {
        Self::new()
    }
}
