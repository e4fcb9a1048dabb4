#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Simulated clock whose rate follows a user-adjustable time velocity.
//!
//! The clock converts readings from a monotonic real-time source into
//! simulated ticks and owns the timestamps of the two periodic schedules:
//! touching live nodes and rotating the pitch field.

use pulse_field_core::{Tick, ToneShaping};
use pulse_field_system_modulation::tone_shaping;

/// Degrees of crank rotation that change the time velocity by 1.0.
pub const CRANK_DEGREES_PER_VELOCITY: f32 = 720.0;

/// Shelf interpolation factor installed before any velocity change.
pub const INITIAL_TONE_ALPHA: f32 = 0.5;

/// Configuration parameters required to construct the clock.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
    touch_rate: u64,
    pitch_change_rate: u64,
    min_velocity: f32,
    max_velocity: f32,
    initial_velocity: f32,
}

impl Config {
    /// Creates a configuration from schedule periods in ticks and velocity bounds.
    #[must_use]
    pub const fn new(
        touch_rate: u64,
        pitch_change_rate: u64,
        min_velocity: f32,
        max_velocity: f32,
        initial_velocity: f32,
    ) -> Self {
        Self {
            touch_rate,
            pitch_change_rate,
            min_velocity,
            max_velocity,
            initial_velocity,
        }
    }

    /// Ticks between two touch passes.
    #[must_use]
    pub const fn touch_rate(&self) -> u64 {
        self.touch_rate
    }

    /// Ticks between two pitch-field rotations.
    #[must_use]
    pub const fn pitch_change_rate(&self) -> u64 {
        self.pitch_change_rate
    }
}

/// Simulated clock and schedule owner.
#[derive(Clone, Debug)]
pub struct Clock {
    config: Config,
    now: Tick,
    last_real: u64,
    velocity: f32,
    next_touch: Tick,
    next_pitch_change: Tick,
}

impl Clock {
    /// Creates a clock at tick zero anchored to the provided real-time reading.
    #[must_use]
    pub fn new(config: Config, real_start: u64) -> Self {
        Self {
            config,
            now: Tick::ZERO,
            last_real: real_start,
            velocity: config.initial_velocity,
            next_touch: Tick::new(config.touch_rate),
            next_pitch_change: Tick::new(config.pitch_change_rate),
        }
    }

    /// Current simulated time.
    #[must_use]
    pub const fn now(&self) -> Tick {
        self.now
    }

    /// Real-time reading consumed by the most recent advance.
    #[must_use]
    pub const fn last_real(&self) -> u64 {
        self.last_real
    }

    /// Current time velocity.
    #[must_use]
    pub const fn velocity(&self) -> f32 {
        self.velocity
    }

    /// Simulated time after which the next touch pass runs.
    #[must_use]
    pub const fn next_touch(&self) -> Tick {
        self.next_touch
    }

    /// Simulated time after which the pitch field rotates.
    #[must_use]
    pub const fn next_pitch_change(&self) -> Tick {
        self.next_pitch_change
    }

    /// Advances simulated time by the scaled real-time delta and returns the new time.
    ///
    /// Readings earlier than the previous one are treated as a zero delta.
    pub fn advance(&mut self, real_now: u64) -> Tick {
        let delta = real_now.saturating_sub(self.last_real);
        let scaled = (delta as f64 * f64::from(self.velocity)).floor() as u64;
        self.now = self.now.saturating_add(scaled);
        self.last_real = real_now;
        self.now
    }

    /// Applies a crank delta to the time velocity.
    ///
    /// Returns the new velocity, or `None` when the change was zero or the
    /// velocity had left the band in which adjustments are accepted.
    pub fn adjust_velocity(&mut self, change: f32) -> Option<f32> {
        if change == 0.0 {
            return None;
        }
        let min = self.config.min_velocity;
        let max = self.config.max_velocity;
        if !(self.velocity > min - 1.0 && self.velocity < max + 1.0) {
            return None;
        }
        self.velocity = (self.velocity + change / CRANK_DEGREES_PER_VELOCITY).clamp(min, max);
        Some(self.velocity)
    }

    /// Shelf gains matching the current time velocity.
    #[must_use]
    pub fn tone_shaping(&self) -> ToneShaping {
        tone_shaping(self.velocity / self.config.max_velocity)
    }

    /// Shelf gains installed before any velocity change.
    #[must_use]
    pub fn initial_tone_shaping() -> ToneShaping {
        tone_shaping(INITIAL_TONE_ALPHA)
    }

    /// Reports whether a touch pass is due and, if so, schedules the next one.
    pub fn poll_touch(&mut self) -> bool {
        if self.now > self.next_touch {
            self.next_touch = self.now.saturating_add(self.config.touch_rate);
            true
        } else {
            false
        }
    }

    /// Reports whether the pitch field should rotate and, if so, schedules the next rotation.
    pub fn poll_pitch_change(&mut self) -> bool {
        if self.now > self.next_pitch_change {
            self.next_pitch_change = self.now.saturating_add(self.config.pitch_change_rate);
            true
        } else {
            false
        }
    }
}
