//! Engine configuration loaded from TOML.

use pulse_field_core::Screen;
use pulse_field_system_clock::Config as ClockConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while loading or validating an engine configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The document was not valid TOML or did not match the schema.
    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// The sample rate was zero.
    #[error("sample rate must be positive")]
    ZeroSampleRate,

    /// The pool cannot hold a live node once one slot is reserved.
    #[error("capacity must be at least 2, got {0}")]
    CapacityTooSmall(usize),

    /// The screen had a non-positive dimension.
    #[error("screen must have positive dimensions, got {width}x{height}")]
    EmptyScreen {
        /// Configured width.
        width: f32,
        /// Configured height.
        height: f32,
    },

    /// The grid scale leaves the screen without a single full cell.
    #[error("grid scale {scale} leaves a {width}x{height} screen without a full cell")]
    EmptyGrid {
        /// Configured grid scale.
        scale: f32,
        /// Configured width.
        width: f32,
        /// Configured height.
        height: f32,
    },

    /// The node lifetime was not positive.
    #[error("node lifetime must be positive, got {0}s")]
    NonPositiveLifetime(f32),

    /// The fade buffer was negative or longer than the lifetime.
    #[error("fade buffer of {fade}s must lie within the {lifetime}s node lifetime")]
    FadeOutsideLifetime {
        /// Configured fade buffer in seconds.
        fade: f32,
        /// Configured lifetime in seconds.
        lifetime: f32,
    },

    /// Nodes would never be touched.
    #[error("touches per second must be positive")]
    ZeroTouchRate,

    /// The time velocity bounds were empty or non-positive.
    #[error("time velocity range [{min}, {max}] is invalid")]
    InvalidVelocityRange {
        /// Configured lower bound.
        min: f32,
        /// Configured upper bound.
        max: f32,
    },

    /// The starting time velocity lay outside its bounds.
    #[error("initial time velocity {initial} lies outside [{min}, {max}]")]
    InitialVelocityOutOfRange {
        /// Configured starting velocity.
        initial: f32,
        /// Configured lower bound.
        min: f32,
        /// Configured upper bound.
        max: f32,
    },
}

/// Tunable parameters of the engine.
///
/// Every field falls back to its default when omitted from a TOML document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Simulated ticks per real second.
    pub sample_rate: u32,
    /// Width of the play area.
    pub screen_width: f32,
    /// Height of the play area.
    pub screen_height: f32,
    /// Number of node slots; one is always kept in reserve.
    pub capacity: usize,
    /// Seconds a node lives before it is freed.
    pub lifetime_seconds: f32,
    /// Seconds over which a node fades out before its death.
    pub fade_buffer_seconds: f32,
    /// Touch passes per second of simulated time.
    pub touches_per_second: u32,
    /// Seconds between pitch-field rotations.
    pub pitch_change_seconds: f32,
    /// Seconds of the slowest base pulse period.
    pub slow_pulse_seconds: f32,
    /// Pulses per second of the fastest base pulse period.
    pub fast_pulses_per_second: u32,
    /// Factor mapping screen units to occupancy grid cells.
    pub grid_scale: f32,
    /// Seed of the engine's random number generator.
    pub seed: u64,
    /// Lowest time velocity reachable with the crank.
    pub min_time_velocity: f32,
    /// Highest time velocity reachable with the crank.
    pub max_time_velocity: f32,
    /// Time velocity at start-up.
    pub initial_time_velocity: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            screen_width: 400.0,
            screen_height: 240.0,
            capacity: 12,
            lifetime_seconds: 16.0,
            fade_buffer_seconds: 4.0,
            touches_per_second: 10,
            pitch_change_seconds: 30.0,
            slow_pulse_seconds: 10.0,
            fast_pulses_per_second: 15,
            grid_scale: 0.01,
            seed: 0x5eed_f1e1_d000_0001,
            min_time_velocity: 0.5,
            max_time_velocity: 2.5,
            initial_time_velocity: 1.0,
        }
    }
}

impl Config {
    /// Parses and validates a configuration from a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that the parameters describe a runnable engine.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate == 0 {
            return Err(ConfigError::ZeroSampleRate);
        }
        if self.capacity < 2 {
            return Err(ConfigError::CapacityTooSmall(self.capacity));
        }
        if !(self.screen_width > 0.0 && self.screen_height > 0.0) {
            return Err(ConfigError::EmptyScreen {
                width: self.screen_width,
                height: self.screen_height,
            });
        }
        if !(self.screen_width * self.grid_scale >= 1.0
            && self.screen_height * self.grid_scale >= 1.0)
        {
            return Err(ConfigError::EmptyGrid {
                scale: self.grid_scale,
                width: self.screen_width,
                height: self.screen_height,
            });
        }
        if !(self.lifetime_seconds > 0.0) {
            return Err(ConfigError::NonPositiveLifetime(self.lifetime_seconds));
        }
        if !(self.fade_buffer_seconds > 0.0 && self.fade_buffer_seconds <= self.lifetime_seconds)
        {
            return Err(ConfigError::FadeOutsideLifetime {
                fade: self.fade_buffer_seconds,
                lifetime: self.lifetime_seconds,
            });
        }
        if self.touches_per_second == 0 || self.fast_pulses_per_second == 0 {
            return Err(ConfigError::ZeroTouchRate);
        }
        if !(self.min_time_velocity > 0.0 && self.min_time_velocity <= self.max_time_velocity) {
            return Err(ConfigError::InvalidVelocityRange {
                min: self.min_time_velocity,
                max: self.max_time_velocity,
            });
        }
        if !(self.min_time_velocity..=self.max_time_velocity).contains(&self.initial_time_velocity)
        {
            return Err(ConfigError::InitialVelocityOutOfRange {
                initial: self.initial_time_velocity,
                min: self.min_time_velocity,
                max: self.max_time_velocity,
            });
        }
        Ok(())
    }

    /// Dimensions of the play area.
    #[must_use]
    pub fn screen(&self) -> Screen {
        Screen::new(self.screen_width, self.screen_height)
    }

    /// Node lifetime in ticks.
    #[must_use]
    pub fn lifetime_ticks(&self) -> u64 {
        self.seconds_to_ticks(self.lifetime_seconds)
    }

    /// Fade window in ticks.
    #[must_use]
    pub fn fade_buffer_ticks(&self) -> u64 {
        self.seconds_to_ticks(self.fade_buffer_seconds)
    }

    /// Ticks between two touch passes.
    #[must_use]
    pub fn touch_rate(&self) -> u64 {
        u64::from(self.sample_rate / self.touches_per_second.max(1))
    }

    /// Ticks between two pitch-field rotations.
    #[must_use]
    pub fn pitch_change_rate(&self) -> u64 {
        self.seconds_to_ticks(self.pitch_change_seconds)
    }

    /// Slowest base pulse period in ticks.
    #[must_use]
    pub fn slow_base_pulse(&self) -> u64 {
        self.seconds_to_ticks(self.slow_pulse_seconds)
    }

    /// Fastest base pulse period in ticks.
    #[must_use]
    pub fn fast_base_pulse(&self) -> u64 {
        u64::from(self.sample_rate / self.fast_pulses_per_second.max(1))
    }

    /// Clock parameters derived from this configuration.
    #[must_use]
    pub fn clock_config(&self) -> ClockConfig {
        ClockConfig::new(
            self.touch_rate(),
            self.pitch_change_rate(),
            self.min_time_velocity,
            self.max_time_velocity,
            self.initial_time_velocity,
        )
    }

    fn seconds_to_ticks(&self, seconds: f32) -> u64 {
        (f64::from(seconds) * f64::from(self.sample_rate)).round().max(0.0) as u64
    }
}
