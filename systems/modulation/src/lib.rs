#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure parameter curves evaluated whenever a node is touched.
//!
//! Every curve is a linear interpolation between two fixed bounds, driven by
//! one of three signals: the node's age, its proximity to other nodes, or its
//! closeness to the centre of the screen.

use pulse_field_core::{Envelope, ModulatorSettings, NodeKind, StereoVolume, Tick, ToneShaping};

/// Linearly interpolates between `low` and `high`.
///
/// `alpha` is not clamped, so values outside `0.0..=1.0` extrapolate.
#[must_use]
pub fn lerp(low: f32, high: f32, alpha: f32) -> f32 {
    low * (1.0 - alpha) + high * alpha
}

/// Closed range of a modulated parameter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Span {
    min: f32,
    max: f32,
}

impl Span {
    /// Creates a span between the provided bounds.
    #[must_use]
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Lower bound of the span.
    #[must_use]
    pub const fn min(&self) -> f32 {
        self.min
    }

    /// Upper bound of the span.
    #[must_use]
    pub const fn max(&self) -> f32 {
        self.max
    }

    /// Value of the span at the provided interpolation factor.
    #[must_use]
    pub fn at(&self, alpha: f32) -> f32 {
        lerp(self.min, self.max, alpha)
    }
}

/// Envelope bounds of a node variant across its lifetime.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnvelopeTable {
    attack: Span,
    decay: Span,
    sustain: Span,
    release: Span,
}

impl EnvelopeTable {
    /// Envelope produced at the provided point of the node's life.
    #[must_use]
    pub fn at(&self, alpha: f32) -> Envelope {
        Envelope {
            attack: self.attack.at(alpha),
            decay: self.decay.at(alpha),
            sustain: self.sustain.at(alpha),
            release: self.release.at(alpha),
        }
    }
}

/// Envelope bounds for the harsh variant.
pub const STRONG_ENVELOPE: EnvelopeTable = EnvelopeTable {
    attack: Span::new(0.01, 0.2),
    decay: Span::new(0.05, 0.3),
    sustain: Span::new(0.06, 0.3),
    release: Span::new(0.2, 1.0),
};

/// Envelope bounds for the soft variant.
pub const WEAK_ENVELOPE: EnvelopeTable = EnvelopeTable {
    attack: Span::new(0.2, 1.0),
    decay: Span::new(0.5, 1.0),
    sustain: Span::new(0.1, 0.5),
    release: Span::new(0.5, 4.0),
};

/// Looks up the envelope bounds of a node variant.
#[must_use]
pub const fn envelope_table(kind: NodeKind) -> &'static EnvelopeTable {
    match kind {
        NodeKind::Strong => &STRONG_ENVELOPE,
        NodeKind::Weak => &WEAK_ENVELOPE,
    }
}

/// Rate, phase and depth bounds of a modulator.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ModulationTable {
    rate: Span,
    phase: Span,
    depth: Span,
}

impl ModulationTable {
    /// Modulator settings at the provided interpolation factor.
    #[must_use]
    pub fn at(&self, alpha: f32) -> ModulatorSettings {
        ModulatorSettings {
            rate: self.rate.at(alpha),
            phase: self.phase.at(alpha),
            depth: self.depth.at(alpha),
        }
    }
}

/// Bounds of the modulator routed to a voice's frequency input.
pub const FREQUENCY_MODULATION: ModulationTable = ModulationTable {
    rate: Span::new(0.001, 0.3),
    phase: Span::new(0.0, 1.0),
    depth: Span::new(0.0, 0.04),
};

/// Bounds of the modulator routed to a voice's amplitude input.
pub const AMPLITUDE_MODULATION: ModulationTable = ModulationTable {
    rate: Span::new(0.1, 50.0),
    phase: Span::new(0.0, 1.0),
    depth: Span::new(0.0, 0.5),
};

/// Centre value assigned to every modulator at creation.
pub const MODULATOR_CENTER: f32 = 0.5;

/// Note length bounds in seconds.
pub const NOTE_LENGTH: Span = Span::new(0.02, 4.0);

/// Pulse-period multiplier bounds.
pub const PULSE_MODULATION: Span = Span::new(0.03, 5.0);

/// Interpolation factor between the slow and fast base pulse periods.
pub const PULSE_BIAS: f32 = 0.5;

/// Octave bounds, bottom of the screen to top.
pub const OCTAVES: Span = Span::new(0.0, 6.0);

/// Bounds of the low-shelf gain, negated minimum first.
pub const LOW_SHELF_GAIN: Span = Span::new(-2.0, 8.0);

/// Bounds of the high-shelf gain, negated minimum first.
pub const HIGH_SHELF_GAIN: Span = Span::new(-15.0, 0.5);

/// Octave selected by the node's height on screen.
#[must_use]
pub fn octave_for(y: f32, screen_height: f32) -> u8 {
    let octave = OCTAVES.at(1.0 - y / screen_height).floor();
    octave.clamp(OCTAVES.min(), OCTAVES.max()) as u8
}

/// Fraction of the node's lifetime that has elapsed.
///
/// Evicted nodes may report values outside `0.0..=1.0`.
#[must_use]
pub fn envelope_alpha(now: Tick, death_time: Tick, lifetime: u64) -> f32 {
    let born = death_time.get() as i64 - lifetime as i64;
    (now.get() as i64 - born) as f32 / lifetime as f32
}

/// Volume multiplier that falls from 1.0 to 0.0 across the final fade window.
#[must_use]
pub fn lifespan_fade(now: Tick, death_time: Tick, fade_buffer: u64) -> f32 {
    let remaining = death_time.get() as i64 - now.get() as i64;
    if remaining < fade_buffer as i64 {
        remaining as f32 / fade_buffer as f32
    } else {
        1.0
    }
}

/// Stereo gains derived from the node's fade, proximity and horizontal position.
#[must_use]
pub fn stereo_volume(fade: f32, proximity: f32, x: f32, screen_width: f32) -> StereoVolume {
    let base = fade * (0.8 * proximity + 0.2);
    let pan = x / screen_width;
    StereoVolume {
        left: lerp(0.0, base, pan),
        right: lerp(0.0, base, 1.0 - pan),
    }
}

/// Note length for a node at the provided closeness to the screen centre.
#[must_use]
pub fn note_length(center_closeness: f32) -> f32 {
    NOTE_LENGTH.at(1.0 - center_closeness)
}

/// Pulse-period multiplier for a node at the provided closeness to the centre.
///
/// Nodes near the centre pulse faster.
#[must_use]
pub fn pulse_period_scale(center_closeness: f32) -> f32 {
    PULSE_BIAS * lerp(PULSE_MODULATION.max(), PULSE_MODULATION.min(), center_closeness)
}

/// Pulse-period multiplier assigned to freshly spawned nodes.
#[must_use]
pub fn initial_pulse_period_scale() -> f32 {
    PULSE_MODULATION.at(0.5)
}

/// Ticks between two pulses before the random salt is added.
#[must_use]
pub fn pulse_interval(period_scale: f32, slow_base: u64, fast_base: u64) -> u64 {
    let interval = period_scale * lerp(slow_base as f32, fast_base as f32, PULSE_BIAS);
    interval.max(0.0) as u64
}

/// Shelf gains for a time velocity expressed as a fraction of its maximum.
#[must_use]
pub fn tone_shaping(alpha: f32) -> ToneShaping {
    ToneShaping {
        low_shelf_gain: LOW_SHELF_GAIN.at(1.0 - alpha),
        high_shelf_gain: HIGH_SHELF_GAIN.at(alpha),
    }
}
