#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Pulse Field engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters and the tick driver submit
//! [`Command`] values describing desired mutations, the world executes those
//! commands via its `apply` entry point, and then broadcasts [`Event`] values
//! describing what changed. External audio and sprite collaborators are
//! reached exclusively through the [`AudioService`] and [`SpriteService`]
//! traits, bundled per call as [`Collaborators`].

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Advances simulated time from the real-time source reading.
    AdvanceClock {
        /// Monotonic real time expressed in audio samples.
        real_now: u64,
    },
    /// Nudges the time velocity by a continuous input delta.
    AdjustTimeVelocity {
        /// Rotational input delta measured in degrees.
        change: f32,
    },
    /// Requests a new node at the provided screen position.
    SpawnNode {
        /// Timbral variant of the requested node.
        kind: NodeKind,
        /// Screen-space position where the node appears.
        position: Vec2,
    },
    /// Runs the touch and pitch-field schedules if they are due.
    RunSchedules,
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulated clock advanced.
    TimeAdvanced {
        /// Simulated time before the advance.
        from: Tick,
        /// Simulated time after the advance.
        to: Tick,
    },
    /// Reports an applied time-velocity adjustment.
    TimeVelocityChanged {
        /// Velocity after clamping.
        velocity: f32,
        /// Shelf gains derived from the new velocity.
        tone: ToneShaping,
    },
    /// Confirms that a node occupied a slot.
    NodeSpawned {
        /// Slot that now holds the node.
        node: NodeId,
        /// Timbral variant of the node.
        kind: NodeKind,
        /// Occupancy grid cell recorded for the node's lifetime.
        cell: GridCell,
        /// Screen quadrant selecting the node's pitch set.
        quadrant: Quadrant,
    },
    /// Reports that a node was pushed into its fade-out window early.
    NodeEvicted {
        /// Slot whose death time was reset.
        node: NodeId,
        /// New death time assigned to the node.
        death_time: Tick,
    },
    /// Reports that a spawn request was discarded because the pool was full.
    SpawnDropped {
        /// Variant that was requested.
        kind: NodeKind,
        /// Position that was requested.
        position: Vec2,
    },
    /// Confirms that a node released its resources and its slot became free.
    NodeFreed {
        /// Slot that was reclaimed.
        node: NodeId,
        /// Grid cell whose count was decremented.
        cell: GridCell,
    },
    /// Reports that a node re-triggered its voice.
    NotePlayed {
        /// Slot of the pulsing node.
        node: NodeId,
        /// Note handed to the voice.
        note: NoteTrigger,
        /// Simulated time of the node's next pulse.
        next_pulse: Tick,
    },
    /// Announces that the active pitch field changed.
    PitchFieldRotated {
        /// Index of the pitch field that became active.
        field: usize,
    },
}

/// Simulated time measured in audio-sample ticks.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Tick(u64);

impl Tick {
    /// The origin of simulated time.
    pub const ZERO: Self = Self(0);

    /// Creates a tick from a raw sample count.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the raw sample count.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }

    /// Returns the tick `ticks` samples later, saturating at the maximum.
    #[must_use]
    pub const fn saturating_add(self, ticks: u64) -> Self {
        Self(self.0.saturating_add(ticks))
    }

    /// Returns the tick `ticks` samples earlier, saturating at zero.
    #[must_use]
    pub const fn saturating_sub(self, ticks: u64) -> Self {
        Self(self.0.saturating_sub(ticks))
    }
}

/// Unique identifier of a node slot within the pool.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct NodeId(u32);

impl NodeId {
    /// Creates a new node identifier from a slot index.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Slot index suitable for indexing the pool.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Timbral variants a live node may take.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// Harsh variant with a sawtooth voice and triangle modulators.
    Strong,
    /// Soft variant with a sine voice and sine modulators.
    Weak,
}

impl NodeKind {
    /// Every variant in declaration order.
    pub const ALL: [NodeKind; 2] = [NodeKind::Strong, NodeKind::Weak];

    /// Oscillator waveform used by the node's voice.
    #[must_use]
    pub const fn waveform(self) -> Waveform {
        match self {
            Self::Strong => Waveform::Sawtooth,
            Self::Weak => Waveform::Sine,
        }
    }

    /// Shape used by both of the node's modulators.
    #[must_use]
    pub const fn modulator_shape(self) -> ModulatorShape {
        match self {
            Self::Strong => ModulatorShape::Triangle,
            Self::Weak => ModulatorShape::Sine,
        }
    }
}

/// Oscillator waveforms requested from the audio service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Waveform {
    /// Bright sawtooth oscillator.
    Sawtooth,
    /// Pure sine oscillator.
    Sine,
}

/// Low-frequency modulator shapes requested from the audio service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ModulatorShape {
    /// Linear up/down ramp.
    Triangle,
    /// Sinusoidal sweep.
    Sine,
}

/// Screen quadrant, which also selects a node's pitch set.
///
/// Screen space grows downwards, so "south" is the half with the larger `y`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quadrant {
    /// Right half, lower half.
    SouthEast,
    /// Right half, upper half.
    NorthEast,
    /// Left half, lower half.
    SouthWest,
    /// Left half, upper half.
    NorthWest,
}

impl Quadrant {
    /// Index of the pitch set associated with the quadrant.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::SouthEast => 0,
            Self::NorthEast => 1,
            Self::SouthWest => 2,
            Self::NorthWest => 3,
        }
    }
}

/// Cell of the coarse occupancy grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCell {
    column: u32,
    row: u32,
}

impl GridCell {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }
}

/// Dimensions of the play area in screen units.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Screen {
    width: f32,
    height: f32,
}

impl Screen {
    /// Creates a screen description.
    #[must_use]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Horizontal extent of the play area.
    #[must_use]
    pub const fn width(&self) -> f32 {
        self.width
    }

    /// Vertical extent of the play area.
    #[must_use]
    pub const fn height(&self) -> f32 {
        self.height
    }

    /// Centre point of the play area.
    #[must_use]
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width * 0.5, self.height * 0.5)
    }

    /// Wraps a position that stepped past an edge back onto the opposite side.
    ///
    /// Only a single screen length is folded back, which is enough for the
    /// small per-frame steps used by nodes and the player.
    #[must_use]
    pub fn wrap(&self, position: Vec2) -> Vec2 {
        Vec2::new(
            wrap_axis(position.x, self.width),
            wrap_axis(position.y, self.height),
        )
    }

    /// Quadrant containing the provided position.
    #[must_use]
    pub fn quadrant_of(&self, position: Vec2) -> Quadrant {
        let center = self.center();
        match (position.x >= center.x, position.y >= center.y) {
            (true, true) => Quadrant::SouthEast,
            (true, false) => Quadrant::NorthEast,
            (false, true) => Quadrant::SouthWest,
            (false, false) => Quadrant::NorthWest,
        }
    }

    /// Distance between the centre and a corner.
    #[must_use]
    pub fn max_distance_from_center(&self) -> f32 {
        self.center().length()
    }

    /// Returns 1.0 at the centre, falling linearly to 0.0 at the corners.
    #[must_use]
    pub fn closeness_to_center(&self, position: Vec2) -> f32 {
        let max_distance = self.max_distance_from_center();
        if max_distance <= f32::EPSILON {
            return 1.0;
        }
        (max_distance - position.distance(self.center())) / max_distance
    }
}

fn wrap_axis(value: f32, extent: f32) -> f32 {
    let mut value = value;
    if value > extent {
        value -= extent;
    }
    if value < 0.0 {
        value += extent;
    }
    value
}

/// Animation frame index of a node sprite.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnimFrame(u8);

impl AnimFrame {
    /// Number of frames in every node animation.
    pub const COUNT: u8 = 8;

    /// First frame of the animation.
    pub const FIRST: Self = Self(0);

    /// Creates a frame index, wrapping values beyond the animation length.
    #[must_use]
    pub const fn new(value: u8) -> Self {
        Self(value % Self::COUNT)
    }

    /// Retrieves the frame index.
    #[must_use]
    pub const fn get(&self) -> u8 {
        self.0
    }

    /// Frame that follows this one, wrapping after the last.
    #[must_use]
    pub const fn next(self) -> Self {
        Self::new(self.0 + 1)
    }
}

/// Image that a sprite should display.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SpriteImage {
    /// The player's cursor.
    Player,
    /// An animation frame of a node variant.
    Node {
        /// Variant whose animation the frame belongs to.
        kind: NodeKind,
        /// Frame within the variant's animation.
        frame: AnimFrame,
    },
}

/// Handle to a synthesizer voice owned by the audio service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoiceHandle(u32);

impl VoiceHandle {
    /// Wraps a raw voice identifier.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Raw voice identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Handle to a low-frequency modulator owned by the audio service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModulatorHandle(u32);

impl ModulatorHandle {
    /// Wraps a raw modulator identifier.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Raw modulator identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Handle to a sprite owned by the sprite service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpriteHandle(u32);

impl SpriteHandle {
    /// Wraps a raw sprite identifier.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Raw sprite identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Attack/decay/sustain/release settings of a voice.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Envelope {
    /// Attack time in seconds.
    pub attack: f32,
    /// Decay time in seconds.
    pub decay: f32,
    /// Sustain level in the range 0.0..=1.0.
    pub sustain: f32,
    /// Release time in seconds.
    pub release: f32,
}

/// Rate, phase and depth of a modulator.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ModulatorSettings {
    /// Oscillation rate in hertz.
    pub rate: f32,
    /// Phase offset in cycles.
    pub phase: f32,
    /// Modulation depth.
    pub depth: f32,
}

/// Per-channel gain of a voice.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StereoVolume {
    /// Left channel gain.
    pub left: f32,
    /// Right channel gain.
    pub right: f32,
}

/// Gains of the two shelf filters on the global audio channel.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ToneShaping {
    /// Low-shelf gain in decibels.
    pub low_shelf_gain: f32,
    /// High-shelf gain in decibels.
    pub high_shelf_gain: f32,
}

impl ToneShaping {
    /// Corner frequency of the low shelf in hertz.
    pub const LOW_SHELF_FREQUENCY: f32 = 300.0;
    /// Corner frequency of the high shelf in hertz.
    pub const HIGH_SHELF_FREQUENCY: f32 = 800.0;
    /// Resonance shared by both shelves.
    pub const SHELF_RESONANCE: f32 = 1.0;
}

/// A single note handed to a voice.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NoteTrigger {
    /// MIDI note number.
    pub pitch: u8,
    /// Velocity in the range 0.5..=1.0.
    pub velocity: f32,
    /// Note length in seconds.
    pub duration: f32,
}

/// Directional buttons currently held by the player.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HeldDirections {
    /// Up is held.
    pub up: bool,
    /// Down is held.
    pub down: bool,
    /// Left is held.
    pub left: bool,
    /// Right is held.
    pub right: bool,
}

/// Action buttons pressed on this frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PressedActions {
    /// Primary action, which spawns a strong node.
    pub primary: bool,
    /// Secondary action, which spawns a weak node.
    pub secondary: bool,
}

/// Input snapshot gathered once per frame by the input adapter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlayerInput {
    /// Directions held during the frame.
    pub held: HeldDirections,
    /// Actions newly pressed during the frame.
    pub pressed: PressedActions,
    /// Rotational delta in degrees since the previous frame.
    pub crank_change: f32,
    /// Whether the rotational input is stowed and must be ignored.
    pub crank_docked: bool,
}

impl Default for PlayerInput {
    fn default() -> Self {
        Self {
            held: HeldDirections::default(),
            pressed: PressedActions::default(),
            crank_change: 0.0,
            crank_docked: true,
        }
    }
}

/// Synthesizer and modulator service consumed by the engine.
///
/// Every handle returned by a `create_*` call is owned by the caller until it
/// is passed to the matching `destroy_*` call.
pub trait AudioService {
    /// Creates a voice using the provided oscillator waveform.
    fn create_voice(&mut self, waveform: Waveform) -> VoiceHandle;
    /// Routes a modulator into the voice's frequency input.
    fn set_frequency_modulator(&mut self, voice: VoiceHandle, modulator: ModulatorHandle);
    /// Routes a modulator into the voice's amplitude input.
    fn set_amplitude_modulator(&mut self, voice: VoiceHandle, modulator: ModulatorHandle);
    /// Replaces the voice's envelope.
    fn set_envelope(&mut self, voice: VoiceHandle, envelope: Envelope);
    /// Replaces the voice's stereo gains.
    fn set_volume(&mut self, voice: VoiceHandle, volume: StereoVolume);
    /// Triggers a note on the voice.
    fn play_note(&mut self, voice: VoiceHandle, note: NoteTrigger);
    /// Releases the voice.
    fn destroy_voice(&mut self, voice: VoiceHandle);

    /// Creates a modulator with the provided shape.
    fn create_modulator(&mut self, shape: ModulatorShape) -> ModulatorHandle;
    /// Sets the modulator's rate.
    fn set_modulator_rate(&mut self, modulator: ModulatorHandle, rate: f32);
    /// Sets the modulator's phase.
    fn set_modulator_phase(&mut self, modulator: ModulatorHandle, phase: f32);
    /// Sets the modulator's depth.
    fn set_modulator_depth(&mut self, modulator: ModulatorHandle, depth: f32);
    /// Sets the modulator's centre value.
    fn set_modulator_center(&mut self, modulator: ModulatorHandle, center: f32);
    /// Releases the modulator.
    fn destroy_modulator(&mut self, modulator: ModulatorHandle);

    /// Mixes the voice into the global channel.
    fn add_to_channel(&mut self, voice: VoiceHandle);
    /// Removes the voice from the global channel.
    fn remove_from_channel(&mut self, voice: VoiceHandle);
    /// Updates the global channel's shelf filters.
    fn set_tone_shaping(&mut self, shaping: ToneShaping);
}

/// Sprite display-list service consumed by the engine.
pub trait SpriteService {
    /// Creates a sprite showing the provided image.
    fn create_sprite(&mut self, image: SpriteImage) -> SpriteHandle;
    /// Moves the sprite's centre to the provided screen position.
    fn move_to(&mut self, sprite: SpriteHandle, position: Vec2);
    /// Replaces the sprite's image.
    fn set_image(&mut self, sprite: SpriteHandle, image: SpriteImage);
    /// Adds the sprite to the display list.
    fn add_to_scene(&mut self, sprite: SpriteHandle);
    /// Removes the sprite from the display list.
    fn remove_from_scene(&mut self, sprite: SpriteHandle);
    /// Releases the sprite.
    fn destroy_sprite(&mut self, sprite: SpriteHandle);
    /// Publishes the display list for the current frame.
    fn render_all(&mut self);
}

/// External collaborators lent to the engine for the duration of a call.
pub struct Collaborators<'a> {
    /// Synthesizer and modulator service.
    pub audio: &'a mut dyn AudioService,
    /// Sprite display-list service.
    pub sprites: &'a mut dyn SpriteService,
}

impl<'a> Collaborators<'a> {
    /// Bundles the provided services.
    #[must_use]
    pub fn new(audio: &'a mut dyn AudioService, sprites: &'a mut dyn SpriteService) -> Self {
        Self { audio, sprites }
    }
}

impl std::fmt::Debug for Collaborators<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCREEN: Screen = Screen::new(400.0, 240.0);

    #[test]
    fn quadrants_split_on_center_inclusive() {
        assert_eq!(SCREEN.quadrant_of(Vec2::new(200.0, 120.0)), Quadrant::SouthEast);
        assert_eq!(SCREEN.quadrant_of(Vec2::new(399.0, 0.0)), Quadrant::NorthEast);
        assert_eq!(SCREEN.quadrant_of(Vec2::new(0.0, 239.0)), Quadrant::SouthWest);
        assert_eq!(SCREEN.quadrant_of(Vec2::new(199.9, 119.9)), Quadrant::NorthWest);
        assert_eq!(Quadrant::SouthEast.index(), 0);
        assert_eq!(Quadrant::NorthWest.index(), 3);
    }

    #[test]
    fn wrap_folds_positions_back_onto_screen() {
        assert_eq!(SCREEN.wrap(Vec2::new(401.0, -1.0)), Vec2::new(1.0, 239.0));
        assert_eq!(SCREEN.wrap(Vec2::new(400.0, 240.0)), Vec2::new(400.0, 240.0));
        assert_eq!(SCREEN.wrap(Vec2::new(12.5, 30.0)), Vec2::new(12.5, 30.0));
    }

    #[test]
    fn closeness_to_center_spans_unit_range() {
        assert!((SCREEN.closeness_to_center(SCREEN.center()) - 1.0).abs() < 1e-6);
        assert!(SCREEN.closeness_to_center(Vec2::ZERO).abs() < 1e-6);
        assert!(SCREEN.closeness_to_center(Vec2::new(400.0, 240.0)).abs() < 1e-6);
    }

    #[test]
    fn animation_frames_wrap_after_eight() {
        let mut frame = AnimFrame::FIRST;
        for _ in 0..AnimFrame::COUNT {
            frame = frame.next();
        }
        assert_eq!(frame, AnimFrame::FIRST);
        assert_eq!(AnimFrame::new(9).get(), 1);
    }

    #[test]
    fn node_kinds_select_distinct_timbres() {
        assert_eq!(NodeKind::Strong.waveform(), Waveform::Sawtooth);
        assert_eq!(NodeKind::Strong.modulator_shape(), ModulatorShape::Triangle);
        assert_eq!(NodeKind::Weak.waveform(), Waveform::Sine);
        assert_eq!(NodeKind::Weak.modulator_shape(), ModulatorShape::Sine);
    }

    #[test]
    fn tick_arithmetic_saturates() {
        assert_eq!(Tick::ZERO.saturating_sub(5), Tick::ZERO);
        assert_eq!(Tick::new(u64::MAX).saturating_add(1), Tick::new(u64::MAX));
        assert_eq!(Tick::new(10).saturating_add(5).get(), 15);
    }
}
