#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative engine state for Pulse Field.
//!
//! The world owns the clock, the node pool, the occupancy grid, the pitch
//! vocabulary and the random number generator. All mutations flow through
//! [`apply`], which reaches the audio and sprite services through the
//! [`Collaborators`] lent to it for the duration of the call.

mod config;
mod lifecycle;
mod pool;

use pulse_field_core::{Collaborators, Command, Event, Screen};
use pulse_field_system_clock::Clock;
use pulse_field_system_pitch::PitchVocabulary;
use pulse_field_system_proximity::OccupancyGrid;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

pub use config::{Config, ConfigError};

use pool::NodePool;

/// Represents the authoritative Pulse Field engine state.
#[derive(Debug)]
pub struct World {
    config: Config,
    screen: Screen,
    clock: Clock,
    pitch: PitchVocabulary,
    grid: OccupancyGrid,
    pool: NodePool,
    rng: ChaCha8Rng,
    lifetime: u64,
    fade_buffer: u64,
    slow_base_pulse: u64,
    fast_base_pulse: u64,
}

impl World {
    /// Creates an empty world whose clock is anchored to the provided real-time reading.
    pub fn new(config: Config, real_start: u64) -> Result<Self, ConfigError> {
        config.validate()?;
        let screen = config.screen();
        Ok(Self {
            screen,
            clock: Clock::new(config.clock_config(), real_start),
            pitch: PitchVocabulary::new(),
            grid: OccupancyGrid::new(screen, config.grid_scale),
            pool: NodePool::new(config.capacity),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            lifetime: config.lifetime_ticks(),
            fade_buffer: config.fade_buffer_ticks(),
            slow_base_pulse: config.slow_base_pulse(),
            fast_base_pulse: config.fast_base_pulse(),
            config,
        })
    }

    /// Frees every live node so that all external handles are released.
    pub fn shutdown(&mut self, collaborators: &mut Collaborators<'_>, out_events: &mut Vec<Event>) {
        let live: Vec<usize> = self.pool.iter_live().map(|(index, _)| index).collect();
        tracing::debug!(live = live.len(), "shutting down world");
        for index in live {
            self.free_node(index, collaborators, out_events);
        }
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(
    world: &mut World,
    command: Command,
    collaborators: &mut Collaborators<'_>,
    out_events: &mut Vec<Event>,
) {
    match command {
        Command::AdvanceClock { real_now } => {
            let from = world.clock.now();
            let to = world.clock.advance(real_now);
            out_events.push(Event::TimeAdvanced { from, to });
        }
        Command::AdjustTimeVelocity { change } => {
            if let Some(velocity) = world.clock.adjust_velocity(change) {
                let tone = world.clock.tone_shaping();
                collaborators.audio.set_tone_shaping(tone);
                tracing::debug!(velocity, ?tone, "time velocity changed");
                out_events.push(Event::TimeVelocityChanged { velocity, tone });
            }
        }
        Command::SpawnNode { kind, position } => {
            world.spawn_node(kind, position, collaborators, out_events);
        }
        Command::RunSchedules => {
            if world.clock.poll_touch() {
                for index in 0..world.pool.capacity() {
                    if world.pool.is_live(index) {
                        world.touch_node(index, collaborators, out_events);
                    }
                }
            }
            if world.clock.poll_pitch_change() {
                let field = world.pitch.rotate();
                tracing::debug!(field, now = world.clock.now().get(), "pitch field rotated");
                out_events.push(Event::PitchFieldRotated { field });
            }
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use glam::Vec2;
    use pulse_field_core::{
        AnimFrame, GridCell, NodeId, NodeKind, Quadrant, Screen, SpriteHandle, Tick, VoiceHandle,
    };
    use pulse_field_system_clock::Clock;
    use pulse_field_system_proximity::OccupancyGrid;

    use super::{pool::Node, Config, World};

    /// Number of live nodes.
    #[must_use]
    pub fn live_count(world: &World) -> usize {
        world.pool.live_count()
    }

    /// Number of slots in the node pool.
    #[must_use]
    pub fn capacity(world: &World) -> usize {
        world.pool.capacity()
    }

    /// Configuration the world was created with.
    #[must_use]
    pub fn config(world: &World) -> &Config {
        &world.config
    }

    /// Dimensions of the play area.
    #[must_use]
    pub fn screen(world: &World) -> Screen {
        world.screen
    }

    /// Provides read-only access to the simulated clock.
    #[must_use]
    pub fn clock(world: &World) -> &Clock {
        &world.clock
    }

    /// Index of the active pitch field.
    #[must_use]
    pub fn pitch_field_index(world: &World) -> usize {
        world.pitch.active_index()
    }

    /// Slot that the next spawn will reuse, if one was freed since the last spawn.
    #[must_use]
    pub fn freed_slot_hint(world: &World) -> Option<NodeId> {
        world.pool.last_freed().map(|index| NodeId::new(index as u32))
    }

    /// Captures a read-only view of the live nodes in slot order.
    #[must_use]
    pub fn node_view(world: &World) -> NodeView {
        NodeView {
            snapshots: world
                .pool
                .iter_live()
                .map(|(index, node)| NodeSnapshot::capture(index, node))
                .collect(),
        }
    }

    /// Snapshot of a single node, if its slot is live.
    #[must_use]
    pub fn node(world: &World, id: NodeId) -> Option<NodeSnapshot> {
        world
            .pool
            .get(id.index())
            .map(|node| NodeSnapshot::capture(id.index(), node))
    }

    /// Crowding score of a live node, if its slot is live.
    #[must_use]
    pub fn proximity_score(world: &World, id: NodeId) -> Option<f32> {
        world
            .pool
            .get(id.index())
            .map(|node| world.grid.proximity_score(node.cell, world.pool.capacity()))
    }

    /// Exposes a read-only view of the occupancy grid.
    #[must_use]
    pub fn occupancy_view(world: &World) -> OccupancyView<'_> {
        OccupancyView { grid: &world.grid }
    }

    /// Read-only snapshot describing all live nodes.
    #[derive(Clone, Debug)]
    pub struct NodeView {
        snapshots: Vec<NodeSnapshot>,
    }

    impl NodeView {
        /// Iterator over the captured snapshots in slot order.
        pub fn iter(&self) -> impl Iterator<Item = &NodeSnapshot> {
            self.snapshots.iter()
        }

        /// Consumes the view, yielding the captured snapshots.
        #[must_use]
        pub fn into_vec(self) -> Vec<NodeSnapshot> {
            self.snapshots
        }
    }

    /// Immutable representation of a single node's state.
    #[derive(Clone, Debug, PartialEq)]
    pub struct NodeSnapshot {
        /// Slot holding the node.
        pub id: NodeId,
        /// Timbral variant of the node.
        pub kind: NodeKind,
        /// Current screen position.
        pub position: Vec2,
        /// Grid cell recorded at spawn.
        pub cell: GridCell,
        /// Spawn quadrant selecting the pitch set.
        pub quadrant: Quadrant,
        /// Simulated time after which the node is freed.
        pub death_time: Tick,
        /// Simulated time of the next pulse.
        pub next_pulse: Tick,
        /// Multiplier applied to the base pulse period.
        pub pulse_period_scale: f32,
        /// Length of the notes the node plays, in seconds.
        pub note_length: f32,
        /// Octave derived from the node's height.
        pub octave: u8,
        /// Current animation frame.
        pub frame: AnimFrame,
        /// Voice owned by the node.
        pub voice: VoiceHandle,
        /// Sprite owned by the node.
        pub sprite: SpriteHandle,
    }

    impl NodeSnapshot {
        fn capture(index: usize, node: &Node) -> Self {
            Self {
                id: NodeId::new(index as u32),
                kind: node.kind,
                position: node.position,
                cell: node.cell,
                quadrant: node.quadrant,
                death_time: node.death_time,
                next_pulse: node.next_pulse,
                pulse_period_scale: node.pulse_period_scale,
                note_length: node.note_length,
                octave: node.octave,
                frame: node.frame,
                voice: node.handles.voice,
                sprite: node.handles.sprite,
            }
        }
    }

    /// Read-only view into the occupancy grid.
    #[derive(Clone, Copy, Debug)]
    pub struct OccupancyView<'a> {
        grid: &'a OccupancyGrid,
    }

    impl<'a> OccupancyView<'a> {
        /// Number of live nodes recorded in the provided cell.
        #[must_use]
        pub fn count(&self, cell: GridCell) -> u32 {
            self.grid.count(cell)
        }

        /// Number of live nodes recorded across the grid.
        #[must_use]
        pub fn total(&self) -> u32 {
            self.grid.total()
        }

        /// Returns an iterator over all cells in row-major order.
        pub fn iter(&self) -> impl Iterator<Item = (GridCell, u32)> + 'a {
            let grid: &'a OccupancyGrid = self.grid;
            grid.iter()
        }

        /// Provides the dimensions of the underlying grid.
        #[must_use]
        pub fn dimensions(&self) -> (u32, u32) {
            (self.grid.columns(), self.grid.rows())
        }
    }
}
