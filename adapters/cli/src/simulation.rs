//! Glue between the engine, the in-memory collaborators and a frame source.

use std::{fmt, time::Duration};

use pulse_field_audio::VoiceBank;
use pulse_field_core::{Collaborators, Event, HeldDirections, PlayerInput, PressedActions, Screen};
use pulse_field_rendering::{HudPresentation, Scene, SpriteStage};
use pulse_field_system_tick_driver::TickDriver;
use pulse_field_world::{query, Config, ConfigError, World};

/// Frames per second assumed by headless sessions.
pub(crate) const HEADLESS_FRAME_RATE: u32 = 30;

/// Counters accumulated over a session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct SessionSummary {
    pub(crate) frames: u64,
    pub(crate) simulated_ticks: u64,
    pub(crate) nodes_spawned: u64,
    pub(crate) nodes_freed: u64,
    pub(crate) evictions: u64,
    pub(crate) spawns_dropped: u64,
    pub(crate) notes_played: u64,
    pub(crate) pitch_field: usize,
    pub(crate) live_at_exit: usize,
}

impl SessionSummary {
    fn record(&mut self, event: &Event) {
        match event {
            Event::NodeSpawned { .. } => self.nodes_spawned += 1,
            Event::NodeFreed { .. } => self.nodes_freed += 1,
            Event::NodeEvicted { .. } => self.evictions += 1,
            Event::SpawnDropped { .. } => self.spawns_dropped += 1,
            Event::NotePlayed { .. } => self.notes_played += 1,
            Event::PitchFieldRotated { field } => self.pitch_field = *field,
            Event::TimeAdvanced { to, .. } => self.simulated_ticks = to.get(),
            Event::TimeVelocityChanged { .. } => {}
        }
    }
}

impl fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "frames: {}", self.frames)?;
        writeln!(f, "simulated ticks: {}", self.simulated_ticks)?;
        writeln!(f, "nodes spawned: {}", self.nodes_spawned)?;
        writeln!(f, "nodes freed: {}", self.nodes_freed)?;
        writeln!(f, "evictions: {}", self.evictions)?;
        writeln!(f, "spawns dropped: {}", self.spawns_dropped)?;
        writeln!(f, "notes played: {}", self.notes_played)?;
        writeln!(f, "pitch field: {}", self.pitch_field)?;
        write!(f, "live at exit: {}", self.live_at_exit)
    }
}

/// Engine plus the collaborators it drives.
#[derive(Debug)]
pub(crate) struct Simulation {
    world: World,
    driver: Option<TickDriver>,
    audio: VoiceBank,
    stage: SpriteStage,
    sample_rate: u32,
    events: Vec<Event>,
    summary: SessionSummary,
}

impl Simulation {
    pub(crate) fn new(config: Config) -> Result<Self, ConfigError> {
        let sample_rate = config.sample_rate;
        let world = World::new(config, 0)?;
        let mut audio = VoiceBank::new();
        let mut stage = SpriteStage::new();
        let driver = {
            let mut collaborators = Collaborators::new(&mut audio, &mut stage);
            TickDriver::new(&world, &mut collaborators)
        };
        Ok(Self {
            world,
            driver: Some(driver),
            audio,
            stage,
            sample_rate,
            events: Vec::new(),
            summary: SessionSummary::default(),
        })
    }

    pub(crate) fn screen(&self) -> Screen {
        query::screen(&self.world)
    }

    /// Real-time reading in samples for the time elapsed since the session started.
    pub(crate) fn samples_since_start(&self, elapsed: Duration) -> u64 {
        (elapsed.as_secs_f64() * f64::from(self.sample_rate)).floor() as u64
    }

    /// Runs one engine frame.
    pub(crate) fn step(&mut self, elapsed: Duration, input: &PlayerInput) {
        let real_now = self.samples_since_start(elapsed);
        let Some(driver) = self.driver.as_mut() else {
            return;
        };
        let mut collaborators = Collaborators::new(&mut self.audio, &mut self.stage);
        driver.frame(
            &mut self.world,
            &mut collaborators,
            real_now,
            input,
            &mut self.events,
        );

        self.summary.frames += 1;
        for event in self.events.drain(..) {
            self.summary.record(&event);
        }
        let _ = self.audio.drain_played_notes();
    }

    pub(crate) fn hud(&self) -> HudPresentation {
        HudPresentation {
            time_velocity: query::clock(&self.world).velocity(),
            live_nodes: query::live_count(&self.world),
            pitch_field: query::pitch_field_index(&self.world),
        }
    }

    /// Copies the sprites published by the last frame into the scene.
    pub(crate) fn populate_scene(&self, scene: &mut Scene) {
        scene.sprites.clear();
        scene.sprites.extend_from_slice(self.stage.frame());
        scene.hud = Some(self.hud());
    }

    /// Frees every node and the player sprite, returning the session counters.
    pub(crate) fn finish(&mut self) -> SessionSummary {
        self.summary.live_at_exit = query::live_count(&self.world);
        if let Some(driver) = self.driver.take() {
            let mut collaborators = Collaborators::new(&mut self.audio, &mut self.stage);
            driver.shutdown(&mut self.world, &mut collaborators, &mut self.events);
            self.events.clear();
            tracing::info!(
                voices = self.audio.voice_count(),
                sprites = self.stage.sprite_count(),
                "session finished"
            );
        }
        self.summary
    }
}

impl Drop for Simulation {
    fn drop(&mut self) {
        let _ = self.finish();
    }
}

/// Runs a session without a window for the requested number of frames.
pub(crate) fn run_headless(
    config: Config,
    frames: u64,
    spawn_every: u64,
) -> Result<SessionSummary, ConfigError> {
    let mut simulation = Simulation::new(config)?;
    let frame_duration = Duration::from_secs(1) / HEADLESS_FRAME_RATE;
    for frame in 0..frames {
        let elapsed = frame_duration * u32::try_from(frame).unwrap_or(u32::MAX);
        simulation.step(elapsed, &scripted_input(frame, spawn_every));
    }
    Ok(simulation.finish())
}

/// Input that sweeps the cursor around the screen, spawning on a fixed cadence.
pub(crate) fn scripted_input(frame: u64, spawn_every: u64) -> PlayerInput {
    let leg = (frame / 45) % 4;
    let held = HeldDirections {
        right: leg == 0,
        down: leg == 1,
        left: leg == 2,
        up: leg == 3,
    };
    let spawn = spawn_every > 0 && frame % spawn_every == 0;
    let strong = (frame / spawn_every.max(1)) % 2 == 0;
    let cranking = (frame / 120) % 3 == 1;
    PlayerInput {
        held,
        pressed: PressedActions {
            primary: spawn && strong,
            secondary: spawn && !strong,
        },
        crank_change: if cranking { 12.0 } else { 0.0 },
        crank_docked: !cranking,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_time_converts_to_samples() {
        let simulation = Simulation::new(Config::default()).expect("default config is valid");
        assert_eq!(simulation.samples_since_start(Duration::from_secs(2)), 88_200);
        assert_eq!(simulation.samples_since_start(Duration::from_millis(500)), 22_050);
    }

    #[test]
    fn scripted_input_alternates_spawn_kinds() {
        let first = scripted_input(0, 10);
        assert!(first.pressed.primary && !first.pressed.secondary);
        let second = scripted_input(10, 10);
        assert!(!second.pressed.primary && second.pressed.secondary);
        assert_eq!(scripted_input(5, 10).pressed, PressedActions::default());
    }

    #[test]
    fn headless_session_stays_within_capacity() {
        let summary = run_headless(Config::default(), 900, 15).expect("default config is valid");
        assert_eq!(summary.frames, 900);
        assert!(summary.simulated_ticks > 44_100 * 29);
        assert!(summary.notes_played > 0);
        assert!(summary.live_at_exit <= 11);
        assert!(summary.spawns_dropped > 0);
    }

    #[test]
    fn finish_releases_collaborator_handles() {
        let mut simulation = Simulation::new(Config::default()).expect("default config is valid");
        for frame in 0..40 {
            let elapsed = Duration::from_millis(33 * frame);
            simulation.step(elapsed, &scripted_input(frame, 8));
        }
        let summary = simulation.finish();
        assert_eq!(summary.nodes_spawned, 5);
        assert_eq!(simulation.audio.voice_count(), 0);
        assert_eq!(simulation.stage.sprite_count(), 0);

        let mut scene = Scene::new(simulation.screen(), Vec::new(), None);
        simulation.populate_scene(&mut scene);
        assert_eq!(scene.hud.map(|hud| hud.live_nodes), Some(0));
    }
}
