#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Per-frame entry point that sequences the engine's commands.
//!
//! Each frame advances the clock, applies the player's input, runs the touch
//! and pitch-field schedules and finally asks the sprite service to render.

use glam::Vec2;
use pulse_field_core::{Collaborators, Command, Event, PlayerInput, SpriteHandle, SpriteImage};
use pulse_field_system_clock::Clock;
use pulse_field_system_player::Player;
use pulse_field_world::{apply, query, World};

/// Drives a world once per display refresh.
#[derive(Debug)]
pub struct TickDriver {
    player: Player,
    player_sprite: SpriteHandle,
    commands: Vec<Command>,
}

impl TickDriver {
    /// Installs the channel's initial tone shaping and the player sprite.
    #[must_use]
    pub fn new(world: &World, collaborators: &mut Collaborators<'_>) -> Self {
        collaborators
            .audio
            .set_tone_shaping(Clock::initial_tone_shaping());

        let player = Player::new(query::screen(world));
        let player_sprite = collaborators.sprites.create_sprite(SpriteImage::Player);
        collaborators.sprites.add_to_scene(player_sprite);
        collaborators
            .sprites
            .move_to(player_sprite, player.position());
        tracing::debug!(sprite = player_sprite.get(), "tick driver ready");

        Self {
            player,
            player_sprite,
            commands: Vec::new(),
        }
    }

    /// Current player cursor position.
    #[must_use]
    pub fn player_position(&self) -> Vec2 {
        self.player.position()
    }

    /// Runs one frame of the engine.
    pub fn frame(
        &mut self,
        world: &mut World,
        collaborators: &mut Collaborators<'_>,
        real_now: u64,
        input: &PlayerInput,
        out_events: &mut Vec<Event>,
    ) {
        apply(
            world,
            Command::AdvanceClock { real_now },
            collaborators,
            out_events,
        );

        self.player.handle(input, &mut self.commands);
        collaborators
            .sprites
            .move_to(self.player_sprite, self.player.position());
        for command in self.commands.drain(..) {
            apply(world, command, collaborators, out_events);
        }

        apply(world, Command::RunSchedules, collaborators, out_events);
        collaborators.sprites.render_all();
    }

    /// Frees every live node and releases the player sprite.
    pub fn shutdown(
        self,
        world: &mut World,
        collaborators: &mut Collaborators<'_>,
        out_events: &mut Vec<Event>,
    ) {
        world.shutdown(collaborators, out_events);
        collaborators.sprites.remove_from_scene(self.player_sprite);
        collaborators.sprites.destroy_sprite(self.player_sprite);
    }
}
