#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Player cursor that turns per-frame input into engine commands.

use glam::Vec2;
use pulse_field_core::{Command, NodeKind, PlayerInput, Screen};

/// Distance travelled per frame for each held direction.
pub const PLAYER_STEP: f32 = 3.0;

/// Pure system that tracks the cursor and emits spawn and time-velocity commands.
#[derive(Clone, Debug)]
pub struct Player {
    screen: Screen,
    position: Vec2,
}

impl Player {
    /// Creates a cursor at the centre of the screen.
    #[must_use]
    pub fn new(screen: Screen) -> Self {
        Self {
            screen,
            position: screen.center(),
        }
    }

    /// Current cursor position.
    #[must_use]
    pub const fn position(&self) -> Vec2 {
        self.position
    }

    /// Consumes a frame of input, moving the cursor and emitting commands.
    ///
    /// The primary action wins when both actions are pressed on the same
    /// frame. Crank input is ignored while the crank is docked.
    pub fn handle(&mut self, input: &PlayerInput, out: &mut Vec<Command>) {
        let mut step = Vec2::ZERO;
        if input.held.up {
            step.y -= PLAYER_STEP;
        }
        if input.held.down {
            step.y += PLAYER_STEP;
        }
        if input.held.left {
            step.x -= PLAYER_STEP;
        }
        if input.held.right {
            step.x += PLAYER_STEP;
        }
        self.position = self.screen.wrap(self.position + step);

        let spawn = if input.pressed.primary {
            Some(NodeKind::Strong)
        } else if input.pressed.secondary {
            Some(NodeKind::Weak)
        } else {
            None
        };
        if let Some(kind) = spawn {
            out.push(Command::SpawnNode {
                kind,
                position: self.position,
            });
        }

        if !input.crank_docked && input.crank_change != 0.0 {
            out.push(Command::AdjustTimeVelocity {
                change: input.crank_change,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_field_core::{HeldDirections, PressedActions};

    const SCREEN: Screen = Screen::new(400.0, 240.0);

    #[test]
    fn starts_at_screen_centre() {
        assert_eq!(Player::new(SCREEN).position(), Vec2::new(200.0, 120.0));
    }

    #[test]
    fn opposite_directions_cancel() {
        let mut player = Player::new(SCREEN);
        let input = PlayerInput {
            held: HeldDirections {
                up: true,
                down: true,
                left: false,
                right: true,
            },
            ..PlayerInput::default()
        };
        let mut commands = Vec::new();
        player.handle(&input, &mut commands);
        assert_eq!(player.position(), Vec2::new(203.0, 120.0));
        assert!(commands.is_empty());
    }

    #[test]
    fn primary_action_wins() {
        let mut player = Player::new(SCREEN);
        let input = PlayerInput {
            pressed: PressedActions {
                primary: true,
                secondary: true,
            },
            ..PlayerInput::default()
        };
        let mut commands = Vec::new();
        player.handle(&input, &mut commands);
        assert_eq!(
            commands,
            vec![Command::SpawnNode {
                kind: NodeKind::Strong,
                position: Vec2::new(200.0, 120.0),
            }]
        );
    }
}
