use glam::Vec2;
use pulse_field_core::{Command, HeldDirections, NodeKind, PlayerInput, PressedActions, Screen};
use pulse_field_system_player::Player;

const SCREEN: Screen = Screen::new(400.0, 240.0);

fn holding(held: HeldDirections) -> PlayerInput {
    PlayerInput {
        held,
        ..PlayerInput::default()
    }
}

#[test]
fn cursor_wraps_past_left_edge() {
    let mut player = Player::new(SCREEN);
    let input = holding(HeldDirections {
        left: true,
        ..HeldDirections::default()
    });
    let mut commands = Vec::new();
    for _ in 0..66 {
        player.handle(&input, &mut commands);
    }
    assert_eq!(player.position(), Vec2::new(2.0, 120.0));

    player.handle(&input, &mut commands);
    assert_eq!(player.position(), Vec2::new(399.0, 120.0));
    assert!(commands.is_empty());
}

#[test]
fn cursor_wraps_past_bottom_edge() {
    let mut player = Player::new(SCREEN);
    let input = holding(HeldDirections {
        down: true,
        ..HeldDirections::default()
    });
    let mut commands = Vec::new();
    for _ in 0..41 {
        player.handle(&input, &mut commands);
    }
    assert_eq!(player.position(), Vec2::new(200.0, 3.0));
}

#[test]
fn secondary_action_spawns_weak_node_at_cursor() {
    let mut player = Player::new(SCREEN);
    let input = PlayerInput {
        held: HeldDirections {
            up: true,
            right: true,
            ..HeldDirections::default()
        },
        pressed: PressedActions {
            primary: false,
            secondary: true,
        },
        ..PlayerInput::default()
    };
    let mut commands = Vec::new();
    player.handle(&input, &mut commands);

    assert_eq!(
        commands,
        vec![Command::SpawnNode {
            kind: NodeKind::Weak,
            position: Vec2::new(203.0, 117.0),
        }]
    );
}

#[test]
fn docked_crank_is_ignored() {
    let mut player = Player::new(SCREEN);
    let mut commands = Vec::new();
    player.handle(
        &PlayerInput {
            crank_change: 45.0,
            crank_docked: true,
            ..PlayerInput::default()
        },
        &mut commands,
    );
    assert!(commands.is_empty());

    player.handle(
        &PlayerInput {
            crank_change: 45.0,
            crank_docked: false,
            ..PlayerInput::default()
        },
        &mut commands,
    );
    assert_eq!(
        commands,
        vec![Command::AdjustTimeVelocity { change: 45.0 }]
    );
}

#[test]
fn undocked_crank_without_rotation_emits_nothing() {
    let mut player = Player::new(SCREEN);
    let mut commands = Vec::new();
    player.handle(
        &PlayerInput {
            crank_docked: false,
            ..PlayerInput::default()
        },
        &mut commands,
    );
    assert!(commands.is_empty());
}
