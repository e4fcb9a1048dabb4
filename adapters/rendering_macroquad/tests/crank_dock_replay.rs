use pulse_field_rendering_macroquad::{CrankDock, MacroquadBackend};

fn run_sequence(sequence: &[bool]) -> Vec<bool> {
    let mut dock = CrankDock::default();
    let mut states = Vec::new();
    for &pressed in sequence {
        if pressed {
            dock.register_toggle();
        }
        states.push(dock.is_docked());
    }
    states
}

#[test]
fn crank_starts_docked() {
    assert!(CrankDock::default().is_docked());
}

#[test]
fn dock_toggle_sequence_is_deterministic() {
    let button_sequence = [false, true, false, true, true, false];
    let expected = vec![true, false, false, true, false, false];

    let first_run = run_sequence(&button_sequence);
    let second_run = run_sequence(&button_sequence);

    assert_eq!(first_run, expected);
    assert_eq!(first_run, second_run);
}

#[test]
fn backend_builder_compiles_without_a_window() {
    let _backend = MacroquadBackend::new()
        .with_vsync(false)
        .with_show_fps(true)
        .with_sprite_loading(false)
        .with_manifest_path("assets/manifest.toml");
}
