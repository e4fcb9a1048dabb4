use std::process::Command;

#[test]
fn cli_compiles_without_warnings() {
    let status = Command::new(env!("CARGO"))
        .current_dir(env!("CARGO_MANIFEST_DIR"))
        .args(["check", "--quiet", "--bin", "pulse-field"])
        .status()
        .expect("failed to invoke cargo check for pulse-field CLI binary");

    assert!(status.success(), "cargo check --bin pulse-field should succeed");
}

#[test]
fn headless_session_prints_summary() {
    let output = Command::new(env!("CARGO_BIN_EXE_pulse-field"))
        .args(["headless", "--frames", "240", "--spawn-every", "12", "--seed", "7"])
        .env("RUST_LOG", "warn")
        .output()
        .expect("failed to run pulse-field headless");

    assert!(output.status.success(), "headless run should exit cleanly");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("frames: 240"), "unexpected summary: {stdout}");
    assert!(stdout.contains("nodes spawned: "), "unexpected summary: {stdout}");
    assert!(stdout.contains("live at exit: "), "unexpected summary: {stdout}");
}
