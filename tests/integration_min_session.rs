// Minimal integration test that drives the compiled binary through a PTY.
// This exercises the real event loop and crossterm input handling across
// the main boundaries without relying on internal modules.
//
// Notes:
// - Requires a TTY; uses expectrl which allocates a pseudo terminal.
// - Marked Unix-only and ignored by default to avoid CI/platform issues.
// - Run manually via: `cargo test --test integration_min_session -- --ignored`.

#![cfg(unix)]

use std::time::Duration;

use expectrl::{spawn, Eof};

#[test]
#[ignore]
fn started_timer_stops_and_exits() -> Result<(), Box<dyn std::error::Error>> {
    let state = tempfile::tempdir()?;
    let config = state.path().join("config.json");
    std::fs::write(&config, r#"{"background_alarm": false}"#)?;

    let bin = assert_cmd::cargo::cargo_bin("nazotimer");
    let cmd = format!(
        "{} --no-sound --state-dir {} --config {} -m 1 -c bus",
        bin.display(),
        state.path().display(),
        config.display()
    );

    let mut p = spawn(cmd)?;
    std::thread::sleep(Duration::from_millis(300));

    // first key dismisses the background alarm notice, the second stops
    p.send("s")?;
    p.send("s")?;
    std::thread::sleep(Duration::from_millis(200));

    p.send("\x1b")?; // ESC
    p.expect(Eof)?;

    let prefs = std::fs::read_to_string(state.path().join("prefs.json"))?;
    assert!(!prefs.contains("end_time"), "stop clears the session: {prefs}");
    Ok(())
}
