use assert_cmd::Command;
use std::fs;
use std::path::Path;

fn nazotimer(state: &Path) -> Command {
    let mut cmd = Command::cargo_bin("nazotimer").unwrap();
    cmd.arg("--no-sound")
        .arg("--state-dir")
        .arg(state)
        .arg("--config")
        .arg(state.join("config.json"));
    cmd
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[test]
fn status_of_fresh_state_is_idle() {
    let dir = tempfile::tempdir().unwrap();
    nazotimer(dir.path())
        .arg("status")
        .assert()
        .success()
        .stdout("phase: idle\n");
}

#[test]
fn status_reports_running_session() {
    let dir = tempfile::tempdir().unwrap();
    let end = now_ms() + 10 * 60 * 1000;
    fs::write(
        dir.path().join("prefs.json"),
        format!(r#"{{"end_time": {end}, "selected_car": 4, "timer_finished": false}}"#),
    )
    .unwrap();

    let out = nazotimer(dir.path()).arg("status").output().unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8(out.stdout).unwrap();
    assert!(stdout.starts_with("phase: running"), "{stdout}");
    assert!(stdout.contains("パトカー"), "{stdout}");
    assert!(stdout.contains("ends at: "), "{stdout}");
}

#[test]
fn fire_marks_session_finished() {
    let dir = tempfile::tempdir().unwrap();
    let end = now_ms() - 1;
    fs::write(
        dir.path().join("prefs.json"),
        format!(r#"{{"end_time": {end}, "selected_car": 1}}"#),
    )
    .unwrap();

    nazotimer(dir.path())
        .args(["fire", "--at", &end.to_string()])
        .assert()
        .success();

    let prefs: serde_json::Value =
        serde_json::from_slice(&fs::read(dir.path().join("prefs.json")).unwrap()).unwrap();
    assert_eq!(prefs["timer_finished"], serde_json::Value::Bool(true));

    let out = nazotimer(dir.path()).arg("status").output().unwrap();
    let stdout = String::from_utf8(out.stdout).unwrap();
    assert!(stdout.starts_with("phase: finished"), "{stdout}");
}

#[test]
fn fire_for_replaced_session_does_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let end = now_ms() + 60_000;
    fs::write(
        dir.path().join("prefs.json"),
        format!(r#"{{"end_time": {end}, "selected_car": 1}}"#),
    )
    .unwrap();

    nazotimer(dir.path())
        .args(["fire", "--at", "1000"])
        .assert()
        .success();

    let prefs: serde_json::Value =
        serde_json::from_slice(&fs::read(dir.path().join("prefs.json")).unwrap()).unwrap();
    assert_ne!(prefs["timer_finished"], serde_json::Value::Bool(true));
}

#[test]
fn reset_clears_saved_timer() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("prefs.json"),
        r#"{"end_time": 1, "selected_car": 2, "timer_finished": true}"#,
    )
    .unwrap();

    nazotimer(dir.path())
        .arg("reset")
        .assert()
        .success()
        .stdout("cleared\n");
    nazotimer(dir.path())
        .arg("status")
        .assert()
        .success()
        .stdout("phase: idle\n");
}

#[test]
fn logs_land_in_state_dir() {
    let dir = tempfile::tempdir().unwrap();
    nazotimer(dir.path()).arg("reset").assert().success();
    assert!(dir.path().join("nazotimer.log").exists());
}
