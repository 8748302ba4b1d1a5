use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;

fn planner() -> Command {
    let mut cmd = Command::cargo_bin("planner").expect("planner binary");
    cmd.env("PLANNER_CONFIG", "/dev/null")
        .env("PLANNER_TIMEZONE", "UTC")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn lists_fixture_tasks() {
    planner()
        .write_stdin("tasks --status pending\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Complete project proposal"))
        .stdout(predicate::str::contains("Review team feedback"))
        .stdout(predicate::str::contains("Write technical documentation").not());
}

#[test]
fn no_fixtures_starts_empty() {
    planner()
        .arg("--no-fixtures")
        .write_stdin("tasks\ngoals\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("No tasks found."))
        .stdout(predicate::str::contains("No goals found."));
}

#[test]
fn add_then_find_task() {
    planner()
        .arg("--no-fixtures")
        .write_stdin("add task --title \"Ship release\" --priority high\ntasks ship\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created task "))
        .stdout(predicate::str::contains("Ship release"))
        .stdout(predicate::str::contains("high"));
}

#[test]
fn errors_are_reported_and_session_continues() {
    planner()
        .write_stdin("settings snooze 99\nbogus\nsettings\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("error: snooze duration must be 1-30 minutes"))
        .stdout(predicate::str::contains("error: unrecognized subcommand"))
        .stdout(predicate::str::contains("snooze         5 min"));
}

#[test]
fn export_prints_json() {
    planner()
        .args(["--set", "settings.dark_mode=on"])
        .write_stdin("export\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"dark_mode\": true"))
        .stdout(predicate::str::contains("\"title\": \"Learn React Advanced Patterns\""));
}

#[test]
fn archive_lists_completed_items() {
    planner()
        .write_stdin("archive --kind goal\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Archive: 6 total (3 tasks, 2 events, 1 goal)"))
        .stdout(predicate::str::contains("Complete TypeScript Course"))
        .stdout(predicate::str::contains("Will be deleted soon"));
}

#[test]
fn quit_stops_reading() {
    planner()
        .arg("--no-fixtures")
        .write_stdin("quit\nadd task --title Late\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created").not());
}

#[test]
fn invalid_config_file_fails_startup() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(file, "[archive]\nretention_days = 0").expect("write config");

    planner()
        .arg("--config")
        .arg(file.path())
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("retention_days must be at least 1"));
}

#[test]
fn unknown_override_key_fails_startup() {
    planner()
        .args(["--set", "colour=off"])
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown config key: colour"));
}
