use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

fn speedsift() -> Command {
    Command::cargo_bin("speedsift").expect("binary")
}

fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

const GUANGZHOU_SNAPSHOT: &str = r#"[
    {"id": "1", "sponsor": "China Telecom", "location": "Guangzhou"},
    {"id": "2", "sponsor": "China Unicom", "location": "Guangzhou"}
]"#;

const SCENARIO_PLAN: &str = r#"
[[groups]]
name = "scenario"

[[groups.tests]]
keyword = "Telecom"
location = "Guangzhou"
label = "CT"

[[groups.tests]]
keyword = "Mobile"
location = "Guangzhou"
label = "CM"
"#;

#[test]
fn resolves_first_match_and_reports_no_match() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot = write(dir.path(), "servers.json", GUANGZHOU_SNAPSHOT);
    let plan = write(dir.path(), "plan.toml", SCENARIO_PLAN);

    speedsift()
        .arg("--plan")
        .arg(&plan)
        .arg("resolve")
        .arg("--directory")
        .arg(&snapshot)
        .assert()
        .success()
        .stdout(predicate::str::contains("[CT] -> 1"))
        .stdout(predicate::str::contains("[CM] -> no match"));
}

#[test]
fn or_mode_restricts_location_to_the_location_field() {
    let dir = tempfile::tempdir().unwrap();
    // Location text appears only in the name; combined-AND finds it, the
    // per-field OR mode must not.
    let snapshot = write(
        dir.path(),
        "servers.json",
        r#"[{"id": "9", "sponsor": "Acme", "name": "Edge Guangzhou", "location": null}]"#,
    );
    let plan = write(
        dir.path(),
        "plan.toml",
        r#"
[[groups]]
name = "only"

[[groups.tests]]
keyword = "Acme"
location = "Guangzhou"
label = "edge"
"#,
    );

    speedsift()
        .arg("--plan")
        .arg(&plan)
        .arg("resolve")
        .arg("--directory")
        .arg(&snapshot)
        .assert()
        .success()
        .stdout(predicate::str::contains("[edge] -> 9"));

    speedsift()
        .arg("--plan")
        .arg(&plan)
        .arg("--match-mode")
        .arg("or")
        .arg("resolve")
        .arg("--directory")
        .arg(&snapshot)
        .assert()
        .success()
        .stdout(predicate::str::contains("[edge] -> no match"));
}

#[test]
fn servers_lists_directory_entries() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot = write(dir.path(), "servers.json", GUANGZHOU_SNAPSHOT);

    speedsift()
        .arg("servers")
        .arg("--directory")
        .arg(&snapshot)
        .assert()
        .success()
        .stdout(predicate::str::contains("China Telecom"))
        .stdout(predicate::str::contains("China Unicom"));
}

#[test]
fn unreadable_snapshot_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    speedsift()
        .arg("resolve")
        .arg("--directory")
        .arg(dir.path().join("missing.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load directory snapshot"));
}
