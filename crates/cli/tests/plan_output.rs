use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

fn speedsift() -> Command {
    Command::cargo_bin("speedsift").expect("binary")
}

#[test]
fn builtin_plan_prints_groups_in_order() {
    speedsift()
        .arg("plan")
        .assert()
        .success()
        .stdout(predicate::str::contains("match mode: and"))
        .stdout(predicate::str::contains("== Regional ISPs =="))
        .stdout(predicate::str::contains("== International nodes =="))
        .stdout(predicate::str::contains(
            "[Telecom / Guangzhou] keyword='China Telecom' location='Guangzhou'",
        ));
}

#[test]
fn match_mode_flag_wins_over_plan_file() {
    let dir = tempfile::tempdir().unwrap();
    let plan = dir.path().join("plan.toml");
    fs::write(
        &plan,
        r#"
match_mode = "and"

[[groups]]
name = "only"

[[groups.tests]]
keyword = "Acme"
location = "Guangzhou"
"#,
    )
    .unwrap();

    speedsift()
        .arg("--plan")
        .arg(&plan)
        .arg("--match-mode")
        .arg("or")
        .arg("plan")
        .assert()
        .success()
        .stdout(predicate::str::contains("match mode: or"));
}

#[test]
fn empty_hints_are_warned_about_but_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let plan = dir.path().join("plan.toml");
    fs::write(
        &plan,
        r#"
[[groups]]
name = "loose"

[[groups.tests]]
keyword = ""
location = "Guangzhou"
"#,
    )
    .unwrap();

    speedsift()
        .arg("--plan")
        .arg(&plan)
        .arg("plan")
        .assert()
        .success()
        .stderr(predicate::str::contains("empty keyword"));
}

#[test]
fn invalid_plan_is_a_fatal_error() {
    let dir = tempfile::tempdir().unwrap();
    let plan = dir.path().join("plan.toml");
    fs::write(&plan, "groups = 3\n").unwrap();

    speedsift()
        .arg("--plan")
        .arg(&plan)
        .arg("plan")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid test plan"));
}

#[test]
fn plan_without_queries_is_a_fatal_error() {
    let dir = tempfile::tempdir().unwrap();
    let plan = dir.path().join("plan.toml");
    fs::write(&plan, "[[groups]]\nname = \"empty\"\n").unwrap();

    speedsift()
        .arg("--plan")
        .arg(&plan)
        .arg("plan")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no queries"));
}
