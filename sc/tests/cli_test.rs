//! CLI tests for the `sc` binary

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use subcurator::Plan;
use tempfile::TempDir;

/// `sc` with config, data and cwd pointed into `dir`
fn sc(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("sc").expect("sc binary");
    cmd.current_dir(dir)
        .env("HOME", dir)
        .env("XDG_CONFIG_HOME", dir.join("config"))
        .env("XDG_DATA_HOME", dir.join("data"))
        .env("NO_COLOR", "1");
    cmd
}

fn write(dir: &Path, name: &str, content: &str) -> String {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path.to_string_lossy().to_string()
}

fn write_plan(dir: &Path, name: &str, plan: &Plan) -> String {
    write(dir, name, &serde_json::to_string(plan).unwrap())
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_score_lists_active_subreddits() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path();
    let subs = write(dir, "subs.txt", "golang\nnews\nrust\n# comment\n");
    let up = write(dir, "up.txt", "r/rust\nbaking\n");
    let com = write(dir, "com.txt", "golang\n");

    sc(dir)
        .args(["score", "--subscribed", &subs, "--upvoted", &up, "--commented", &com])
        .assert()
        .success()
        .stdout("r/golang\nr/rust\n");

    sc(dir)
        .args(["score", "--subscribed", &subs, "--upvoted", &up, "--threshold", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("r/baking"))
        .stdout(predicate::str::contains("r/news"));
}

#[test]
fn test_score_rejects_bad_threshold() {
    let temp = TempDir::new().unwrap();
    sc(temp.path())
        .args(["score", "--threshold", "4"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("between 1 and 3"));
}

#[test]
fn test_classify_prints_intent_json() {
    let temp = TempDir::new().unwrap();
    sc(temp.path())
        .args(["classify", "show", "my", "subs"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"show_sub_list\": true"));

    sc(temp.path())
        .args(["classify", "--exclusion", "don't", "add", "r/baking"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"exclusion_only\": true"));
}

#[test]
fn test_parse_reads_stdin() {
    let temp = TempDir::new().unwrap();
    let output = sc(temp.path())
        .args(["parse", "--format", "json"])
        .write_stdin("Here you go:\n+ r/a\n- r/b\n= r/c\n")
        .output()
        .unwrap();

    assert!(output.status.success());
    let plan: Plan = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(plan.to_add, strings(&["r/a"]));
    assert_eq!(plan.to_remove, strings(&["r/b"]));
    assert_eq!(plan.to_keep, strings(&["r/c"]));
    assert!(plan.explanations.is_empty());
}

#[test]
fn test_parse_text_output() {
    let temp = TempDir::new().unwrap();
    let reply = write(temp.path(), "reply.txt", "+ r/Breadit - bread at home\n");

    sc(temp.path())
        .args(["parse", &reply])
        .assert()
        .success()
        .stdout("To Add:\n + r/Breadit (bread at home)\n");
}

#[test]
fn test_reconcile_keep_and_subscribed_filter() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path();
    let previous = write_plan(
        dir,
        "prev.json",
        &Plan {
            to_remove: strings(&["r/news"]),
            ..Default::default()
        },
    );
    let reply = write(dir, "reply.txt", "- r/news - noisy\n+ r/chess - strategy\n+ r/golang - go\n");
    let subs = write(dir, "subs.txt", "golang\nnews\n");

    let output = sc(dir)
        .args([
            "reconcile",
            "--reply",
            &reply,
            "--previous",
            &previous,
            "--subscribed",
            &subs,
            "--format",
            "json",
            "keep",
            "r/news",
        ])
        .output()
        .unwrap();

    assert!(output.status.success());
    let plan: Plan = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(plan.to_add, strings(&["r/chess"]));
    assert!(plan.to_remove.is_empty());
    assert_eq!(plan.to_keep, strings(&["r/news"]));
}

#[test]
fn test_merge_cancels_contradictions() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path();
    let a = write_plan(
        dir,
        "a.json",
        &Plan {
            to_add: strings(&["r/rust", "r/chess"]),
            ..Default::default()
        },
    );
    let b = write_plan(
        dir,
        "b.json",
        &Plan {
            to_add: strings(&["r/go"]),
            to_remove: strings(&["r/Chess"]),
            ..Default::default()
        },
    );

    let output = sc(dir).args(["merge", &a, &b, "--format", "json"]).output().unwrap();

    assert!(output.status.success());
    let plan: Plan = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(plan.to_add, strings(&["r/go", "r/rust"]));
    assert!(plan.to_remove.is_empty());
}

#[test]
fn test_prompt_lists_active_subreddits() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path();
    let subs = write(dir, "subs.txt", "golang\nrust\n");
    let up = write(dir, "up.txt", "rust\n");
    let state = dir.join("state.json");

    sc(dir)
        .args(["prompt", "--state", state.to_str().unwrap(), "--subscribed", &subs, "--upvoted", &up])
        .args(["I", "like", "baking"])
        .assert()
        .success()
        .stdout(predicate::str::contains("I like baking"))
        .stdout(predicate::str::contains("r/rust\n"))
        .stdout(predicate::str::contains("r/golang\n").not());
}

#[test]
fn test_turn_show_exclude_reset() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path();
    let state = dir.join("state.json");
    let state_arg = state.to_str().unwrap();
    let subs = write(dir, "subs.txt", "golang\nnews\n");
    let reply = write(
        dir,
        "reply.txt",
        "Baking:\n+ r/Breadit - bread\n+ r/Sourdough - starters\n+ r/golang - go\n",
    );

    // Model turn
    let output = sc(dir)
        .args(["turn", "--state", state_arg, "--reply", &reply, "--subscribed", &subs])
        .args(["--format", "json", "I'm", "into", "baking"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let outcome: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(outcome["kind"], "model");
    assert_eq!(outcome["model_called"], true);
    assert!(state.exists());

    let output = sc(dir)
        .args(["show", "--state", state_arg, "--format", "json"])
        .output()
        .unwrap();
    let plan: Plan = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(plan.to_add, strings(&["r/Breadit", "r/Sourdough"]));

    // Exclusion-only turn needs no reply file
    sc(dir)
        .args(["turn", "--state", state_arg, "don't", "add", "r/Sourdough"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Excluded based on your feedback"))
        .stdout(predicate::str::contains("- r/Sourdough"));

    sc(dir)
        .args(["show", "--state", state_arg])
        .assert()
        .success()
        .stdout("To Add:\n + r/Breadit (bread)\n");

    sc(dir)
        .args(["reset", "--state", state_arg])
        .assert()
        .success()
        .stdout(predicate::str::contains("Conversation reset"));
    assert!(!state.exists());

    sc(dir)
        .args(["show", "--state", state_arg])
        .assert()
        .success()
        .stdout("= No changes needed.\n");
}

#[test]
fn test_turn_without_reply_fails_when_model_needed() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path();
    let state = dir.join("state.json");

    sc(dir)
        .args(["turn", "--state", state.to_str().unwrap(), "I", "like", "chess"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--reply"));
    assert!(!state.exists());
}

#[test]
fn test_turn_show_subs_is_view_only() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path();
    let state = dir.join("state.json");
    let subs = write(dir, "subs.txt", "golang\n");
    let up = write(dir, "up.txt", "baking\n");

    let output = sc(dir)
        .args(["turn", "--state", state.to_str().unwrap(), "--subscribed", &subs, "--upvoted", &up])
        .args(["--format", "json", "show", "my", "subs"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let outcome: TurnOutcomeView = serde_json::from_slice(&output.stdout).unwrap();
    assert!(outcome.view_only);
    assert!(outcome.reply.contains("* r/baking (upvoted-only)"));
    assert!(!state.exists());
}

#[derive(serde::Deserialize)]
struct TurnOutcomeView {
    view_only: bool,
    reply: String,
}

#[test]
fn test_config_file_is_validated() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path();
    let config = write(dir, "bad.yml", "scoring:\n  active-threshold: 5\n");

    sc(dir)
        .args(["--config", &config, "show", "--state", "state.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("active-threshold"));
}

#[test]
fn test_local_config_sets_threshold() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path();
    write(dir, ".subcurator.yml", "scoring:\n  active-threshold: 1\n");
    let subs = write(dir, "subs.txt", "golang\n");

    sc(dir)
        .args(["score", "--subscribed", &subs])
        .assert()
        .success()
        .stdout("r/golang\n");
}

