//! E2E CLI tests for the commands that write the board:
//! - `spl reschedule` keeps duration and persists the new dates
//! - `spl resize` moves one edge and clamps inverted targets
//! - unchanged gestures leave the file untouched
//! - a held board lock blocks the write instead of racing it
//!
//! Each test runs `spl` as a subprocess in an isolated temp directory.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use sprintline_core::board::{BoardLock, LOCK_TIMEOUT};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Test Harness
// ---------------------------------------------------------------------------

const BOARD: &str = r#"{
  "items": [
    {
      "id": "a",
      "title": "Checkout flow",
      "start_date": "2024-03-01",
      "delivery_date": "2024-03-08"
    },
    {
      "id": "b",
      "title": "Undated spike"
    }
  ]
}"#;

fn spl_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("spl"));
    cmd.current_dir(dir);
    cmd.env("SPRINTLINE_LOG", "error");
    cmd.env("XDG_CONFIG_HOME", dir.join(".xdg"));
    cmd.env_remove("SPRINTLINE_FORMAT");
    cmd
}

fn project() -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("tempdir");
    let root = dir.path().join(".sprintline");
    fs::create_dir_all(&root).expect("mkdir");
    let board = root.join("board.json");
    fs::write(&board, BOARD).expect("write board");
    (dir, board)
}

fn run_json(dir: &Path, args: &[&str]) -> Value {
    let output = spl_cmd(dir)
        .args(args)
        .args(["--today", "2024-03-20", "--json"])
        .output()
        .expect("spl should not crash");
    assert!(
        output.status.success(),
        "spl {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("valid JSON")
}

fn stored_item(board: &Path, id: &str) -> Value {
    let json: Value = serde_json::from_str(&fs::read_to_string(board).expect("read board"))
        .expect("board stays valid JSON");
    json["items"]
        .as_array()
        .expect("items")
        .iter()
        .find(|item| item["id"] == id)
        .cloned()
        .expect("item present")
}

// ---------------------------------------------------------------------------
// reschedule
// ---------------------------------------------------------------------------

#[test]
fn reschedule_keeps_duration_and_saves() {
    let (dir, board) = project();
    let json = run_json(dir.path(), &["reschedule", "a", "--start", "2024-04-02"]);
    assert_eq!(json["changed"], true);
    assert_eq!(json["start_date"], "2024-04-02");
    assert_eq!(json["delivery_date"], "2024-04-09");

    let item = stored_item(&board, "a");
    assert_eq!(item["start_date"], "2024-04-02");
    assert_eq!(item["delivery_date"], "2024-04-09");
    assert!(item["updated_at"].is_string());
}

#[test]
fn reschedule_to_same_start_leaves_file_alone() {
    let (dir, board) = project();
    let json = run_json(dir.path(), &["reschedule", "a", "--start", "2024-03-01"]);
    assert_eq!(json["changed"], false);
    assert_eq!(fs::read_to_string(&board).expect("read"), BOARD);
}

#[test]
fn reschedule_undated_item_gets_default_week() {
    let (dir, board) = project();
    run_json(dir.path(), &["reschedule", "b", "--start", "2024-05-06"]);
    let item = stored_item(&board, "b");
    assert_eq!(item["start_date"], "2024-05-06");
    assert_eq!(item["delivery_date"], "2024-05-13");
}

#[test]
fn reschedule_unknown_item_fails_with_code() {
    let (dir, _board) = project();
    spl_cmd(dir.path())
        .args(["reschedule", "zzz", "--start", "2024-04-02"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error[E2001]"));
}

#[test]
fn reschedule_unknown_item_json_error_is_rendered_once() {
    let (dir, _board) = project();
    let output = spl_cmd(dir.path())
        .args(["reschedule", "zzz", "--start", "2024-04-02", "--json"])
        .output()
        .expect("spl should not crash");
    assert_eq!(output.status.code(), Some(1));
    let err: Value = serde_json::from_slice(&output.stderr).expect("single JSON error on stderr");
    assert_eq!(err["error"]["error_code"], "E2001");
}

#[test]
fn reschedule_waits_on_held_lock_and_leaves_board_alone() {
    let (dir, board) = project();
    let held = BoardLock::acquire(&board, LOCK_TIMEOUT).expect("lock");

    spl_cmd(dir.path())
        .args(["reschedule", "a", "--start", "2024-04-02", "--today", "2024-03-20"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error[E5002]"));
    drop(held);

    assert_eq!(fs::read_to_string(&board).expect("read board"), BOARD);
}

#[test]
fn reschedule_text_output_is_tab_separated() {
    let (dir, _board) = project();
    spl_cmd(dir.path())
        .args(["reschedule", "a", "--start", "2024-03-04", "--format", "text"])
        .assert()
        .success()
        .stdout("a\t2024-03-04\t2024-03-11\n");
}

// ---------------------------------------------------------------------------
// resize
// ---------------------------------------------------------------------------

#[test]
fn resize_end_moves_delivery_only() {
    let (dir, board) = project();
    let json = run_json(dir.path(), &["resize", "a", "--edge", "end", "--to", "2024-03-20"]);
    assert_eq!(json["start_date"], "2024-03-01");
    assert_eq!(json["delivery_date"], "2024-03-20");
    assert_eq!(stored_item(&board, "a")["delivery_date"], "2024-03-20");
}

#[test]
fn resize_start_past_end_is_clamped() {
    let (dir, board) = project();
    run_json(dir.path(), &["resize", "a", "--edge", "start", "--to", "2024-03-30"]);
    let item = stored_item(&board, "a");
    assert_eq!(item["start_date"], "2024-03-07");
    assert_eq!(item["delivery_date"], "2024-03-08");
}

#[test]
fn resize_end_before_start_is_clamped() {
    let (dir, board) = project();
    run_json(dir.path(), &["resize", "a", "--edge", "end", "--to", "2024-02-10"]);
    assert_eq!(stored_item(&board, "a")["delivery_date"], "2024-03-02");
}

#[test]
fn resize_requires_valid_edge() {
    let (dir, _board) = project();
    spl_cmd(dir.path())
        .args(["resize", "a", "--edge", "middle", "--to", "2024-03-20"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn board_path_flag_targets_other_file() {
    let dir = TempDir::new().expect("tempdir");
    let board = dir.path().join("team.json");
    fs::write(&board, BOARD).expect("write");
    spl_cmd(dir.path())
        .args(["reschedule", "a", "--start", "2024-03-05", "--today", "2024-03-20", "--board"])
        .arg(&board)
        .assert()
        .success();
    assert_eq!(stored_item(&board, "a")["start_date"], "2024-03-05");
    assert!(!dir.path().join(".sprintline").exists());
}
