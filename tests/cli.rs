//! End-to-end tests for the `tasktrack` binary.
//!
//! Every test works on its own task file inside a temporary directory, so
//! the default file in the user's data directory is never touched.

use assert_cmd::Command;
use chrono::{Duration, Local};
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[allow(deprecated)]
fn tasktrack(file: &Path) -> Command {
    let mut cmd = Command::cargo_bin("tasktrack").unwrap();
    cmd.env_remove("RUST_LOG").arg("-f").arg(file);
    cmd
}

fn task_file(dir: &TempDir, name: &str) -> PathBuf {
    dir.path().join(name)
}

fn run_ok(file: &Path, args: &[&str]) {
    tasktrack(file).args(args).assert().success();
}

fn days_from_now(days: i64) -> String {
    (Local::now() + Duration::days(days))
        .format("%Y-%m-%d")
        .to_string()
}

/// Active, completed, due tomorrow and overdue tasks, ids 1 to 4.
fn setup_tasks(file: &Path) {
    run_ok(file, &["add", "Active task"]);
    run_ok(file, &["add", "Completed task"]);
    run_ok(file, &["done", "2"]);
    run_ok(file, &["add", "Tomorrow task", "--due", days_from_now(1).as_str()]);
    run_ok(file, &["add", "Overdue task", "--due", days_from_now(-1).as_str()]);
}

#[test]
fn add_simple_task() {
    let dir = TempDir::new().unwrap();
    let file = task_file(&dir, "tasks.json");

    tasktrack(&file)
        .args(&["add", "Buy groceries"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added task #1: Buy groceries"))
        .stderr(predicate::str::is_empty());
    assert!(file.exists());
}

#[test]
fn add_with_due_date_shows_remaining_time() {
    let dir = TempDir::new().unwrap();
    let file = task_file(&dir, "tasks.json");

    tasktrack(&file)
        .args(&["add", "Important task", "--due", days_from_now(2).as_str()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added task #1: Important task"))
        .stdout(predicate::str::contains("Due:"))
        .stdout(predicate::str::contains("remaining"));
}

#[test]
fn add_with_relative_date() {
    let dir = TempDir::new().unwrap();
    let file = task_file(&dir, "tasks.json");

    tasktrack(&file)
        .args(&["add", "Do today", "--due", "TODAY"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Due:"))
        .stdout(predicate::str::contains("23:59"));
}

#[test]
fn add_with_invalid_date_fails() {
    let dir = TempDir::new().unwrap();
    let file = task_file(&dir, "tasks.json");

    tasktrack(&file)
        .args(&["add", "Task", "--due", "invalid-date"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Error:"))
        .stderr(predicate::str::contains(
            "Unrecognized date format: 'invalid-date'",
        ));
    assert!(!file.exists());
}

#[test]
fn add_blank_title_fails() {
    let dir = TempDir::new().unwrap();
    let file = task_file(&dir, "tasks.json");

    tasktrack(&file)
        .args(&["add", "   "])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Task title cannot be empty"));
}

#[test]
fn ids_keep_counting_after_delete() {
    let dir = TempDir::new().unwrap();
    let file = task_file(&dir, "tasks.json");

    run_ok(&file, &["add", "First"]);
    run_ok(&file, &["add", "Second"]);
    run_ok(&file, &["add", "Third"]);
    run_ok(&file, &["delete", "2", "--no-confirm"]);

    tasktrack(&file)
        .args(&["add", "Fourth"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added task #4: Fourth"));
}

#[test]
fn file_flag_after_subcommand() {
    let dir = TempDir::new().unwrap();
    let file = task_file(&dir, "tasks.json");

    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("tasktrack").unwrap();
    cmd.args(&["add", "Late flag", "-f"])
        .arg(&file)
        .assert()
        .success();
    assert!(fs::read_to_string(&file).unwrap().contains("Late flag"));
}

#[test]
fn list_active_tasks() {
    let dir = TempDir::new().unwrap();
    let file = task_file(&dir, "tasks.json");
    setup_tasks(&file);

    tasktrack(&file)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("Active Tasks"))
        .stdout(predicate::str::contains("#1 [ ] Active task"))
        .stdout(predicate::str::contains("#3 [ ] Tomorrow task"))
        .stdout(predicate::str::contains("#4 [ ] Overdue task"))
        .stdout(predicate::str::contains("Completed task").not());
}

#[test]
fn list_all_tasks() {
    let dir = TempDir::new().unwrap();
    let file = task_file(&dir, "tasks.json");
    setup_tasks(&file);

    tasktrack(&file)
        .args(&["list", "--all"])
        .assert()
        .success()
        .stdout(predicate::str::contains("All Tasks"))
        .stdout(predicate::str::contains("#2 [x] Completed task"))
        .stdout(predicate::str::contains("Active task"));
}

#[test]
fn list_upcoming_tasks() {
    let dir = TempDir::new().unwrap();
    let file = task_file(&dir, "tasks.json");
    setup_tasks(&file);

    tasktrack(&file)
        .args(&["list", "--upcoming"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Upcoming Tasks"))
        .stdout(predicate::str::contains("Tomorrow task"))
        .stdout(predicate::str::contains("Overdue task").not());
}

#[test]
fn list_overdue_tasks() {
    let dir = TempDir::new().unwrap();
    let file = task_file(&dir, "tasks.json");
    setup_tasks(&file);

    tasktrack(&file)
        .args(&["list", "--overdue"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Overdue Tasks"))
        .stdout(predicate::str::contains("Overdue task"))
        .stdout(predicate::str::contains("OVERDUE"))
        .stdout(predicate::str::contains("Tomorrow task").not());
}

#[test]
fn list_empty() {
    let dir = TempDir::new().unwrap();
    let file = task_file(&dir, "tasks.json");

    tasktrack(&file)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No tasks found"));
}

#[test]
fn list_unicode_titles() {
    let dir = TempDir::new().unwrap();
    let file = task_file(&dir, "tasks.json");
    for title in &["Tâche française", "タスク日本語", "Задача русский"] {
        run_ok(&file, &["add", *title]);
    }

    tasktrack(&file)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("Tâche française"))
        .stdout(predicate::str::contains("タスク日本語"))
        .stdout(predicate::str::contains("Задача русский"));
}

#[test]
fn mark_task_done() {
    let dir = TempDir::new().unwrap();
    let file = task_file(&dir, "tasks.json");
    run_ok(&file, &["add", "Complete me"]);

    tasktrack(&file)
        .args(&["done", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Completed task #1: Complete me"));

    tasktrack(&file)
        .args(&["list", "--all"])
        .assert()
        .stdout(predicate::str::contains("[x]"));

    tasktrack(&file)
        .args(&["done", "1"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("already completed"));
}

#[test]
fn mark_missing_task_done() {
    let dir = TempDir::new().unwrap();
    let file = task_file(&dir, "tasks.json");

    tasktrack(&file)
        .args(&["done", "999"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("not found"));
}

#[test]
fn delete_task() {
    let dir = TempDir::new().unwrap();
    let file = task_file(&dir, "tasks.json");
    run_ok(&file, &["add", "Delete me"]);

    tasktrack(&file)
        .args(&["delete", "1", "--no-confirm"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted task #1: Delete me"));

    tasktrack(&file)
        .arg("list")
        .assert()
        .stdout(predicate::str::contains("No tasks found"));
}

#[test]
fn delete_asks_for_confirmation() {
    let dir = TempDir::new().unwrap();
    let file = task_file(&dir, "tasks.json");
    run_ok(&file, &["add", "Keep me"]);

    tasktrack(&file)
        .args(&["delete", "1"])
        .write_stdin("n\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Deletion cancelled."));

    tasktrack(&file)
        .arg("list")
        .assert()
        .stdout(predicate::str::contains("Keep me"));

    tasktrack(&file)
        .args(&["delete", "1"])
        .write_stdin("y\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted task #1: Keep me"));
}

#[test]
fn delete_missing_task() {
    let dir = TempDir::new().unwrap();
    let file = task_file(&dir, "tasks.json");

    tasktrack(&file)
        .args(&["delete", "999", "--no-confirm"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("not found"));
}

#[test]
fn start_and_stop_timer_across_runs() {
    let dir = TempDir::new().unwrap();
    let file = task_file(&dir, "tasks.json");
    run_ok(&file, &["add", "Timer task"]);

    tasktrack(&file)
        .args(&["start", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Started timer for task #1: Timer task"));

    tasktrack(&file)
        .arg("list")
        .assert()
        .stdout(predicate::str::contains("⏰"));

    tasktrack(&file)
        .args(&["start", "1"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Timer already running"));

    tasktrack(&file)
        .args(&["stop", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Stopped timer"))
        .stdout(predicate::str::contains("Session time:"))
        .stdout(predicate::str::contains("Total time:"));
}

#[test]
fn start_timer_on_completed_task() {
    let dir = TempDir::new().unwrap();
    let file = task_file(&dir, "tasks.json");
    run_ok(&file, &["add", "Completed task"]);
    run_ok(&file, &["done", "1"]);

    tasktrack(&file)
        .args(&["start", "1"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains(
            "Cannot start timer for completed task",
        ));
}

#[test]
fn stop_timer_not_running() {
    let dir = TempDir::new().unwrap();
    let file = task_file(&dir, "tasks.json");
    run_ok(&file, &["add", "No timer task"]);

    tasktrack(&file)
        .args(&["stop", "1"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("No timer running"));
}

#[test]
fn timer_on_missing_task() {
    let dir = TempDir::new().unwrap();
    let file = task_file(&dir, "tasks.json");

    for command in &["start", "stop"] {
        tasktrack(&file)
            .args(&[*command, "999"])
            .assert()
            .code(1)
            .stdout(predicate::str::contains("not found"));
    }
}

#[test]
fn done_stops_running_timer() {
    let dir = TempDir::new().unwrap();
    let file = task_file(&dir, "tasks.json");
    run_ok(&file, &["add", "First task"]);
    run_ok(&file, &["start", "1"]);
    run_ok(&file, &["done", "1"]);

    let saved: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&file).unwrap()).unwrap();
    assert_eq!(saved[0]["done"], true);
    assert!(saved[0]["timer_start"].is_null());
}

#[test]
fn time_report() {
    let dir = TempDir::new().unwrap();
    let file = task_file(&dir, "tasks.json");
    run_ok(&file, &["add", "Task 1"]);
    run_ok(&file, &["add", "Task 2"]);

    tasktrack(&file)
        .arg("time")
        .assert()
        .success()
        .stdout(predicate::str::contains("Time Tracking Report"))
        .stdout(predicate::str::contains("Total time spent:"));
}

#[test]
fn time_summary() {
    let dir = TempDir::new().unwrap();
    let file = task_file(&dir, "tasks.json");
    fs::write(
        &file,
        r#"[{"id": 1, "title": "Task", "done": false, "due_date": null, "time_spent": 5400}]"#,
    )
    .unwrap();

    tasktrack(&file)
        .args(&["time", "--summary"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Total time: 1h 30m"))
        .stdout(predicate::str::contains("Time Tracking Report").not());
}

#[test]
fn remaining_time() {
    let dir = TempDir::new().unwrap();
    let file = task_file(&dir, "tasks.json");
    run_ok(&file, &["add", "Due tomorrow", "--due", "tomorrow"]);

    tasktrack(&file)
        .args(&["remaining", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Task #1: Due tomorrow"))
        .stdout(predicate::str::contains("Due:"))
        .stdout(predicate::str::contains("Status:"));
}

#[test]
fn remaining_time_without_deadline() {
    let dir = TempDir::new().unwrap();
    let file = task_file(&dir, "tasks.json");
    run_ok(&file, &["add", "No deadline"]);

    tasktrack(&file)
        .args(&["remaining", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("has no deadline"));
}

#[test]
fn remaining_time_of_completed_task() {
    let dir = TempDir::new().unwrap();
    let file = task_file(&dir, "tasks.json");
    run_ok(&file, &["add", "Done task"]);
    run_ok(&file, &["done", "1"]);

    tasktrack(&file)
        .args(&["remaining", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("is completed"));
}

#[test]
fn task_id_must_be_positive() {
    let dir = TempDir::new().unwrap();
    let file = task_file(&dir, "tasks.json");

    for id in &["0", "-1"] {
        tasktrack(&file)
            .args(&["done", *id])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("must be a positive integer"));
    }
}

#[test]
fn missing_title_is_a_usage_error() {
    let dir = TempDir::new().unwrap();
    let file = task_file(&dir, "tasks.json");

    tasktrack(&file).arg("add").assert().failure();
}

#[test]
fn corrupt_file_reports_load_error() {
    let dir = TempDir::new().unwrap();
    let file = task_file(&dir, "tasks.json");
    fs::write(&file, "{ not json").unwrap();

    tasktrack(&file)
        .arg("list")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Error loading tasks"));
}

#[test]
fn unsupported_extension_is_rejected() {
    let dir = TempDir::new().unwrap();
    let file = task_file(&dir, "tasks.txt");

    tasktrack(&file)
        .arg("list")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Unsupported task file"));
}

#[test]
fn csv_and_sqlite_files_work_end_to_end() {
    let dir = TempDir::new().unwrap();
    for name in &["tasks.csv", "tasks.db"] {
        let file = task_file(&dir, name);
        run_ok(&file, &["add", "Stored, with a comma", "--due", "2031-01-02 10:00"]);
        run_ok(&file, &["add", "Second"]);
        run_ok(&file, &["done", "2"]);

        tasktrack(&file)
            .args(&["list", "--all"])
            .assert()
            .success()
            .stdout(predicate::str::contains("#1 [ ] Stored, with a comma (due 2031-01-02 10:00"))
            .stdout(predicate::str::contains("#2 [x] Second"));
    }
}

#[test]
fn save_keeps_backup_of_previous_file() {
    let dir = TempDir::new().unwrap();
    let file = task_file(&dir, "tasks.json");
    run_ok(&file, &["add", "One"]);
    run_ok(&file, &["add", "Two"]);

    let backup = dir.path().join("tasks.json.bak");
    let previous = fs::read_to_string(backup).unwrap();
    assert!(previous.contains("One"));
    assert!(!previous.contains("Two"));
}
