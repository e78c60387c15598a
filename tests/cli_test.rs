//! Tests for the sheetwatch binary.

mod common;

use std::process::Command;

use common::{read_lines, write_xlsx};
use tempfile::TempDir;

fn sheetwatch() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_sheetwatch"));
    // Keep a developer's own config file out of the way.
    cmd.args(["--config", "/nonexistent/sheetwatch.toml"]);
    cmd
}

#[test]
fn test_help_lists_commands() {
    let output = sheetwatch().arg("--help").output().expect("Failed to execute command");
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("watch"), "Help should mention watch");
    assert!(stdout.contains("convert"), "Help should mention convert");
    assert!(stdout.contains("check"), "Help should mention check");
}

#[test]
fn test_check_reports_matches() {
    let output = sheetwatch()
        .args(["check", "ALINAN_SIPARISLER.xlsx", "report.xlsx", "ALINAN_notes.txt"])
        .output()
        .expect("Failed to execute command");
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("ALINAN_SIPARISLER.xlsx"));
    assert_eq!(stdout.matches("[MATCH]").count(), 1);
    assert_eq!(stdout.matches("[SKIP]").count(), 2);
}

#[test]
fn test_convert_once() {
    let dir = TempDir::new().unwrap();
    write_xlsx(&dir.path().join("ALINAN.xlsx"), &[&["id"], &["1"]]);

    let status = sheetwatch()
        .args(["convert", "--dir"])
        .arg(dir.path())
        .status()
        .expect("Failed to execute command");

    assert!(status.success());
    assert_eq!(read_lines(&dir.path().join("orders.csv")), vec!["id", "1"]);
}

#[test]
fn test_convert_custom_output_and_marker() {
    let dir = TempDir::new().unwrap();
    write_xlsx(&dir.path().join("orders-2024.xlsx"), &[&["x"]]);

    let status = sheetwatch()
        .args(["convert", "--marker", "orders", "--output", "export.csv", "--dir"])
        .arg(dir.path())
        .status()
        .expect("Failed to execute command");

    assert!(status.success());
    assert_eq!(read_lines(&dir.path().join("export.csv")), vec!["x"]);
}

#[test]
fn test_convert_without_target_fails() {
    let dir = TempDir::new().unwrap();

    let status = sheetwatch()
        .args(["convert", "--dir"])
        .arg(dir.path())
        .status()
        .expect("Failed to execute command");

    assert_eq!(status.code(), Some(1));
    assert!(!dir.path().join("orders.csv").exists());
}

#[test]
fn test_watch_missing_directory_exits_nonzero() {
    let dir = TempDir::new().unwrap();

    let status = sheetwatch()
        .args(["watch", "--dir"])
        .arg(dir.path().join("missing"))
        .status()
        .expect("Failed to execute command");

    assert_eq!(status.code(), Some(1));
}

#[test]
fn test_bad_config_file_fails() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("bad.toml");
    std::fs::write(&config, "marker = 5").unwrap();

    let status = Command::new(env!("CARGO_BIN_EXE_sheetwatch"))
        .arg("--config")
        .arg(&config)
        .args(["check", "ALINAN.xlsx"])
        .status()
        .expect("Failed to execute command");

    assert_eq!(status.code(), Some(1));
}
