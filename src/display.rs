//! Colored CLI display utilities for pipeline status.
//!
//! One human-readable line per pipeline step, alongside the tracing logs.

use std::io::{self, Write};
use std::path::Path;

use chrono::Utc;
use owo_colors::OwoColorize;

use crate::convert::ConversionResult;

/// Get current timestamp in the same format as tracing.
fn timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

/// Maximum length for failure reasons.
const REASON_MAX_LEN: usize = 200;

/// Truncate a string to a maximum length, adding ellipsis if truncated.
#[must_use]
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        "...".to_string()
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{head}...")
    }
}

/// Base name of a path for display, falling back to the full path.
#[must_use]
pub fn file_label(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.display().to_string(),
        |name| name.to_string_lossy().into_owned(),
    )
}

fn line(tag: &str, message: &str) {
    println!("{} {} {}", timestamp().dimmed(), tag, message);
    let _ = io::stdout().flush();
}

/// Print the watch start banner.
pub fn print_watch_start(directory: &Path, output: &Path) {
    line(
        &"[WATCH]".blue().bold().to_string(),
        &format!(
            "dir={} output={}",
            directory.display().cyan(),
            output.display().cyan()
        ),
    );
    println!("{}", "Press Ctrl+C to stop.".dimmed());
    let _ = io::stdout().flush();
}

/// Print a target found by the start-up scan.
pub fn print_scan_found(path: &Path, candidates: usize) {
    let extra = if candidates > 1 {
        format!(" ({candidates} candidates, first by name)")
    } else {
        String::new()
    };
    line(
        &"[SCAN]".blue().bold().to_string(),
        &format!("found {}{}", file_label(path).bold(), extra.dimmed()),
    );
}

/// Print that no target exists yet.
pub fn print_waiting(directory: &Path) {
    line(
        &"[WAITING]".yellow().bold().to_string(),
        &format!(
            "no matching spreadsheet in {} yet, waiting for one to be added",
            directory.display()
        ),
    );
}

/// Print an added target.
pub fn print_added(path: &Path) {
    line(&"[ADDED]".cyan().bold().to_string(), &file_label(path));
}

/// Print a modified target.
pub fn print_modified(path: &Path) {
    line(&"[MODIFIED]".cyan().bold().to_string(), &file_label(path));
}

/// Print a removed target.
pub fn print_removed(path: &Path) {
    line(
        &"[REMOVED]".yellow().bold().to_string(),
        &format!("{} {}", file_label(path), "(output kept)".dimmed()),
    );
}

/// Print the outcome of a conversion.
pub fn print_conversion(result: &ConversionResult) {
    match (result.rows(), result.error()) {
        (Some(rows), _) => line(
            &"[CONVERTED]".green().bold().to_string(),
            &format!(
                "{} -> {} ({rows} rows)",
                file_label(&result.source),
                file_label(&result.destination)
            ),
        ),
        (None, Some(err)) => line(
            &"[FAILED]".red().bold().to_string(),
            &format!(
                "{} - {}",
                file_label(&result.source),
                truncate(&err.to_string(), REASON_MAX_LEN).red()
            ),
        ),
        (None, None) => {}
    }
}

/// Print a persistent output failure alert.
pub fn print_alert(destination: &Path, consecutive: u32) {
    line(
        &"[ALERT]".red().bold().to_string(),
        &format!(
            "{} could not be written {} times in a row",
            destination.display().bold(),
            consecutive
        )
        .red()
        .to_string(),
    );
}

/// Print whether a name is a target.
pub fn print_check(name: &str, is_target: bool) {
    if is_target {
        println!("{} {}", "[MATCH]".green().bold(), name);
    } else {
        println!("{} {}", "[SKIP]".dimmed(), name);
    }
    let _ = io::stdout().flush();
}

/// Print an error message.
pub fn print_error(message: &str) {
    line(&"[ERROR]".red().bold().to_string(), message);
}

/// Print shutdown.
pub fn print_stop() {
    line(&"[STOP]".blue().bold().to_string(), "watcher stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_string() {
        assert_eq!(truncate("hello", 10), "hello");
    }

    #[test]
    fn test_truncate_exact_length() {
        assert_eq!(truncate("hello", 5), "hello");
    }

    #[test]
    fn test_truncate_long_string() {
        assert_eq!(truncate("hello world", 8), "hello...");
    }

    #[test]
    fn test_truncate_very_short_max() {
        assert_eq!(truncate("hello", 3), "...");
        assert_eq!(truncate("hello", 0), "...");
    }

    #[test]
    fn test_truncate_multibyte() {
        assert_eq!(truncate("SİPARİŞLER", 6), "SİP...");
    }

    #[test]
    fn test_file_label() {
        assert_eq!(file_label(Path::new("/srv/orders/ALINAN.xlsx")), "ALINAN.xlsx");
        assert_eq!(file_label(Path::new("/")), "/");
    }
}
