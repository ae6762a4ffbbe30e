//! Display utilities for the DotVault CLI

use console::style;
use dotvault_engine::{contract_home, VerifyReport};
use dotvault_types::{BackupResult, RestoreResult};
use std::path::Path;
use std::time::Duration;

/// Errors listed before the rest are summarised
const MAX_LISTED_ERRORS: usize = 10;

/// Print the summary of a backup run, with paths below `home` shown as `~/...`
pub fn display_backup_summary(result: &BackupResult, home: &Path) {
    println!();
    println!("{}", style("Backup Summary:").bold().underlined());
    println!(
        "  Output: {}",
        style(contract_home(&result.output_path, home)).cyan()
    );
    println!("  Files backed up: {}", style(result.total_files).green());
    println!(
        "  Bytes written: {}",
        style(format_bytes(result.total_bytes)).green()
    );
    println!(
        "  Files skipped: {}",
        style(result.skipped_files.len()).yellow()
    );
    println!(
        "  Errors: {}",
        if result.errors.is_empty() {
            style(result.errors.len()).green()
        } else {
            style(result.errors.len()).red()
        }
    );
    println!(
        "  Duration: {}",
        style(format_duration(Duration::from_millis(result.duration_ms))).blue()
    );
    display_error_list(&result.errors);
}

/// Print the summary of a restore run
pub fn display_restore_summary(result: &RestoreResult) {
    println!();
    println!("{}", style("Restore Summary:").bold().underlined());
    println!("  Files in source: {}", style(result.total_files).cyan());
    println!("  Files restored: {}", style(result.restored_files).green());
    println!("  Files kept: {}", style(result.skipped_files).yellow());
    println!("  Conflicts: {}", style(result.conflicts.len()).yellow());
    println!(
        "  Errors: {}",
        if result.errors.is_empty() {
            style(result.errors.len()).green()
        } else {
            style(result.errors.len()).red()
        }
    );
    println!(
        "  Duration: {}",
        style(format_duration(Duration::from_millis(result.duration_ms))).blue()
    );
    for warning in &result.warnings {
        display_warning(warning);
    }
    display_error_list(&result.errors);
}

/// Print a verification report
pub fn display_verify_report(report: &VerifyReport) {
    println!();
    println!("{}", style("Verification:").bold().underlined());
    println!("  Matched: {}", style(report.matched.len()).green());
    println!("  Mismatched: {}", style(report.mismatched.len()).red());
    println!("  Missing: {}", style(report.missing.len()).red());

    for path in &report.mismatched {
        println!("    {} {}", style("≠").red(), path.display());
    }
    for path in &report.missing {
        println!("    {} {}", style("?").red(), path.display());
    }
}

fn display_error_list(errors: &[String]) {
    for error in errors.iter().take(MAX_LISTED_ERRORS) {
        display_error(error);
    }
    if errors.len() > MAX_LISTED_ERRORS {
        println!(
            "  {}",
            style(format!("... and {} more", errors.len() - MAX_LISTED_ERRORS)).dim()
        );
    }
}

/// Format bytes in human-readable format
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_index])
}

/// Format duration in human-readable format
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{:.2}s", duration.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

/// Display a warning message with proper formatting
pub fn display_warning(message: &str) {
    eprintln!("{} {}", style("⚠").yellow().bold(), style(message).yellow());
}

/// Display an error message with proper formatting
pub fn display_error(message: &str) {
    eprintln!("{} {}", style("✗").red().bold(), style(message).red());
}

/// Display a success message with proper formatting
pub fn display_success(message: &str) {
    println!("{} {}", style("✓").green().bold(), style(message).green());
}

/// Display an info message with proper formatting
pub fn display_info(message: &str) {
    println!("{} {}", style("ℹ").blue().bold(), style(message).blue());
}
