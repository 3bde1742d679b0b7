//! Terminal output for the CLI.
//!
//! Color handling follows the NO_COLOR standard (https://no-color.org/) and
//! the CLICOLOR conventions:
//! - `NO_COLOR` set to anything disables colors
//! - `CLICOLOR_FORCE` set to non-zero forces colors even when not a TTY
//! - `CLICOLOR=0` disables colors
//!
//! Otherwise colors are used only when stdout is a terminal.

use crate::error::ResolveError;
use crate::release::ReleaseTable;
use crate::resolver::InstallReport;
use colored::{Colorize, control};
use std::io::IsTerminal;

/// Decide whether colored output is enabled. Call early in `main`.
pub fn init_colors() {
    control::set_override(colors_enabled(
        |key| std::env::var(key).ok(),
        std::io::stdout().is_terminal(),
    ));
}

fn colors_enabled(env: impl Fn(&str) -> Option<String>, is_tty: bool) -> bool {
    if env("NO_COLOR").is_some() {
        return false;
    }
    if env("CLICOLOR_FORCE").is_some_and(|v| v != "0") {
        return true;
    }
    if env("CLICOLOR").is_some_and(|v| v == "0") {
        return false;
    }
    is_tty
}

/// Whether a download progress bar should be drawn.
pub fn show_progress() -> bool {
    std::io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none()
}

pub fn print_report(report: &InstallReport) {
    println!(
        "{} Installed {} {} ({})",
        "✓".green(),
        report
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
            .bold(),
        report.version.to_string().cyan(),
        report.platform
    );
    println!("  {} {}", "path:".dimmed(), report.path.display());
    println!("  {} {}", "from:".dimmed(), report.url);
    println!("  {} {}", "sha256:".dimmed(), report.sha256);
    println!("  {} {} bytes", "size:".dimmed(), report.bytes);
}

pub fn print_table(table: &ReleaseTable) {
    println!(
        "{} {} {}",
        "==>".bold().green(),
        table.tool().bold(),
        table.version().to_string().cyan()
    );
    for (key, entry) in table.entries() {
        let digest = if entry.sha256.is_placeholder() {
            "(no checksum published)".yellow().to_string()
        } else {
            entry.sha256.to_string()
        };
        println!("{:<14} {}", key.to_string().bold(), entry.url);
        println!("{:<14} {}", "", digest.dimmed());
    }
}

/// Render a failure for stderr, including whether a retry makes sense.
pub fn format_error(err: &ResolveError) -> String {
    let hint = if err.is_retryable() {
        "retryable".yellow()
    } else {
        "fatal".red()
    };
    format!("{} [{}, {}] {}", "✗".red(), err.kind(), hint, err)
}
