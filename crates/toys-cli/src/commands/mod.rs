//! Command implementations for toys-cli

pub mod check;
pub mod completions;
pub mod list;
pub mod start;
pub mod wait;

pub use check::run_check;
pub use completions::run_completions;
pub use list::run_list;
pub use start::run_start;
pub use wait::run_wait;

use colored::{ColoredString, Colorize};
use serde::Serialize;
use toys_spawn::{Freshness, JobStatus, WaitEnd};

use crate::error::{Result, exit};

/// First eight characters of a job id, enough to pass back as a prefix
pub(crate) fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

pub(crate) fn status_label(status: JobStatus) -> ColoredString {
    let text = status.as_str();
    match status {
        JobStatus::Pending => text.yellow(),
        JobStatus::Running => text.cyan(),
        JobStatus::Completed => text.green(),
        JobStatus::Failed => text.red(),
        JobStatus::TimedOut => text.magenta(),
    }
}

pub(crate) fn freshness_note(freshness: &Freshness) -> Option<ColoredString> {
    match freshness {
        Freshness::Stale(_) => Some("(stale)".yellow()),
        Freshness::Cached => Some("(not refreshed)".dimmed()),
        Freshness::Terminal | Freshness::Refreshed => None,
    }
}

/// Single line of `text`, cut to `width` characters
pub(crate) fn one_line(text: &str, width: usize) -> String {
    let line = text.lines().next().unwrap_or_default();
    let mut out: String = line.chars().take(width).collect();
    if line.chars().count() > width || text.lines().nth(1).is_some() {
        out.push_str("...");
    }
    out
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub(crate) fn exit_code_for(end: WaitEnd) -> i32 {
    match end {
        WaitEnd::Resolved => exit::SUCCESS,
        WaitEnd::TimedOut => exit::TIMED_OUT,
        WaitEnd::Interrupted => exit::INTERRUPTED,
    }
}
