//! Message rendering for restart notifications.
//!
//! Everything here is pure string work so it can be tested without a channel.

use chrono::{DateTime, Utc};

use crate::report::EventLine;

/// Character limit for the log reply.
pub const LOG_LIMIT: usize = 1000;

/// Character limit for the analysis reply.
pub const ANALYSIS_LIMIT: usize = 3000;

/// Suffix appended to truncated text.
pub const TRUNCATION_SUFFIX: &str = "... (truncated)";

/// Line prefixes treated as shell commands by [`format_code_blocks`].
const COMMAND_PREFIXES: &[&str] = &["kubectl ", "bash "];

/// Render the parent message for a restart.
#[must_use]
pub fn render_summary(pod: &str, namespace: &str, restart_time: DateTime<Utc>) -> String {
    format!(
        "*🚨 Pod Restart Detected!*\n\
         > *Pod:* `{pod}`\n\
         > *Namespace:* `{namespace}`\n\
         > *Restart Time:* `{}`",
        restart_time.format("%Y-%m-%d %H:%M:%S")
    )
}

/// Render events as `reason: message` lines.
#[must_use]
pub fn render_events(events: &[EventLine]) -> String {
    events
        .iter()
        .map(|e| format!("{}: {}", e.reason, e.message))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Cut `s` to `limit` bytes and mark it as truncated.
///
/// The cut is by length only and may land mid-line. If `limit` splits a
/// multi-byte character the cut moves back to the previous boundary.
#[must_use]
pub fn truncate(s: &str, limit: usize) -> String {
    if s.len() <= limit {
        return s.to_string();
    }
    let mut end = limit;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}{TRUNCATION_SUFFIX}", &s[..end])
}

fn is_command_line(trimmed: &str) -> bool {
    COMMAND_PREFIXES.iter().any(|p| trimmed.starts_with(p))
}

/// Wrap runs of command lines in fenced `bash` blocks.
///
/// Line-prefix heuristic only, not a markdown parser. Every output line is
/// trimmed.
#[must_use]
pub fn format_code_blocks(text: &str) -> String {
    let mut formatted = Vec::new();
    let mut in_block = false;

    for line in text.split('\n') {
        let trimmed = line.trim();
        if is_command_line(trimmed) {
            if !in_block {
                formatted.push("```bash");
                in_block = true;
            }
            formatted.push(trimmed);
            continue;
        }
        if in_block {
            formatted.push("```");
            in_block = false;
        }
        formatted.push(trimmed);
    }
    if in_block {
        formatted.push("```");
    }

    formatted.join("\n")
}

/// Threaded reply carrying the correlated events.
#[must_use]
pub fn events_block(events: &[EventLine]) -> String {
    format!("📋 *Events:*\n```{}```", render_events(events))
}

/// Threaded reply carrying the log tail.
#[must_use]
pub fn logs_block(logs: &str) -> String {
    format!("📦 *Logs:*\n```{}```", truncate(logs, LOG_LIMIT))
}

/// Threaded reply carrying the model analysis.
#[must_use]
pub fn analysis_block(analysis: &str) -> String {
    format!(
        "🤖 *Analysis:*\n{}",
        format_code_blocks(&truncate(analysis, ANALYSIS_LIMIT))
    )
}
