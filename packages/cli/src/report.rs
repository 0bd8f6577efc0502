// ABOUTME: Human-readable rendering of execution results and managed sandboxes
// ABOUTME: Maps result statuses to process exit codes

use chrono::Utc;
use coderunner_sandbox::{ContainerInfo, ExecutionResult, ExecutionStatus, JOB_LABEL};
use colored::*;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, ContentArrangement, Table};

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_ERROR: i32 = 1;
/// Same code `timeout(1)` uses
pub const EXIT_TIMEOUT: i32 = 124;

pub fn exit_code(result: &ExecutionResult) -> i32 {
    match result.status {
        ExecutionStatus::Success => EXIT_SUCCESS,
        ExecutionStatus::Error => EXIT_ERROR,
        ExecutionStatus::Timeout => EXIT_TIMEOUT,
    }
}

/// One-line outcome printed after the program's own output
pub fn summary_line(result: &ExecutionResult) -> String {
    let timing = format!("{:.3}s", result.execution_time_seconds);
    match result.status {
        ExecutionStatus::Success => format!("{} success in {}", "✓".green().bold(), timing),
        ExecutionStatus::Error => match result.exit_code {
            Some(code) => format!(
                "{} error (exit code {}) in {}",
                "✗".red().bold(),
                code,
                timing
            ),
            None => format!("{} error", "✗".red().bold()),
        },
        ExecutionStatus::Timeout => format!("{} timeout after {}", "⏱".yellow().bold(), timing),
    }
}

/// Human age of a sandbox created at `created` (unix seconds)
pub fn format_age(created: i64, now: i64) -> String {
    let secs = (now - created).max(0);
    match secs {
        s if s < 60 => format!("{}s", s),
        s if s < 3600 => format!("{}m", s / 60),
        s if s < 86_400 => format!("{}h{}m", s / 3600, (s % 3600) / 60),
        s => format!("{}d", s / 86_400),
    }
}

pub fn sandbox_table(sandboxes: &[ContainerInfo]) -> Table {
    let now = Utc::now().timestamp();

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Container", "Job", "State", "Age", "Image"]);

    for sandbox in sandboxes {
        let short_id: String = sandbox.id.chars().take(12).collect();
        table.add_row(vec![
            short_id,
            sandbox.labels.get(JOB_LABEL).cloned().unwrap_or_default(),
            sandbox.state.clone(),
            format_age(sandbox.created, now),
            sandbox.image.clone(),
        ]);
    }

    table
}
