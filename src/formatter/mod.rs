//! Rendering of records into text lines. Everything here is pure.

use std::time::Duration;

use crossterm::style::Stylize;

use crate::{
    config::{Visibility, DEFAULT_ENV},
    models::{
        record::LogRecord,
        task::{FinishedTask, TaskStatus},
    },
};

pub const SPINNER: [&str; 10] = ["⠙", "⠘", "⠰", "⠴", "⠤", "⠦", "⠆", "⠃", "⠋", "⠉"];

const UNKNOWN_FILE: &str = "unknown";
const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Render `record` as a single line without a trailing newline.
///
/// A missing environment tag renders as `default`, a missing location as
/// `unknown:0`.
pub fn format_record(record: &LogRecord, visibility: &Visibility, colors: bool) -> String {
    let mut line = String::new();
    let env = record.env.as_deref().unwrap_or(DEFAULT_ENV);
    let (file, lineno) = match &record.location {
        Some(location) => (location.short_file(), location.line),
        None => (UNKNOWN_FILE, 0),
    };

    if visibility.date {
        let date = record.timestamp.format(DATE_FORMAT).to_string();
        if colors {
            line.push_str(&date.dark_blue().to_string());
        } else {
            line.push_str(&date);
        }
        line.push(' ');
    }
    if visibility.env {
        let env = format!("({})", env);
        if colors {
            line.push_str(&env.magenta().to_string());
        } else {
            line.push_str(&env);
        }
        line.push(' ');
    }
    if visibility.level {
        if colors {
            line.push_str(&record.level.colored_tag());
        } else {
            line.push_str(record.level.name());
        }
        line.push(' ');
    }
    if visibility.file {
        if colors {
            line.push_str(&format!(
                "{}{}{}",
                file.dark_green(),
                ":".dark_yellow(),
                lineno.to_string().dark_green()
            ));
        } else {
            line.push_str(&format!("{}:{}", file, lineno));
        }
        line.push(' ');
    }

    line.push_str("| ");
    line.push_str(&record.message);
    line
}

/// `"1h, 1min, 1s, 500ms"` style rendering. Zero-valued components are left
/// out, so a zero duration renders as an empty string.
pub fn format_elapsed(elapsed: Duration) -> String {
    let total_ms = elapsed.as_millis();
    let hours = total_ms / 3_600_000;
    let minutes = total_ms % 3_600_000 / 60_000;
    let seconds = total_ms % 60_000 / 1000;
    let millis = total_ms % 1000;

    [(hours, "h"), (minutes, "min"), (seconds, "s"), (millis, "ms")]
        .iter()
        .filter(|(value, _)| *value > 0)
        .map(|(value, unit)| format!("{}{}", value, unit))
        .collect::<Vec<_>>()
        .join(", ")
}

/// One animation frame for the oldest running task.
pub fn running_line(label: &str, active: usize, frame: usize, elapsed: Duration) -> String {
    format!(
        "{} ({} bg tasks) {} ({})",
        label,
        active,
        SPINNER[frame % SPINNER.len()],
        format_elapsed(elapsed)
    )
}

/// Terminal line for a task that left the active set.
pub fn finished_line(task: &FinishedTask) -> String {
    let mark = match task.status {
        TaskStatus::Failed => "❌",
        TaskStatus::Completed | TaskStatus::Running => "✅",
    };
    format!(
        "{} {} ({}){}",
        task.label,
        mark,
        format_elapsed(task.elapsed),
        task.postfix()
    )
}
