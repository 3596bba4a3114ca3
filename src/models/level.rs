use std::{fmt, str::FromStr};

use crossterm::style::{Color, Stylize};

use crate::error::LogError;

/// Severity of a log record.
///
/// Ordering follows the numeric severity, so `Level::Info < Level::Warning`
/// and a threshold comparison is a plain `>=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    Trace,
    Debug,
    Info,
    Done,
    Running,
    Completed,
    Success,
    Warning,
    Error,
    Failed,
    Critical,
    Exception,
}

impl Level {
    pub const ALL: [Level; 12] = [
        Level::Trace,
        Level::Debug,
        Level::Info,
        Level::Done,
        Level::Running,
        Level::Completed,
        Level::Success,
        Level::Warning,
        Level::Error,
        Level::Failed,
        Level::Critical,
        Level::Exception,
    ];

    pub fn severity(self) -> u8 {
        match self {
            Level::Trace => 9,
            Level::Debug => 10,
            Level::Info => 20,
            Level::Done => 21,
            Level::Running => 22,
            Level::Completed => 23,
            Level::Success => 24,
            Level::Warning => 30,
            Level::Error => 40,
            Level::Failed => 41,
            Level::Critical => 50,
            Level::Exception => 51,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Done => "DONE",
            Level::Running => "RUNNING",
            Level::Completed => "COMPLETED",
            Level::Success => "SUCCESS",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
            Level::Failed => "FAILED",
            Level::Critical => "CRITICAL",
            Level::Exception => "EXCEPTION",
        }
    }

    /// Four-letter tag used on the console.
    pub fn tag(self) -> &'static str {
        match self {
            Level::Trace => "TRAC",
            Level::Debug => "DEBG",
            Level::Info => "INFO",
            Level::Done => "DONE",
            Level::Running => "RUNN",
            Level::Completed => "COMP",
            Level::Success => "SUCC",
            Level::Warning => "WARN",
            Level::Error => "ERRR",
            Level::Failed => "FAIL",
            Level::Critical => "CRIT",
            Level::Exception => "EXCP",
        }
    }

    pub fn colored_tag(self) -> String {
        let tag = self.tag().bold();
        let styled = match self {
            Level::Trace | Level::Running => tag.with(Color::Magenta),
            Level::Debug => tag.with(Color::Cyan),
            Level::Info => tag.with(Color::White),
            Level::Done => tag.with(Color::Green),
            Level::Success => tag.on(Color::Green),
            Level::Completed => tag.on(Color::DarkGreen),
            Level::Warning => tag.with(Color::DarkYellow),
            Level::Error => tag.with(Color::Red),
            Level::Failed | Level::Critical => tag.on(Color::DarkRed),
            Level::Exception => tag.on(Color::DarkYellow),
        };
        styled.to_string()
    }
}

impl PartialOrd for Level {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Level {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.severity().cmp(&other.severity())
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Level {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        Level::ALL
            .into_iter()
            .find(|level| level.name() == wanted)
            .ok_or_else(|| LogError::UnknownLevel(s.to_string()))
    }
}

impl From<log::Level> for Level {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => Level::Error,
            log::Level::Warn => Level::Warning,
            log::Level::Info => Level::Info,
            log::Level::Debug => Level::Debug,
            log::Level::Trace => Level::Trace,
        }
    }
}
