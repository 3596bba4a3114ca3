use chrono::{DateTime, Local};

use super::level::Level;

/// Source location of the code that produced a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub file: String,
    pub line: u32,
}

impl Location {
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self { file: file.into(), line }
    }

    /// Location of the caller, resolved through `#[track_caller]`.
    #[track_caller]
    pub fn caller() -> Self {
        Self::from(std::panic::Location::caller())
    }

    /// The last two path components, e.g. `src/main.rs`.
    pub fn short_file(&self) -> &str {
        let mut cut = None;
        let separators = self.file.rmatch_indices(|c: char| c == '/' || c == '\\');
        for (seen, (idx, _)) in separators.enumerate() {
            if seen == 1 {
                cut = Some(idx + 1);
                break;
            }
        }
        match cut {
            Some(idx) => &self.file[idx..],
            None => &self.file,
        }
    }
}

impl From<&std::panic::Location<'_>> for Location {
    fn from(location: &std::panic::Location<'_>) -> Self {
        Self::new(location.file(), location.line())
    }
}

/// One unit of log output. Built by a producer thread, rendered and dropped by
/// the consumer; never mutated in between.
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub level: Level,
    pub timestamp: DateTime<Local>,
    pub env: Option<String>,
    pub location: Option<Location>,
    pub message: String,
    /// Overwrite the previously rendered line instead of starting a fresh one.
    pub continuation: bool,
}

impl LogRecord {
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            level,
            timestamp: Local::now(),
            env: None,
            location: None,
            message: message.into(),
            continuation: false,
        }
    }

    pub fn with_env(mut self, env: impl Into<String>) -> Self {
        self.env = Some(env.into());
        self
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    pub fn continuing(mut self, continuation: bool) -> Self {
        self.continuation = continuation;
        self
    }
}
