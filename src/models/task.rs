use std::{
    fmt,
    time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};

use sha2::{Digest, Sha256};

use super::record::Location;

/// Identifier of a tracked task, derived from its label and start time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskId(String);

impl TaskId {
    pub(crate) fn derive(label: &str, seq: u64) -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();

        let mut hasher = Sha256::new();
        hasher.update(label.as_bytes());
        hasher.update(nanos.to_le_bytes());
        hasher.update(seq.to_le_bytes());
        let digest = hasher.finalize();

        let hex = digest[..8].iter().map(|b| format!("{:02x}", b)).collect();
        TaskId(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        TaskId(id.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone)]
pub struct Task {
    pub id: TaskId,
    pub label: String,
    pub started: Instant,
    pub location: Location,
    pub(crate) seq: u64,
}

impl Task {
    pub fn new(id: TaskId, label: String, location: Location, seq: u64) -> Self {
        Self {
            id,
            label,
            started: Instant::now(),
            location,
            seq,
        }
    }
}

/// A task that left the active set, waiting to be reported.
#[derive(Debug, Clone)]
pub struct FinishedTask {
    pub id: TaskId,
    pub label: String,
    pub status: TaskStatus,
    pub elapsed: Duration,
    pub message: Option<String>,
    /// Where `finish` was called.
    pub location: Location,
}

impl FinishedTask {
    /// `" {message}"` when a non-blank message was given, empty otherwise.
    pub fn postfix(&self) -> String {
        match self.message.as_deref() {
            Some(message) if !message.trim().is_empty() => format!(" {}", message),
            _ => String::new(),
        }
    }
}
