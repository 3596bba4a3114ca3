//! Error types for the logger and the process runner.

use std::{io, path::PathBuf};

use thiserror::Error;

/// Errors surfaced by the logger API.
#[derive(Error, Debug)]
pub enum LogError {
    /// A level name that is not one of the known levels.
    #[error("invalid log level: {0}")]
    UnknownLevel(String),

    #[error("cannot open log file {}: {source}", path.display())]
    FileSink {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to spawn the log consumer thread: {0}")]
    Spawn(#[source] io::Error),

    /// Raised back to the caller of `Logger::exception`.
    #[error("{message}")]
    Fatal { message: String },

    #[error("a global logger is already installed")]
    InstallLogger(#[from] log::SetLoggerError),
}

/// Errors surfaced by `ProcessRunner::run`.
///
/// A non-zero exit is not an error by itself; it is reported through
/// `ProcessResult` and only becomes `Execution` via `into_checked`.
#[derive(Error, Debug)]
pub enum RunError {
    #[error("pipeline has no stages")]
    EmptyPipeline,

    #[error("pipeline stage {index} has no arguments left after filtering")]
    EmptyStage { index: usize },

    /// The executable could not be started at all.
    #[error("failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("process exited with code {code}")]
    Execution {
        code: i32,
        stdout: String,
        stderr: String,
    },

    #[error("i/o error while running pipeline: {0}")]
    Io(#[from] io::Error),
}

impl RunError {
    pub fn is_launch(&self) -> bool {
        matches!(self, RunError::Launch { .. })
    }
}

/// A fault inside the consumer thread. Reported on the error writer only.
#[derive(Error, Debug)]
pub(crate) enum ConsumerFault {
    #[error("failed to write {sink} output: {source}")]
    Write {
        sink: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("rendering panicked: {0}")]
    Panic(String),
}
