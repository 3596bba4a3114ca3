//! Background logging with live task animation, plus a pipeline runner for
//! external processes.
//!
//! A [`Logger`] funnels records from any number of threads through a single
//! consumer thread, which also draws a spinner line for running tasks and
//! replaces it with a `COMPLETED`/`FAILED` line once the task finishes.
//! [`ProcessRunner`] spawns one or more processes chained like a shell
//! pipeline and drains stdout and stderr of the last stage concurrently.
//!
//! ```no_run
//! use process_log_system::{Logger, LoggerConfig, Pipeline, ProcessRunner};
//!
//! let logger = Logger::new(LoggerConfig::default()).unwrap();
//! logger.start().unwrap();
//!
//! let task = logger.start_task("listing files");
//! let runner = ProcessRunner::with_logger(logger.clone());
//! let result = runner
//!     .run(&Pipeline::command(["ls", "-l"]).stage(["grep", "rs"]).show_output(true))
//!     .unwrap();
//! logger.finish_task(&task, None, result.success);
//! logger.stop();
//! ```

pub mod bridge;
pub mod config;
pub mod error;
pub mod formatter;
pub mod manager;
pub mod models;
pub mod runner;
pub mod worker;

pub use bridge::LogBridge;
pub use config::{FileSinkConfig, LoggerConfig, Visibility};
pub use error::{LogError, RunError};
pub use formatter::{format_elapsed, format_record};
pub use manager::{logger::Logger, task_tracker::TaskTracker};
pub use models::{
    level::Level,
    process::{IntoArg, OutputLine, Pipeline, PipelineStage, ProcessResult},
    record::{Location, LogRecord},
    task::{FinishedTask, Task, TaskId, TaskStatus},
};
pub use runner::process::ProcessRunner;
