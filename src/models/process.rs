use std::path::{Path, PathBuf};

use crate::error::RunError;

/// One argv slot as handed over by the argument builder. Absent and empty
/// slots are dropped before anything is spawned.
pub trait IntoArg {
    fn into_arg(self) -> Option<String>;
}

impl IntoArg for String {
    fn into_arg(self) -> Option<String> {
        Some(self)
    }
}

impl IntoArg for &str {
    fn into_arg(self) -> Option<String> {
        Some(self.to_string())
    }
}

impl IntoArg for &String {
    fn into_arg(self) -> Option<String> {
        Some(self.clone())
    }
}

impl<A: IntoArg> IntoArg for Option<A> {
    fn into_arg(self) -> Option<String> {
        self.and_then(IntoArg::into_arg)
    }
}

/// One process of a pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineStage {
    argv: Vec<String>,
}

impl PipelineStage {
    pub fn new<I, A>(args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: IntoArg,
    {
        let argv = args
            .into_iter()
            .filter_map(IntoArg::into_arg)
            .filter(|arg| !arg.is_empty())
            .collect();
        Self { argv }
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    pub fn program(&self) -> Option<&str> {
        self.argv.first().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.argv.is_empty()
    }
}

/// Stages chained stdout-to-stdin, plus where and how to run them.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    stages: Vec<PipelineStage>,
    cwd: Option<PathBuf>,
    show_output: bool,
    title: Option<String>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-stage pipeline.
    pub fn command<I, A>(args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: IntoArg,
    {
        Self::new().stage(args)
    }

    pub fn stage<I, A>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: IntoArg,
    {
        self.stages.push(PipelineStage::new(args));
        self
    }

    pub fn cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = Some(cwd.as_ref().to_path_buf());
        self
    }

    /// Relay every output line to the logger while the process runs.
    pub fn show_output(mut self, show: bool) -> Self {
        self.show_output = show;
        self
    }

    /// Announced as `Running: {title}` before output is relayed.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn stages(&self) -> &[PipelineStage] {
        &self.stages
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    pub fn shows_output(&self) -> bool {
        self.show_output
    }

    pub fn announced_title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub(crate) fn validate(&self) -> Result<(), RunError> {
        if self.stages.is_empty() {
            return Err(RunError::EmptyPipeline);
        }
        match self.stages.iter().position(PipelineStage::is_empty) {
            Some(index) => Err(RunError::EmptyStage { index }),
            None => Ok(()),
        }
    }
}

/// A line read from the last stage, trailing newline stripped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputLine<'a> {
    Stdout(&'a str),
    Stderr(&'a str),
}

impl<'a> OutputLine<'a> {
    pub fn stdout(self) -> Option<&'a str> {
        match self {
            OutputLine::Stdout(line) => Some(line),
            OutputLine::Stderr(_) => None,
        }
    }

    pub fn stderr(self) -> Option<&'a str> {
        match self {
            OutputLine::Stderr(line) => Some(line),
            OutputLine::Stdout(_) => None,
        }
    }
}

/// Outcome of a finished pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessResult<T = (), U = ()> {
    pub success: bool,
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
    /// Per-line callback outputs, in arrival order.
    pub line_outputs: Vec<T>,
    pub completion_output: Option<U>,
}

impl<T, U> ProcessResult<T, U> {
    /// Turn a non-zero exit into `RunError::Execution`.
    pub fn into_checked(self) -> Result<Self, RunError> {
        if self.success {
            Ok(self)
        } else {
            Err(RunError::Execution {
                code: self.code,
                stdout: self.stdout,
                stderr: self.stderr,
            })
        }
    }
}
