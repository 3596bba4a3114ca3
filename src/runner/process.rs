use std::{
    io::{self, BufRead, BufReader, Read},
    process::{Child, Command, ExitStatus, Stdio},
    thread::{self, JoinHandle},
};

use crossbeam_channel::{unbounded, Sender};
use log::{debug, error};

use crate::{
    error::RunError,
    manager::logger::Logger,
    models::{
        level::Level,
        process::{OutputLine, Pipeline, PipelineStage, ProcessResult},
        record::Location,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stream {
    Stdout,
    Stderr,
}

enum StreamEvent {
    Line(Stream, String),
    Failed(Stream, io::Error),
}

type LineCallback<'a, T> = &'a mut dyn FnMut(OutputLine<'_>) -> T;
type CompleteCallback<'a, U> = Box<dyn FnOnce(&str, &str) -> U + 'a>;

/// Spawns pipelines of external processes and drains their output.
///
/// Callbacks run on the calling thread; only the pipe readers live on
/// helper threads. Output relayed to the logger goes through its queue like
/// any other record.
#[derive(Clone, Default)]
pub struct ProcessRunner {
    logger: Option<Logger>,
}

impl ProcessRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runner that relays output of pipelines with `show_output` set.
    pub fn with_logger(logger: Logger) -> Self {
        Self {
            logger: Some(logger),
        }
    }

    /// Run without callbacks.
    #[track_caller]
    pub fn run(&self, pipeline: &Pipeline) -> Result<ProcessResult, RunError> {
        self.execute::<(), ()>(pipeline, None, None, Location::caller())
    }

    /// Run with a per-line callback and a completion callback.
    ///
    /// `on_line` is called once per line of either stream as soon as it is
    /// read; its results are kept in arrival order. `on_complete` receives the
    /// full stdout and stderr after the process exited and both streams hit
    /// end-of-stream.
    #[track_caller]
    pub fn run_with<T, U, L, C>(
        &self,
        pipeline: &Pipeline,
        mut on_line: L,
        on_complete: C,
    ) -> Result<ProcessResult<T, U>, RunError>
    where
        L: FnMut(OutputLine<'_>) -> T,
        C: FnOnce(&str, &str) -> U,
    {
        self.execute(
            pipeline,
            Some(&mut on_line as LineCallback<'_, T>),
            Some(Box::new(on_complete) as CompleteCallback<'_, U>),
            Location::caller(),
        )
    }

    /// Run with only a per-line callback.
    #[track_caller]
    pub fn run_lines<T, L>(
        &self,
        pipeline: &Pipeline,
        mut on_line: L,
    ) -> Result<ProcessResult<T>, RunError>
    where
        L: FnMut(OutputLine<'_>) -> T,
    {
        self.execute(
            pipeline,
            Some(&mut on_line as LineCallback<'_, T>),
            None,
            Location::caller(),
        )
    }

    /// Run with only a completion callback.
    #[track_caller]
    pub fn run_complete<U, C>(
        &self,
        pipeline: &Pipeline,
        on_complete: C,
    ) -> Result<ProcessResult<(), U>, RunError>
    where
        C: FnOnce(&str, &str) -> U,
    {
        self.execute(
            pipeline,
            None,
            Some(Box::new(on_complete) as CompleteCallback<'_, U>),
            Location::caller(),
        )
    }

    fn execute<T, U>(
        &self,
        pipeline: &Pipeline,
        mut on_line: Option<LineCallback<'_, T>>,
        on_complete: Option<CompleteCallback<'_, U>>,
        location: Location,
    ) -> Result<ProcessResult<T, U>, RunError> {
        pipeline.validate()?;
        let relay = self.logger.as_ref().filter(|_| pipeline.shows_output());
        if let (Some(logger), Some(title)) = (relay, pipeline.announced_title()) {
            logger.record(Level::Info, format_args!("Running: {}", title), location.clone());
        }

        let mut spawned = spawn_pipeline(pipeline)?;
        let mut last = spawned.children.pop().ok_or(RunError::EmptyPipeline)?;

        let (events, event_rx) = unbounded();
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = last.child.stdout.take() {
            readers.push(spawn_reader(Stream::Stdout, stdout, events.clone()));
        }
        if let Some(stderr) = last.child.stderr.take() {
            readers.push(spawn_reader(Stream::Stderr, stderr, events.clone()));
        }
        drop(events);

        let mut stdout = String::new();
        let mut stderr = String::new();
        let mut line_outputs = Vec::new();
        let mut read_error = None;

        // Ends once both readers hit end-of-stream and dropped their senders.
        for event in event_rx.iter() {
            let (stream, raw) = match event {
                StreamEvent::Line(stream, raw) => (stream, raw),
                StreamEvent::Failed(stream, err) => {
                    error!("Failed to read {:?} of {}: {}", stream, last.program, err);
                    read_error.get_or_insert(err);
                    continue;
                }
            };
            let line = trim_newline(&raw);
            let output = match stream {
                Stream::Stdout => OutputLine::Stdout(line),
                Stream::Stderr => OutputLine::Stderr(line),
            };

            if let Some(on_line) = on_line.as_mut() {
                line_outputs.push(on_line(output));
            }
            if let Some(logger) = relay {
                let level = match stream {
                    Stream::Stdout => Level::Info,
                    Stream::Stderr => Level::Error,
                };
                logger.record(level, line, location.clone());
            }

            match stream {
                Stream::Stdout => stdout.push_str(&raw),
                Stream::Stderr => stderr.push_str(&raw),
            }
        }

        for reader in readers {
            let _ = reader.join();
        }
        let status = last.child.wait();
        spawned.reap();
        let status = status?;
        if let Some(err) = read_error {
            return Err(RunError::Io(err));
        }

        let code = exit_code(status);
        debug!("Pipeline '{}' exited with code {}", last.program, code);

        let completion_output = on_complete.map(|on_complete| on_complete(&stdout, &stderr));
        Ok(ProcessResult {
            success: code == 0,
            code,
            stdout,
            stderr,
            line_outputs,
            completion_output,
        })
    }
}

struct Spawned {
    program: String,
    child: Child,
}

/// All stages of a running pipeline plus the drains of intermediate stderr.
struct SpawnedPipeline {
    children: Vec<Spawned>,
    drains: Vec<JoinHandle<()>>,
}

impl SpawnedPipeline {
    /// Wait for every remaining stage and stderr drain.
    fn reap(&mut self) {
        for spawned in self.children.iter_mut() {
            match spawned.child.wait() {
                Ok(status) => debug!("Stage '{}' exited with {}", spawned.program, status),
                Err(e) => error!("Failed to wait for stage '{}': {}", spawned.program, e),
            }
        }
        for drain in self.drains.drain(..) {
            let _ = drain.join();
        }
    }

    /// Tear down after a failed launch.
    fn abort(&mut self) {
        for spawned in self.children.iter_mut() {
            let _ = spawned.child.kill();
        }
        self.reap();
    }
}

fn spawn_pipeline(pipeline: &Pipeline) -> Result<SpawnedPipeline, RunError> {
    let stages = pipeline.stages();
    let last = stages.len() - 1;
    let mut spawned = SpawnedPipeline {
        children: Vec::with_capacity(stages.len()),
        drains: Vec::new(),
    };
    let mut upstream = None;

    for (index, stage) in stages.iter().enumerate() {
        let program = stage.program().unwrap_or_default().to_string();
        let mut command = build_command(stage, pipeline);
        command.stdin(match upstream.take() {
            Some(previous) => Stdio::from(previous),
            None => Stdio::null(),
        });

        debug!("Starting stage {}: {:?}", index, stage.argv());
        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(source) => {
                spawned.abort();
                return Err(RunError::Launch { program, source });
            }
        };

        if index < last {
            upstream = child.stdout.take();
            if let Some(stderr) = child.stderr.take() {
                spawned.drains.push(spawn_discard(program.clone(), stderr));
            }
        }
        spawned.children.push(Spawned { program, child });
    }
    Ok(spawned)
}

fn build_command(stage: &PipelineStage, pipeline: &Pipeline) -> Command {
    let argv = stage.argv();
    let mut command = Command::new(&argv[0]);
    command
        .args(&argv[1..])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(cwd) = pipeline.working_dir() {
        command.current_dir(cwd);
    }
    command
}

fn spawn_reader<R>(stream: Stream, pipe: R, events: Sender<StreamEvent>) -> JoinHandle<()>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut reader = BufReader::new(pipe);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf).into_owned();
                    if events.send(StreamEvent::Line(stream, line)).is_err() {
                        break;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    let _ = events.send(StreamEvent::Failed(stream, e));
                    break;
                }
            }
        }
    })
}

/// Keep an intermediate stage's stderr flowing so it can never block on a
/// full pipe.
fn spawn_discard<R>(program: String, pipe: R) -> JoinHandle<()>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let reader = BufReader::new(pipe);
        for line in reader.split(b'\n') {
            match line {
                Ok(line) => debug!("[{} stderr] {}", program, String::from_utf8_lossy(&line)),
                Err(_) => break,
            }
        }
    })
}

fn trim_newline(raw: &str) -> &str {
    let line = raw.strip_suffix('\n').unwrap_or(raw);
    line.strip_suffix('\r').unwrap_or(line)
}

#[cfg(unix)]
fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;

    status
        .code()
        .or_else(|| status.signal().map(|signal| 128 + signal))
        .unwrap_or(-1)
}

#[cfg(not(unix))]
fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}
