use std::{fmt::Display, sync::Arc, time::Duration};

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use crossterm::terminal;
use parking_lot::{Mutex, RwLock};

use crate::{
    config::{LoggerConfig, Visibility},
    error::LogError,
    models::{
        level::Level,
        message::DispatchMessage,
        record::{LogRecord, Location},
        task::TaskId,
    },
    worker::{
        dispatcher::{
            spawn_consumer, ConsumerHandle, ConsumerLinks, ConsumerState, FatalSubscribers,
            RenderSettings, Sinks,
        },
        sink::{BoxedWriter, ConsoleSink},
    },
};

use super::task_tracker::TaskTracker;

const FLUSH_TIMEOUT: Duration = Duration::from_secs(5);
const SEPARATOR: &str = "─";

enum Lifecycle {
    Idle(ConsumerState),
    Running(ConsumerHandle),
    /// The previous consumer died and took its sinks with it.
    Lost,
}

struct Shared {
    config: LoggerConfig,
    intake: Sender<DispatchMessage>,
    intake_rx: Receiver<DispatchMessage>,
    tracker: Arc<TaskTracker>,
    env: Arc<RwLock<String>>,
    visibility: Mutex<Visibility>,
    fatal: FatalSubscribers,
    lifecycle: Mutex<Lifecycle>,
}

impl Shared {
    fn stop(&self) {
        let mut lifecycle = self.lifecycle.lock();
        let previous = std::mem::replace(&mut *lifecycle, Lifecycle::Lost);
        *lifecycle = match previous {
            Lifecycle::Running(handle) => handle.stop().map_or(Lifecycle::Lost, Lifecycle::Idle),
            other => other,
        };
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Handle to the logging engine. Cheap to clone; every clone feeds the same
/// queue and the same single consumer thread.
///
/// The consumer runs between `start` and `stop`. Records enqueued while it
/// is stopped wait in the queue. Dropping the last handle stops it.
#[derive(Clone)]
pub struct Logger {
    shared: Arc<Shared>,
}

impl Logger {
    /// Logger writing to the process stdout/stderr.
    pub fn new(config: LoggerConfig) -> Result<Self, LogError> {
        Self::build(config, ConsoleSink::stdio())
    }

    /// Logger writing its console output to the given writers.
    pub fn with_writers(
        config: LoggerConfig,
        out: BoxedWriter,
        err: BoxedWriter,
    ) -> Result<Self, LogError> {
        Self::build(config, ConsoleSink::new(out, err))
    }

    fn build(config: LoggerConfig, console: ConsoleSink) -> Result<Self, LogError> {
        let sinks = Sinks::from_config(&config, console)?;
        let settings = RenderSettings::from(&config);
        let (intake, intake_rx) = unbounded();

        let shared = Shared {
            env: Arc::new(RwLock::new(config.env.clone())),
            visibility: Mutex::new(config.visibility),
            tracker: Arc::new(TaskTracker::new()),
            intake,
            intake_rx,
            fatal: FatalSubscribers::default(),
            lifecycle: Mutex::new(Lifecycle::Idle(ConsumerState { sinks, settings })),
            config,
        };
        Ok(Logger {
            shared: Arc::new(shared),
        })
    }

    /// Spin up the consumer thread unless one is already running.
    pub fn start(&self) -> Result<(), LogError> {
        let shared = &self.shared;
        let mut lifecycle = shared.lifecycle.lock();
        let state = match std::mem::replace(&mut *lifecycle, Lifecycle::Lost) {
            Lifecycle::Running(handle) if !handle.is_finished() => {
                *lifecycle = Lifecycle::Running(handle);
                return Ok(());
            }
            Lifecycle::Running(handle) => match handle.stop() {
                Some(state) => state,
                None => self.fresh_state()?,
            },
            Lifecycle::Idle(state) => state,
            Lifecycle::Lost => self.fresh_state()?,
        };

        let links = ConsumerLinks {
            intake: shared.intake_rx.clone(),
            tracker: Arc::clone(&shared.tracker),
            env: Arc::clone(&shared.env),
            fatal: Arc::clone(&shared.fatal),
            poll_interval: shared.config.poll_interval,
            tick_interval: shared.config.tick_interval,
        };
        let handle = spawn_consumer(links, state).map_err(LogError::Spawn)?;
        *lifecycle = Lifecycle::Running(handle);
        Ok(())
    }

    /// Drain everything queued so far and join the consumer thread.
    pub fn stop(&self) {
        self.shared.stop();
    }

    pub fn is_running(&self) -> bool {
        matches!(
            &*self.shared.lifecycle.lock(),
            Lifecycle::Running(handle) if !handle.is_finished()
        )
    }

    fn fresh_state(&self) -> Result<ConsumerState, LogError> {
        let config = &self.shared.config;
        Ok(ConsumerState {
            sinks: Sinks::from_config(config, ConsoleSink::stdio())?,
            settings: RenderSettings::from(config),
        })
    }

    /// Queue a record. Never blocks.
    pub fn enqueue(&self, record: LogRecord) {
        // The receiving end lives in `Shared`, so the queue cannot be closed.
        let _ = self.shared.intake.send(DispatchMessage::Record(record));
    }

    /// Wait until everything enqueued before this call has been written.
    /// Returns `false` when no consumer is running or it did not answer.
    pub fn flush(&self) -> bool {
        if !self.is_running() {
            return false;
        }
        let (ack, ack_rx) = bounded(1);
        let _ = self.shared.intake.send(DispatchMessage::Flush(ack));
        ack_rx.recv_timeout(FLUSH_TIMEOUT).is_ok()
    }

    pub fn record(&self, level: Level, message: impl Display, location: Location) {
        let record = LogRecord::new(level, message.to_string())
            .with_env(self.env())
            .with_location(location);
        self.enqueue(record);
    }

    /// Log by level name, e.g. `"warning"`.
    #[track_caller]
    pub fn log(&self, level: &str, message: impl Display) -> Result<(), LogError> {
        let level: Level = level.parse()?;
        self.record(level, message, Location::caller());
        Ok(())
    }

    #[track_caller]
    pub fn log_at(&self, level: Level, message: impl Display) {
        self.record(level, message, Location::caller());
    }

    #[track_caller]
    pub fn trace(&self, message: impl Display) {
        self.record(Level::Trace, message, Location::caller());
    }

    #[track_caller]
    pub fn debug(&self, message: impl Display) {
        self.record(Level::Debug, message, Location::caller());
    }

    #[track_caller]
    pub fn info(&self, message: impl Display) {
        self.record(Level::Info, message, Location::caller());
    }

    #[track_caller]
    pub fn done(&self, message: impl Display) {
        self.record(Level::Done, message, Location::caller());
    }

    #[track_caller]
    pub fn success(&self, message: impl Display) {
        self.record(Level::Success, message, Location::caller());
    }

    #[track_caller]
    pub fn warn(&self, message: impl Display) {
        self.record(Level::Warning, message, Location::caller());
    }

    #[track_caller]
    pub fn error(&self, message: impl Display) {
        self.record(Level::Error, message, Location::caller());
    }

    #[track_caller]
    pub fn critical(&self, message: impl Display) {
        self.record(Level::Critical, message, Location::caller());
    }

    /// Queue an `EXCEPTION` line and hand the fatal error straight back.
    ///
    /// The line is rendered asynchronously, so it may show up after the
    /// caller already reacted to the returned error. Once rendered, the
    /// message is also published on [`Logger::fatal_signals`].
    #[track_caller]
    pub fn exception(&self, message: impl Display) -> LogError {
        let message = message.to_string();
        self.record(Level::Exception, &message, Location::caller());
        LogError::Fatal { message }
    }

    /// Subscribe to messages of `EXCEPTION` records. Every receiver returned
    /// here gets its own copy of each message, published after the line was
    /// rendered. Dropping the receiver unsubscribes.
    pub fn fatal_signals(&self) -> Receiver<String> {
        let (subscriber, signals) = unbounded();
        self.shared.fatal.lock().push(subscriber);
        signals
    }

    /// Horizontal rule as wide as the terminal.
    #[track_caller]
    pub fn sep(&self) {
        let width = terminal::size().map(|(cols, _)| cols).unwrap_or(80).max(1);
        self.record(Level::Info, SEPARATOR.repeat(width as usize), Location::caller());
    }

    /// Register a background task and get its id for `finish_task`.
    #[track_caller]
    pub fn start_task(&self, label: impl Display) -> TaskId {
        self.shared.tracker.start_at(label.to_string(), Location::caller())
    }

    /// Finish a task. Repeated calls with the same id do nothing.
    #[track_caller]
    pub fn finish_task(&self, id: &TaskId, message: Option<&str>, success: bool) -> bool {
        self.shared
            .tracker
            .finish_at(id, message, success, Location::caller())
    }

    pub fn tracker(&self) -> &Arc<TaskTracker> {
        &self.shared.tracker
    }

    /// Change the console threshold by name. Unknown names are rejected.
    pub fn set_level(&self, level: &str) -> Result<(), LogError> {
        let level: Level = level.parse()?;
        self.set_console_level(level);
        Ok(())
    }

    pub fn set_console_level(&self, level: Level) {
        let _ = self
            .shared
            .intake
            .send(DispatchMessage::SetConsoleLevel(level));
    }

    pub fn set_env(&self, env: impl Into<String>) {
        *self.shared.env.write() = env.into();
    }

    pub fn env(&self) -> String {
        self.shared.env.read().clone()
    }

    pub fn show_file(&self, show: bool) {
        self.update_visibility(|visibility| visibility.file = show);
    }

    pub fn show_date(&self, show: bool) {
        self.update_visibility(|visibility| visibility.date = show);
    }

    pub fn show_env(&self, show: bool) {
        self.update_visibility(|visibility| visibility.env = show);
    }

    pub fn show_level(&self, show: bool) {
        self.update_visibility(|visibility| visibility.level = show);
    }

    fn update_visibility(&self, change: impl FnOnce(&mut Visibility)) {
        let mut visibility = self.shared.visibility.lock();
        change(&mut visibility);
        let _ = self
            .shared
            .intake
            .send(DispatchMessage::SetVisibility(*visibility));
    }
}
