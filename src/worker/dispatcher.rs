use std::{
    any::Any,
    io,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
    thread::{self, JoinHandle},
    time::Duration,
};

use crossbeam_channel::{bounded, select, tick, Receiver, Sender};
use parking_lot::{Mutex, RwLock};

use crate::{
    config::{LoggerConfig, Visibility},
    error::{ConsumerFault, LogError},
    formatter::{finished_line, format_record, running_line},
    manager::task_tracker::TaskTracker,
    models::{
        level::Level,
        message::DispatchMessage,
        record::LogRecord,
        task::{FinishedTask, TaskStatus},
    },
};

use super::sink::{ConsoleSink, RotatingFileSink};

/// Output targets, owned by whichever consumer thread is running.
pub struct Sinks {
    pub console: ConsoleSink,
    pub file: Option<RotatingFileSink>,
}

impl Sinks {
    pub fn from_config(config: &LoggerConfig, console: ConsoleSink) -> Result<Self, LogError> {
        let file = config.file.as_ref().map(RotatingFileSink::open).transpose()?;
        Ok(Self { console, file })
    }
}

/// Rendering settings. Changed only through the intake queue, so a change
/// applies exactly from its position in the record stream onwards.
#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub console_level: Level,
    pub file_level: Level,
    pub visibility: Visibility,
    pub colors: bool,
    pub animate: bool,
}

impl From<&LoggerConfig> for RenderSettings {
    fn from(config: &LoggerConfig) -> Self {
        Self {
            console_level: config.console_level,
            file_level: config.file_level,
            visibility: config.visibility,
            colors: config.colors,
            animate: config.animate,
        }
    }
}

/// What a consumer hands back when it exits, ready for the next `start`.
pub struct ConsumerState {
    pub sinks: Sinks,
    pub settings: RenderSettings,
}

/// Receivers registered through `Logger::fatal_signals`.
pub type FatalSubscribers = Arc<Mutex<Vec<Sender<String>>>>;

/// Shared pieces the consumer reads but does not own.
#[derive(Clone)]
pub struct ConsumerLinks {
    pub intake: Receiver<DispatchMessage>,
    pub tracker: Arc<TaskTracker>,
    pub env: Arc<RwLock<String>>,
    pub fatal: FatalSubscribers,
    pub poll_interval: Duration,
    pub tick_interval: Duration,
}

pub struct ConsumerHandle {
    shutdown: Sender<()>,
    join: JoinHandle<ConsumerState>,
}

impl ConsumerHandle {
    /// Signal the consumer and wait for it to drain and exit. `None` if the
    /// thread died.
    pub fn stop(self) -> Option<ConsumerState> {
        let _ = self.shutdown.send(());
        self.join.join().ok()
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

pub fn spawn_consumer(links: ConsumerLinks, state: ConsumerState) -> io::Result<ConsumerHandle> {
    let (shutdown, shutdown_rx) = bounded(1);
    let consumer = Consumer {
        links,
        sinks: state.sinks,
        settings: state.settings,
        frame: 0,
    };
    let join = thread::Builder::new()
        .name("log-consumer".into())
        .spawn(move || consumer.run(shutdown_rx))?;
    Ok(ConsumerHandle { shutdown, join })
}

struct Consumer {
    links: ConsumerLinks,
    sinks: Sinks,
    settings: RenderSettings,
    frame: usize,
}

impl Consumer {
    fn run(mut self, shutdown: Receiver<()>) -> ConsumerState {
        let ticker = tick(self.links.tick_interval);
        let intake = self.links.intake.clone();
        let poll = self.links.poll_interval;

        loop {
            let keep_running = select! {
                recv(intake) -> message => match message {
                    Ok(message) => {
                        self.dispatch(message);
                        true
                    }
                    Err(_) => false,
                },
                recv(ticker) -> _ => {
                    self.animate();
                    true
                },
                recv(shutdown) -> _ => false,
                default(poll) => true,
            };
            if !keep_running {
                break;
            }
            self.report_finished();
        }

        for message in intake.try_iter() {
            self.dispatch(message);
        }
        self.report_finished();
        if let Err(source) = self.sinks.console.clear_frame() {
            self.fault(ConsumerFault::Write { sink: "console", source });
        }
        self.flush();

        ConsumerState {
            sinks: self.sinks,
            settings: self.settings,
        }
    }

    fn dispatch(&mut self, message: DispatchMessage) {
        match message {
            DispatchMessage::Record(record) => {
                self.write_record(&record);
                if record.level == Level::Exception {
                    self.publish_fatal(&record.message);
                }
            }
            DispatchMessage::SetConsoleLevel(level) => self.settings.console_level = level,
            DispatchMessage::SetVisibility(visibility) => self.settings.visibility = visibility,
            DispatchMessage::Flush(ack) => {
                self.report_finished();
                self.flush();
                let _ = ack.send(());
            }
        }
    }

    fn write_record(&mut self, record: &LogRecord) {
        self.guarded(|consumer| consumer.try_write(record));
    }

    /// Run one rendering step. Write errors and panics are reported on the
    /// error writer and the consumer carries on with the next step.
    fn guarded(&mut self, step: impl FnOnce(&mut Self) -> Result<(), ConsumerFault>) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| step(self)));
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(fault)) => self.fault(fault),
            Err(payload) => self.fault(ConsumerFault::Panic(panic_message(payload))),
        }
    }

    fn try_write(&mut self, record: &LogRecord) -> Result<(), ConsumerFault> {
        if record.level >= self.settings.console_level {
            let line = format_record(record, &self.settings.visibility, self.settings.colors);
            self.sinks
                .console
                .write_line(&line)
                .map_err(|source| ConsumerFault::Write { sink: "console", source })?;
        }
        if let Some(file) = self.sinks.file.as_mut() {
            if record.level >= self.settings.file_level {
                let line = format_record(record, &self.settings.visibility, false);
                file.write_line(&line)
                    .map_err(|source| ConsumerFault::Write { sink: "file", source })?;
            }
        }
        Ok(())
    }

    fn animate(&mut self) {
        if !self.settings.animate {
            return;
        }
        self.report_finished();
        self.guarded(Self::try_animate);
    }

    /// Draw the next spinner frame for the oldest running task.
    fn try_animate(&mut self) -> Result<(), ConsumerFault> {
        let console_fault = |source: io::Error| ConsumerFault::Write { sink: "console", source };

        let Some((task, active)) = self.links.tracker.oldest_active() else {
            return self.sinks.console.clear_frame().map_err(console_fault);
        };
        if Level::Running < self.settings.console_level {
            return Ok(());
        }

        let text = running_line(&task.label, active, self.frame, task.started.elapsed());
        self.frame = self.frame.wrapping_add(1);
        let record = LogRecord::new(Level::Running, text)
            .with_env(self.links.env.read().clone())
            .with_location(task.location)
            .continuing(self.sinks.console.frame_visible());

        let line = format_record(&record, &self.settings.visibility, self.settings.colors);
        self.sinks
            .console
            .write_frame(&line, record.continuation)
            .map_err(console_fault)
    }

    fn report_finished(&mut self) {
        for task in self.links.tracker.drain_finished() {
            self.guarded(|consumer| {
                let record = consumer.finished_record(&task);
                consumer.try_write(&record)
            });
        }
    }

    fn finished_record(&self, task: &FinishedTask) -> LogRecord {
        let level = match task.status {
            TaskStatus::Failed => Level::Failed,
            TaskStatus::Completed | TaskStatus::Running => Level::Completed,
        };
        LogRecord::new(level, finished_line(task))
            .with_env(self.links.env.read().clone())
            .with_location(task.location.clone())
    }

    /// Hand an `EXCEPTION` message to every live subscriber. Subscribers
    /// whose receiver is gone are dropped.
    fn publish_fatal(&self, message: &str) {
        self.links
            .fatal
            .lock()
            .retain(|subscriber| subscriber.send(message.to_string()).is_ok());
    }

    fn flush(&mut self) {
        if let Err(source) = self.sinks.console.flush() {
            self.fault(ConsumerFault::Write { sink: "console", source });
        }
        if let Some(file) = self.sinks.file.as_mut() {
            if let Err(source) = file.flush() {
                self.fault(ConsumerFault::Write { sink: "file", source });
            }
        }
    }

    fn fault(&mut self, fault: ConsumerFault) {
        self.sinks
            .console
            .report(&format!("Error in log consumer: {}", fault));
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
