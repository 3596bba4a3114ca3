#![allow(dead_code)]

use std::{
    io::{self, Write},
    sync::Arc,
};

use parking_lot::Mutex;
use process_log_system::{Logger, LoggerConfig, Visibility};

/// In-memory writer whose contents can be read back after the consumer ran.
#[derive(Clone, Default)]
pub struct Capture(Arc<Mutex<Vec<u8>>>);

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Capture {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.text().lines().map(str::to_string).collect()
    }
}

/// How a [`Flaky`] writer misbehaves.
#[derive(Clone, Copy)]
pub enum Failure {
    Error,
    Panic,
}

/// Writer whose first `failures` writes go wrong; later writes land in `out`.
#[derive(Clone)]
pub struct Flaky {
    pub out: Capture,
    remaining: Arc<Mutex<usize>>,
    failure: Failure,
}

impl Flaky {
    pub fn new(failures: usize, failure: Failure) -> Self {
        Self {
            out: Capture::default(),
            remaining: Arc::new(Mutex::new(failures)),
            failure,
        }
    }
}

impl Write for Flaky {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let failing = {
            let mut remaining = self.remaining.lock();
            let failing = *remaining > 0;
            *remaining = remaining.saturating_sub(1);
            failing
        };
        match (failing, self.failure) {
            (false, _) => self.out.write(buf),
            (true, Failure::Error) => Err(io::Error::new(io::ErrorKind::Other, "disk gone")),
            (true, Failure::Panic) => panic!("sink exploded"),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub fn plain_config() -> LoggerConfig {
    LoggerConfig::default()
        .colors(false)
        .animate(false)
        .visibility(Visibility {
            date: false,
            env: false,
            level: true,
            file: false,
        })
}

/// Logger over a misbehaving console writer, with its error writer captured.
pub fn flaky_logger(config: LoggerConfig, console: Flaky) -> (Logger, Capture) {
    let err = Capture::default();
    let logger = Logger::with_writers(config, Box::new(console), Box::new(err.clone()))
        .expect("logger without file sink");
    (logger, err)
}

pub fn captured_logger(config: LoggerConfig) -> (Logger, Capture) {
    let out = Capture::default();
    let logger = Logger::with_writers(config, Box::new(out.clone()), Box::new(io::sink()))
        .expect("logger without file sink");
    (logger, out)
}
