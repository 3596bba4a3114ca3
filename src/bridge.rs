//! Routes the `log` facade into a [`Logger`], so `log::info!` and friends from
//! any crate end up on the same consumer thread as everything else.

use log::{LevelFilter, Metadata, Record};

use crate::{
    error::LogError,
    manager::logger::Logger,
    models::{level::Level, record::Location},
};

pub struct LogBridge {
    logger: Logger,
    max_level: LevelFilter,
}

impl LogBridge {
    pub fn new(logger: Logger, max_level: LevelFilter) -> Self {
        Self { logger, max_level }
    }

    /// Install as the process-wide `log` backend.
    pub fn install(self) -> Result<(), LogError> {
        let max_level = self.max_level;
        log::set_boxed_logger(Box::new(self))?;
        log::set_max_level(max_level);
        Ok(())
    }
}

impl log::Log for LogBridge {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let location = match (record.file(), record.line()) {
            (Some(file), Some(line)) => Location::new(file, line),
            (Some(file), None) => Location::new(file, 0),
            _ => Location::new(record.target(), 0),
        };
        self.logger
            .record(Level::from(record.level()), record.args(), location);
    }

    fn flush(&self) {
        self.logger.flush();
    }
}

impl Logger {
    /// Make this logger the `log` backend for the whole process.
    pub fn install_global(&self, max_level: LevelFilter) -> Result<(), LogError> {
        LogBridge::new(self.clone(), max_level).install()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io::{self, Write},
        sync::Arc,
    };

    use log::Log;
    use parking_lot::Mutex;

    use super::*;
    use crate::config::{LoggerConfig, Visibility};

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn facade_records_keep_their_location() {
        let out = Capture::default();
        let config = LoggerConfig::default()
            .colors(false)
            .animate(false)
            .visibility(Visibility {
                date: false,
                env: false,
                level: true,
                file: true,
            });
        let logger =
            Logger::with_writers(config, Box::new(out.clone()), Box::new(io::sink())).unwrap();
        let bridge = LogBridge::new(logger.clone(), LevelFilter::Info);
        logger.start().unwrap();

        bridge.log(
            &Record::builder()
                .args(format_args!("from the facade"))
                .level(log::Level::Warn)
                .file(Some("src/net/client.rs"))
                .line(Some(17))
                .build(),
        );
        bridge.log(
            &Record::builder()
                .args(format_args!("filtered"))
                .level(log::Level::Debug)
                .build(),
        );
        logger.stop();

        let text = String::from_utf8_lossy(&out.0.lock()).into_owned();
        assert_eq!(text, "WARNING net/client.rs:17 | from the facade\n");
    }
}
